mod analysis;
mod audio;
mod cli;
mod config;
mod encode;
mod playback;
mod render;
mod session;

use anyhow::{Context, Result};
use clap::Parser;

use analysis::AnalysisConfig;
use cli::Cli;
use encode::ffmpeg::EncoderSettings;
use playback::clock::FrameClock;
use render::surface::{Overlay, VideoSurface};
use render::text::TextOverlay;
use session::Session;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();
    let mut analysis_config = AnalysisConfig {
        frame_size: cli.frame_size,
        num_bars: cli.bars,
        trailing: cli.trailing,
        lazy: cli.lazy,
        ..AnalysisConfig::default()
    };

    if let Some(ref path) = config::find_config(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.width == 1920 { cli.width = cfg.output.width; }
            if cli.height == 1080 { cli.height = cfg.output.height; }
            if cli.fps == 60 { cli.fps = cfg.output.fps; }
            if cli.crf == 18 { cli.crf = cfg.output.crf; }
            if cli.codec == "libx264" { cli.codec = cfg.output.codec; }
            if cli.pix_fmt == "yuv420p" { cli.pix_fmt = cfg.output.pix_fmt; }
            if cli.font.is_none() { cli.font = cfg.output.font; }

            let a = cfg.analysis;
            if cli.frame_size == 2048 { analysis_config.frame_size = a.frame_size; }
            if cli.bars == 32 { analysis_config.num_bars = a.num_bars; }
            if cli.trailing == analysis::TrailingFrame::Drop { analysis_config.trailing = a.trailing; }
            if !cli.lazy { analysis_config.lazy = a.lazy; }
            analysis_config.magnitude_gain = a.magnitude_gain;
            analysis_config.height_scale = a.height_scale;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if cli.fps == 0 {
        anyhow::bail!("--fps must be at least 1");
    }
    analysis_config
        .validate()
        .context("Invalid analysis settings")?;

    let input = &cli.input;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("musvis - frequency bar visualizer");
    log::info!("Input: {}", input.display());
    log::info!("Output: {}", cli.output.display());
    log::info!("Resolution: {}x{} @ {}fps", cli.width, cli.height, cli.fps);

    // 1. Decode audio
    log::info!("Decoding audio...");
    let waveform = audio::decode::decode_audio(input)
        .with_context(|| format!("Error loading audio file {}", input.display()))?;

    // 2. Analyze the whole track before playback starts
    log::info!(
        "Analyzing audio (frame_size={}, bars={}, {})...",
        analysis_config.frame_size,
        analysis_config.num_bars,
        if analysis_config.lazy { "lazy" } else { "eager" }
    );
    let analysis = analysis::analyze(&waveform, &analysis_config)?;
    let duration = analysis.duration;
    log::info!("Analyzed frames: {}, Duration: {:.1}s", analysis.frame_count(), duration);
    if analysis.source.is_empty() {
        log::warn!("Track is shorter than one analysis frame; bars will stay flat");
    }

    // 3. Overlay
    let text = match cli.font {
        Some(ref font) if cli.title.is_some() || cli.show_time => {
            let shorter = cli.width.min(cli.height) as f32;
            Some(TextOverlay::from_file(font, (shorter * 0.046).max(24.0))?)
        }
        None if cli.title.is_some() || cli.show_time => {
            log::warn!("Overlay requested but no --font given; skipping text");
            None
        }
        _ => None,
    };
    let overlay = Overlay {
        text,
        title: cli.title.clone(),
        show_time: cli.show_time,
    };

    // 4. Render surface: one video frame per clock tick, at least one frame
    let total_frames = ((duration * cli.fps as f64).ceil() as u64).max(1);
    let settings = EncoderSettings {
        output: cli.output.clone(),
        audio: input.clone(),
        width: cli.width,
        height: cli.height,
        fps: cli.fps,
        codec: cli.codec.clone(),
        pix_fmt: cli.pix_fmt.clone(),
        crf: cli.crf,
    };
    let mut surface = VideoSurface::new(settings, analysis_config.num_bars, total_frames, overlay)?;

    // 5. Playback loop
    let mut clock = FrameClock::new(cli.fps);
    let mut session = Session::new(analysis, analysis_config);
    let stats = session.run(&mut clock, &mut surface)?;

    surface.finish()?;

    log::info!(
        "Done! {} frames ({} bar updates) written to {}",
        stats.presented,
        stats.recomputed,
        cli.output.display()
    );
    Ok(())
}
