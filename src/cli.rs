use clap::Parser;
use std::path::PathBuf;

use crate::analysis::TrailingFrame;

#[derive(Parser, Debug)]
#[command(name = "musvis", about = "Render a frequency-bar visualization of an audio file")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Output video file
    #[arg(short, long, default_value = "musvis.mp4")]
    pub output: PathBuf,

    /// Config file (defaults to ./musvis.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Video width in pixels
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Video height in pixels
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// Samples per analysis frame (power of two)
    #[arg(long, default_value_t = 2048)]
    pub frame_size: usize,

    /// Number of bars
    #[arg(long, default_value_t = 32)]
    pub bars: usize,

    /// What to do with samples after the last full frame
    #[arg(long, value_enum, default_value_t = TrailingFrame::Drop)]
    pub trailing: TrailingFrame,

    /// Transform frames on demand instead of all up front
    #[arg(long)]
    pub lazy: bool,

    /// Title text overlay (needs --font)
    #[arg(long)]
    pub title: Option<String>,

    /// Show elapsed time overlay (needs --font)
    #[arg(long)]
    pub show_time: bool,

    /// TTF/OTF font used for overlays
    #[arg(long)]
    pub font: Option<PathBuf>,
}
