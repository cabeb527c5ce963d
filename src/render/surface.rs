use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::analysis::bars::{BarVertex, Viewport};
use crate::encode::ffmpeg::{EncoderSettings, FfmpegEncoder};

use super::frame::{FrameRenderer, TEXTURE_FORMAT};
use super::gpu::GpuContext;
use super::pipeline::{BarPipeline, BarUniforms};
use super::text::{format_elapsed, TextOverlay};

/// Whatever ends up showing the bars.
pub trait RenderSurface {
    fn viewport(&self) -> Viewport;

    /// Polled once per tick; the loop stops as soon as this returns true.
    fn close_requested(&mut self) -> bool;

    /// Replace the vertex list drawn by subsequent presents.
    fn set_vertices(&mut self, vertices: &[BarVertex]) -> Result<()>;

    fn present(&mut self, elapsed: Duration) -> Result<()>;
}

#[derive(Default)]
pub struct Overlay {
    pub text: Option<TextOverlay>,
    pub title: Option<String>,
    pub show_time: bool,
}

/// Offscreen GPU surface whose presented frames are piped into ffmpeg.
pub struct VideoSurface {
    gpu: GpuContext,
    renderer: FrameRenderer,
    bars: BarPipeline,
    vertex_count: u32,
    encoder: Option<FfmpegEncoder>,
    settings: EncoderSettings,
    overlay: Overlay,
    total_frames: u64,
    presented: u64,
    progress: ProgressBar,
}

impl VideoSurface {
    pub fn new(
        settings: EncoderSettings,
        num_bars: usize,
        total_frames: u64,
        overlay: Overlay,
    ) -> Result<Self> {
        log::info!("Initializing GPU...");
        let gpu = GpuContext::new()?;
        let renderer = FrameRenderer::new(&gpu, settings.width, settings.height);
        let bars = BarPipeline::new(&gpu.device, TEXTURE_FORMAT, num_bars * 2);

        let uniforms = BarUniforms::new(settings.width, settings.height);
        gpu.queue
            .write_buffer(&bars.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        log::info!("Starting FFmpeg encoder...");
        let encoder = FfmpegEncoder::new(&settings)?;

        let progress = ProgressBar::new(total_frames);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
                .progress_chars("=>-"),
        );

        Ok(Self {
            gpu,
            renderer,
            bars,
            vertex_count: 0,
            encoder: Some(encoder),
            settings,
            overlay,
            total_frames,
            presented: 0,
            progress,
        })
    }

    /// Flush the encoder. Must be called after the session ends.
    pub fn finish(mut self) -> Result<()> {
        self.progress.finish_with_message("Rendering complete");
        log::info!("Finishing encoding...");
        match self.encoder.take() {
            Some(encoder) => encoder.finish(&self.settings.output),
            None => Ok(()),
        }
    }

    fn draw_overlay(&self, pixels: &mut [u8], elapsed: Duration) {
        let Some(ref text) = self.overlay.text else {
            return;
        };
        let (width, height) = (self.settings.width, self.settings.height);
        let color = [255u8, 255, 255, 220];
        let margin = (width.min(height) as f32 * 0.05) as u32;

        if let Some(ref title) = self.overlay.title {
            let tx = width.saturating_sub(margin + text.measure_width(title));
            text.composite(pixels, width, height, title, tx, margin, color);
        }

        if self.overlay.show_time {
            let time_str = format_elapsed(elapsed);
            let tx = width.saturating_sub(margin + text.measure_width(&time_str));
            let ty = height.saturating_sub(margin + text.line_height());
            text.composite(pixels, width, height, &time_str, tx, ty, color);
        }
    }
}

impl RenderSurface for VideoSurface {
    fn viewport(&self) -> Viewport {
        Viewport::new(self.settings.width as f32, self.settings.height as f32)
    }

    fn close_requested(&mut self) -> bool {
        self.presented >= self.total_frames
    }

    fn set_vertices(&mut self, vertices: &[BarVertex]) -> Result<()> {
        if vertices.len() > self.bars.vertex_capacity {
            anyhow::bail!(
                "{} vertices exceed the buffer capacity of {}",
                vertices.len(),
                self.bars.vertex_capacity
            );
        }
        if !vertices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.bars.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        }
        self.vertex_count = vertices.len() as u32;
        Ok(())
    }

    fn present(&mut self, elapsed: Duration) -> Result<()> {
        let mut pixels = self
            .renderer
            .render_and_readback(&self.gpu, &self.bars, self.vertex_count)?;
        self.draw_overlay(&mut pixels, elapsed);

        if let Some(ref mut encoder) = self.encoder {
            encoder.write_frame(&pixels)?;
        }

        self.presented += 1;
        self.progress.set_position(self.presented);
        Ok(())
    }
}
