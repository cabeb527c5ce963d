use anyhow::Result;
use wgpu;

use super::gpu::GpuContext;
use super::pipeline::BarPipeline;

/// Written as-is: vertex colors are already display-ready sRGB bytes.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Offscreen render target plus the staging buffer used to read it back.
pub struct FrameRenderer {
    pub render_texture: wgpu::Texture,
    pub render_texture_view: wgpu::TextureView,
    pub output_buffer: wgpu::Buffer,
    pub width: u32,
    pub height: u32,
    pub padded_bytes_per_row: u32,
    pub unpadded_bytes_per_row: u32,
}

impl FrameRenderer {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let render_texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("render_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let render_texture_view = render_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row = padded_row_bytes(width);

        let output_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("output_buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            render_texture,
            render_texture_view,
            output_buffer,
            width,
            height,
            padded_bytes_per_row,
            unpadded_bytes_per_row,
        }
    }

    /// Clear to black, draw `vertex_count` bar vertices as lines, and return
    /// tightly packed RGBA rows.
    pub fn render_and_readback(
        &self,
        gpu: &GpuContext,
        bars: &BarPipeline,
        vertex_count: u32,
    ) -> Result<Vec<u8>> {
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("bar_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.render_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if vertex_count > 0 {
                render_pass.set_pipeline(&bars.pipeline);
                render_pass.set_bind_group(0, &bars.bind_group, &[]);
                render_pass.set_vertex_buffer(0, bars.vertex_buffer.slice(..));
                render_pass.draw(0..vertex_count, 0..1);
            }
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.render_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        gpu.queue.submit(std::iter::once(encoder.finish()));

        // Read back
        let buffer_slice = self.output_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        gpu.device.poll(wgpu::Maintain::Wait);
        receiver.recv()??;

        let data = buffer_slice.get_mapped_range();
        let pixels = strip_row_padding(
            &data,
            self.height,
            self.padded_bytes_per_row,
            self.unpadded_bytes_per_row,
        );
        drop(data);
        self.output_buffer.unmap();

        Ok(pixels)
    }
}

/// Row stride rounded up to wgpu's copy alignment.
pub fn padded_row_bytes(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn strip_row_padding(data: &[u8], height: u32, padded: u32, unpadded: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((unpadded * height) as usize);
    for row in 0..height {
        let start = (row * padded) as usize;
        let end = start + unpadded as usize;
        pixels.extend_from_slice(&data[start..end]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_row_bytes(64), 256);
        assert_eq!(padded_row_bytes(65), 512);
        assert_eq!(padded_row_bytes(1920), 7680);
    }

    #[test]
    fn padding_is_stripped_per_row() {
        // 2 rows of 2 pixels with 8 bytes of padding each
        let mut data = Vec::new();
        for row in 0..2u8 {
            data.extend(std::iter::repeat(row + 1).take(8));
            data.extend(std::iter::repeat(0xEE).take(8));
        }
        let pixels = strip_row_padding(&data, 2, 16, 8);
        assert_eq!(pixels.len(), 16);
        assert!(pixels[..8].iter().all(|&b| b == 1));
        assert!(pixels[8..].iter().all(|&b| b == 2));
    }
}
