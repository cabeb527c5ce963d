use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use std::path::Path;
use std::time::Duration;

pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn from_bytes(bytes: &[u8], font_size: f32) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        Ok(Self { font, font_size })
    }

    pub fn from_file(path: &Path, font_size: f32) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file: {}", path.display()))?;
        Self::from_bytes(&bytes, font_size)
    }

    pub fn line_height(&self) -> u32 {
        self.font_size.ceil() as u32
    }

    /// Alpha-blend `text` onto an RGBA buffer with its top-left corner at `(x, y)`.
    pub fn composite(
        &self,
        pixels: &mut [u8],
        width: u32,
        height: u32,
        text: &str,
        x: u32,
        y: u32,
        color: [u8; 4],
    ) {
        let mut cursor_x = x as i32;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let glyph_y = y as i32 + self.font_size as i32 - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = bitmap[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }
                    let px = cursor_x + gx as i32;
                    let py = glyph_y + gy as i32;
                    blend_pixel(pixels, width, height, px, py, alpha, color);
                }
            }

            cursor_x += metrics.advance_width as i32;
        }
    }

    pub fn measure_width(&self, text: &str) -> u32 {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, self.font_size).advance_width)
            .sum();
        width.ceil() as u32
    }
}

fn blend_pixel(pixels: &mut [u8], width: u32, height: u32, px: i32, py: i32, alpha: u8, color: [u8; 4]) {
    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
        return;
    }
    let idx = ((py as u32 * width + px as u32) * 4) as usize;
    if idx + 3 >= pixels.len() {
        return;
    }

    let a = alpha as f32 / 255.0 * (color[3] as f32 / 255.0);
    let inv_a = 1.0 - a;
    for c in 0..3 {
        pixels[idx + c] = (color[c] as f32 * a + pixels[idx + c] as f32 * inv_a) as u8;
    }
    pixels[idx + 3] = 255;
}

/// `mm:ss.cc`, or `hh:mm:ss.cc` past the hour.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let centis = elapsed.subsec_millis() / 10;
    if total_secs >= 3600 {
        format!(
            "{:02}:{:02}:{:02}.{:02}",
            total_secs / 3600,
            (total_secs % 3600) / 60,
            total_secs % 60,
            centis
        )
    } else {
        format!("{:02}:{:02}.{:02}", total_secs / 60, total_secs % 60, centis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00.00");
        assert_eq!(format_elapsed(Duration::from_millis(61_250)), "01:01.25");
        assert_eq!(format_elapsed(Duration::from_millis(3_723_990)), "01:02:03.99");
    }

    #[test]
    fn blending_respects_bounds_and_alpha() {
        let mut pixels = vec![0u8; 2 * 2 * 4];
        blend_pixel(&mut pixels, 2, 2, 5, 0, 255, [255, 255, 255, 255]);
        blend_pixel(&mut pixels, 2, 2, -1, 0, 255, [255, 255, 255, 255]);
        assert!(pixels.iter().all(|&b| b == 0));

        blend_pixel(&mut pixels, 2, 2, 1, 1, 255, [200, 100, 50, 255]);
        assert_eq!(&pixels[12..16], &[200, 100, 50, 255]);
    }

    #[test]
    fn rejects_garbage_font() {
        assert!(TextOverlay::from_bytes(b"not a font", 24.0).is_err());
    }
}
