use bytemuck::{Pod, Zeroable};
use rustfft::num_complex::Complex;

use super::color::{bar_colors, Rgb};
use super::AnalysisConfig;

/// Drawable area in pixels; y grows downwards from the top edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bar {
    pub index: usize,
    pub height: f32,
    pub base: Rgb,
    pub tip: Rgb,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BarVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// Half-open range of spectrum bins feeding bar `index`.
///
/// Bars are spaced exponentially over `[1, half)`: low bars get a bin or two
/// each, high bars get wide slices. Every bar gets at least one bin.
pub fn bin_range(index: usize, num_bars: usize, half: usize) -> (usize, usize) {
    let edge = |i: usize| (half as f64).powf(i as f64 / num_bars as f64) as usize;
    let low = edge(index);
    let mut high = edge(index + 1);
    if high <= low {
        high = low + 1;
    }
    (low, high)
}

/// Mean magnitude over the bar's bins, clipped to the first half of the spectrum.
pub fn average_magnitude(spectrum: &[Complex<f64>], index: usize, num_bars: usize) -> f64 {
    let half = spectrum.len() / 2;
    let (low, high) = bin_range(index, num_bars, half);
    let high = high.min(half);
    if low >= high {
        return 0.0;
    }
    let sum: f64 = spectrum[low..high].iter().map(|c| c.norm()).sum();
    sum / (high - low) as f64
}

/// Map a mean magnitude onto a pixel height in `[0, max_height]`.
pub fn scale_height(avg: f64, config: &AnalysisConfig, max_height: f32) -> f32 {
    let db = 20.0 * (avg * config.magnitude_gain + 1.0).log10();
    let h = db.max(0.0) * config.height_scale;
    if h.is_nan() {
        return 0.0;
    }
    (h as f32).clamp(0.0, max_height.max(0.0))
}

/// Refill `bars` with one entry per configured bar for `spectrum`.
pub fn compute_bars(
    spectrum: &[Complex<f64>],
    config: &AnalysisConfig,
    viewport: Viewport,
    bars: &mut Vec<Bar>,
) {
    bars.clear();
    bars.extend((0..config.num_bars).map(|index| {
        let avg = average_magnitude(spectrum, index, config.num_bars);
        let (base, tip) = bar_colors(index, config.num_bars);
        Bar {
            index,
            height: scale_height(avg, config, viewport.height),
            base,
            tip,
        }
    }));
}

/// Flat bars for frames with no spectrum (silence, empty tracks).
pub fn silent_bars(num_bars: usize, bars: &mut Vec<Bar>) {
    bars.clear();
    bars.extend((0..num_bars).map(|index| {
        let (base, tip) = bar_colors(index, num_bars);
        Bar {
            index,
            height: 0.0,
            base,
            tip,
        }
    }));
}

/// Two vertices per bar: the foot on the bottom edge, then the tip.
pub fn bar_vertices(bars: &[Bar], viewport: Viewport, vertices: &mut Vec<BarVertex>) {
    vertices.clear();
    if bars.is_empty() {
        return;
    }
    let bar_width = viewport.width / bars.len() as f32;
    for bar in bars {
        let x = bar.index as f32 * bar_width;
        vertices.push(BarVertex {
            position: [x, viewport.height],
            color: bar.base.to_rgba_f32(),
        });
        vertices.push(BarVertex {
            position: [x, viewport.height - bar.height],
            color: bar.tip.to_rgba_f32(),
        });
    }
}
