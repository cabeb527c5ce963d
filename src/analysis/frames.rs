use std::f64::consts::PI;

use super::TrailingFrame;

/// Cut `signal` into consecutive, non-overlapping frames of `frame_size`.
pub fn split_frames(signal: &[f64], frame_size: usize, trailing: TrailingFrame) -> Vec<Vec<f64>> {
    let mut frames: Vec<Vec<f64>> = Vec::with_capacity(signal.len() / frame_size + 1);
    let mut current: Vec<f64> = Vec::with_capacity(frame_size);

    for &sample in signal {
        current.push(sample);
        if current.len() == frame_size {
            frames.push(std::mem::replace(&mut current, Vec::with_capacity(frame_size)));
        }
    }

    if !current.is_empty() {
        match trailing {
            TrailingFrame::Drop => {
                log::debug!("Dropping {} trailing samples", current.len());
            }
            TrailingFrame::ZeroPad => {
                current.resize(frame_size, 0.0);
                frames.push(current);
            }
        }
    }

    frames
}

pub fn hann_coefficient(y: usize, size: usize) -> f64 {
    if size < 2 {
        return 1.0;
    }
    0.5 * (1.0 - (2.0 * PI * y as f64 / (size - 1) as f64).cos())
}

/// Precomputed Hann coefficients for one frame size.
pub struct HannWindow {
    coeffs: Vec<f64>,
}

impl HannWindow {
    pub fn new(size: usize) -> Self {
        let coeffs = (0..size).map(|y| hann_coefficient(y, size)).collect();
        Self { coeffs }
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn apply(&self, frame: &mut [f64]) {
        for (sample, &c) in frame.iter_mut().zip(self.coeffs.iter()) {
            *sample *= c;
        }
    }
}

pub fn apply_hann(frames: &mut [Vec<f64>], window: &HannWindow) {
    for frame in frames.iter_mut() {
        debug_assert_eq!(frame.len(), window.len());
        window.apply(frame);
    }
}
