//! Offline spectrum analysis: waveform in, per-frame complex spectra out.
//!
//! Everything under this module is pure computation with no I/O, so it can
//! be driven from tests without a GPU or an audio device.

pub mod bars;
pub mod color;
pub mod fft;
pub mod frames;
pub mod source;

use serde::Deserialize;
use thiserror::Error;

use crate::audio::waveform::{downmix, normalize, Waveform};
use fft::SpectrumEngine;
use frames::{apply_hann, split_frames, HannWindow};
use source::SpectrumSource;

pub const DEFAULT_FRAME_SIZE: usize = 2048;
pub const DEFAULT_NUM_BARS: usize = 32;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("transform size {size} is not a power of two")]
    NotPowerOfTwo { size: usize },
    #[error("transform expects {expected} samples, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("invalid waveform: {reason}")]
    InvalidWaveform { reason: String },
    #[error("invalid analysis config: {reason}")]
    InvalidConfig { reason: String },
}

/// What happens to the samples left over after the last full frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrailingFrame {
    /// Discard the remainder.
    #[default]
    Drop,
    /// Zero-fill the remainder up to a full frame.
    #[value(name = "pad")]
    #[serde(rename = "pad")]
    ZeroPad,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisConfig {
    pub frame_size: usize,
    pub num_bars: usize,
    /// Multiplier applied to the mean magnitude before the log.
    pub magnitude_gain: f64,
    /// Multiplier applied to the dB-like value to get pixels.
    pub height_scale: f64,
    pub trailing: TrailingFrame,
    /// Compute spectra on demand instead of for the whole track up front.
    pub lazy: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            num_bars: DEFAULT_NUM_BARS,
            magnitude_gain: 100.0,
            height_scale: 10.0,
            trailing: TrailingFrame::Drop,
            lazy: false,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.frame_size.is_power_of_two() || self.frame_size < 2 {
            return Err(AnalysisError::NotPowerOfTwo {
                size: self.frame_size,
            });
        }
        if self.num_bars == 0 || self.num_bars > self.frame_size / 2 {
            return Err(AnalysisError::InvalidConfig {
                reason: format!(
                    "num_bars must be in 1..={}, got {}",
                    self.frame_size / 2,
                    self.num_bars
                ),
            });
        }
        if !self.magnitude_gain.is_finite() || !self.height_scale.is_finite() {
            return Err(AnalysisError::InvalidConfig {
                reason: "magnitude_gain and height_scale must be finite".into(),
            });
        }
        Ok(())
    }
}

/// Result of analyzing one track. The spectra are read-only from here on.
pub struct Analysis {
    pub source: SpectrumSource,
    /// Rate of the analyzed (mono) signal.
    pub sample_rate: u32,
    /// Channel count of the analyzed signal; always 1 after downmixing.
    pub channels: u16,
    pub duration: f64,
}

impl Analysis {
    pub fn frame_count(&self) -> usize {
        self.source.len()
    }
}

/// Run the whole pipeline: downmix, normalize, frame, window, transform.
pub fn analyze(waveform: &Waveform, config: &AnalysisConfig) -> Result<Analysis, AnalysisError> {
    config.validate()?;

    let mono = downmix(waveform);
    let signal = normalize(&mono);
    let mut frames = split_frames(&signal, config.frame_size, config.trailing);
    let window = HannWindow::new(config.frame_size);
    apply_hann(&mut frames, &window);

    log::info!(
        "Analysis: {} mono samples -> {} frames of {} ({} dropped)",
        signal.len(),
        frames.len(),
        config.frame_size,
        match config.trailing {
            TrailingFrame::Drop => signal.len() % config.frame_size,
            TrailingFrame::ZeroPad => 0,
        }
    );

    let engine = SpectrumEngine::new(config.frame_size)?;
    let source = if config.lazy {
        SpectrumSource::lazy(frames, engine)
    } else {
        SpectrumSource::eager(&frames, &engine)?
    };

    Ok(Analysis {
        source,
        sample_rate: mono.sample_rate(),
        channels: mono.channels(),
        duration: mono.duration(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: u32, seconds: f64, amplitude: f64) -> Vec<i16> {
        let n = (sample_rate as f64 * seconds) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (amplitude * (2.0 * PI * freq * t).sin() * 32767.0) as i16
            })
            .collect()
    }

    #[test]
    fn config_rejects_bad_sizes() {
        let mut cfg = AnalysisConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.frame_size = 1000;
        assert!(matches!(cfg.validate(), Err(AnalysisError::NotPowerOfTwo { size: 1000 })));

        cfg.frame_size = 0;
        assert!(cfg.validate().is_err());

        cfg = AnalysisConfig {
            num_bars: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(AnalysisError::InvalidConfig { .. })));

        cfg = AnalysisConfig {
            magnitude_gain: f64::NAN,
            ..AnalysisConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_track_yields_no_frames() {
        let waveform = Waveform::new(Vec::new(), 44_100, 2).unwrap();
        let analysis = analyze(&waveform, &AnalysisConfig::default()).unwrap();
        assert_eq!(analysis.frame_count(), 0);
        assert_eq!(analysis.channels, 1);
    }

    #[test]
    fn stereo_track_is_framed_after_downmix() {
        // 5000 stereo frames -> 5000 mono samples -> 2 full frames of 2048
        let waveform = Waveform::new(vec![100; 10_000], 22_050, 2).unwrap();
        let analysis = analyze(&waveform, &AnalysisConfig::default()).unwrap();
        assert_eq!(analysis.frame_count(), 2);
        assert_eq!(analysis.sample_rate, 22_050);
        assert_eq!(analysis.channels, 1);
    }

    #[test]
    fn tone_peaks_in_its_bar_for_every_frame() {
        let cfg = AnalysisConfig::default();
        let waveform = Waveform::new(sine(440.0, 44_100, 1.0, 0.5), 44_100, 1).unwrap();
        let mut analysis = analyze(&waveform, &cfg).unwrap();
        assert_eq!(analysis.frame_count(), 44_100 / 2048);

        let half = cfg.frame_size / 2;
        let bin_hz = 44_100.0 / cfg.frame_size as f64;
        let tone_bin = (440.0 / bin_hz).round() as usize;
        let bar = (0..cfg.num_bars)
            .find(|&i| {
                let (low, high) = bars::bin_range(i, cfg.num_bars, half);
                (low..high).contains(&tone_bin)
            })
            .expect("some bar covers the tone");

        let viewport = bars::Viewport::new(1920.0, 100_000.0);
        let mut out = Vec::new();
        for index in 0..analysis.frame_count() {
            let spectrum = analysis.source.spectrum(index).unwrap().unwrap();
            bars::compute_bars(spectrum, &cfg, viewport, &mut out);
            let peak = out[bar].height;
            assert!(peak > out[bar - 1].height + 50.0, "frame {index}");
            assert!(peak > out[bar + 1].height + 50.0, "frame {index}");
        }
    }

    #[test]
    fn lazy_and_eager_agree() {
        let waveform = Waveform::new(sine(1000.0, 8_000, 1.0, 0.8), 8_000, 1).unwrap();
        let eager_cfg = AnalysisConfig {
            frame_size: 256,
            num_bars: 16,
            ..AnalysisConfig::default()
        };
        let lazy_cfg = AnalysisConfig {
            lazy: true,
            ..eager_cfg.clone()
        };

        let mut eager = analyze(&waveform, &eager_cfg).unwrap();
        let mut lazy = analyze(&waveform, &lazy_cfg).unwrap();
        assert_eq!(eager.frame_count(), lazy.frame_count());

        for index in [0, 3, 3, 17, eager.frame_count() - 1] {
            let a = eager.source.spectrum(index).unwrap().unwrap().to_vec();
            let b = lazy.source.spectrum(index).unwrap().unwrap();
            assert_eq!(a.as_slice(), b);
        }
    }
}
