use crate::analysis::AnalysisError;

/// Interleaved signed 16-bit PCM, as handed over by the decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waveform {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl Waveform {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Result<Self, AnalysisError> {
        if sample_rate == 0 || channels == 0 {
            return Err(AnalysisError::InvalidWaveform {
                reason: format!("sample_rate={sample_rate}, channels={channels}"),
            });
        }
        if samples.len() % channels as usize != 0 {
            return Err(AnalysisError::InvalidWaveform {
                reason: format!(
                    "{} samples do not divide into {} channels",
                    samples.len(),
                    channels
                ),
            });
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_mono(&self) -> bool {
        self.channels == 1
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        let frames = self.samples.len() / self.channels as usize;
        frames as f64 / self.sample_rate as f64
    }
}

/// Collapse every group of `channels` interleaved samples into their mean.
///
/// The mean is taken in `i32` and truncated toward zero, so a stereo pair
/// `(L, R)` becomes `(L + R) / 2`. A trailing partial group is ignored.
pub fn downmix(waveform: &Waveform) -> Waveform {
    if waveform.is_mono() {
        return waveform.clone();
    }

    let channels = waveform.channels as usize;
    let mono: Vec<i16> = waveform
        .samples
        .chunks_exact(channels)
        .map(|group| {
            let sum: i32 = group.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect();

    Waveform {
        samples: mono,
        sample_rate: waveform.sample_rate,
        channels: 1,
    }
}

/// Map each sample onto `s / 32768.0`.
///
/// `i16::MIN` lands exactly on -1.0 while `i16::MAX` stops just short of 1.0.
pub fn normalize(waveform: &Waveform) -> Vec<f64> {
    waveform
        .samples
        .iter()
        .map(|&s| s as f64 / 32768.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(samples: Vec<i16>) -> Waveform {
        Waveform::new(samples, 44_100, 2).unwrap()
    }

    #[test]
    fn rejects_partial_channel_group() {
        assert!(Waveform::new(vec![1, 2, 3], 44_100, 2).is_err());
        assert!(Waveform::new(vec![1, 2], 0, 2).is_err());
        assert!(Waveform::new(vec![1, 2], 44_100, 0).is_err());
    }

    #[test]
    fn downmix_averages_pairs_toward_zero() {
        let mono = downmix(&stereo(vec![3, 4, -3, -4, 32767, 32767, -32768, -32768, 1, -2]));
        assert!(mono.is_mono());
        assert_eq!(mono.sample_rate(), 44_100);
        // 7/2 -> 3, -7/2 -> -3, -1/2 -> 0
        assert_eq!(mono.samples(), &[3, -3, 32767, -32768, 0]);
    }

    #[test]
    fn downmix_handles_extreme_pairs() {
        let pairs = [
            (i16::MAX, i16::MIN),
            (i16::MIN, i16::MIN),
            (i16::MAX, i16::MAX),
            (-1, 0),
            (1, 0),
            (-101, 50),
        ];
        for (l, r) in pairs {
            let mono = downmix(&stereo(vec![l, r]));
            let expected = ((l as i32 + r as i32) / 2) as i16;
            assert_eq!(mono.samples(), &[expected], "pair ({l}, {r})");
        }
    }

    #[test]
    fn downmix_of_silence_is_silent() {
        let mono = downmix(&stereo(vec![0; 512]));
        assert_eq!(mono.samples().len(), 256);
        assert!(mono.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn downmix_generalizes_to_more_channels() {
        let quad = Waveform::new(vec![4, 4, 4, 5, -1, -1, -1, 0], 48_000, 4).unwrap();
        assert_eq!(downmix(&quad).samples(), &[4, 0]);
    }

    #[test]
    fn downmix_keeps_mono_untouched() {
        let mono = Waveform::new(vec![1, -1, 7], 8_000, 1).unwrap();
        assert_eq!(downmix(&mono), mono);
    }

    #[test]
    fn normalize_is_asymmetric() {
        let mono = Waveform::new(vec![32767, -32768, 0, 16384], 44_100, 1).unwrap();
        let signal = normalize(&mono);
        assert!((signal[0] - 0.999_969).abs() < 1e-6);
        assert!(signal[0] < 1.0);
        assert_eq!(signal[1], -1.0);
        assert_eq!(signal[2], 0.0);
        assert_eq!(signal[3], 0.5);
    }

    #[test]
    fn duration_counts_frames_not_samples() {
        let w = stereo(vec![0; 88_200]);
        assert!((w.duration() - 1.0).abs() < 1e-12);
    }
}
