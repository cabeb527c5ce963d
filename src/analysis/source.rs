use rustfft::num_complex::Complex;

use super::fft::SpectrumEngine;
use super::AnalysisError;

/// Where the render loop gets the spectrum for a frame index.
pub enum SpectrumSource {
    /// Every frame transformed up front.
    Eager(Vec<Vec<Complex<f64>>>),
    /// Windowed frames kept around and transformed when first asked for.
    /// Only the most recent spectrum is cached since playback never rewinds.
    Lazy {
        frames: Vec<Vec<f64>>,
        engine: SpectrumEngine,
        buffer: Vec<Complex<f64>>,
        cached: Option<usize>,
    },
}

impl SpectrumSource {
    pub fn eager(frames: &[Vec<f64>], engine: &SpectrumEngine) -> Result<Self, AnalysisError> {
        let spectra = frames
            .iter()
            .map(|frame| engine.spectrum_of(frame))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Eager(spectra))
    }

    pub fn lazy(frames: Vec<Vec<f64>>, engine: SpectrumEngine) -> Self {
        let buffer = vec![Complex::new(0.0, 0.0); engine.size()];
        Self::Lazy {
            frames,
            engine,
            buffer,
            cached: None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Eager(spectra) => spectra.len(),
            Self::Lazy { frames, .. } => frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spectrum for `index`, or `None` past the last frame.
    ///
    /// A lazily held frame whose length differs from the engine size is an
    /// error rather than a partial transform.
    pub fn spectrum(&mut self, index: usize) -> Result<Option<&[Complex<f64>]>, AnalysisError> {
        match self {
            Self::Eager(spectra) => Ok(spectra.get(index).map(Vec::as_slice)),
            Self::Lazy {
                frames,
                engine,
                buffer,
                cached,
            } => {
                let Some(frame) = frames.get(index) else {
                    return Ok(None);
                };
                if *cached != Some(index) {
                    *cached = None;
                    if frame.len() != engine.size() {
                        return Err(AnalysisError::LengthMismatch {
                            expected: engine.size(),
                            actual: frame.len(),
                        });
                    }
                    for (slot, &sample) in buffer.iter_mut().zip(frame.iter()) {
                        *slot = Complex::new(sample, 0.0);
                    }
                    engine.transform(buffer)?;
                    *cached = Some(index);
                }
                Ok(Some(buffer.as_slice()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> Vec<Vec<f64>> {
        vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]]
    }

    #[test]
    fn eager_holds_one_spectrum_per_frame() {
        let engine = SpectrumEngine::new(4).unwrap();
        let mut source = SpectrumSource::eager(&frames(), &engine).unwrap();
        assert_eq!(source.len(), 2);
        // impulse at 0 -> flat spectrum of ones
        let spectrum = source.spectrum(0).unwrap().unwrap();
        assert!(spectrum.iter().all(|c| (c.re - 1.0).abs() < 1e-12 && c.im.abs() < 1e-12));
        assert!(source.spectrum(2).unwrap().is_none());
    }

    #[test]
    fn eager_rejects_misfit_frames() {
        let engine = SpectrumEngine::new(4).unwrap();
        let bad = vec![vec![0.0; 3]];
        assert!(matches!(
            SpectrumSource::eager(&bad, &engine),
            Err(AnalysisError::LengthMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn lazy_recomputes_only_on_index_change() {
        let engine = SpectrumEngine::new(4).unwrap();
        let mut source = SpectrumSource::lazy(frames(), engine);
        let first = source.spectrum(1).unwrap().unwrap().to_vec();
        // impulse at 1 -> exp(-2πik/4)
        assert!((first[1].im + 1.0).abs() < 1e-12);
        assert_eq!(source.spectrum(1).unwrap().unwrap(), first.as_slice());
        assert!(source.spectrum(5).unwrap().is_none());
        let impulse = source.spectrum(0).unwrap().unwrap();
        assert!(impulse.iter().all(|c| (c.re - 1.0).abs() < 1e-12));
    }

    #[test]
    fn lazy_rejects_misfit_frames() {
        let engine = SpectrumEngine::new(8).unwrap();
        let mut source = SpectrumSource::lazy(vec![vec![0.25; 8], vec![0.5; 5]], engine);
        assert!(source.spectrum(0).unwrap().is_some());
        assert!(matches!(
            source.spectrum(1),
            Err(AnalysisError::LengthMismatch { expected: 8, actual: 5 })
        ));
        // the failed frame is not served from the cache on a retry
        assert!(source.spectrum(1).is_err());
        assert!(source.spectrum(0).unwrap().is_some());
    }
}
