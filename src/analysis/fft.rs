use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use super::AnalysisError;

/// Iterative radix-2 decimation-in-time FFT for one fixed power-of-two size.
///
/// The bit-reversal permutation and the twiddle factors are computed once in
/// `new`; `transform` then works entirely inside the caller's buffer, so the
/// same engine can be reused for every frame of a track.
pub struct SpectrumEngine {
    size: usize,
    bit_reversed: Vec<usize>,
    /// `exp(-2πi·k/size)` for `k` in `0..size/2`.
    twiddles: Vec<Complex<f64>>,
}

impl SpectrumEngine {
    pub fn new(size: usize) -> Result<Self, AnalysisError> {
        if !size.is_power_of_two() {
            return Err(AnalysisError::NotPowerOfTwo { size });
        }

        let bits = size.trailing_zeros();
        let bit_reversed = (0..size)
            .map(|i| if bits == 0 { 0 } else { i.reverse_bits() >> (usize::BITS - bits) })
            .collect();

        let twiddles = (0..size / 2)
            .map(|k| Complex::from_polar(1.0, -2.0 * PI * k as f64 / size as f64))
            .collect();

        Ok(Self {
            size,
            bit_reversed,
            twiddles,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform of `buffer` in place.
    pub fn transform(&self, buffer: &mut [Complex<f64>]) -> Result<(), AnalysisError> {
        if buffer.len() != self.size {
            return Err(AnalysisError::LengthMismatch {
                expected: self.size,
                actual: buffer.len(),
            });
        }

        for (i, &j) in self.bit_reversed.iter().enumerate() {
            if i < j {
                buffer.swap(i, j);
            }
        }

        // Each pass merges pairs of length-`half` transforms into length-`len`
        // ones. The twiddle for step k of a length-`len` merge is
        // twiddles[k * size / len].
        let mut len = 2;
        while len <= self.size {
            let half = len / 2;
            let stride = self.size / len;
            for start in (0..self.size).step_by(len) {
                for k in 0..half {
                    let even = buffer[start + k];
                    let odd = self.twiddles[k * stride] * buffer[start + k + half];
                    buffer[start + k] = even + odd;
                    buffer[start + k + half] = even - odd;
                }
            }
            len <<= 1;
        }

        Ok(())
    }

    /// Transform a real-valued frame, returning all `size` complex bins.
    pub fn spectrum_of(&self, frame: &[f64]) -> Result<Vec<Complex<f64>>, AnalysisError> {
        let mut buffer: Vec<Complex<f64>> = frame.iter().map(|&s| Complex::new(s, 0.0)).collect();
        self.transform(&mut buffer)?;
        Ok(buffer)
    }
}
