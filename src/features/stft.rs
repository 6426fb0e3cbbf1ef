use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Periodic Hann window of `len` samples.
pub(crate) fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|k| 0.5 - 0.5 * (2.0 * PI * k as f32 / len as f32).cos())
        .collect()
}

/// Number of centred frames for a signal of `len` samples.
pub(crate) fn centered_frame_count(len: usize, hop: usize) -> usize {
    1 + len / hop.max(1)
}

/// Centred short-time Fourier transform.
///
/// The signal is treated as zero-padded by `n_fft / 2` samples on both sides, so
/// frame `t` is centred on sample `t * hop`. Each frame holds the `n_fft / 2 + 1`
/// non-negative frequency bins.
pub(crate) struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub(crate) fn new(n_fft: usize, hop: usize) -> Self {
        debug_assert!(n_fft > 0 && hop > 0);
        let mut planner = FftPlanner::<f32>::new();
        Self {
            n_fft,
            hop,
            window: hann_window(n_fft),
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        }
    }

    pub(crate) fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    pub(crate) fn forward(&self, samples: &[f32]) -> Vec<Vec<Complex<f32>>> {
        let n_frames = centered_frame_count(samples.len(), self.hop);
        let pad = self.n_fft / 2;
        let bins = self.num_bins();
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.forward.get_inplace_scratch_len()];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];

        let mut frames = Vec::with_capacity(n_frames);
        for t in 0..n_frames {
            let origin = t * self.hop;
            for (k, slot) in buffer.iter_mut().enumerate() {
                let sample = (origin + k)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[k], 0.0);
            }
            self.forward.process_with_scratch(&mut buffer, &mut scratch);
            frames.push(buffer[..bins].to_vec());
        }
        frames
    }

    /// Overlap-add inverse of [`Stft::forward`], trimmed or zero-filled to `length`.
    pub(crate) fn inverse(&self, frames: &[Vec<Complex<f32>>], length: usize) -> Vec<f32> {
        let pad = self.n_fft / 2;
        let bins = self.num_bins();
        let total = frames.len().saturating_sub(1) * self.hop + self.n_fft;
        let mut signal = vec![0.0f32; total];
        let mut window_sum = vec![0.0f32; total];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.inverse.get_inplace_scratch_len()];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let scale = 1.0 / self.n_fft as f32;

        for (t, frame) in frames.iter().enumerate() {
            for k in 0..self.n_fft {
                buffer[k] = if k < bins {
                    frame[k]
                } else {
                    frame[self.n_fft - k].conj()
                };
            }
            self.inverse.process_with_scratch(&mut buffer, &mut scratch);

            let origin = t * self.hop;
            for k in 0..self.n_fft {
                let w = self.window[k];
                signal[origin + k] += buffer[k].re * scale * w;
                window_sum[origin + k] += w * w;
            }
        }

        for (s, &w) in signal.iter_mut().zip(&window_sum) {
            if w > f32::EPSILON {
                *s /= w;
            }
        }

        (0..length)
            .map(|i| signal.get(i + pad).copied().unwrap_or(0.0))
            .collect()
    }
}
