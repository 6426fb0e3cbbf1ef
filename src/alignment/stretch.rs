use std::f32::consts::PI;

use rustfft::num_complex::Complex;

use crate::error::ComparisonError;
use crate::features::stft::Stft;

/// Stretches the shorter of two sample buffers to the longer one's length.
///
/// Only the shorter buffer is processed, by a factor of `longer / shorter`; the
/// longer one is returned untouched. Equal lengths return both unchanged. Empty
/// input is rejected since there is nothing to stretch.
pub fn normalize_lengths(
    student: &[f32],
    reference: &[f32],
    max_window: usize,
) -> Result<(Vec<f32>, Vec<f32>), ComparisonError> {
    if student.is_empty() {
        return Err(ComparisonError::empty_segment(
            "student segment has no samples to stretch",
        ));
    }
    if reference.is_empty() {
        return Err(ComparisonError::empty_segment(
            "reference segment has no samples to stretch",
        ));
    }

    match student.len().cmp(&reference.len()) {
        std::cmp::Ordering::Less => Ok((
            time_stretch_to(student, reference.len(), max_window),
            reference.to_vec(),
        )),
        std::cmp::Ordering::Greater => Ok((
            student.to_vec(),
            time_stretch_to(reference, student.len(), max_window),
        )),
        std::cmp::Ordering::Equal => Ok((student.to_vec(), reference.to_vec())),
    }
}

/// Phase-vocoder time stretch to exactly `target_len` samples.
///
/// The FFT size is `min(max_window, samples.len())` with a quarter-window hop, so
/// short segments are never analysed with a window longer than themselves.
pub fn time_stretch_to(samples: &[f32], target_len: usize, max_window: usize) -> Vec<f32> {
    if samples.is_empty() || target_len == 0 {
        return vec![0.0; target_len];
    }
    if samples.len() == target_len {
        return samples.to_vec();
    }

    let n_fft = max_window.min(samples.len()).max(1);
    let hop = (n_fft / 4).max(1);
    // rate < 1 slows down (lengthens), rate > 1 speeds up.
    let rate = samples.len() as f64 / target_len as f64;

    let stft = Stft::new(n_fft, hop);
    let spectrum = stft.forward(samples);
    let stretched = phase_vocoder(&spectrum, rate, hop, n_fft);

    tracing::debug!(
        input_samples = samples.len(),
        target_samples = target_len,
        rate,
        n_fft,
        "stretch: phase vocoder"
    );

    stft.inverse(&stretched, target_len)
}

fn phase_vocoder(
    frames: &[Vec<Complex<f32>>],
    rate: f64,
    hop: usize,
    n_fft: usize,
) -> Vec<Vec<Complex<f32>>> {
    let n_frames = frames.len();
    let bins = frames.first().map_or(0, Vec::len);
    if n_frames == 0 || bins == 0 {
        return Vec::new();
    }

    let expected_advance: Vec<f32> = (0..bins)
        .map(|k| 2.0 * PI * hop as f32 * k as f32 / n_fft as f32)
        .collect();
    let zero_frame = vec![Complex::new(0.0f32, 0.0); bins];
    let column = |t: usize| frames.get(t).unwrap_or(&zero_frame);

    let mut phase_acc: Vec<f32> = frames[0].iter().map(|c| c.arg()).collect();
    let out_frames = (n_frames as f64 / rate).ceil() as usize;
    let mut out = Vec::with_capacity(out_frames);

    for t in 0..out_frames {
        let step = t as f64 * rate;
        let base = step.floor() as usize;
        if base >= n_frames {
            break;
        }
        let alpha = (step - base as f64) as f32;
        let (left, right) = (column(base), column(base + 1));

        let frame = (0..bins)
            .map(|k| {
                let mag = (1.0 - alpha) * left[k].norm() + alpha * right[k].norm();
                Complex::from_polar(mag, phase_acc[k])
            })
            .collect();
        out.push(frame);

        for k in 0..bins {
            let dphase = right[k].arg() - left[k].arg() - expected_advance[k];
            let wrapped = dphase - 2.0 * PI * (dphase / (2.0 * PI)).round();
            phase_acc[k] += expected_advance[k] + wrapped;
        }
    }
    out
}
