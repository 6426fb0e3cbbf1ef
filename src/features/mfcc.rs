use std::f64::consts::PI;

use crate::error::ComparisonError;
use crate::features::mel::mel_filter_bank;
use crate::features::stft::Stft;
use crate::types::FeatureMatrix;

const POWER_FLOOR: f32 = 1e-10;
const DYNAMIC_RANGE_DB: f32 = 80.0;

/// Shortest usable analysis window. A one-sample periodic Hann window is all
/// zeros, so every frame would carry no energy.
pub const MIN_WINDOW_LENGTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MfccParams {
    pub n_coefficients: usize,
    pub n_mels: usize,
    /// FFT size in samples. Must not exceed the segment length.
    pub window_length: usize,
    pub hop_length: usize,
}

/// Caps the analysis window to the segment so short segments stay analysable.
pub fn effective_window(requested: usize, segment_len: usize) -> usize {
    requested.min(segment_len)
}

/// Mel-frequency cepstral coefficients, one row per centred frame.
///
/// Pipeline: power STFT, mel filterbank, dB with an 80 dB dynamic range below the
/// matrix peak, orthonormal DCT-II. Frame count is `1 + len / hop_length`.
pub fn extract_mfcc(
    samples: &[f32],
    sample_rate_hz: u32,
    params: &MfccParams,
) -> Result<FeatureMatrix, ComparisonError> {
    if samples.is_empty() {
        return Err(ComparisonError::empty_segment(
            "cannot extract features from an empty segment",
        ));
    }
    if sample_rate_hz == 0 {
        return Err(ComparisonError::invalid_input("sample rate must be non-zero"));
    }
    if params.window_length < MIN_WINDOW_LENGTH || params.hop_length == 0 {
        return Err(ComparisonError::invalid_input(format!(
            "analysis window must be at least {MIN_WINDOW_LENGTH} samples and hop non-zero, \
             got window {} and hop {}",
            params.window_length, params.hop_length
        )));
    }
    if params.window_length > samples.len() {
        return Err(ComparisonError::invalid_input(format!(
            "analysis window of {} samples exceeds segment of {} samples",
            params.window_length,
            samples.len()
        )));
    }
    if params.n_coefficients == 0 || params.n_coefficients > params.n_mels {
        return Err(ComparisonError::invalid_config(format!(
            "n_coefficients must be in 1..={}, got {}",
            params.n_mels, params.n_coefficients
        )));
    }

    let stft = Stft::new(params.window_length, params.hop_length);
    let mel_bank = mel_filter_bank(params.n_mels, params.window_length, sample_rate_hz);

    let mut log_mel: Vec<Vec<f32>> = stft
        .forward(samples)
        .iter()
        .map(|spectrum| {
            let power: Vec<f32> = spectrum.iter().map(|c| c.norm_sqr()).collect();
            mel_bank
                .iter()
                .map(|filter| {
                    let energy: f32 = filter.iter().zip(&power).map(|(&w, &p)| w * p).sum();
                    10.0 * energy.max(POWER_FLOOR).log10()
                })
                .collect()
        })
        .collect();

    let peak_db = log_mel
        .iter()
        .flatten()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor_db = peak_db - DYNAMIC_RANGE_DB;
    for value in log_mel.iter_mut().flatten() {
        *value = value.max(floor_db);
    }

    let basis = dct_basis(params.n_coefficients, params.n_mels);
    let mut data = Vec::with_capacity(log_mel.len() * params.n_coefficients);
    for frame in &log_mel {
        for row in &basis {
            let coeff: f64 = row.iter().zip(frame).map(|(&b, &x)| b * x as f64).sum();
            data.push(coeff as f32);
        }
    }

    Ok(FeatureMatrix::from_flat(params.n_coefficients, data))
}

/// Orthonormal DCT-II basis, `n_out` rows of `n_in` weights.
fn dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f64>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}
