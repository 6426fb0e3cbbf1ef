use rubato::{FftFixedInOut, Resampler};

use crate::error::ComparisonError;

const CHUNK_FRAMES: usize = 1024;

/// Converts mono samples between sample rates with rubato's FFT resampler.
///
/// The output is trimmed to `ceil(len * to / from)` samples with the resampler's
/// delay removed, so timing is preserved.
pub fn resample_mono(samples: &[f32], from_hz: u32, to_hz: u32) -> Result<Vec<f32>, ComparisonError> {
    if from_hz == 0 || to_hz == 0 {
        return Err(ComparisonError::invalid_input(
            "cannot resample with a zero sample rate",
        ));
    }
    if from_hz == to_hz || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(from_hz as usize, to_hz as usize, CHUNK_FRAMES, 1)
            .map_err(|e| ComparisonError::runtime("create resampler", e))?;
    let delay = resampler.output_delay();
    let expected = (samples.len() as u64 * to_hz as u64).div_ceil(from_hz as u64) as usize;

    let mut output = Vec::with_capacity(expected + delay);
    let mut input = vec![Vec::new()];
    let mut pos = 0usize;
    while output.len() < expected + delay {
        let needed = resampler.input_frames_next();
        let chunk = &mut input[0];
        chunk.clear();
        chunk.resize(needed, 0.0);
        if pos < samples.len() {
            let end = (pos + needed).min(samples.len());
            chunk[..end - pos].copy_from_slice(&samples[pos..end]);
        }
        pos += needed;

        let processed = resampler
            .process(&input, None)
            .map_err(|e| ComparisonError::runtime("resample audio", e))?;
        output.extend_from_slice(&processed[0]);
    }

    output.drain(..delay);
    output.truncate(expected);

    tracing::debug!(
        from_hz,
        to_hz,
        input_samples = samples.len(),
        output_samples = output.len(),
        "audio: resampled"
    );
    Ok(output)
}
