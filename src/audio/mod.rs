//! Decoding of WAV and FLAC files into mono `f32` signals.

mod resample;

use std::path::Path;

use claxon::FlacReader;
use hound::{SampleFormat, WavReader};

use crate::error::ComparisonError;
use crate::types::AudioSignal;

pub use resample::resample_mono;

/// Decodes `path` by extension (`wav` or `flac`), averaging channels to mono.
pub fn decode_file(path: &Path) -> Result<AudioSignal, ComparisonError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("wav") | Some("wave") => read_wav_mono(path),
        Some("flac") => read_flac_mono(path),
        _ => Err(ComparisonError::decode(
            path,
            "unsupported audio format (expected .wav or .flac)",
        )),
    }
}

/// Decodes a file and resamples it to `target_sample_rate_hz` when given.
pub fn load_mono(
    path: &Path,
    target_sample_rate_hz: Option<u32>,
) -> Result<AudioSignal, ComparisonError> {
    let signal = decode_file(path)?;
    match target_sample_rate_hz {
        Some(target) if target != signal.sample_rate_hz => {
            let samples = resample_mono(&signal.samples, signal.sample_rate_hz, target)?;
            Ok(AudioSignal::new(target, samples))
        }
        _ => Ok(signal),
    }
}

fn read_wav_mono(path: &Path) -> Result<AudioSignal, ComparisonError> {
    let mut reader = WavReader::open(path).map_err(|err| ComparisonError::decode(path, err))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(ComparisonError::decode(path, "WAV has zero channels"));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|err| ComparisonError::decode(path, err))?,
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample as u32);
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|err| ComparisonError::decode(path, err))?
        }
    };

    Ok(AudioSignal::new(
        spec.sample_rate,
        downmix(&interleaved, channels),
    ))
}

fn read_flac_mono(path: &Path) -> Result<AudioSignal, ComparisonError> {
    let mut reader = FlacReader::open(path).map_err(|err| ComparisonError::decode(path, err))?;
    let streaminfo = reader.streaminfo();
    let channels = streaminfo.channels as usize;
    let scale = int_scale(streaminfo.bits_per_sample);
    let sample_rate_hz = streaminfo.sample_rate;
    if channels == 0 {
        return Err(ComparisonError::decode(path, "FLAC has zero channels"));
    }

    let mut interleaved = Vec::new();
    for sample in reader.samples() {
        let sample = sample.map_err(|err| ComparisonError::decode(path, err))?;
        interleaved.push(sample as f32 / scale);
    }

    Ok(AudioSignal::new(
        sample_rate_hz,
        downmix(&interleaved, channels),
    ))
}

fn int_scale(bits_per_sample: u32) -> f32 {
    if bits_per_sample > 1 {
        ((1_i64 << (bits_per_sample - 1)) - 1) as f32
    } else {
        1.0
    }
}

/// Averages interleaved frames; a trailing partial frame is dropped.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use hound::{WavSpec, WavWriter};

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pronunciation_dtw_audio_{name}"))
    }

    fn write_wav(path: &Path, spec: WavSpec, samples: &[i16]) {
        let mut writer = WavWriter::create(path, spec).expect("create wav");
        for &s in samples {
            writer.write_sample(s).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }

    #[test]
    fn downmix_averages_channels() {
        assert_eq!(downmix(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(downmix(&[0.25, 0.75], 1), vec![0.25, 0.75]);
        assert_eq!(downmix(&[1.0, 1.0, 1.0], 2), vec![1.0]);
    }

    #[test]
    fn reads_int_wav_as_scaled_mono() {
        let path = temp_path("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, &[32_767, 32_767, 0, -32_767]);
        let signal = decode_file(&path).expect("decode wav");
        assert_eq!(signal.sample_rate_hz, 16_000);
        assert_eq!(signal.samples.len(), 2);
        assert!((signal.samples[0] - 1.0).abs() < 1e-6);
        assert!((signal.samples[1] + 0.5).abs() < 1e-6);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn reads_stereo_flac_fixture_as_mono() {
        // 1600 frames at 16 kHz, 16-bit: left is a 440 Hz tone at amplitude
        // 16000, right the same tone at 8000.
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data/stereo_tone_16k.flac");
        let signal = decode_file(&path).expect("decode flac");
        assert_eq!(signal.sample_rate_hz, 16_000);
        assert_eq!(signal.samples.len(), 1600);
        for (i, &sample) in signal.samples.iter().enumerate() {
            let phase = (2.0 * std::f64::consts::PI * 440.0 * i as f64 / 16_000.0).sin();
            let left = (16_000.0 * phase).round() / 32_767.0;
            let right = (8_000.0 * phase).round() / 32_767.0;
            let expected = ((left + right) / 2.0) as f32;
            assert!(
                (sample - expected).abs() < 1e-5,
                "sample {i}: {sample} vs {expected}"
            );
        }

        let resampled = load_mono(&path, Some(22_050)).expect("load flac");
        assert_eq!(resampled.sample_rate_hz, 22_050);
        assert_eq!(resampled.samples.len(), 2205);
    }

    #[test]
    fn load_mono_resamples_to_target() {
        let path = temp_path("resample.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let samples: Vec<i16> = (0..16_000)
            .map(|i| ((i as f32 * 0.05).sin() * 10_000.0) as i16)
            .collect();
        write_wav(&path, spec, &samples);
        let signal = load_mono(&path, Some(22_050)).expect("load");
        assert_eq!(signal.sample_rate_hz, 22_050);
        assert_eq!(signal.samples.len(), 22_050);
        let native = load_mono(&path, None).expect("load native");
        assert_eq!(native.sample_rate_hz, 16_000);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unreadable_files_are_decode_errors() {
        let path = temp_path("garbage.wav");
        std::fs::write(&path, b"not a riff file").expect("write garbage");
        assert!(matches!(
            decode_file(&path),
            Err(ComparisonError::Decode { .. })
        ));
        let _ = std::fs::remove_file(&path);

        assert!(matches!(
            decode_file(Path::new("/nonexistent/student.flac")),
            Err(ComparisonError::Decode { .. })
        ));
        assert!(matches!(
            decode_file(Path::new("speech.mp3")),
            Err(ComparisonError::Decode { .. })
        ));
    }
}
