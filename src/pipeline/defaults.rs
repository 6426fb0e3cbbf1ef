use std::path::Path;

use crate::alignment::dtw::dtw_align;
use crate::alignment::segmentation::{split_active_segments, SplitParams};
use crate::alignment::stretch::normalize_lengths;
use crate::audio::load_mono;
use crate::error::ComparisonError;
use crate::features::{extract_mfcc, MfccParams};
use crate::pipeline::traits::{
    AudioLoader, FeatureExtractor, LengthNormalizer, SegmentIsolator, SequenceAligner,
};
use crate::types::{AudioSignal, DtwAlignment, FeatureMatrix, Segment};

/// WAV/FLAC loader that resamples to a fixed analysis rate.
pub struct FileAudioLoader {
    pub target_sample_rate_hz: Option<u32>,
}

impl AudioLoader for FileAudioLoader {
    fn load(&self, path: &Path) -> Result<AudioSignal, ComparisonError> {
        load_mono(path, self.target_sample_rate_hz)
    }
}

pub struct EnergySegmentIsolator;

impl SegmentIsolator for EnergySegmentIsolator {
    fn isolate(&self, signal: &AudioSignal, params: &SplitParams) -> Vec<Segment> {
        split_active_segments(signal, params)
    }
}

pub struct MfccFeatureExtractor;

impl FeatureExtractor for MfccFeatureExtractor {
    fn extract(
        &self,
        samples: &[f32],
        sample_rate_hz: u32,
        params: &MfccParams,
    ) -> Result<FeatureMatrix, ComparisonError> {
        extract_mfcc(samples, sample_rate_hz, params)
    }
}

pub struct PhaseVocoderNormalizer {
    pub max_window: usize,
}

impl LengthNormalizer for PhaseVocoderNormalizer {
    fn normalize(
        &self,
        student: &[f32],
        reference: &[f32],
    ) -> Result<(Vec<f32>, Vec<f32>), ComparisonError> {
        normalize_lengths(student, reference, self.max_window)
    }
}

pub struct DtwSequenceAligner;

impl SequenceAligner for DtwSequenceAligner {
    fn align(
        &self,
        student: &FeatureMatrix,
        reference: &FeatureMatrix,
    ) -> Result<DtwAlignment, ComparisonError> {
        dtw_align(student, reference)
    }
}
