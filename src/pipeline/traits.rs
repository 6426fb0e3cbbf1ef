use std::path::Path;

use crate::alignment::segmentation::SplitParams;
use crate::error::ComparisonError;
use crate::features::MfccParams;
use crate::types::{AudioSignal, DtwAlignment, FeatureMatrix, Segment};

pub trait AudioLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<AudioSignal, ComparisonError>;
}

pub trait SegmentIsolator: Send + Sync {
    fn isolate(&self, signal: &AudioSignal, params: &SplitParams) -> Vec<Segment>;
}

pub trait FeatureExtractor: Send + Sync {
    fn extract(
        &self,
        samples: &[f32],
        sample_rate_hz: u32,
        params: &MfccParams,
    ) -> Result<FeatureMatrix, ComparisonError>;
}

pub trait LengthNormalizer: Send + Sync {
    /// Returns `(student, reference)` with equal sample counts.
    fn normalize(
        &self,
        student: &[f32],
        reference: &[f32],
    ) -> Result<(Vec<f32>, Vec<f32>), ComparisonError>;
}

pub trait SequenceAligner: Send + Sync {
    fn align(
        &self,
        student: &FeatureMatrix,
        reference: &FeatureMatrix,
    ) -> Result<DtwAlignment, ComparisonError>;
}
