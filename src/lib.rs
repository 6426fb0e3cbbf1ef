//! Scores a student's recording against a reference recording.
//!
//! Both recordings are split into voiced segments, each segment pair is turned
//! into MFCC sequences and aligned with dynamic time warping, and the summed
//! alignment distance is bucketed into a [`Feedback`] label.

use std::path::Path;

pub mod alignment;
pub mod audio;
pub mod config;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod types;

pub use alignment::report::ComparisonReport;
pub use config::{ComparisonConfig, FeedbackThresholds};
pub use error::ComparisonError;
pub use pipeline::builder::PronunciationComparatorBuilder;
pub use pipeline::runtime::PronunciationComparator;
pub use pipeline::traits::{
    AudioLoader, FeatureExtractor, LengthNormalizer, SegmentIsolator, SequenceAligner,
};
pub use types::{
    AudioSignal, ComparisonOutcome, DtwAlignment, Feedback, FeatureMatrix, PairComparison, Segment,
};

/// Compares two audio files with the default pipeline components.
pub fn compare(
    student_path: &Path,
    reference_path: &Path,
    config: &ComparisonConfig,
) -> Result<ComparisonOutcome, ComparisonError> {
    PronunciationComparatorBuilder::new(config.clone())
        .build()?
        .compare(student_path, reference_path)
}
