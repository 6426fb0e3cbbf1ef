use std::path::Path;

use serde::Serialize;

use crate::config::ComparisonConfig;
use crate::error::ComparisonError;
use crate::types::{AlignmentPath, ComparisonOutcome, CostMatrix, Feedback, PairComparison};

const SCHEMA_VERSION: u32 = 1;

/// Serializable view of a comparison for external plotting tools.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub schema_version: u32,
    pub meta: Meta,
    pub pairs: Vec<PairReport>,
    pub aggregates: AggregateReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub top_db: f32,
    pub n_coefficients: usize,
    pub window_length: usize,
    pub normalize_lengths: bool,
    pub excellent_threshold: f64,
    pub good_threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentSpan {
    pub start: usize,
    pub end: usize,
    pub start_secs: f64,
    pub end_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    pub index: usize,
    pub student: SegmentSpan,
    pub reference: SegmentSpan,
    pub student_frames: usize,
    pub reference_frames: usize,
    pub distance: f64,
    /// Mean local cost along the path, comparable across pairs of different length.
    pub normalized_distance: f64,
    pub path: AlignmentPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostMatrix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accumulated: Option<CostMatrix>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub distance: f64,
    pub feedback: Feedback,
    pub feedback_label: &'static str,
    pub feedback_message: &'static str,
    pub compared_pairs: usize,
    pub skipped_pairs: Vec<usize>,
    pub unmatched_student: usize,
    pub unmatched_reference: usize,
}

impl ComparisonReport {
    /// Builds a report. Matrices are only embedded when `include_matrices` is set,
    /// since they grow with the product of both frame counts.
    pub fn new(
        outcome: &ComparisonOutcome,
        config: &ComparisonConfig,
        include_matrices: bool,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            meta: Meta {
                top_db: config.top_db,
                n_coefficients: config.n_coefficients,
                window_length: config.window_length,
                normalize_lengths: config.normalize_lengths,
                excellent_threshold: config.thresholds.excellent,
                good_threshold: config.thresholds.good,
            },
            pairs: outcome
                .pairs
                .iter()
                .map(|pair| pair_report(pair, include_matrices))
                .collect(),
            aggregates: AggregateReport {
                distance: outcome.distance,
                feedback: outcome.feedback,
                feedback_label: outcome.feedback.label(),
                feedback_message: outcome.feedback.message(),
                compared_pairs: outcome.pairs.len(),
                skipped_pairs: outcome.skipped_pairs.clone(),
                unmatched_student: outcome.unmatched_student,
                unmatched_reference: outcome.unmatched_reference,
            },
        }
    }

    pub fn to_json_string(&self) -> Result<String, ComparisonError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ComparisonError::json("serialize comparison report", e))
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ComparisonError> {
        let json = self.to_json_string()?;
        std::fs::write(path, json).map_err(|e| ComparisonError::io("write comparison report", e))
    }
}

fn pair_report(pair: &PairComparison, include_matrices: bool) -> PairReport {
    let alignment = &pair.alignment;
    let normalized_distance = if alignment.path.is_empty() {
        0.0
    } else {
        alignment.distance / alignment.path.len() as f64
    };
    PairReport {
        index: pair.index,
        student: SegmentSpan {
            start: pair.student.start,
            end: pair.student.end,
            start_secs: pair.student.start_secs(),
            end_secs: pair.student.end_secs(),
        },
        reference: SegmentSpan {
            start: pair.reference.start,
            end: pair.reference.end,
            start_secs: pair.reference.start_secs(),
            end_secs: pair.reference.end_secs(),
        },
        student_frames: alignment.cost.rows(),
        reference_frames: alignment.cost.cols(),
        distance: alignment.distance,
        normalized_distance,
        path: alignment.path.clone(),
        cost: include_matrices.then(|| alignment.cost.clone()),
        accumulated: include_matrices.then(|| alignment.accumulated.clone()),
    }
}
