use crate::config::FeedbackThresholds;
use crate::error::ComparisonError;
use crate::types::{Feedback, PairComparison};

/// Number of segment pairs compared when the two sides isolate different counts.
///
/// Pairs are taken in isolation order; surplus segments on the longer side have
/// no partner and are reported as unmatched rather than compared.
pub fn comparable_pair_count(student_segments: usize, reference_segments: usize) -> usize {
    student_segments.min(reference_segments)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreAggregate {
    pub distance: f64,
    pub pairs: Vec<PairComparison>,
    pub skipped_pairs: Vec<usize>,
    pub unmatched_student: usize,
    pub unmatched_reference: usize,
}

/// Sums per-pair distances into one score.
///
/// `results` are in pair order. Pairs that failed with a recoverable error
/// (an empty segment) are skipped; any other error is returned unchanged. Each
/// unmatched segment adds `unmatched_penalty`. When nothing could be compared
/// the result is [`ComparisonError::NoComparableAudio`], never a zero score.
pub fn aggregate_pairs(
    results: Vec<Result<PairComparison, ComparisonError>>,
    student_segments: usize,
    reference_segments: usize,
    unmatched_penalty: f64,
) -> Result<ScoreAggregate, ComparisonError> {
    let mut pairs = Vec::with_capacity(results.len());
    let mut skipped_pairs = Vec::new();

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(pair) => pairs.push(pair),
            Err(err) if err.is_recoverable() => {
                tracing::warn!(pair = index, error = %err, "scoring: skipping segment pair");
                skipped_pairs.push(index);
            }
            Err(err) => return Err(err),
        }
    }

    if pairs.is_empty() {
        return Err(ComparisonError::NoComparableAudio {
            student_segments,
            reference_segments,
            skipped_pairs: skipped_pairs.len(),
        });
    }

    let compared = comparable_pair_count(student_segments, reference_segments);
    let unmatched_student = student_segments - compared;
    let unmatched_reference = reference_segments - compared;
    if unmatched_student + unmatched_reference > 0 {
        tracing::warn!(
            student_segments,
            reference_segments,
            unmatched_penalty,
            "scoring: segment counts differ, surplus segments are not compared"
        );
    }

    let pair_total: f64 = pairs.iter().map(PairComparison::distance).sum();
    let penalty = (unmatched_student + unmatched_reference) as f64 * unmatched_penalty;

    Ok(ScoreAggregate {
        distance: pair_total + penalty,
        pairs,
        skipped_pairs,
        unmatched_student,
        unmatched_reference,
    })
}

/// `score < excellent` is excellent, `score < good` is good, anything else needs
/// improvement. Each lower bound belongs to the worse bucket.
pub fn classify(score: f64, thresholds: &FeedbackThresholds) -> Feedback {
    if score < thresholds.excellent {
        Feedback::Excellent
    } else if score < thresholds.good {
        Feedback::Good
    } else {
        Feedback::NeedsImprovement
    }
}
