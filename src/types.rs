use serde::Serialize;

use crate::error::ComparisonError;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    pub sample_rate_hz: u32,
    /// Mono samples in [-1, 1].
    pub samples: Vec<f32>,
}

impl AudioSignal {
    pub fn new(sample_rate_hz: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate_hz,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }

    pub fn segment_samples(&self, segment: &Segment) -> &[f32] {
        &self.samples[segment.start..segment.end]
    }
}

/// Sample range `[start, end)` of an [`AudioSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub sample_rate_hz: u32,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Panics if the segment does not lie within `signal`.
    pub fn samples<'a>(&self, signal: &'a AudioSignal) -> &'a [f32] {
        signal.segment_samples(self)
    }

    pub fn start_secs(&self) -> f64 {
        self.start as f64 / self.sample_rate_hz.max(1) as f64
    }

    pub fn end_secs(&self) -> f64 {
        self.end as f64 / self.sample_rate_hz.max(1) as f64
    }
}

/// Time-major feature frames, all of the same dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    dim: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn from_frames(frames: Vec<Vec<f32>>) -> Result<Self, ComparisonError> {
        let dim = frames.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(frames.len() * dim);
        for frame in &frames {
            if frame.len() != dim {
                return Err(ComparisonError::DimensionMismatch {
                    expected: dim,
                    actual: frame.len(),
                });
            }
            data.extend_from_slice(frame);
        }
        Ok(Self { dim, data })
    }

    pub(crate) fn from_flat(dim: usize, data: Vec<f32>) -> Self {
        debug_assert!(dim == 0 || data.len() % dim == 0);
        Self { dim, data }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_frames(&self) -> usize {
        if self.dim == 0 {
            return 0;
        }
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    pub fn frame(&self, index: usize) -> &[f32] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dim.max(1))
    }
}

/// Dense row-major matrix of non-negative costs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl CostMatrix {
    pub(crate) fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline(always)]
    pub(crate) fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }
}

/// Frame correspondences `(student_frame, reference_frame)` from `(0, 0)` to the last cell.
pub type AlignmentPath = Vec<(usize, usize)>;

/// DTW output for one segment pair; retained so callers can render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DtwAlignment {
    pub distance: f64,
    pub cost: CostMatrix,
    pub accumulated: CostMatrix,
    pub path: AlignmentPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Excellent,
    Good,
    NeedsImprovement,
}

impl Feedback {
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good, needs slight improvement",
            Self::NeedsImprovement => "needs improvement",
        }
    }

    /// Sentence shown to the learner.
    pub fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent pronunciation!",
            Self::Good => "Good pronunciation, but needs slight improvement.",
            Self::NeedsImprovement => "Needs improvement. Practice more!",
        }
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairComparison {
    pub index: usize,
    pub student: Segment,
    pub reference: Segment,
    /// Sample counts fed to feature extraction (after any stretching).
    pub student_samples: usize,
    pub reference_samples: usize,
    pub alignment: DtwAlignment,
}

impl PairComparison {
    pub fn distance(&self) -> f64 {
        self.alignment.distance
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOutcome {
    pub distance: f64,
    pub feedback: Feedback,
    pub pairs: Vec<PairComparison>,
    pub skipped_pairs: Vec<usize>,
    pub unmatched_student: usize,
    pub unmatched_reference: usize,
}
