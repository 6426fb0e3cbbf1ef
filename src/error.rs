use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error("failed to decode audio '{}': {message}", path.display())]
    Decode { path: PathBuf, message: String },
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("empty segment: {context}")]
    EmptySegment { context: &'static str },
    #[error(
        "no comparable audio: {student_segments} student / {reference_segments} reference \
         segments, {skipped_pairs} pairs skipped"
    )]
    NoComparableAudio {
        student_segments: usize,
        reference_segments: usize,
        skipped_pairs: usize,
    },
    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("{context}: {message}")]
    Runtime {
        context: &'static str,
        message: String,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
}

impl ComparisonError {
    pub(crate) fn decode(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn empty_segment(context: &'static str) -> Self {
        Self::EmptySegment { context }
    }

    pub(crate) fn runtime(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Runtime {
            context,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether the comparison loop may skip the offending pair and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptySegment { .. })
    }
}
