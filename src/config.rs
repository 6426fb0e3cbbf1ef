use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ComparisonError;
use crate::features::MIN_WINDOW_LENGTH;

/// Score cut points for [`crate::types::Feedback`]. Scores below `excellent` are
/// excellent, scores below `good` are good, everything else needs improvement.
///
/// Serialized as `excellent_threshold` / `good_threshold`, flattened into
/// [`ComparisonConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackThresholds {
    #[serde(rename = "excellent_threshold")]
    pub excellent: f64,
    #[serde(rename = "good_threshold")]
    pub good: f64,
}

impl FeedbackThresholds {
    pub const DEFAULT_EXCELLENT: f64 = 10.0;
    pub const DEFAULT_GOOD: f64 = 20.0;

    pub fn new(excellent: f64, good: f64) -> Result<Self, ComparisonError> {
        let thresholds = Self { excellent, good };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ComparisonError> {
        if !self.excellent.is_finite() || !self.good.is_finite() {
            return Err(ComparisonError::invalid_config(
                "feedback thresholds must be finite",
            ));
        }
        if self.excellent >= self.good {
            return Err(ComparisonError::invalid_config(format!(
                "excellent threshold ({}) must be below good threshold ({})",
                self.excellent, self.good
            )));
        }
        Ok(())
    }
}

impl Default for FeedbackThresholds {
    fn default() -> Self {
        Self {
            excellent: Self::DEFAULT_EXCELLENT,
            good: Self::DEFAULT_GOOD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Silence threshold in dB below the loudest frame.
    pub top_db: f32,
    pub n_coefficients: usize,
    /// MFCC analysis window (FFT size) in samples; capped per segment.
    pub window_length: usize,
    /// MFCC hop is `window_length / hop_divisor`.
    pub hop_divisor: usize,
    pub n_mels: usize,
    pub normalize_lengths: bool,
    /// Upper bound of the phase-vocoder FFT used when stretching segments.
    pub stretch_window: usize,
    pub split_frame_length: usize,
    pub split_hop_length: usize,
    pub min_active_frames: usize,
    /// When false each whole signal is compared as a single segment.
    pub isolate_segments: bool,
    /// Resample loaded audio to this rate; `None` keeps the file's rate.
    pub target_sample_rate_hz: Option<u32>,
    /// Added to the score once per segment left without a partner.
    pub unmatched_segment_penalty: f64,
    /// Segments shorter than this many samples are skipped rather than compared.
    pub min_segment_samples: usize,
    #[serde(flatten)]
    pub thresholds: FeedbackThresholds,
}

impl ComparisonConfig {
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 22_050;
    pub const DEFAULT_TOP_DB: f32 = 20.0;
    pub const DEFAULT_N_COEFFICIENTS: usize = 13;
    pub const DEFAULT_WINDOW_LENGTH: usize = 2048;
    pub const DEFAULT_MIN_SEGMENT_SAMPLES: usize = 64;

    pub fn load(path: &Path) -> Result<Self, ComparisonError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| ComparisonError::io("read comparison config", e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| ComparisonError::json("parse comparison config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ComparisonError> {
        if !self.top_db.is_finite() || self.top_db <= 0.0 {
            return Err(ComparisonError::invalid_config(format!(
                "top_db must be a positive number of decibels, got {}",
                self.top_db
            )));
        }
        for (name, value) in [
            ("n_coefficients", self.n_coefficients),
            ("window_length", self.window_length),
            ("hop_divisor", self.hop_divisor),
            ("n_mels", self.n_mels),
            ("stretch_window", self.stretch_window),
            ("split_frame_length", self.split_frame_length),
            ("split_hop_length", self.split_hop_length),
            ("min_active_frames", self.min_active_frames),
        ] {
            if value == 0 {
                return Err(ComparisonError::invalid_config(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        if self.n_coefficients > self.n_mels {
            return Err(ComparisonError::invalid_config(format!(
                "n_coefficients ({}) cannot exceed n_mels ({})",
                self.n_coefficients, self.n_mels
            )));
        }
        if self.min_segment_samples < MIN_WINDOW_LENGTH {
            return Err(ComparisonError::invalid_config(format!(
                "min_segment_samples must be at least {MIN_WINDOW_LENGTH}, got {}",
                self.min_segment_samples
            )));
        }
        if self.target_sample_rate_hz == Some(0) {
            return Err(ComparisonError::invalid_config(
                "target_sample_rate_hz must be greater than zero",
            ));
        }
        if !self.unmatched_segment_penalty.is_finite() || self.unmatched_segment_penalty < 0.0 {
            return Err(ComparisonError::invalid_config(
                "unmatched_segment_penalty must be a non-negative number",
            ));
        }
        self.thresholds.validate()
    }

    /// MFCC hop for a given (already capped) window.
    pub fn hop_for_window(&self, window_length: usize) -> usize {
        (window_length / self.hop_divisor.max(1)).max(1)
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            top_db: Self::DEFAULT_TOP_DB,
            n_coefficients: Self::DEFAULT_N_COEFFICIENTS,
            window_length: Self::DEFAULT_WINDOW_LENGTH,
            hop_divisor: 4,
            n_mels: 128,
            normalize_lengths: false,
            stretch_window: 2048,
            split_frame_length: 2048,
            split_hop_length: 512,
            min_active_frames: 1,
            isolate_segments: true,
            target_sample_rate_hz: Some(Self::DEFAULT_SAMPLE_RATE_HZ),
            unmatched_segment_penalty: 0.0,
            min_segment_samples: Self::DEFAULT_MIN_SEGMENT_SAMPLES,
            thresholds: FeedbackThresholds::default(),
        }
    }
}
