use std::borrow::Cow;
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::alignment::scoring::{aggregate_pairs, classify, comparable_pair_count};
use crate::alignment::segmentation::{whole_signal_segment, SplitParams};
use crate::config::ComparisonConfig;
use crate::error::ComparisonError;
use crate::features::{effective_window, MfccParams};
use crate::pipeline::traits::{
    AudioLoader, FeatureExtractor, LengthNormalizer, SegmentIsolator, SequenceAligner,
};
use crate::types::{AudioSignal, ComparisonOutcome, PairComparison, Segment};

pub struct PronunciationComparator {
    config: ComparisonConfig,
    audio_loader: Box<dyn AudioLoader>,
    segment_isolator: Box<dyn SegmentIsolator>,
    feature_extractor: Box<dyn FeatureExtractor>,
    length_normalizer: Box<dyn LengthNormalizer>,
    sequence_aligner: Box<dyn SequenceAligner>,
}

pub(crate) struct PronunciationComparatorParts {
    pub config: ComparisonConfig,
    pub audio_loader: Box<dyn AudioLoader>,
    pub segment_isolator: Box<dyn SegmentIsolator>,
    pub feature_extractor: Box<dyn FeatureExtractor>,
    pub length_normalizer: Box<dyn LengthNormalizer>,
    pub sequence_aligner: Box<dyn SequenceAligner>,
}

impl PronunciationComparator {
    pub(crate) fn from_parts(parts: PronunciationComparatorParts) -> Self {
        Self {
            config: parts.config,
            audio_loader: parts.audio_loader,
            segment_isolator: parts.segment_isolator,
            feature_extractor: parts.feature_extractor,
            length_normalizer: parts.length_normalizer,
            sequence_aligner: parts.sequence_aligner,
        }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Loads both recordings and compares them. Decode failures are fatal.
    pub fn compare(
        &self,
        student_path: &Path,
        reference_path: &Path,
    ) -> Result<ComparisonOutcome, ComparisonError> {
        let student = self.audio_loader.load(student_path)?;
        let reference = self.audio_loader.load(reference_path)?;
        tracing::debug!(
            student = %student_path.display(),
            reference = %reference_path.display(),
            student_secs = student.duration_secs(),
            reference_secs = reference.duration_secs(),
            "comparator: loaded recordings"
        );
        self.compare_signals(&student, &reference)
    }

    pub fn compare_signals(
        &self,
        student: &AudioSignal,
        reference: &AudioSignal,
    ) -> Result<ComparisonOutcome, ComparisonError> {
        if student.sample_rate_hz == 0 || reference.sample_rate_hz == 0 {
            return Err(ComparisonError::invalid_input("sample rate must be non-zero"));
        }
        if student.sample_rate_hz != reference.sample_rate_hz {
            tracing::warn!(
                student_rate_hz = student.sample_rate_hz,
                reference_rate_hz = reference.sample_rate_hz,
                "comparator: sample rates differ; features may not be comparable"
            );
        }

        let student_segments = self.segments(student);
        let reference_segments = self.segments(reference);
        let pair_count = comparable_pair_count(student_segments.len(), reference_segments.len());
        tracing::debug!(
            student_segments = student_segments.len(),
            reference_segments = reference_segments.len(),
            pair_count,
            "comparator: isolated segments"
        );

        let compare = |index: usize| {
            self.compare_pair(
                index,
                student,
                &student_segments[index],
                reference,
                &reference_segments[index],
            )
        };

        #[cfg(feature = "parallel")]
        let results: Vec<_> = (0..pair_count).into_par_iter().map(compare).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = (0..pair_count).map(compare).collect();

        let aggregate = aggregate_pairs(
            results,
            student_segments.len(),
            reference_segments.len(),
            self.config.unmatched_segment_penalty,
        )?;
        let feedback = classify(aggregate.distance, &self.config.thresholds);

        tracing::debug!(
            distance = aggregate.distance,
            feedback = feedback.label(),
            compared_pairs = aggregate.pairs.len(),
            skipped_pairs = aggregate.skipped_pairs.len(),
            "comparator: scored recording"
        );

        Ok(ComparisonOutcome {
            distance: aggregate.distance,
            feedback,
            pairs: aggregate.pairs,
            skipped_pairs: aggregate.skipped_pairs,
            unmatched_student: aggregate.unmatched_student,
            unmatched_reference: aggregate.unmatched_reference,
        })
    }

    fn segments(&self, signal: &AudioSignal) -> Vec<Segment> {
        if !self.config.isolate_segments {
            return whole_signal_segment(signal);
        }
        let params = SplitParams {
            top_db: self.config.top_db,
            frame_length: self.config.split_frame_length,
            hop_length: self.config.split_hop_length,
            min_active_frames: self.config.min_active_frames,
        };
        self.segment_isolator.isolate(signal, &params)
    }

    fn compare_pair(
        &self,
        index: usize,
        student: &AudioSignal,
        student_segment: &Segment,
        reference: &AudioSignal,
        reference_segment: &Segment,
    ) -> Result<PairComparison, ComparisonError> {
        if student_segment.end > student.len() || reference_segment.end > reference.len() {
            return Err(ComparisonError::invalid_input(format!(
                "segment pair {index} extends past the end of its recording"
            )));
        }
        if student_segment.is_empty() {
            return Err(ComparisonError::empty_segment("student segment has no samples"));
        }
        if reference_segment.is_empty() {
            return Err(ComparisonError::empty_segment(
                "reference segment has no samples",
            ));
        }
        let min_len = self.config.min_segment_samples;
        if student_segment.len() < min_len || reference_segment.len() < min_len {
            tracing::debug!(
                pair = index,
                student_samples = student_segment.len(),
                reference_samples = reference_segment.len(),
                min_segment_samples = min_len,
                "comparator: segment too short to analyse"
            );
            return Err(ComparisonError::empty_segment(
                "segment is shorter than the minimum analysis length",
            ));
        }
        let student_raw = student.segment_samples(student_segment);
        let reference_raw = reference.segment_samples(reference_segment);

        let (student_samples, reference_samples): (Cow<[f32]>, Cow<[f32]>) =
            if self.config.normalize_lengths {
                let (s, r) = self.length_normalizer.normalize(student_raw, reference_raw)?;
                (Cow::Owned(s), Cow::Owned(r))
            } else {
                (Cow::Borrowed(student_raw), Cow::Borrowed(reference_raw))
            };

        let student_features = self.feature_extractor.extract(
            &student_samples,
            student.sample_rate_hz,
            &self.mfcc_params(student_samples.len()),
        )?;
        let reference_features = self.feature_extractor.extract(
            &reference_samples,
            reference.sample_rate_hz,
            &self.mfcc_params(reference_samples.len()),
        )?;

        let alignment = self
            .sequence_aligner
            .align(&student_features, &reference_features)?;

        tracing::debug!(
            pair = index,
            student_samples = student_samples.len(),
            reference_samples = reference_samples.len(),
            distance = alignment.distance,
            "comparator: compared segment pair"
        );

        Ok(PairComparison {
            index,
            student: *student_segment,
            reference: *reference_segment,
            student_samples: student_samples.len(),
            reference_samples: reference_samples.len(),
            alignment,
        })
    }

    fn mfcc_params(&self, segment_len: usize) -> MfccParams {
        let window_length = effective_window(self.config.window_length, segment_len);
        MfccParams {
            n_coefficients: self.config.n_coefficients,
            n_mels: self.config.n_mels,
            window_length,
            hop_length: self.config.hop_for_window(window_length),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::builder::PronunciationComparatorBuilder;
    use crate::types::FeatureMatrix;

    const SR: u32 = 22_050;

    fn tone(len: usize, freq: f32) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    /// Fixed segments regardless of the signal.
    struct FixedIsolator(Vec<(usize, usize)>);

    impl SegmentIsolator for FixedIsolator {
        fn isolate(&self, signal: &AudioSignal, _params: &SplitParams) -> Vec<Segment> {
            self.0
                .iter()
                .map(|&(start, end)| Segment {
                    start,
                    end,
                    sample_rate_hz: signal.sample_rate_hz,
                })
                .collect()
        }
    }

    /// One frame per segment holding its length, so distances are easy to predict.
    struct LengthFeatures {
        calls: Arc<AtomicUsize>,
        dim: usize,
    }

    impl FeatureExtractor for LengthFeatures {
        fn extract(
            &self,
            samples: &[f32],
            _sample_rate_hz: u32,
            _params: &MfccParams,
        ) -> Result<FeatureMatrix, ComparisonError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            FeatureMatrix::from_frames(vec![vec![samples.len() as f32; self.dim]])
        }
    }

    #[test]
    fn identical_signals_score_zero_and_excellent() {
        let mut samples = vec![0.0; 4000];
        samples.extend(tone(12_000, 220.0));
        samples.extend(vec![0.0; 6000]);
        samples.extend(tone(9_000, 330.0));
        samples.extend(vec![0.0; 4000]);
        let signal = AudioSignal::new(SR, samples);

        let comparator = PronunciationComparatorBuilder::new(ComparisonConfig::default())
            .build()
            .unwrap();
        let outcome = comparator.compare_signals(&signal, &signal).unwrap();
        assert_eq!(outcome.pairs.len(), 2);
        assert!(outcome.distance.abs() < 1e-6);
        assert_eq!(outcome.feedback.label(), "excellent");
        for pair in &outcome.pairs {
            let n = pair.alignment.cost.rows();
            let diagonal: Vec<_> = (0..n).map(|i| (i, i)).collect();
            assert_eq!(pair.alignment.path, diagonal);
        }
    }

    #[test]
    fn three_student_segments_against_two_reference_segments() {
        struct SplitBySide;
        impl SegmentIsolator for SplitBySide {
            fn isolate(&self, signal: &AudioSignal, _params: &SplitParams) -> Vec<Segment> {
                // Student recordings are 3000 samples long, references 2000.
                (0..signal.len() / 1000)
                    .map(|k| Segment {
                        start: k * 1000,
                        end: k * 1000 + 500 + 100 * k,
                        sample_rate_hz: signal.sample_rate_hz,
                    })
                    .collect()
            }
        }
        let calls = Arc::new(AtomicUsize::new(0));
        let comparator = PronunciationComparatorBuilder::new(ComparisonConfig::default())
            .with_segment_isolator(Box::new(SplitBySide))
            .with_feature_extractor(Box::new(LengthFeatures {
                calls: calls.clone(),
                dim: 1,
            }))
            .build()
            .unwrap();

        let student = AudioSignal::new(SR, vec![0.1; 3000]);
        let reference = AudioSignal::new(SR, vec![0.1; 2000]);
        let outcome = comparator.compare_signals(&student, &reference).unwrap();

        assert_eq!(outcome.pairs.len(), 2);
        assert_eq!(outcome.pairs[0].student.start, 0);
        assert_eq!(outcome.pairs[1].student.start, 1000);
        assert_eq!(outcome.unmatched_student, 1);
        assert_eq!(outcome.unmatched_reference, 0);
        // Only the two compared pairs were featurised.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Same lengths on both sides of each pair, so the distance is zero.
        assert_eq!(outcome.distance, 0.0);
    }

    #[test]
    fn length_normalization_equalises_sample_counts() {
        let config = ComparisonConfig {
            normalize_lengths: true,
            isolate_segments: false,
            ..ComparisonConfig::default()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let comparator = PronunciationComparatorBuilder::new(config)
            .with_feature_extractor(Box::new(LengthFeatures {
                calls: calls.clone(),
                dim: 1,
            }))
            .build()
            .unwrap();
        let student = AudioSignal::new(SR, tone(8000, 220.0));
        let reference = AudioSignal::new(SR, tone(10_000, 220.0));

        let outcome = comparator.compare_signals(&student, &reference).unwrap();
        let pair = &outcome.pairs[0];
        assert_eq!(pair.student.len(), 8000);
        assert_eq!(pair.reference.len(), 10_000);
        assert_eq!(pair.student_samples, 10_000);
        assert_eq!(pair.reference_samples, 10_000);
        assert_eq!(outcome.distance, 0.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unequal_lengths_are_compared_as_is_by_default() {
        let calls = Arc::new(AtomicUsize::new(0));
        let comparator = PronunciationComparatorBuilder::new(ComparisonConfig {
            isolate_segments: false,
            ..ComparisonConfig::default()
        })
        .with_feature_extractor(Box::new(LengthFeatures { calls, dim: 1 }))
        .build()
        .unwrap();
        let student = AudioSignal::new(SR, tone(8000, 220.0));
        let reference = AudioSignal::new(SR, tone(10_000, 220.0));
        let outcome = comparator.compare_signals(&student, &reference).unwrap();
        assert_eq!(outcome.pairs[0].student_samples, 8000);
        assert_eq!(outcome.distance, 2000.0);
        assert_eq!(outcome.feedback.label(), "needs improvement");
    }

    #[test]
    fn whole_signal_mode_compares_one_pair() {
        let config = ComparisonConfig {
            isolate_segments: false,
            ..ComparisonConfig::default()
        };
        let comparator = PronunciationComparatorBuilder::new(config).build().unwrap();
        let mut samples = tone(5000, 220.0);
        samples.extend(vec![0.0; 5000]);
        samples.extend(tone(5000, 440.0));
        let signal = AudioSignal::new(SR, samples);
        let outcome = comparator.compare_signals(&signal, &signal).unwrap();
        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.pairs[0].student.len(), 15_000);
    }

    #[test]
    fn silent_recording_is_not_comparable() {
        let comparator = PronunciationComparatorBuilder::new(ComparisonConfig::default())
            .build()
            .unwrap();
        let silent = AudioSignal::new(SR, vec![0.0; 22_050]);
        let speech = AudioSignal::new(SR, tone(22_050, 220.0));
        let err = comparator.compare_signals(&silent, &speech).unwrap_err();
        assert!(matches!(
            err,
            ComparisonError::NoComparableAudio {
                student_segments: 0,
                reference_segments: 1,
                ..
            }
        ));
    }

    #[test]
    fn empty_pairs_are_skipped_but_others_scored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let comparator = PronunciationComparatorBuilder::new(ComparisonConfig::default())
            .with_segment_isolator(Box::new(FixedIsolator(vec![(0, 100), (300, 300), (500, 700)])))
            .with_feature_extractor(Box::new(LengthFeatures { calls, dim: 1 }))
            .build()
            .unwrap();
        let signal = AudioSignal::new(SR, vec![0.1; 1000]);
        let outcome = comparator.compare_signals(&signal, &signal).unwrap();
        assert_eq!(outcome.skipped_pairs, vec![1]);
        assert_eq!(outcome.pairs.len(), 2);
    }

    #[test]
    fn mismatched_feature_dimensions_are_fatal() {
        struct AlternatingDims(AtomicUsize);
        impl FeatureExtractor for AlternatingDims {
            fn extract(
                &self,
                _samples: &[f32],
                _sample_rate_hz: u32,
                _params: &MfccParams,
            ) -> Result<FeatureMatrix, ComparisonError> {
                let call = self.0.fetch_add(1, Ordering::SeqCst);
                FeatureMatrix::from_frames(vec![vec![0.0; 13 + call % 2]])
            }
        }
        let comparator = PronunciationComparatorBuilder::new(ComparisonConfig {
            isolate_segments: false,
            ..ComparisonConfig::default()
        })
        .with_feature_extractor(Box::new(AlternatingDims(AtomicUsize::new(0))))
        .build()
        .unwrap();
        let signal = AudioSignal::new(SR, vec![0.1; 1000]);
        assert!(matches!(
            comparator.compare_signals(&signal, &signal),
            Err(ComparisonError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn single_sample_segments_are_not_scored() {
        let comparator = PronunciationComparatorBuilder::new(ComparisonConfig {
            isolate_segments: false,
            ..ComparisonConfig::default()
        })
        .build()
        .unwrap();
        let student = AudioSignal::new(SR, vec![0.9]);
        let reference = AudioSignal::new(SR, vec![-0.01]);
        assert!(matches!(
            comparator.compare_signals(&student, &reference),
            Err(ComparisonError::NoComparableAudio {
                skipped_pairs: 1,
                ..
            })
        ));
    }

    #[test]
    fn short_segment_is_skipped_while_others_are_scored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let comparator = PronunciationComparatorBuilder::new(ComparisonConfig::default())
            .with_segment_isolator(Box::new(FixedIsolator(vec![(0, 500), (600, 601)])))
            .with_feature_extractor(Box::new(LengthFeatures {
                calls: calls.clone(),
                dim: 1,
            }))
            .build()
            .unwrap();
        let signal = AudioSignal::new(SR, vec![0.1; 1000]);
        let outcome = comparator.compare_signals(&signal, &signal).unwrap();
        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.skipped_pairs, vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn segment_shorter_than_window_uses_capped_mfcc_window() {
        let comparator = PronunciationComparatorBuilder::new(ComparisonConfig {
            isolate_segments: false,
            ..ComparisonConfig::default()
        })
        .build()
        .unwrap();
        let signal = AudioSignal::new(SR, tone(700, 220.0));
        let outcome = comparator.compare_signals(&signal, &signal).unwrap();
        let alignment = &outcome.pairs[0].alignment;
        // Window capped to 700 samples, hop 175: 1 + 700 / 175 frames.
        assert_eq!(alignment.cost.rows(), 5);
        assert_eq!(alignment.cost.cols(), 5);
        assert_eq!(outcome.distance, 0.0);

        let other = AudioSignal::new(SR, tone(700, 660.0));
        let differs = comparator.compare_signals(&signal, &other).unwrap();
        assert!(differs.distance > 0.0);
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        let comparator = PronunciationComparatorBuilder::new(ComparisonConfig::default())
            .build()
            .unwrap();
        let bad = AudioSignal::new(0, vec![0.1; 10]);
        let good = AudioSignal::new(SR, vec![0.1; 10]);
        assert!(matches!(
            comparator.compare_signals(&bad, &good),
            Err(ComparisonError::InvalidInput { .. })
        ));
    }
}
