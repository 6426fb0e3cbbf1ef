use std::path::Path;

use crate::config::ComparisonConfig;
use crate::error::ComparisonError;
use crate::pipeline::defaults::{
    DtwSequenceAligner, EnergySegmentIsolator, FileAudioLoader, MfccFeatureExtractor,
    PhaseVocoderNormalizer,
};
use crate::pipeline::runtime::{PronunciationComparator, PronunciationComparatorParts};
use crate::pipeline::traits::{
    AudioLoader, FeatureExtractor, LengthNormalizer, SegmentIsolator, SequenceAligner,
};

pub struct PronunciationComparatorBuilder {
    config: ComparisonConfig,
    audio_loader: Option<Box<dyn AudioLoader>>,
    segment_isolator: Option<Box<dyn SegmentIsolator>>,
    feature_extractor: Option<Box<dyn FeatureExtractor>>,
    length_normalizer: Option<Box<dyn LengthNormalizer>>,
    sequence_aligner: Option<Box<dyn SequenceAligner>>,
}

impl PronunciationComparatorBuilder {
    pub fn new(config: ComparisonConfig) -> Self {
        Self {
            config,
            audio_loader: None,
            segment_isolator: None,
            feature_extractor: None,
            length_normalizer: None,
            sequence_aligner: None,
        }
    }

    /// Starts from a JSON config file; missing keys take their defaults.
    pub fn from_config_path(path: &Path) -> Result<Self, ComparisonError> {
        Ok(Self::new(ComparisonConfig::load(path)?))
    }

    pub fn with_audio_loader(mut self, audio_loader: Box<dyn AudioLoader>) -> Self {
        self.audio_loader = Some(audio_loader);
        self
    }

    pub fn with_segment_isolator(mut self, segment_isolator: Box<dyn SegmentIsolator>) -> Self {
        self.segment_isolator = Some(segment_isolator);
        self
    }

    pub fn with_feature_extractor(mut self, feature_extractor: Box<dyn FeatureExtractor>) -> Self {
        self.feature_extractor = Some(feature_extractor);
        self
    }

    pub fn with_length_normalizer(mut self, length_normalizer: Box<dyn LengthNormalizer>) -> Self {
        self.length_normalizer = Some(length_normalizer);
        self
    }

    pub fn with_sequence_aligner(mut self, sequence_aligner: Box<dyn SequenceAligner>) -> Self {
        self.sequence_aligner = Some(sequence_aligner);
        self
    }

    pub fn build(self) -> Result<PronunciationComparator, ComparisonError> {
        self.config.validate()?;

        let target_sample_rate_hz = self.config.target_sample_rate_hz;
        let max_window = self.config.stretch_window;

        Ok(PronunciationComparator::from_parts(
            PronunciationComparatorParts {
                audio_loader: self.audio_loader.unwrap_or_else(|| {
                    Box::new(FileAudioLoader {
                        target_sample_rate_hz,
                    })
                }),
                segment_isolator: self
                    .segment_isolator
                    .unwrap_or_else(|| Box::new(EnergySegmentIsolator)),
                feature_extractor: self
                    .feature_extractor
                    .unwrap_or_else(|| Box::new(MfccFeatureExtractor)),
                length_normalizer: self
                    .length_normalizer
                    .unwrap_or_else(|| Box::new(PhaseVocoderNormalizer { max_window })),
                sequence_aligner: self
                    .sequence_aligner
                    .unwrap_or_else(|| Box::new(DtwSequenceAligner)),
                config: self.config,
            },
        ))
    }
}
