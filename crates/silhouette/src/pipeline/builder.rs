use crate::{
    algorithms::{ExternalContourExtractor, Normalizer, ThresholdSegmenter},
    config::SilhouetteConfig,
    pipeline::Pipeline,
    traits::{ContourExtractor, ForegroundSegmenter},
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    config: SilhouetteConfig,
    segmenter: Option<Box<dyn ForegroundSegmenter>>,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: SilhouetteConfig::default(),
            segmenter: None,
            contour_extractor: None,
        }
    }

    /// Take thresholds and padding from a config value
    pub fn with_config(mut self, config: SilhouetteConfig) -> Self {
        self.config = config;
        self
    }

    pub fn alpha_threshold(mut self, threshold: u8) -> Self {
        self.config.alpha_threshold = threshold;
        self
    }

    pub fn white_threshold(mut self, threshold: u8) -> Self {
        self.config.white_threshold = threshold;
        self
    }

    pub fn padding(mut self, padding_px: u32) -> Self {
        self.config.padding_px = padding_px;
        self
    }

    /// Set the segmenter (replaces the threshold segmenter)
    pub fn set_segmenter<S>(mut self, segmenter: S) -> Self
    where
        S: ForegroundSegmenter + 'static,
    {
        self.segmenter = Some(Box::new(segmenter));
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let config = self.config;
        let segmenter = self.segmenter.unwrap_or_else(|| {
            Box::new(ThresholdSegmenter::new(config.alpha_threshold, config.white_threshold))
        });
        let contour_extractor = self
            .contour_extractor
            .unwrap_or_else(|| Box::new(ExternalContourExtractor));

        Pipeline::new(segmenter, Normalizer::new(config.padding_px), contour_extractor)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
