pub mod builder;

use image::RgbaImage;
use tracing::debug;

use crate::{
    algorithms::Normalizer,
    error::Result,
    traits::{ContourExtractor, ForegroundSegmenter},
    types::{CanonicalImage, Contour},
};

/// Result of running the full silhouette pipeline on one image
#[derive(Debug, Clone)]
pub struct SilhouetteOutput {
    pub canonical: CanonicalImage,
    pub contours: Vec<Contour>,
}

/// Segment -> normalize -> extract contours
pub struct Pipeline {
    segmenter: Box<dyn ForegroundSegmenter>,
    normalizer: Normalizer,
    contour_extractor: Box<dyn ContourExtractor>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        segmenter: Box<dyn ForegroundSegmenter>,
        normalizer: Normalizer,
        contour_extractor: Box<dyn ContourExtractor>,
    ) -> Self {
        Self {
            segmenter,
            normalizer,
            contour_extractor,
        }
    }

    /// Segment and normalize an image into its canonical silhouette
    pub fn normalize(&self, image: &RgbaImage) -> Result<CanonicalImage> {
        let mask = self.segmenter.segment(image);
        self.normalizer.normalize(&mask)
    }

    /// Run every stage, returning the canonical image and its contours
    pub fn process(&self, image: &RgbaImage) -> Result<SilhouetteOutput> {
        let canonical = self.normalize(image)?;
        let contours: Vec<Contour> = self
            .contour_extractor
            .extract_contours(canonical.as_gray())?
            .collect();

        debug!(
            side = canonical.side(),
            contours = contours.len(),
            "silhouette pipeline finished"
        );

        Ok(SilhouetteOutput { canonical, contours })
    }

    /// Extract contours from an already canonical image
    pub fn contours(&self, canonical: &CanonicalImage) -> Result<Vec<Contour>> {
        Ok(self.contour_extractor.extract_contours(canonical.as_gray())?.collect())
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!("Pipeline: segment, normalize (padding {}px), extract contours", self.normalizer.padding_px)
    }
}
