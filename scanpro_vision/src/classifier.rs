//! Local heuristic classifier.

use std::path::Path;

use image::DynamicImage;
use scanpro_core::{ClassificationResult, ClassifyError, Classifier};

use crate::metrics::compute_metrics;

/// Brightness decision table over the rendered heatmap. Pure: the same
/// image always yields the same result.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_image(&self, img: &DynamicImage) -> ClassificationResult {
        ClassificationResult::from_metrics(compute_metrics(img))
    }

    /// Classify an encoded image held in memory (e.g. an upload body).
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<ClassificationResult, ClassifyError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ClassifyError::ImageDecode(e.to_string()))?;
        Ok(self.classify_image(&img))
    }
}

impl Classifier for HeuristicClassifier {
    fn classify(&self, image: &Path) -> Result<ClassificationResult, ClassifyError> {
        let img = image::open(image)
            .map_err(|e| ClassifyError::ImageDecode(format!("{}: {e}", image.display())))?;
        let r = self.classify_image(&img);
        tracing::debug!(
            path = %image.display(),
            sharpness = r.sharpness,
            brightness = r.brightness,
            object = %r.object,
            "local classification"
        );
        Ok(r)
    }
}
