//! Scan → normalize → render → classify.

use std::path::{Path, PathBuf};

use scanpro_traits::Clock;

use crate::abort::AbortToken;
use crate::classification::ClassificationResult;
use crate::config::ScanParams;
use crate::error::{ClassifyError, Result, ScanError};
use crate::grid::NormalizedGrid;
use crate::raster::{RasterScanner, ScanOutcome};

/// Turns a normalized grid into an image on disk.
pub trait Renderer {
    fn render(&self, grid: &NormalizedGrid) -> std::result::Result<PathBuf, ScanError>;
}

/// Classifies a rendered image, locally or through a remote service.
pub trait Classifier {
    fn classify(&self, image: &Path) -> std::result::Result<ClassificationResult, ClassifyError>;
}

impl<R: Renderer + ?Sized> Renderer for &R {
    fn render(&self, grid: &NormalizedGrid) -> std::result::Result<PathBuf, ScanError> {
        (**self).render(grid)
    }
}

impl<K: Classifier + ?Sized> Classifier for &K {
    fn classify(&self, image: &Path) -> std::result::Result<ClassificationResult, ClassifyError> {
        (**self).classify(image)
    }
}

impl<K: Classifier + ?Sized> Classifier for Box<K> {
    fn classify(&self, image: &Path) -> std::result::Result<ClassificationResult, ClassifyError> {
        (**self).classify(image)
    }
}

/// Everything one scan produced. A failed classification keeps the grid
/// and image.
#[derive(Debug)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub grid: NormalizedGrid,
    pub image_path: PathBuf,
    pub classification: std::result::Result<ClassificationResult, ClassifyError>,
}

/// Run one full acquisition and analysis. Errors before classification are
/// returned as `ScanError` inside the report chain.
pub fn run_pipeline<C, R, K>(
    scanner: &mut RasterScanner<C>,
    params: &ScanParams,
    abort: &AbortToken,
    renderer: &R,
    classifier: &K,
) -> Result<ScanReport>
where
    C: Clock,
    R: Renderer + ?Sized,
    K: Classifier + ?Sized,
{
    let outcome = scanner.scan(params, abort)?;
    let grid = NormalizedGrid::normalize(&outcome.matrix)?;
    let image_path = renderer.render(&grid)?;
    tracing::info!(path = %image_path.display(), "heatmap rendered");

    let classification = classifier.classify(&image_path);
    match &classification {
        Ok(r) => tracing::info!(
            object = %r.object,
            threat = r.threat_score,
            sharpness = r.sharpness,
            "classified"
        ),
        Err(e) => tracing::warn!(error = %e, "classification failed; scan kept"),
    }

    Ok(ScanReport {
        outcome,
        grid,
        image_path,
        classification,
    })
}
