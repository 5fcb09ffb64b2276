//! Error types for the dataset pipeline.
//!
//! Errors are categorized by pipeline stage. A stage error aborts its
//! dataset job; the parallel driver tolerates per-dataset failures and the
//! run continues with whatever rasters were produced.

use gdal::errors::GdalError;
use thiserror::Error;

/// Errors that can occur while processing one dataset.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source raster missing from the archive (or archive missing)
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// Palette expansion / source windowing failed
    #[error("palette expansion failed for '{dataset}': {source}")]
    ExpandFailed {
        dataset: String,
        source: GdalError,
    },

    /// Mask has a zero-area outer ring, or its window falls entirely
    /// outside the image
    #[error("invalid mask for '{0}': outer ring covers no pixels")]
    MaskInvalid(String),

    /// Mask rasterization failed
    #[error("mask rasterization failed for '{dataset}': {source}")]
    MaskBurnFailed {
        dataset: String,
        source: GdalError,
    },

    /// Fewer than three usable ground control points, or all collinear
    #[error("'{dataset}': cannot fit affine from {count} GCPs (need >= 3, non-collinear)")]
    InsufficientGcps { dataset: String, count: usize },

    /// A coordinate-system transform could not be created or applied
    #[error("coordinate transform failed: {0}")]
    CrsTransform(#[source] GdalError),

    /// Reprojection to the target CRS failed
    #[error("warp failed for '{dataset}': {source}")]
    WarpFailed {
        dataset: String,
        source: GdalError,
    },

    /// Geographic clip failed
    #[error("clip failed for '{dataset}': {source}")]
    ClipFailed {
        dataset: String,
        source: GdalError,
    },

    /// Writing the processed GeoTIFF failed
    #[error("failed to save '{path}': {source}")]
    SaveFailed { path: String, source: GdalError },

    /// Embedded overview generation failed
    #[error("overview build failed for '{path}': {source}")]
    OverviewFailed { path: String, source: GdalError },

    /// Any other raster library failure
    #[error(transparent)]
    Gdal(#[from] GdalError),
}
