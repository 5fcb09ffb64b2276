//! Tile engine errors
//!
//! Per-tile read/encode errors are logged and counted by the workers, not
//! propagated; the variants here surface only through worker-fatal paths
//! (VRT open, directory creation) or the phase drivers.

use thiserror::Error;

use crate::vrt::VrtError;

/// Errors that abort tile generation for a tileset.
#[derive(Debug, Error)]
pub enum TileError {
    /// Building a zoom VRT failed
    #[error(transparent)]
    Vrt(#[from] VrtError),

    /// A worker could not open its zoom VRT
    #[error("failed to open zoom VRT '{path}': {source}")]
    VrtOpen {
        path: String,
        source: gdal::errors::GdalError,
    },

    /// No VRT exists for a zoom the manifest calls for
    #[error("no zoom VRT available for zoom {0}")]
    VrtMissing(u8),

    /// Creating a tile output directory failed
    #[error("failed to create directory '{path}': {source}")]
    DirCreate {
        path: String,
        source: std::io::Error,
    },

    /// A tile worker panicked or returned an error
    #[error("tile worker failed: {0}")]
    WorkerFailed(String),
}

/// Errors for a single tile; logged and skipped by the workers.
#[derive(Debug, Error)]
pub enum TileRenderError {
    /// Windowed band read from the zoom VRT failed
    #[error("raster read failed: {0}")]
    Read(#[from] gdal::errors::GdalError),

    /// Encoding the tile image failed
    #[error("tile encode failed: {0}")]
    Encode(#[from] image::ImageError),

    /// Writing the tile file failed
    #[error("tile write failed: {0}")]
    Write(#[from] std::io::Error),
}
