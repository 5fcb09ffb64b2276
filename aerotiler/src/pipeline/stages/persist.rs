//! Processed raster persistence
//!
//! Writes the in-memory result as a tiled LZW GeoTIFF and builds embedded
//! overviews. The overviews are what make the tile engine viable: a
//! low-zoom tile read hits a pre-averaged level instead of the full
//! resolution raster.

use std::path::Path;

use gdal::raster::RasterCreationOption;
use gdal::{Dataset, DriverManager};
use tracing::debug;

use crate::pipeline::PipelineError;

/// Overview decimation factors embedded in every processed raster.
pub const OVERVIEW_LEVELS: [i32; 6] = [2, 4, 8, 16, 32, 64];

/// Saves the dataset as a compressed GeoTIFF with embedded overviews.
pub fn save_with_overviews(src: &Dataset, path: &Path) -> Result<(), PipelineError> {
    // Overviews inherit no compression by default; pin LZW to match the
    // base raster.
    gdal::config::set_config_option("COMPRESS_OVERVIEW", "LZW")?;

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let options = [
        RasterCreationOption {
            key: "COMPRESS",
            value: "LZW",
        },
        RasterCreationOption {
            key: "TILED",
            value: "YES",
        },
        RasterCreationOption {
            key: "BIGTIFF",
            value: "IF_SAFER",
        },
    ];

    let mut out =
        src.create_copy(&driver, path, &options)
            .map_err(|source| PipelineError::SaveFailed {
                path: path.display().to_string(),
                source,
            })?;
    out.flush_cache();

    debug!(path = %path.display(), "building embedded overviews");
    out.build_overviews("AVERAGE", &OVERVIEW_LEVELS, &[])
        .map_err(|source| PipelineError::OverviewFailed {
            path: path.display().to_string(),
            source,
        })?;

    Ok(())
}
