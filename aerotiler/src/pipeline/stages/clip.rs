//! Geographic clipping
//!
//! Optional post-warp clip to catalog-specified lat/lon bounds. Each side
//! is transformed into the target CRS independently, holding the other axis
//! at a dummy coordinate taken from the dataset center; with a fixed dummy
//! like 45N a tall or skewed chart would clip at the wrong easting.

use gdal::Dataset;
use tracing::debug;

use crate::catalog::GeoBounds;
use crate::coord::MercatorBounds;
use crate::pipeline::PipelineError;
use crate::raster::{
    center_geographic, dataset_extent, spatial_ref_from_epsg, transform_point, wgs84_to_crs,
};

/// Clips the warped dataset to its geographic bounds. No-op when the
/// bounds are absent, unbounded, or do not tighten the current extent.
pub fn clip_to_bounds(
    src: Dataset,
    bounds: &GeoBounds,
    epsg: u32,
    dataset_name: &str,
) -> Result<Dataset, PipelineError> {
    if bounds.is_unbounded() {
        return Ok(src);
    }

    let extent = dataset_extent(&src)?;
    let (dummy_lon, dummy_lat) =
        center_geographic(&src).map_err(PipelineError::CrsTransform)?;

    let target = spatial_ref_from_epsg(epsg).map_err(PipelineError::CrsTransform)?;
    let to_target = wgs84_to_crs(&target).map_err(PipelineError::CrsTransform)?;

    let project_lon = |lon: Option<f64>| -> Result<Option<f64>, PipelineError> {
        lon.map(|lon| {
            transform_point(&to_target, lon, dummy_lat)
                .map(|(x, _)| x)
                .map_err(PipelineError::CrsTransform)
        })
        .transpose()
    };
    let clip_min_x = project_lon(bounds.lon_min)?;
    let clip_max_x = project_lon(bounds.lon_max)?;

    let project_lat = |lat: Option<f64>| -> Result<Option<f64>, PipelineError> {
        lat.map(|lat| {
            transform_point(&to_target, dummy_lon, lat)
                .map(|(_, y)| y)
                .map_err(PipelineError::CrsTransform)
        })
        .transpose()
    };
    let clip_min_y = project_lat(bounds.lat_min)?;
    let clip_max_y = project_lat(bounds.lat_max)?;

    let clipped = match apply_side_bounds(extent, clip_min_x, clip_min_y, clip_max_x, clip_max_y) {
        Some(clipped) => clipped,
        None => return Ok(src),
    };

    debug!(
        dataset = dataset_name,
        min_x = clipped.min_x,
        min_y = clipped.min_y,
        max_x = clipped.max_x,
        max_y = clipped.max_y,
        "clipping to geographic bounds"
    );

    // -projwin takes upper-left then lower-right.
    let args: Vec<String> = vec![
        "-of".to_string(),
        "MEM".to_string(),
        "-projwin".to_string(),
        format!("{:.10}", clipped.min_x),
        format!("{:.10}", clipped.max_y),
        format!("{:.10}", clipped.max_x),
        format!("{:.10}", clipped.min_y),
    ];

    crate::raster::translate(&src, &args).map_err(|source| PipelineError::ClipFailed {
        dataset: dataset_name.to_string(),
        source,
    })
}

/// Intersects the extent with the given (already projected) sides.
/// Returns `None` when no side tightens the extent.
pub(crate) fn apply_side_bounds(
    extent: MercatorBounds,
    min_x: Option<f64>,
    min_y: Option<f64>,
    max_x: Option<f64>,
    max_y: Option<f64>,
) -> Option<MercatorBounds> {
    let clipped = MercatorBounds {
        min_x: min_x.unwrap_or(extent.min_x).max(extent.min_x),
        min_y: min_y.unwrap_or(extent.min_y).max(extent.min_y),
        max_x: max_x.unwrap_or(extent.max_x).min(extent.max_x),
        max_y: max_y.unwrap_or(extent.max_y).min(extent.max_y),
    };

    let tightened = clipped.min_x > extent.min_x
        || clipped.min_y > extent.min_y
        || clipped.max_x < extent.max_x
        || clipped.max_y < extent.max_y;

    tightened.then_some(clipped)
}
