//! Latitude-normalized reprojection
//!
//! Web Mercator stretches north-south by `1/cos(lat)`, so warping a chart
//! at the equatorial resolution of its max LOD would inflate high-latitude
//! output by `1/cos^2(lat)`. The warp therefore targets
//! `resolution(max_lod) / cos(center_latitude)`: the processed raster keeps
//! roughly the source pixel density and the tile engine's overview
//! selection does the rest.

use gdal::Dataset;
use tracing::debug;

use crate::coord;
use crate::pipeline::PipelineError;
use crate::raster;
use crate::resample::Resampling;

/// Target pixel size in meters for a chart with the given max LOD centered
/// at `center_lat` degrees.
pub fn adjusted_resolution(max_lod: u8, center_lat: f64) -> f64 {
    coord::resolution(max_lod) / center_lat.to_radians().cos()
}

/// Warps the dataset to the target EPSG with square latitude-adjusted
/// pixels and a generated destination alpha band.
pub fn warp_to_target(
    src: &Dataset,
    max_lod: u8,
    epsg: u32,
    kernel: Resampling,
    threads: usize,
    dataset_name: &str,
) -> Result<Dataset, PipelineError> {
    let (_, center_lat) = raster::center_geographic(src).map_err(PipelineError::CrsTransform)?;
    let resolution = adjusted_resolution(max_lod, center_lat);
    debug!(
        dataset = dataset_name,
        center_lat,
        resolution,
        "warping to EPSG:{}",
        epsg
    );

    let resolution_arg = format!("{:.10}", resolution);
    let mut args: Vec<String> = vec![
        "-of".to_string(),
        "MEM".to_string(),
        "-t_srs".to_string(),
        format!("EPSG:{}", epsg),
        "-tr".to_string(),
        resolution_arg.clone(),
        resolution_arg,
        "-r".to_string(),
        kernel.warp_name().to_string(),
    ];
    if threads > 1 {
        args.push("-wo".to_string());
        args.push(format!("NUM_THREADS={}", threads));
    }
    args.push("-dstalpha".to_string());

    raster::warp(src, &args).map_err(|source| PipelineError::WarpFailed {
        dataset: dataset_name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjusted_resolution_at_equator() {
        assert!((adjusted_resolution(11, 0.0) - coord::resolution(11)).abs() < 1e-12);
    }

    #[test]
    fn test_adjusted_resolution_seattle_sectional() {
        // max_lod 11 chart centered at 47.6N.
        let adjusted = adjusted_resolution(11, 47.6);
        let expected = 76.43702828517625 / (47.6f64).to_radians().cos();

        let relative_error = (adjusted - expected).abs() / expected;
        assert!(relative_error < 1e-6);
        assert!((adjusted - 113.3).abs() < 0.5);
    }

    #[test]
    fn test_adjusted_resolution_doubles_at_60_degrees() {
        let equator = adjusted_resolution(10, 0.0);
        let high = adjusted_resolution(10, 60.0);
        assert!((high / equator - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_adjusted_resolution_symmetric_about_equator() {
        assert!(
            (adjusted_resolution(9, 47.6) - adjusted_resolution(9, -47.6)).abs() < 1e-12
        );
    }
}
