//! GCP-derived georeferencing
//!
//! Charts whose embedded georeferencing is wrong (or absent) carry ground
//! control points in the catalog. The GCP geographic coordinates are
//! projected from WGS84 into the source CRS before fitting: in conic
//! projections a least-squares affine computed in lon/lat space distorts at
//! high latitudes. GCP pixel coordinates refer to the original image, so
//! the cumulative window offset is subtracted first.

use gdal::{Dataset, DriverManager, GeoTransform};
use nalgebra::{Matrix2, Vector2};
use tracing::debug;

use crate::catalog::ControlPoint;
use crate::pipeline::PipelineError;
use crate::raster::{spatial_ref_from_epsg, spatial_ref_from_wkt, transform_point, wgs84_to_crs};

/// Replaces the raster's georeferencing with a best-fit affine computed
/// from the dataset's GCPs.
pub fn apply_gcps(
    src: Dataset,
    gcps: &[ControlPoint],
    cumulative_offset: (isize, isize),
    dataset_name: &str,
) -> Result<Dataset, PipelineError> {
    if gcps.len() < 3 {
        return Err(PipelineError::InsufficientGcps {
            dataset: dataset_name.to_string(),
            count: gcps.len(),
        });
    }

    let (width, height) = src.raster_size();
    let bands = src.raster_count();

    let mem = DriverManager::get_driver_by_name("MEM")?;
    let mut dst = mem.create_with_band_type::<u8, _>("", width as isize, height as isize, bands)?;
    super::copy_bands(&src, &dst, (0, 0), (width, height))?;

    // Project GCP geographic coordinates into the source CRS when there is
    // one; otherwise the fit stays in lon/lat and the output is stamped
    // WGS84.
    let projection = src.projection();
    let to_source = if projection.is_empty() {
        None
    } else {
        let source_srs = spatial_ref_from_wkt(&projection).map_err(PipelineError::CrsTransform)?;
        Some(wgs84_to_crs(&source_srs).map_err(PipelineError::CrsTransform)?)
    };

    let mut points = Vec::with_capacity(gcps.len());
    for gcp in gcps {
        let (geo_x, geo_y) = match &to_source {
            Some(transform) => transform_point(transform, gcp.lon, gcp.lat)
                .map_err(PipelineError::CrsTransform)?,
            None => (gcp.lon, gcp.lat),
        };
        points.push((
            gcp.pixel_x - cumulative_offset.0 as f64,
            gcp.pixel_y - cumulative_offset.1 as f64,
            geo_x,
            geo_y,
        ));
    }

    let geo_transform = fit_affine(&points).ok_or_else(|| PipelineError::InsufficientGcps {
        dataset: dataset_name.to_string(),
        count: gcps.len(),
    })?;
    debug!(
        dataset = dataset_name,
        gcps = gcps.len(),
        "assigned GCP-derived geotransform"
    );

    dst.set_geo_transform(&geo_transform)?;
    if projection.is_empty() {
        let wgs84 = spatial_ref_from_epsg(crate::coord::EPSG_WGS84)?;
        dst.set_spatial_ref(&wgs84)?;
    } else {
        dst.set_projection(&projection)?;
    }

    Ok(dst)
}

/// Least-squares affine fit mapping pixel coordinates to projected
/// coordinates. Input tuples are `(pixel_x, pixel_y, geo_x, geo_y)`.
///
/// Returns `None` for fewer than three points or a (near-)collinear
/// configuration. The fit is computed about the pixel centroid, which keeps
/// the normal equations well conditioned for large pixel coordinates.
pub fn fit_affine(points: &[(f64, f64, f64, f64)]) -> Option<GeoTransform> {
    if points.len() < 3 {
        return None;
    }

    let n = points.len() as f64;
    let (mut mean_px, mut mean_py, mut mean_gx, mut mean_gy) = (0.0, 0.0, 0.0, 0.0);
    for &(px, py, gx, gy) in points {
        mean_px += px;
        mean_py += py;
        mean_gx += gx;
        mean_gy += gy;
    }
    mean_px /= n;
    mean_py /= n;
    mean_gx /= n;
    mean_gy /= n;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    let (mut sx_gx, mut sy_gx, mut sx_gy, mut sy_gy) = (0.0, 0.0, 0.0, 0.0);
    for &(px, py, gx, gy) in points {
        let dx = px - mean_px;
        let dy = py - mean_py;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
        sx_gx += dx * (gx - mean_gx);
        sy_gx += dy * (gx - mean_gx);
        sx_gy += dx * (gy - mean_gy);
        sy_gy += dy * (gy - mean_gy);
    }

    let normal = Matrix2::new(sxx, sxy, sxy, syy);
    let det = normal.determinant();
    if !(det.abs() > sxx.max(syy).powi(2) * 1e-12) {
        // Collinear (or identical) pixel coordinates.
        return None;
    }

    let lu = normal.lu();
    let bx = lu.solve(&Vector2::new(sx_gx, sy_gx))?;
    let by = lu.solve(&Vector2::new(sx_gy, sy_gy))?;

    Some([
        mean_gx - bx[0] * mean_px - bx[1] * mean_py,
        bx[0],
        bx[1],
        mean_gy - by[0] * mean_px - by[1] * mean_py,
        by[0],
        by[1],
    ])
}
