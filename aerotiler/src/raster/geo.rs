//! Coordinate-system and geotransform helpers
//!
//! Every spatial reference created here is pinned to traditional GIS axis
//! order (longitude, latitude). Without the pin, GDAL 3 honors the
//! authority-defined axis order for geographic CRSes and silently swaps
//! axes in the center-latitude and GCP paths.

use gdal::errors::Result;
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal::{Dataset, GeoTransform};

use crate::coord::MercatorBounds;

/// Spatial reference from an EPSG code, axis order pinned.
pub fn spatial_ref_from_epsg(epsg: u32) -> Result<SpatialRef> {
    let srs = SpatialRef::from_epsg(epsg)?;
    srs.set_axis_mapping_strategy(gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
    Ok(srs)
}

/// Spatial reference from WKT, axis order pinned.
pub fn spatial_ref_from_wkt(wkt: &str) -> Result<SpatialRef> {
    let srs = SpatialRef::from_wkt(wkt)?;
    srs.set_axis_mapping_strategy(gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
    Ok(srs)
}

/// Transform from WGS84 (lon, lat) into the given CRS.
pub fn wgs84_to_crs(dst: &SpatialRef) -> Result<CoordTransform> {
    let wgs84 = spatial_ref_from_epsg(crate::coord::EPSG_WGS84)?;
    CoordTransform::new(&wgs84, dst)
}

/// Transforms a single point through a coordinate transform.
pub fn transform_point(transform: &CoordTransform, x: f64, y: f64) -> Result<(f64, f64)> {
    let mut xs = [x];
    let mut ys = [y];
    let mut zs = [0.0];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;
    Ok((xs[0], ys[0]))
}

/// Projected bounds of a north-up raster from its geotransform and size.
///
/// `gt[5]` is negative for north-up rasters, so the row axis runs from
/// `max_y` at the top to `min_y` at the bottom.
pub fn extent_of(gt: &GeoTransform, width: usize, height: usize) -> MercatorBounds {
    MercatorBounds {
        min_x: gt[0],
        max_x: gt[0] + width as f64 * gt[1],
        max_y: gt[3],
        min_y: gt[3] + height as f64 * gt[5],
    }
}

/// Projected bounds of an open dataset.
pub fn dataset_extent(ds: &Dataset) -> Result<MercatorBounds> {
    let gt = ds.geo_transform()?;
    let (width, height) = ds.raster_size();
    Ok(extent_of(&gt, width, height))
}

/// Geotransform of a pixel window inside a raster: the same scale and
/// rotation terms with the origin moved to the window's top-left pixel.
pub fn window_geo_transform(gt: &GeoTransform, x0: f64, y0: f64) -> GeoTransform {
    [
        gt[0] + x0 * gt[1] + y0 * gt[2],
        gt[1],
        gt[2],
        gt[3] + x0 * gt[4] + y0 * gt[5],
        gt[4],
        gt[5],
    ]
}

/// Center of a dataset in geographic (lon, lat) degrees.
///
/// Used for the latitude-normalized warp resolution and as the dummy
/// coordinate when clipping one-sided geographic bounds.
pub fn center_geographic(ds: &Dataset) -> Result<(f64, f64)> {
    let gt = ds.geo_transform()?;
    let (width, height) = ds.raster_size();

    let px = width as f64 / 2.0;
    let py = height as f64 / 2.0;
    let cx = gt[0] + px * gt[1] + py * gt[2];
    let cy = gt[3] + px * gt[4] + py * gt[5];

    let src = ds.spatial_ref()?;
    src.set_axis_mapping_strategy(gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
    let wgs84 = spatial_ref_from_epsg(crate::coord::EPSG_WGS84)?;
    let to_geographic = CoordTransform::new(&src, &wgs84)?;
    transform_point(&to_geographic, cx, cy)
}
