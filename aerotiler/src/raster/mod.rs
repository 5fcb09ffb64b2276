//! Raster library plumbing
//!
//! Small helpers layered over the GDAL bindings: the `gdal_utils` entry
//! points the safe crate does not wrap (translate, warp) and the
//! coordinate-system / geotransform arithmetic shared by the pipeline,
//! manifest, and tile engine.

mod geo;
mod ops;

pub use geo::{
    center_geographic, dataset_extent, extent_of, window_geo_transform, wgs84_to_crs,
    spatial_ref_from_epsg, spatial_ref_from_wkt, transform_point,
};
pub use ops::{translate, warp};
