//! Pipeline stages
//!
//! The fixed stage sequence of the dataset pipeline. Each stage takes the
//! current in-memory dataset and either passes it through untouched or
//! replaces it with a transformed one. Window-producing stages additionally
//! report pixel offsets so later stages can map original-image coordinates
//! (mask vertices, GCP pixels) into the current raster.

mod clip;
mod expand;
mod georef;
mod mask;
mod persist;
mod warp;

pub use clip::clip_to_bounds;
pub use expand::{expand_palette, mask_window, SourceWindow};
pub use georef::{apply_gcps, fit_affine};
pub use mask::apply_mask;
pub use persist::save_with_overviews;
pub use warp::{adjusted_resolution, warp_to_target};

use gdal::Dataset;

/// Copies all bands of `src` (windowed at `window`, `size` pixels) into the
/// same band numbers of `dst`, preserving color interpretation.
pub(crate) fn copy_bands(
    src: &Dataset,
    dst: &Dataset,
    window: (isize, isize),
    size: (usize, usize),
) -> gdal::errors::Result<()> {
    for index in 1..=src.raster_count() {
        let band = src.rasterband(index)?;
        let buffer = band.read_as::<u8>(window, size, size, None)?;
        let mut out = dst.rasterband(index)?;
        out.write((0, 0), size, &buffer)?;
        out.set_color_interpretation(band.color_interpretation())?;
    }
    Ok(())
}
