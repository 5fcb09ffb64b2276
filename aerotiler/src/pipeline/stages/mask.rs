//! Polygon mask rasterization
//!
//! Extracts the mask's bounding-box window from the current raster into a
//! fresh RGBA memory dataset and burns the polygon (holes included) into
//! the alpha band: pixels outside the mask stay transparent.
//!
//! Mask vertices are in original-image pixel space; the cumulative window
//! offset maps them into the current raster. The burn happens under a
//! temporary identity geotransform so pixel coordinates and geometry
//! coordinates coincide; the real windowed geotransform is restored after.

use gdal::raster::{rasterize, Buffer, ColorInterpretation};
use gdal::vector::Geometry;
use gdal::{Dataset, DriverManager, GeoTransform};
use tracing::debug;

use crate::catalog::Mask;
use crate::pipeline::PipelineError;
use crate::raster::window_geo_transform;

use super::{copy_bands, mask_window};

const IDENTITY_GT: GeoTransform = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Applies the pixel-space polygon mask to the current raster.
///
/// Returns the masked RGBA dataset and the updated cumulative offset
/// `(window_offset + bbox_origin)` in original-image pixels.
pub fn apply_mask(
    src: Dataset,
    mask: &Mask,
    window_offset: (isize, isize),
    dataset_name: &str,
) -> Result<(Dataset, (isize, isize)), PipelineError> {
    let (img_width, img_height) = src.raster_size();

    // Mask bbox in current-raster coordinates.
    let shifted = shift_mask(mask, (window_offset.0 as f64, window_offset.1 as f64));
    let window = mask_window(&shifted, img_width, img_height)
        .ok_or_else(|| PipelineError::MaskInvalid(dataset_name.to_string()))?;

    let cumulative = (window_offset.0 + window.x0, window_offset.1 + window.y0);
    debug!(
        dataset = dataset_name,
        rings = mask.rings.len(),
        cox = cumulative.0,
        coy = cumulative.1,
        "applying pixel mask"
    );

    let src_bands = src.raster_count();
    let has_alpha = (1..=src_bands).any(|index| {
        src.rasterband(index)
            .map(|band| band.color_interpretation() == ColorInterpretation::AlphaBand)
            .unwrap_or(false)
    });
    let dst_bands = if has_alpha { src_bands } else { src_bands + 1 };

    let mem = DriverManager::get_driver_by_name("MEM")?;
    let mut dst = mem.create_with_band_type::<u8, _>(
        "",
        window.width as isize,
        window.height as isize,
        dst_bands,
    )?;

    copy_bands(
        &src,
        &dst,
        (window.x0, window.y0),
        (window.width, window.height),
    )?;

    // Alpha starts fully transparent; the burn below opens up the mask
    // interior.
    {
        let mut alpha = dst.rasterband(dst_bands)?;
        alpha.set_color_interpretation(ColorInterpretation::AlphaBand)?;
        let zeros = Buffer::new(
            (window.width, window.height),
            vec![0u8; window.width * window.height],
        );
        alpha.write((0, 0), (window.width, window.height), &zeros)?;
    }

    // Geotransform for the extracted window, when the source has one.
    let windowed_gt = src
        .geo_transform()
        .ok()
        .map(|gt| window_geo_transform(&gt, window.x0 as f64, window.y0 as f64));

    let projection = src.projection();
    if !projection.is_empty() {
        dst.set_projection(&projection)?;
    }

    // Burn under an identity geotransform: geometry coordinates are pixels
    // of the current raster, i.e. original-image pixels minus the
    // cumulative offset.
    dst.set_geo_transform(&IDENTITY_GT)?;
    let polygon = mask_geometry(mask, (cumulative.0 as f64, cumulative.1 as f64))?;
    rasterize(&mut dst, &[dst_bands], &[polygon], &[255.0], None).map_err(|source| {
        PipelineError::MaskBurnFailed {
            dataset: dataset_name.to_string(),
            source,
        }
    })?;

    if let Some(gt) = windowed_gt {
        dst.set_geo_transform(&gt)?;
    }

    Ok((dst, cumulative))
}

/// Builds the OGR polygon for a mask, with every vertex shifted by
/// `-offset`. Ring order and winding are preserved: the first ring is the
/// outer boundary, the rest are holes.
fn mask_geometry(mask: &Mask, offset: (f64, f64)) -> gdal::errors::Result<Geometry> {
    let mut polygon = Geometry::empty(gdal_sys::OGRwkbGeometryType::wkbPolygon)?;
    for ring_vertices in &mask.rings {
        let mut ring = Geometry::empty(gdal_sys::OGRwkbGeometryType::wkbLinearRing)?;
        for &[x, y] in ring_vertices {
            ring.add_point_2d((x - offset.0, y - offset.1));
        }
        polygon.add_geometry(ring)?;
    }
    Ok(polygon)
}

/// A copy of the mask with all vertices shifted by `-offset`.
fn shift_mask(mask: &Mask, offset: (f64, f64)) -> Mask {
    Mask {
        rings: mask
            .rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .map(|&[x, y]| [x - offset.0, y - offset.1])
                    .collect()
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_mask_translates_all_rings() {
        let mask = Mask {
            rings: vec![
                vec![[1000.0, 500.0], [7000.0, 500.0], [7000.0, 5500.0]],
                vec![[2000.0, 1000.0], [2500.0, 1000.0], [2500.0, 1500.0]],
            ],
        };

        let shifted = shift_mask(&mask, (1000.0, 500.0));

        assert_eq!(shifted.rings[0][0], [0.0, 0.0]);
        assert_eq!(shifted.rings[0][2], [6000.0, 5000.0]);
        assert_eq!(shifted.rings[1][0], [1000.0, 500.0]);
    }

    #[test]
    fn test_cumulative_offset_composition() {
        // After a srcwin at (1000, 500), a mask bbox starting at the window
        // origin contributes nothing further; a bbox at (1200, 700) in
        // original coordinates lands at (200, 200) in the window, making
        // the cumulative offset (1200, 700).
        let mask = Mask {
            rings: vec![vec![
                [1200.0, 700.0],
                [3200.0, 700.0],
                [3200.0, 2700.0],
                [1200.0, 2700.0],
            ]],
        };

        let shifted = shift_mask(&mask, (1000.0, 500.0));
        let window = mask_window(&shifted, 6000, 5000).unwrap();

        assert_eq!((window.x0, window.y0), (200, 200));
        assert_eq!((1000 + window.x0, 500 + window.y0), (1200, 700));
    }
}
