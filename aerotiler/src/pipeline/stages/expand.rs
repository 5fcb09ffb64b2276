//! Palette expansion and source windowing
//!
//! Paletted charts are expanded to RGB. When the dataset also carries a
//! mask, the expansion is fused with a source-window read covering only the
//! mask's bounding box, so the (often much larger) full chart is never
//! materialized. The window offset in original-image pixels is reported to
//! the caller; the translate call itself keeps the geotransform consistent
//! with the window.

use gdal::raster::ColorInterpretation;
use gdal::Dataset;
use tracing::debug;

use crate::catalog::Mask;
use crate::pipeline::PipelineError;
use crate::raster;

/// A pixel window in a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceWindow {
    pub x0: isize,
    pub y0: isize,
    pub width: usize,
    pub height: usize,
}

/// The mask's outer-ring bounding box as an integral pixel window, clamped
/// to the image. Returns `None` when the clamped window covers no pixels.
pub fn mask_window(mask: &Mask, img_width: usize, img_height: usize) -> Option<SourceWindow> {
    let (min_x, min_y, max_x, max_y) = mask.outer_bbox();

    let x0 = (min_x.floor() as isize).clamp(0, img_width as isize);
    let y0 = (min_y.floor() as isize).clamp(0, img_height as isize);
    let x1 = (max_x.ceil() as isize).clamp(0, img_width as isize);
    let y1 = (max_y.ceil() as isize).clamp(0, img_height as isize);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(SourceWindow {
        x0,
        y0,
        width: (x1 - x0) as usize,
        height: (y1 - y0) as usize,
    })
}

/// Expands a paletted band-1 raster to RGB, windowing the read to the mask
/// bbox when a mask is present. No-op for non-paletted sources.
///
/// Returns the (possibly replaced) dataset and the window offset in
/// original-image pixel space.
pub fn expand_palette(
    src: Dataset,
    mask: Option<&Mask>,
    dataset_name: &str,
) -> Result<(Dataset, (isize, isize)), PipelineError> {
    let has_palette = src.rasterband(1)?.color_interpretation() == ColorInterpretation::PaletteIndex;
    if !has_palette {
        return Ok((src, (0, 0)));
    }

    let mut args: Vec<String> = ["-of", "MEM", "-expand", "rgb"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut offset = (0isize, 0isize);
    if let Some(mask) = mask {
        let (width, height) = src.raster_size();
        let window =
            mask_window(mask, width, height).ok_or_else(|| PipelineError::MaskInvalid(dataset_name.to_string()))?;

        args.push("-srcwin".to_string());
        args.push(window.x0.to_string());
        args.push(window.y0.to_string());
        args.push(window.width.to_string());
        args.push(window.height.to_string());
        offset = (window.x0, window.y0);

        debug!(
            dataset = dataset_name,
            x0 = window.x0,
            y0 = window.y0,
            width = window.width,
            height = window.height,
            "windowing palette expansion to mask bbox"
        );
    }

    let expanded = raster::translate(&src, &args).map_err(|source| PipelineError::ExpandFailed {
        dataset: dataset_name.to_string(),
        source,
    })?;

    Ok((expanded, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_mask(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Mask {
        Mask {
            rings: vec![vec![
                [min_x, min_y],
                [max_x, min_y],
                [max_x, max_y],
                [min_x, max_y],
            ]],
        }
    }

    #[test]
    fn test_mask_window_inside_image() {
        // A sectional chart: 8000x6000 source, mask bbox (1000,500)-(7000,5500).
        let mask = rect_mask(1000.0, 500.0, 7000.0, 5500.0);
        let window = mask_window(&mask, 8000, 6000).unwrap();

        assert_eq!(window.x0, 1000);
        assert_eq!(window.y0, 500);
        assert_eq!(window.width, 6000);
        assert_eq!(window.height, 5000);
    }

    #[test]
    fn test_mask_window_clamped_to_image() {
        let mask = rect_mask(-100.0, -50.0, 9000.0, 7000.0);
        let window = mask_window(&mask, 8000, 6000).unwrap();

        assert_eq!(window.x0, 0);
        assert_eq!(window.y0, 0);
        assert_eq!(window.width, 8000);
        assert_eq!(window.height, 6000);
    }

    #[test]
    fn test_mask_window_fractional_vertices_round_outward() {
        let mask = rect_mask(10.4, 20.6, 30.2, 40.1);
        let window = mask_window(&mask, 100, 100).unwrap();

        assert_eq!(window.x0, 10);
        assert_eq!(window.y0, 20);
        assert_eq!(window.width, 21);
        assert_eq!(window.height, 21);
    }

    #[test]
    fn test_mask_window_zero_area_is_none() {
        let degenerate = rect_mask(100.0, 100.0, 100.0, 100.0);
        assert_eq!(mask_window(&degenerate, 8000, 6000), None);
    }

    #[test]
    fn test_mask_window_outside_image_is_none() {
        let outside = rect_mask(9000.0, 7000.0, 9500.0, 7500.0);
        assert_eq!(mask_window(&outside, 8000, 6000), None);
    }
}
