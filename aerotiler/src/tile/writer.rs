//! Tile file encode/decode
//!
//! Tiles travel through the engine as raw RGBA byte planes; this module
//! turns them into PNG/JPEG/WebP files and reads child tiles back for
//! overview synthesis. JPEG has no alpha channel, so JPEG tiles drop it at
//! encode time (empty-tile suppression has already run by then).

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::webp::WebPEncoder;
use image::{ColorType, DynamicImage, ImageFormat, RgbaImage};

use super::error::TileRenderError;
use super::TileFormat;

/// Encodes and writes a square RGBA tile.
pub(crate) fn write_tile(
    path: &Path,
    rgba: Vec<u8>,
    size: u32,
    format: TileFormat,
) -> Result<(), TileRenderError> {
    let img = RgbaImage::from_raw(size, size, rgba)
        .ok_or_else(|| image::ImageError::Parameter(image::error::ParameterError::from_kind(
            image::error::ParameterErrorKind::DimensionMismatch,
        )))?;

    match format {
        TileFormat::Png => img.save_with_format(path, ImageFormat::Png)?,
        TileFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(img).to_rgb8();
            rgb.save_with_format(path, ImageFormat::Jpeg)?;
        }
        TileFormat::Webp => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            WebPEncoder::new_lossless(writer).encode(img.as_raw(), size, size, ColorType::Rgba8)?;
        }
    }
    Ok(())
}

/// Reads a tile file back as RGBA. Returns `None` when the file is missing
/// or does not decode; overview synthesis treats both as an absent child.
pub(crate) fn read_tile_rgba(path: &Path) -> Option<RgbaImage> {
    if !path.exists() {
        return None;
    }
    image::open(path).ok().map(|img| img.to_rgba8())
}
