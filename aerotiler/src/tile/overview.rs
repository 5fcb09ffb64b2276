//! Phase 2: overview tile synthesis
//!
//! Builds each lower-zoom tile from its (up to four) children at zoom+1:
//! composite into 512x512, downsample to 256x256, suppress fully
//! transparent results. Runs top zoom down, sequentially, because every
//! level reads the files the previous level wrote.
//!
//! Existing files are always skipped. Base tiles written in Phase 1 at
//! intermediate zooms (charts whose max LOD equals that zoom) must survive
//! untouched; a downsampled composite would replace real chart pixels with
//! blurrier ones.

use std::collections::BTreeSet;
use std::path::Path;

use image::{imageops, RgbaImage};
use tracing::{error, info, warn};

use crate::coord::TILE_SIZE;
use crate::resample::Resampling;

use super::writer;
use super::{tile_file_path, PhaseReport, TileFormat};

/// Synthesizes overview tiles for every zoom from `zoom_max - 1` down to
/// `zoom_min`.
pub(crate) fn generate_overview_tiles(
    tile_root: &Path,
    zoom_min: u8,
    zoom_max: u8,
    format: TileFormat,
    resampling: Resampling,
) -> PhaseReport {
    let mut total = PhaseReport::default();

    for zoom in (zoom_min..zoom_max).rev() {
        let parents = collect_parents(tile_root, zoom + 1, format);
        let mut level = PhaseReport::default();

        for &(x, y) in &parents {
            match synthesize_tile(tile_root, zoom, x, y, format, resampling) {
                Ok(Outcome::Generated) => level.generated += 1,
                Ok(Outcome::Skipped) => level.skipped += 1,
                Ok(Outcome::Existing) => level.existing += 1,
                Err(err) => {
                    error!("overview tile {}/{}/{} failed: {}", zoom, x, y, err);
                    level.failed += 1;
                }
            }
        }

        if level.existing > 0 {
            info!(
                "    zoom {}: {} generated, {} skipped, {} existing (base tiles)",
                zoom, level.generated, level.skipped, level.existing
            );
        } else {
            info!(
                "    zoom {}: {} generated, {} skipped",
                zoom, level.generated, level.skipped
            );
        }
        total.absorb(level);
    }

    total
}

enum Outcome {
    Generated,
    Skipped,
    Existing,
}

/// Unique parent addresses derived from the tile files present at
/// `child_zoom`, sorted for deterministic processing order.
fn collect_parents(tile_root: &Path, child_zoom: u8, format: TileFormat) -> BTreeSet<(u32, u32)> {
    let mut parents = BTreeSet::new();
    let child_dir = tile_root.join(child_zoom.to_string());

    let x_entries = match std::fs::read_dir(&child_dir) {
        Ok(entries) => entries,
        // No children at this zoom at all.
        Err(_) => return parents,
    };

    for x_entry in x_entries.flatten() {
        let x_name = x_entry.file_name();
        let child_x: u32 = match x_name.to_string_lossy().parse() {
            Ok(x) => x,
            Err(_) => continue,
        };
        if !x_entry.path().is_dir() {
            continue;
        }

        let y_entries = match std::fs::read_dir(x_entry.path()) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("cannot scan {}: {}", x_entry.path().display(), err);
                continue;
            }
        };
        for y_entry in y_entries.flatten() {
            let y_name = y_entry.file_name();
            let y_name = y_name.to_string_lossy();
            let stem = match y_name.strip_suffix(&format!(".{}", format.ext())) {
                Some(stem) => stem,
                None => continue,
            };
            let child_y: u32 = match stem.parse() {
                Ok(y) => y,
                Err(_) => continue,
            };

            parents.insert((child_x / 2, child_y / 2));
        }
    }

    parents
}

/// Builds one overview tile from its children at zoom+1.
fn synthesize_tile(
    tile_root: &Path,
    zoom: u8,
    x: u32,
    y: u32,
    format: TileFormat,
    resampling: Resampling,
) -> Result<Outcome, super::TileRenderError> {
    let path = tile_file_path(tile_root, zoom, x, y, format);
    if path.exists() {
        // Base tiles win over synthesized overviews.
        return Ok(Outcome::Existing);
    }

    let size = TILE_SIZE as u32;
    let mut composite = RgbaImage::new(size * 2, size * 2);
    let mut has_any_child = false;

    for qy in 0..2u32 {
        for qx in 0..2u32 {
            let child_path =
                tile_file_path(tile_root, zoom + 1, x * 2 + qx, y * 2 + qy, format);
            if let Some(child) = writer::read_tile_rgba(&child_path) {
                has_any_child = true;
                imageops::replace(
                    &mut composite,
                    &child,
                    (qx * size) as i64,
                    (qy * size) as i64,
                );
            }
        }
    }

    if !has_any_child {
        return Ok(Outcome::Skipped);
    }

    let tile = imageops::resize(&composite, size, size, resampling.filter());
    if tile.pixels().all(|pixel| pixel.0[3] == 0) {
        return Ok(Outcome::Skipped);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    writer::write_tile(&path, tile.into_raw(), size, format)?;
    Ok(Outcome::Generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_child(root: &Path, z: u8, x: u32, y: u32, rgba: [u8; 4]) {
        let path = tile_file_path(root, z, x, y, TileFormat::Png);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = RgbaImage::from_pixel(256, 256, image::Rgba(rgba));
        img.save(&path).unwrap();
    }

    #[test]
    fn test_collect_parents_from_children() {
        let temp = TempDir::new().unwrap();
        write_child(temp.path(), 11, 328, 715, [255, 0, 0, 255]);
        write_child(temp.path(), 11, 329, 715, [0, 255, 0, 255]);
        write_child(temp.path(), 11, 400, 500, [0, 0, 255, 255]);

        let parents = collect_parents(temp.path(), 11, TileFormat::Png);
        let expected: BTreeSet<(u32, u32)> = [(164, 357), (200, 250)].into_iter().collect();
        assert_eq!(parents, expected);
    }

    #[test]
    fn test_collect_parents_ignores_foreign_files() {
        let temp = TempDir::new().unwrap();
        write_child(temp.path(), 9, 10, 20, [1, 2, 3, 255]);
        // Wrong extension and non-numeric names must be skipped.
        std::fs::write(temp.path().join("9/10/20.webp"), b"x").unwrap();
        std::fs::write(temp.path().join("9/10/notes.txt"), b"x").unwrap();
        std::fs::create_dir_all(temp.path().join("9/junk")).unwrap();

        let parents = collect_parents(temp.path(), 9, TileFormat::Png);
        assert_eq!(parents, [(5, 10)].into_iter().collect());
    }

    #[test]
    fn test_collect_parents_empty_when_no_child_dir() {
        let temp = TempDir::new().unwrap();
        assert!(collect_parents(temp.path(), 7, TileFormat::Png).is_empty());
    }

    #[test]
    fn test_synthesize_composites_children() {
        let temp = TempDir::new().unwrap();
        // Only the north-west child exists.
        write_child(temp.path(), 8, 20, 30, [200, 100, 50, 255]);

        let outcome =
            synthesize_tile(temp.path(), 7, 10, 15, TileFormat::Png, Resampling::Nearest)
                .unwrap();
        assert!(matches!(outcome, Outcome::Generated));

        let tile =
            writer::read_tile_rgba(&tile_file_path(temp.path(), 7, 10, 15, TileFormat::Png))
                .unwrap();
        // North-west quadrant carries the child; the rest is transparent.
        assert_eq!(tile.get_pixel(10, 10).0, [200, 100, 50, 255]);
        assert_eq!(tile.get_pixel(200, 200).0[3], 0);
    }

    #[test]
    fn test_synthesize_skips_when_no_children() {
        let temp = TempDir::new().unwrap();
        let outcome =
            synthesize_tile(temp.path(), 7, 10, 15, TileFormat::Png, Resampling::Bilinear)
                .unwrap();
        assert!(matches!(outcome, Outcome::Skipped));
        assert!(!tile_file_path(temp.path(), 7, 10, 15, TileFormat::Png).exists());
    }

    #[test]
    fn test_synthesize_preserves_existing_base_tile() {
        let temp = TempDir::new().unwrap();
        // A Phase-1 base tile already exists at the parent address...
        write_child(temp.path(), 7, 10, 15, [9, 9, 9, 255]);
        // ...and children exist below it.
        write_child(temp.path(), 8, 20, 30, [200, 100, 50, 255]);

        let outcome =
            synthesize_tile(temp.path(), 7, 10, 15, TileFormat::Png, Resampling::Bilinear)
                .unwrap();
        assert!(matches!(outcome, Outcome::Existing));

        // The base tile's pixels are untouched.
        let tile =
            writer::read_tile_rgba(&tile_file_path(temp.path(), 7, 10, 15, TileFormat::Png))
                .unwrap();
        assert_eq!(tile.get_pixel(0, 0).0, [9, 9, 9, 255]);
    }

    #[test]
    fn test_synthesize_suppresses_transparent_result() {
        let temp = TempDir::new().unwrap();
        // A child exists but is fully transparent.
        write_child(temp.path(), 8, 20, 30, [0, 0, 0, 0]);

        let outcome =
            synthesize_tile(temp.path(), 7, 10, 15, TileFormat::Png, Resampling::Bilinear)
                .unwrap();
        assert!(matches!(outcome, Outcome::Skipped));
        assert!(!tile_file_path(temp.path(), 7, 10, 15, TileFormat::Png).exists());
    }

    #[test]
    fn test_generate_runs_top_down_to_zoom_min() {
        let temp = TempDir::new().unwrap();
        write_child(temp.path(), 8, 20, 30, [10, 20, 30, 255]);

        let report =
            generate_overview_tiles(temp.path(), 6, 8, TileFormat::Png, Resampling::Nearest);

        // Zoom 7 parent from the zoom-8 child, zoom 6 parent from that.
        assert_eq!(report.generated, 2);
        assert!(tile_file_path(temp.path(), 7, 10, 15, TileFormat::Png).exists());
        assert!(tile_file_path(temp.path(), 6, 5, 7, TileFormat::Png).exists());
    }
}
