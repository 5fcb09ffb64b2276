//! Phase 1: base tile rendering
//!
//! Workers claim tile indices off a shared atomic counter and render each
//! tile by windowed reads from the zoom VRT. The processed rasters carry
//! embedded overviews, so the library's overview selection keeps low-zoom
//! reads cheap; the engine never reads a full-resolution raster to build a
//! coarse tile.
//!
//! Each worker holds its own VRT handles, one per zoom level it has
//! encountered, opened lazily and dropped at worker exit.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use gdal::Dataset;
use tracing::{error, info};

use crate::coord::{self, MercatorBounds, TileCoord, TILE_SIZE};
use crate::raster::extent_of;
use crate::resample::Resampling;

use super::error::{TileError, TileRenderError};
use super::writer;
use super::{tile_file_path, PhaseReport, TileFormat};

/// What happened to one tile.
enum TileOutcome {
    Generated,
    Skipped,
    Existing,
}

/// Renders all base tiles with up to `workers` threads stealing work off a
/// shared counter.
pub(crate) fn generate_base_tiles(
    tiles: &[TileCoord],
    vrt_paths: &HashMap<u8, PathBuf>,
    tile_root: &Path,
    format: TileFormat,
    resampling: Resampling,
    workers: usize,
) -> Result<PhaseReport, TileError> {
    let worker_count = workers.min(tiles.len()).max(1);
    let next_tile = AtomicU32::new(0);

    let results: Vec<Result<PhaseReport, TileError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..worker_count)
            .map(|worker_id| {
                let next_tile = &next_tile;
                scope.spawn(move || {
                    worker_loop(
                        worker_id, tiles, next_tile, vrt_paths, tile_root, format, resampling,
                    )
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(TileError::WorkerFailed("worker panicked".to_string()))
                })
            })
            .collect()
    });

    let mut report = PhaseReport::default();
    let mut first_error = None;
    for result in results {
        match result {
            Ok(worker_report) => report.absorb(worker_report),
            Err(err) => {
                error!("tile worker failed: {}", err);
                first_error.get_or_insert(err);
            }
        }
    }

    // Surviving workers drained the counter, so the report is complete even
    // when a worker died; the tileset still counts as failed.
    match first_error {
        Some(err) => Err(err),
        None => Ok(report),
    }
}

fn worker_loop(
    worker_id: usize,
    tiles: &[TileCoord],
    next_tile: &AtomicU32,
    vrt_paths: &HashMap<u8, PathBuf>,
    tile_root: &Path,
    format: TileFormat,
    resampling: Resampling,
) -> Result<PhaseReport, TileError> {
    let mut handles: HashMap<u8, Dataset> = HashMap::new();
    let mut report = PhaseReport::default();

    loop {
        let index = next_tile.fetch_add(1, Ordering::AcqRel) as usize;
        if index >= tiles.len() {
            break;
        }
        let tile = tiles[index];

        let ds = match handles.entry(tile.z) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = vrt_paths
                    .get(&tile.z)
                    .ok_or(TileError::VrtMissing(tile.z))?;
                let ds = Dataset::open(path).map_err(|source| TileError::VrtOpen {
                    path: path.display().to_string(),
                    source,
                })?;
                entry.insert(ds)
            }
        };

        match render_base_tile(ds, tile, tile_root, format, resampling)? {
            Ok(TileOutcome::Generated) => report.generated += 1,
            Ok(TileOutcome::Skipped) => report.skipped += 1,
            Ok(TileOutcome::Existing) => report.existing += 1,
            Err(err) => {
                error!("tile {} failed: {}", tile, err);
                report.failed += 1;
            }
        }
    }

    info!(
        "    worker {}: {} generated, {} skipped, {} existing, {} failed",
        worker_id, report.generated, report.skipped, report.existing, report.failed
    );
    Ok(report)
}

/// Renders one tile. The outer `Result` carries worker-fatal errors
/// (directory creation); the inner one carries per-tile errors the caller
/// logs and counts.
fn render_base_tile(
    ds: &Dataset,
    tile: TileCoord,
    tile_root: &Path,
    format: TileFormat,
    resampling: Resampling,
) -> Result<Result<TileOutcome, TileRenderError>, TileError> {
    let path = tile_file_path(tile_root, tile.z, tile.x, tile.y, format);
    if path.exists() {
        return Ok(Ok(TileOutcome::Existing));
    }

    let bounds = coord::tile_bounds(tile.z, tile.x, tile.y);

    let gt = match ds.geo_transform() {
        Ok(gt) => gt,
        Err(err) => return Ok(Err(err.into())),
    };
    let (ds_width, ds_height) = ds.raster_size();
    let extent = extent_of(&gt, ds_width, ds_height);

    if !bounds.intersects(&extent) {
        return Ok(Ok(TileOutcome::Skipped));
    }

    // Tile bounds in source pixels, clamped to the dataset.
    let src_x0 = ((bounds.min_x - gt[0]) / gt[1]).max(0.0);
    let src_y0 = ((bounds.max_y - gt[3]) / gt[5]).max(0.0);
    let src_x1 = ((bounds.max_x - gt[0]) / gt[1]).min(ds_width as f64);
    let src_y1 = ((bounds.min_y - gt[3]) / gt[5]).min(ds_height as f64);

    let read_x = src_x0 as isize;
    let read_y = src_y0 as isize;
    let read_w = (src_x1 - src_x0 + 0.5) as usize;
    let read_h = (src_y1 - src_y0 + 0.5) as usize;
    if read_w == 0 || read_h == 0 {
        return Ok(Ok(TileOutcome::Skipped));
    }

    let subrect = match dest_subrect(&bounds, &extent) {
        Some(subrect) => subrect,
        None => return Ok(Ok(TileOutcome::Skipped)),
    };
    let (tile_x0, tile_y0, tile_w, tile_h) = subrect;

    let band_count = ds.raster_count();
    let mut rgba = vec![0u8; TILE_SIZE * TILE_SIZE * 4];

    for band_slot in 0..4usize {
        let source_band: isize = if band_slot < 3 {
            band_slot as isize + 1
        } else if band_count >= 4 {
            4
        } else {
            0
        };

        if source_band > 0 {
            let band = match ds.rasterband(source_band) {
                Ok(band) => band,
                Err(err) => return Ok(Err(err.into())),
            };
            let buffer = match band.read_as::<u8>(
                (read_x, read_y),
                (read_w, read_h),
                (tile_w, tile_h),
                Some(resampling.rio_alg()),
            ) {
                Ok(buffer) => buffer,
                Err(err) => return Ok(Err(err.into())),
            };
            blit_band(&mut rgba, band_slot, &buffer.data, tile_x0, tile_y0, tile_w, tile_h);
        } else {
            // RGB-only source: data present in the sub-rectangle is opaque.
            fill_opaque_alpha(&mut rgba, tile_x0, tile_y0, tile_w, tile_h);
        }
    }

    if is_fully_transparent(&rgba) {
        return Ok(Ok(TileOutcome::Skipped));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| TileError::DirCreate {
            path: parent.display().to_string(),
            source,
        })?;
    }

    match writer::write_tile(&path, rgba, TILE_SIZE as u32, format) {
        Ok(()) => Ok(Ok(TileOutcome::Generated)),
        Err(err) => Ok(Err(err)),
    }
}

/// Destination sub-rectangle `(x0, y0, width, height)` within the 256x256
/// tile for a dataset that only partially covers the tile. `None` when the
/// coverage rounds down to nothing.
fn dest_subrect(
    tile: &MercatorBounds,
    dataset: &MercatorBounds,
) -> Option<(usize, usize, usize, usize)> {
    let size = TILE_SIZE as f64;
    let span_x = tile.max_x - tile.min_x;
    let span_y = tile.max_y - tile.min_y;

    let mut x0 = 0i64;
    let mut y0 = 0i64;
    let mut w = TILE_SIZE as i64;
    let mut h = TILE_SIZE as i64;

    if tile.min_x < dataset.min_x {
        x0 = ((dataset.min_x - tile.min_x) / span_x * size) as i64;
        w = TILE_SIZE as i64 - x0;
    }
    if tile.max_x > dataset.max_x {
        w = ((dataset.max_x - tile.min_x) / span_x * size) as i64 - x0;
    }
    if tile.max_y > dataset.max_y {
        y0 = ((tile.max_y - dataset.max_y) / span_y * size) as i64;
        h = TILE_SIZE as i64 - y0;
    }
    if tile.min_y < dataset.min_y {
        h = ((tile.max_y - dataset.min_y) / span_y * size) as i64 - y0;
    }

    if w <= 0 || h <= 0 {
        return None;
    }
    Some((x0 as usize, y0 as usize, w as usize, h as usize))
}

/// Copies one band plane into the interleaved RGBA buffer at the
/// sub-rectangle.
fn blit_band(
    rgba: &mut [u8],
    band_slot: usize,
    data: &[u8],
    x0: usize,
    y0: usize,
    w: usize,
    h: usize,
) {
    for row in 0..h {
        for col in 0..w {
            let tile_index = ((y0 + row) * TILE_SIZE + (x0 + col)) * 4 + band_slot;
            rgba[tile_index] = data[row * w + col];
        }
    }
}

/// Sets alpha to 255 over the sub-rectangle.
fn fill_opaque_alpha(rgba: &mut [u8], x0: usize, y0: usize, w: usize, h: usize) {
    for row in 0..h {
        for col in 0..w {
            rgba[((y0 + row) * TILE_SIZE + (x0 + col)) * 4 + 3] = 255;
        }
    }
}

/// True when every alpha byte is zero: the tile must not be materialized.
fn is_fully_transparent(rgba: &[u8]) -> bool {
    rgba.iter().skip(3).step_by(4).all(|&alpha| alpha == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MercatorBounds {
        MercatorBounds {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[test]
    fn test_dest_subrect_full_coverage() {
        let tile = bounds(0.0, 0.0, 256.0, 256.0);
        let dataset = bounds(-1000.0, -1000.0, 1000.0, 1000.0);
        assert_eq!(dest_subrect(&tile, &dataset), Some((0, 0, 256, 256)));
    }

    #[test]
    fn test_dest_subrect_dataset_starts_mid_tile() {
        // Dataset covers the right half of the tile: data lands in the
        // right half of the buffer.
        let tile = bounds(0.0, 0.0, 256.0, 256.0);
        let dataset = bounds(128.0, -1000.0, 1000.0, 1000.0);
        assert_eq!(dest_subrect(&tile, &dataset), Some((128, 0, 128, 256)));
    }

    #[test]
    fn test_dest_subrect_dataset_ends_mid_tile() {
        let tile = bounds(0.0, 0.0, 256.0, 256.0);
        let dataset = bounds(-1000.0, -1000.0, 64.0, 1000.0);
        assert_eq!(dest_subrect(&tile, &dataset), Some((0, 0, 64, 256)));
    }

    #[test]
    fn test_dest_subrect_dataset_covers_bottom() {
        // Dataset top edge cuts through the tile: data starts lower in the
        // buffer (y grows downward in the tile, upward in meters).
        let tile = bounds(0.0, 0.0, 256.0, 256.0);
        let dataset = bounds(-1000.0, -1000.0, 1000.0, 192.0);
        assert_eq!(dest_subrect(&tile, &dataset), Some((0, 64, 256, 192)));
    }

    #[test]
    fn test_dest_subrect_corner_quadrant() {
        let tile = bounds(0.0, 0.0, 256.0, 256.0);
        let dataset = bounds(128.0, 128.0, 1000.0, 1000.0);
        // Right half horizontally; meters-above-128 is the upper half, i.e.
        // tile rows 0..128.
        assert_eq!(dest_subrect(&tile, &dataset), Some((128, 0, 128, 128)));
    }

    #[test]
    fn test_dest_subrect_no_overlap_is_none() {
        let tile = bounds(0.0, 0.0, 256.0, 256.0);
        let dataset = bounds(300.0, 300.0, 400.0, 400.0);
        assert_eq!(dest_subrect(&tile, &dataset), None);
    }

    #[test]
    fn test_blit_band_places_plane_in_subrect() {
        let mut rgba = vec![0u8; TILE_SIZE * TILE_SIZE * 4];
        let plane = vec![7u8; 4]; // 2x2
        blit_band(&mut rgba, 1, &plane, 10, 20, 2, 2);

        assert_eq!(rgba[(20 * TILE_SIZE + 10) * 4 + 1], 7);
        assert_eq!(rgba[(21 * TILE_SIZE + 11) * 4 + 1], 7);
        // Outside the subrect and on other bands: untouched.
        assert_eq!(rgba[(20 * TILE_SIZE + 10) * 4], 0);
        assert_eq!(rgba[(22 * TILE_SIZE + 10) * 4 + 1], 0);
    }

    #[test]
    fn test_fill_opaque_alpha_only_subrect() {
        let mut rgba = vec![0u8; TILE_SIZE * TILE_SIZE * 4];
        fill_opaque_alpha(&mut rgba, 0, 0, 8, 8);

        assert_eq!(rgba[3], 255);
        assert_eq!(rgba[(7 * TILE_SIZE + 7) * 4 + 3], 255);
        assert_eq!(rgba[(8 * TILE_SIZE + 8) * 4 + 3], 0);
    }

    #[test]
    fn test_fully_transparent_detection() {
        let mut rgba = vec![0u8; TILE_SIZE * TILE_SIZE * 4];
        // Color without alpha still counts as transparent.
        rgba[0] = 255;
        rgba[1] = 128;
        assert!(is_fully_transparent(&rgba));

        rgba[3] = 1;
        assert!(!is_fully_transparent(&rgba));
    }
}
