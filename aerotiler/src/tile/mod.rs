//! Two-phase tile engine
//!
//! Phase 1 renders base tiles from the zoom VRTs: the manifest enumerates
//! every `(z, x, y)` worth producing, and a pool of workers claims tiles
//! off a shared atomic counter. Phase 2 then synthesizes the remaining
//! lower-zoom tiles bottom-up from the children written at zoom+1; it runs
//! sequentially because each zoom depends on the one below.
//!
//! Tiles that already exist on disk are never rewritten. That is what
//! makes re-runs cheap, and it is also load-bearing for correctness: a
//! base tile written in Phase 1 at some intermediate zoom must not be
//! replaced by a downsampled Phase 2 composite.

mod base;
mod error;
mod overview;
mod writer;

pub use error::{TileError, TileRenderError};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::catalog::{Catalog, Tileset};
use crate::manifest::TileManifest;
use crate::resample::Resampling;
use crate::vrt;

/// Output encodings for tile files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    Png,
    Jpeg,
    Webp,
}

impl TileFormat {
    /// Parses a format name as given on the command line.
    pub fn from_name(name: &str) -> Option<TileFormat> {
        match name {
            "png" => Some(TileFormat::Png),
            "jpeg" => Some(TileFormat::Jpeg),
            "webp" => Some(TileFormat::Webp),
            _ => None,
        }
    }

    /// File extension (without dot).
    pub fn ext(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpeg => "jpeg",
            TileFormat::Webp => "webp",
        }
    }
}

/// Path of one tile file under the tileset's output root:
/// `{root}/{z}/{x}/{y}.{ext}`.
pub fn tile_file_path(root: &Path, z: u8, x: u32, y: u32, format: TileFormat) -> PathBuf {
    root.join(z.to_string())
        .join(x.to_string())
        .join(format!("{}.{}", y, format.ext()))
}

/// Per-phase tile counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseReport {
    /// Tiles written.
    pub generated: usize,
    /// Tiles skipped (empty alpha, no coverage, or no children).
    pub skipped: usize,
    /// Tiles that already existed on disk.
    pub existing: usize,
    /// Tiles that errored (logged and skipped).
    pub failed: usize,
}

impl PhaseReport {
    pub(crate) fn absorb(&mut self, other: PhaseReport) {
        self.generated += other.generated;
        self.skipped += other.skipped;
        self.existing += other.existing;
        self.failed += other.failed;
    }
}

/// Full per-tileset result.
#[derive(Debug, Clone, Copy, Default)]
pub struct TilesetReport {
    pub base: PhaseReport,
    pub overview: PhaseReport,
}

/// Engine settings shared across tilesets.
#[derive(Debug, Clone)]
pub struct TileEngineOptions {
    /// Directory holding processed rasters and zoom VRTs.
    pub tmppath: PathBuf,
    /// Tile output root; the tileset's `tile_path` is appended.
    pub outpath: PathBuf,
    pub format: TileFormat,
    pub resampling: Resampling,
    /// Phase-1 worker threads (capped at the tile count).
    pub workers: usize,
}

/// Generates all tiles for one tileset.
pub struct TileEngine<'a> {
    catalog: &'a Catalog,
    tileset: &'a Tileset,
    options: TileEngineOptions,
}

impl<'a> TileEngine<'a> {
    pub fn new(catalog: &'a Catalog, tileset: &'a Tileset, options: TileEngineOptions) -> Self {
        TileEngine {
            catalog,
            tileset,
            options,
        }
    }

    /// Runs both phases for the tileset.
    pub fn generate(&self) -> Result<TilesetReport, TileError> {
        info!("=== tiles: {} ===", self.tileset.name);

        let manifest = TileManifest::build(self.catalog, self.tileset, &self.options.tmppath);
        let tiles = manifest.flatten();
        if tiles.is_empty() {
            info!("  no processed rasters contribute tiles; nothing to do");
            return Ok(TilesetReport::default());
        }

        // One VRT per zoom level that has manifest entries. A zoom can
        // lose its VRT if every qualifying raster vanished since the
        // manifest was built; workers treat that as fatal.
        let mut vrt_paths: HashMap<u8, PathBuf> = HashMap::new();
        for zoom in self.tileset.zoom_min..=self.tileset.zoom_max {
            if manifest.tiles_at(zoom).is_empty() {
                continue;
            }
            if let Some(path) =
                vrt::build_zoom_vrt(self.catalog, self.tileset, zoom, &self.options.tmppath)?
            {
                vrt_paths.insert(zoom, path);
            }
        }

        let tile_root = self.options.outpath.join(&self.tileset.tile_path);

        info!(
            "  phase 1: {} base tiles, zoom {}..{}",
            tiles.len(),
            self.tileset.zoom_min,
            self.tileset.zoom_max
        );
        let base = base::generate_base_tiles(
            &tiles,
            &vrt_paths,
            &tile_root,
            self.options.format,
            self.options.resampling,
            self.options.workers,
        )?;
        info!(
            "    {} generated, {} skipped, {} existing, {} failed",
            base.generated, base.skipped, base.existing, base.failed
        );

        let overview = if self.tileset.zoom_max > self.tileset.zoom_min {
            info!(
                "  phase 2: overview tiles, zoom {}..{}",
                self.tileset.zoom_max - 1,
                self.tileset.zoom_min
            );
            overview::generate_overview_tiles(
                &tile_root,
                self.tileset.zoom_min,
                self.tileset.zoom_max,
                self.options.format,
                self.options.resampling,
            )
        } else {
            PhaseReport::default()
        };

        Ok(TilesetReport { base, overview })
    }
}
