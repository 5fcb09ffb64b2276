//! Tile manifest
//!
//! Enumerates, per zoom level, exactly the tiles any contributing dataset
//! covers. Coverage comes from each processed raster's extent on disk, and
//! a dataset only contributes up to its max LOD (clamped to the tileset's
//! zoom range). Tiles are stored packed and sorted per zoom; membership is
//! a binary search.

use std::path::Path;

use tracing::{debug, warn};

use crate::catalog::{Catalog, Tileset};
use crate::coord::{
    self, pack_tile, unpack_tile, PackedTile, TileCoord, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON,
};
use crate::raster;

/// The set of tiles to produce for one tileset.
#[derive(Debug)]
pub struct TileManifest {
    zoom_min: u8,
    zoom_max: u8,
    /// Sorted, de-duplicated packed tiles per zoom, indexed by
    /// `zoom - zoom_min`.
    zooms: Vec<Vec<PackedTile>>,
}

impl TileManifest {
    /// Builds the manifest for a tileset from the processed rasters under
    /// `tmppath`. Datasets whose raster is missing or unreadable
    /// contribute nothing.
    pub fn build(catalog: &Catalog, tileset: &Tileset, tmppath: &Path) -> TileManifest {
        let mut manifest = TileManifest::empty(tileset.zoom_min, tileset.zoom_max);

        for dataset in catalog.tileset_datasets(tileset) {
            let raster_path = tmppath.join(&dataset.tmp_file);
            let bounds = match raster_bounds(&raster_path) {
                Some(bounds) => bounds,
                None => {
                    warn!(
                        "manifest: skipping '{}' (no readable raster at {})",
                        dataset.name,
                        raster_path.display()
                    );
                    continue;
                }
            };

            let (lon_min, lat_min, lon_max, lat_max) = bounds;
            let ds_max_zoom = dataset
                .max_lod
                .clamp(tileset.zoom_min, tileset.zoom_max);

            for zoom in tileset.zoom_min..=ds_max_zoom {
                manifest.add_bounds(zoom, lon_min, lat_min, lon_max, lat_max);
            }
        }

        manifest.finalize();
        debug!(
            tileset = tileset.name,
            tiles = manifest.total_tiles(),
            "built tile manifest"
        );
        manifest
    }

    /// An empty manifest covering the given zoom range.
    pub fn empty(zoom_min: u8, zoom_max: u8) -> TileManifest {
        let levels = (zoom_max - zoom_min) as usize + 1;
        TileManifest {
            zoom_min,
            zoom_max,
            zooms: vec![Vec::new(); levels],
        }
    }

    /// Adds every tile covering a geographic bbox at one zoom level.
    /// Handles antimeridian crossing by splitting into two queries.
    pub fn add_bounds(&mut self, zoom: u8, lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64) {
        let lon_min = lon_min.max(MIN_LON);
        let lon_max = lon_max.min(MAX_LON);
        let lat_min = lat_min.max(MIN_LAT);
        let lat_max = lat_max.min(MAX_LAT);

        if lon_min > lon_max {
            self.add_bounds(zoom, lon_min, lat_min, MAX_LON, lat_max);
            self.add_bounds(zoom, MIN_LON, lat_min, lon_max, lat_max);
            return;
        }

        let (x_min, y_max) = coord::tile_at(lon_min, lat_min, zoom);
        let (x_max, y_min) = coord::tile_at(lon_max, lat_max, zoom);

        let level = &mut self.zooms[(zoom - self.zoom_min) as usize];
        for x in x_min..=x_max {
            for y in y_min..=y_max {
                level.push(pack_tile(x, y));
            }
        }
    }

    /// Sorts and de-duplicates every zoom level. Must run before
    /// [`TileManifest::contains`] is used.
    pub fn finalize(&mut self) {
        for level in &mut self.zooms {
            level.sort_unstable();
            level.dedup();
        }
    }

    /// Whether the manifest calls for tile `(z, x, y)`.
    pub fn contains(&self, z: u8, x: u32, y: u32) -> bool {
        if z < self.zoom_min || z > self.zoom_max {
            return false;
        }
        self.zooms[(z - self.zoom_min) as usize]
            .binary_search(&pack_tile(x, y))
            .is_ok()
    }

    /// Total tile count across all zoom levels.
    pub fn total_tiles(&self) -> usize {
        self.zooms.iter().map(Vec::len).sum()
    }

    /// Zoom range covered by the manifest.
    pub fn zoom_range(&self) -> (u8, u8) {
        (self.zoom_min, self.zoom_max)
    }

    /// Packed tiles at one zoom, sorted ascending.
    pub fn tiles_at(&self, zoom: u8) -> &[PackedTile] {
        &self.zooms[(zoom - self.zoom_min) as usize]
    }

    /// All tiles flattened to `(z, x, y)` triples, zoom ascending and
    /// packed order within a zoom.
    pub fn flatten(&self) -> Vec<TileCoord> {
        let mut tiles = Vec::with_capacity(self.total_tiles());
        for (offset, level) in self.zooms.iter().enumerate() {
            let z = self.zoom_min + offset as u8;
            for &packed in level {
                let (x, y) = unpack_tile(packed);
                tiles.push(TileCoord { z, x, y });
            }
        }
        tiles
    }
}

/// Geographic (lon/lat) bounds of a processed raster, or `None` when the
/// file is missing or unreadable.
fn raster_bounds(path: &Path) -> Option<(f64, f64, f64, f64)> {
    if !path.exists() {
        return None;
    }
    let ds = gdal::Dataset::open(path).ok()?;
    let extent = raster::dataset_extent(&ds).ok()?;

    let (lon_min, lat_min) = coord::mercator_to_geographic(extent.min_x, extent.min_y);
    let (lon_max, lat_max) = coord::mercator_to_geographic(extent.max_x, extent.max_y);
    Some((lon_min, lat_min, lon_max, lat_max))
}
