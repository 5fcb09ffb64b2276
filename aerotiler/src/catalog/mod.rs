//! Chart catalog
//!
//! Loads the JSON catalog describing datasets (chart definitions) and
//! tilesets (mosaic groupings) and provides lookup by name. The catalog is
//! loaded once at startup and read-only afterwards.
//!
//! # Schema
//!
//! ```json
//! {
//!   "datasets": {
//!     "Seattle SEC": {
//!       "zip_file": "Seattle",
//!       "input_file": "Seattle SEC.tif",
//!       "mask": [[[1000, 500], [7000, 500], [7000, 5500], [1000, 5500]]],
//!       "geobound": [null, 44.0, null, null],
//!       "gcps": [[100, 200, -124.5, 49.0], ...],
//!       "max_lod": 11
//!     }
//!   },
//!   "tilesets": {
//!     "VFR Sectional Charts": {
//!       "tile_path": "sec",
//!       "zoom": [5, 11],
//!       "datasets": ["Seattle SEC", ...]
//!     }
//!   }
//! }
//! ```
//!
//! `input_file` defaults to `{name}.tif`; the temp filename is always
//! derived as `_{name}.tif`.

mod error;
mod types;

pub use error::CatalogError;
pub use types::{ControlPoint, Dataset, GeoBounds, Mask, Tileset};

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

/// Maximum GCPs accepted per dataset.
pub const MAX_GCPS: usize = 16;

/// Minimum GCPs needed for an affine fit.
pub const MIN_GCPS: usize = 3;

/// Deepest supported zoom level. Tile x/y must fit in 16 bits each for the
/// manifest's packed representation.
pub const MAX_ZOOM: u8 = 15;

#[derive(Deserialize)]
struct RawCatalog {
    datasets: BTreeMap<String, RawDataset>,
    tilesets: BTreeMap<String, RawTileset>,
}

#[derive(Deserialize)]
struct RawDataset {
    zip_file: String,
    input_file: Option<String>,
    mask: Option<Vec<Vec<[f64; 2]>>>,
    geobound: Option<[Option<f64>; 4]>,
    gcps: Option<Vec<[f64; 4]>>,
    max_lod: u8,
}

#[derive(Deserialize)]
struct RawTileset {
    tile_path: String,
    zoom: [u8; 2],
    datasets: Vec<String>,
}

/// The loaded catalog: all dataset and tileset definitions for a run.
#[derive(Debug)]
pub struct Catalog {
    datasets: BTreeMap<String, Dataset>,
    tilesets: BTreeMap<String, Tileset>,
}

impl Catalog {
    /// Loads and validates a catalog from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses and validates a catalog from a JSON string.
    pub fn from_json(text: &str) -> Result<Catalog, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(text)?;

        let mut datasets = BTreeMap::new();
        for (name, raw_ds) in raw.datasets {
            let dataset = convert_dataset(&name, raw_ds)?;
            datasets.insert(name, dataset);
        }

        let mut tilesets = BTreeMap::new();
        for (name, raw_ts) in raw.tilesets {
            let [zoom_min, zoom_max] = raw_ts.zoom;
            if zoom_min > zoom_max {
                return Err(CatalogError::ZoomRange {
                    tileset: name,
                    zoom_min,
                    zoom_max,
                });
            }
            if zoom_max > MAX_ZOOM {
                return Err(CatalogError::ZoomTooDeep {
                    tileset: name,
                    zoom_max,
                    max: MAX_ZOOM,
                });
            }
            for ds_name in &raw_ts.datasets {
                if !datasets.contains_key(ds_name) {
                    return Err(CatalogError::UnknownDataset {
                        tileset: name,
                        dataset: ds_name.clone(),
                    });
                }
            }
            tilesets.insert(
                name.clone(),
                Tileset {
                    name,
                    tile_path: raw_ts.tile_path,
                    zoom_min,
                    zoom_max,
                    datasets: raw_ts.datasets,
                },
            );
        }

        Ok(Catalog { datasets, tilesets })
    }

    /// Looks up a dataset definition by name.
    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    /// Looks up a tileset definition by name.
    pub fn tileset(&self, name: &str) -> Option<&Tileset> {
        self.tilesets.get(name)
    }

    /// All tileset names in sorted order.
    pub fn tileset_names(&self) -> Vec<&str> {
        self.tilesets.keys().map(String::as_str).collect()
    }

    /// Resolved dataset definitions for a tileset, in tileset order.
    /// References were validated at load, so every name resolves.
    pub fn tileset_datasets<'a>(
        &'a self,
        tileset: &'a Tileset,
    ) -> impl Iterator<Item = &'a Dataset> + 'a {
        tileset
            .datasets
            .iter()
            .filter_map(move |name| self.datasets.get(name))
    }
}

fn convert_dataset(name: &str, raw: RawDataset) -> Result<Dataset, CatalogError> {
    let mask = match raw.mask {
        Some(rings) => {
            if rings.is_empty() || rings[0].is_empty() {
                return Err(CatalogError::EmptyMask(name.to_string()));
            }
            Some(Mask { rings })
        }
        None => None,
    };

    let gcps: Vec<ControlPoint> = raw
        .gcps
        .unwrap_or_default()
        .into_iter()
        .map(|[pixel_x, pixel_y, lon, lat]| ControlPoint {
            pixel_x,
            pixel_y,
            lon,
            lat,
        })
        .collect();
    if !gcps.is_empty() && !(MIN_GCPS..=MAX_GCPS).contains(&gcps.len()) {
        return Err(CatalogError::GcpCount {
            dataset: name.to_string(),
            count: gcps.len(),
        });
    }

    let geobound = raw.geobound.map(|[lon_min, lat_min, lon_max, lat_max]| GeoBounds {
        lon_min,
        lat_min,
        lon_max,
        lat_max,
    });

    Ok(Dataset {
        name: name.to_string(),
        input_file: raw
            .input_file
            .unwrap_or_else(|| format!("{}.tif", name)),
        tmp_file: format!("_{}.tif", name),
        zip_file: raw.zip_file,
        mask,
        geobound,
        gcps,
        max_lod: raw.max_lod,
    })
}
