//! Aerotiler - aeronautical chart tile pyramid builder
//!
//! This library converts a catalog of aeronautical raster charts (GeoTIFFs
//! packaged in ZIP archives) into seamless XYZ web map tile pyramids in
//! Web Mercator (EPSG:3857).
//!
//! # High-Level Flow
//!
//! ```ignore
//! use aerotiler::catalog::Catalog;
//! use aerotiler::pipeline::{self, PipelineOptions};
//! use aerotiler::tile::{TileEngine, TileEngineOptions};
//!
//! let catalog = Catalog::from_path("aerotiler.conf.json")?;
//!
//! // Reproject every chart referenced by the selected tilesets.
//! pipeline::process_datasets(&catalog, &tilesets, &options);
//!
//! // Mosaic the processed charts into an XYZ tile tree.
//! for tileset in &tilesets {
//!     TileEngine::new(&catalog, tileset, engine_options.clone()).generate()?;
//! }
//! ```

pub mod catalog;
pub mod coord;
pub mod jobqueue;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod raster;
pub mod resample;
pub mod tile;
pub mod vrt;

/// Version of the aerotiler library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
