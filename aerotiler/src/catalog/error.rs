//! Catalog loading errors

use thiserror::Error;

/// Errors raised while loading or validating the catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Config file could not be read
    #[error("failed to read catalog file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Config file is not valid JSON or does not match the schema
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// A mask has no outer ring or an empty one
    #[error("dataset '{0}': mask has no usable outer ring")]
    EmptyMask(String),

    /// GCP count outside the supported 3..=16 range
    #[error("dataset '{dataset}': {count} GCPs given, expected between 3 and 16")]
    GcpCount { dataset: String, count: usize },

    /// Tileset zoom range is inverted
    #[error("tileset '{tileset}': zoom_min {zoom_min} exceeds zoom_max {zoom_max}")]
    ZoomRange {
        tileset: String,
        zoom_min: u8,
        zoom_max: u8,
    },

    /// Zoom level beyond what packed tile addresses support
    #[error("tileset '{tileset}': zoom_max {zoom_max} exceeds the supported maximum of {max}")]
    ZoomTooDeep {
        tileset: String,
        zoom_max: u8,
        max: u8,
    },

    /// Tileset references a dataset the catalog does not define
    #[error("tileset '{tileset}' references unknown dataset '{dataset}'")]
    UnknownDataset { tileset: String, dataset: String },
}
