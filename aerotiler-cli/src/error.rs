//! CLI error handling
//!
//! Centralizes user-facing error formatting: everything fatal prints one
//! `Error:`-prefixed line to stderr and exits non-zero.

use std::fmt;
use std::process;

use aerotiler::catalog::CatalogError;

/// Fatal CLI errors.
#[derive(Debug)]
pub enum CliError {
    /// Catalog failed to load or validate
    Catalog(CatalogError),
    /// None of the requested tilesets exist
    NoTilesets,
    /// A required directory could not be created
    DirCreate { path: String, error: std::io::Error },
    /// At least one tileset aborted with a fatal error
    TilesetFailures(usize),
}

impl CliError {
    /// Prints the error and exits with a non-zero code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);
        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Catalog(e) => write!(f, "{}", e),
            CliError::NoTilesets => write!(f, "no valid tilesets to process"),
            CliError::DirCreate { path, error } => {
                write!(f, "failed to create directory '{}': {}", path, error)
            }
            CliError::TilesetFailures(count) => {
                write!(f, "{} tileset(s) failed", count)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Catalog(e) => Some(e),
            CliError::DirCreate { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        CliError::Catalog(e)
    }
}
