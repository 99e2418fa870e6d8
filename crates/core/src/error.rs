//! Error types for dsm2dtm

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dsm2dtm operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The destination raster could not be created or written.
    #[error("Cannot write raster to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input is missing, corrupt, or not a single-band raster.
    #[error("Unreadable raster {location}: {reason}")]
    UnreadableRaster { location: String, reason: String },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    /// Two grids cannot be related through their transforms or CRSs.
    #[error("Geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// Every cell is nodata, so there is no valid median to impute with.
    #[error("Raster contains no valid cells: every sample is nodata")]
    AllNodata,

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidParameter`] built from any displayable value.
    pub fn invalid_parameter(
        name: &'static str,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`Error::UnreadableRaster`].
    pub fn unreadable(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::UnreadableRaster {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for dsm2dtm operations
pub type Result<T> = std::result::Result<T, Error>;
