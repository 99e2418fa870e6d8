//! # dsm2dtm Core
//!
//! Core types, traits and I/O for the dsm2dtm terrain extraction workspace.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform` and `Bounds`: Affine georeferencing and extents
//! - `CRS`: Coordinate Reference System handling, lon/lat bounds projection
//! - Algorithm trait for a consistent API
//! - Native GeoTIFF reading and writing

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{Bounds, GeoTransform, Raster, RasterElement, DEFAULT_NODATA};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{Bounds, GeoTransform, Raster, RasterElement, DEFAULT_NODATA};
    pub use crate::Algorithm;
}

/// A named raster operation with a parameter struct.
///
/// Implemented by the morphology filters and the ground filter so callers can
/// drive them generically, e.g. from a list of pipeline stages.
pub trait Algorithm {
    type Input;
    type Output;
    /// Parameters, with defaults matching the free-function entry point
    type Params: Default;
    type Error: std::error::Error;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// One-line summary
    fn description(&self) -> &'static str;

    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Run with `Params::default()`
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
