//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;

pub use element::RasterElement;
pub use geotransform::{Bounds, GeoTransform};
pub use grid::{Raster, RasterStatistics};

/// Nodata sentinel used when a source raster declares none.
pub const DEFAULT_NODATA: f64 = -9999.0;
