//! Terrain model derivation from elevation surfaces
//!
//! - Window: metric search radius to an odd pixel window
//! - Ground: median imputation, grayscale opening and nodata restore (DTM)
//! - CHM: surface minus ground with nodata masking

mod chm;
mod ground;
mod window;

pub use chm::{canopy_height, CanopyHeight};
pub use ground::{
    fill_nodata, ground_filter, open_surface, restore_nodata, valid_median, GroundFilter,
    GroundFilterParams,
};
pub use window::{window_pixels, WindowSpec};
