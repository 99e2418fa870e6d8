//! # dsm2dtm Algorithms
//!
//! Bare-ground extraction from Digital Surface Models.
//!
//! ## Modules
//!
//! - **morphology**: separable grayscale erosion, dilation and opening
//! - **resample**: pixel budget guard, block averaging, bilinear reconciliation
//! - **terrain**: window sizing, nodata-aware ground filter, canopy height
//! - **pipeline**: end-to-end DSM → DTM + CHM runs over files or buffers

pub(crate) mod maybe_rayon;

pub mod morphology;
pub mod pipeline;
pub mod resample;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::morphology::{
        dilate, erode, opening, Dilate, Erode, Opening, StructuringElement,
    };
    pub use crate::pipeline::{
        derive_terrain, load_dsm, process, process_buffer, process_with_options,
        ProcessingParameters, RunMetadata, TerrainModels,
    };
    pub use crate::resample::{block_average, downsample_factor, reconcile};
    pub use crate::terrain::{
        canopy_height, ground_filter, open_surface, restore_nodata, valid_median, window_pixels,
        CanopyHeight, GroundFilter,
    };
    pub use dsm2dtm_core::prelude::*;
}
