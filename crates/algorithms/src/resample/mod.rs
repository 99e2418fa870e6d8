//! Resampling between the source grid and a coarser processing grid
//!
//! - **downsample**: pixel budget check and block averaging by an integer factor
//! - **bilinear**: bilinear reprojection of a coarse grid onto a finer one

mod bilinear;
mod downsample;

pub use bilinear::reconcile;
pub use downsample::{block_average, downsample_factor};
