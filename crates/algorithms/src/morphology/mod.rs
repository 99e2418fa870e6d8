//! Grayscale mathematical morphology with flat square elements
//!
//! - **Erosion**: minimum filter (shrinks bright regions)
//! - **Dilation**: maximum filter (expands bright regions)
//! - **Opening**: erosion then dilation (removes small bright features)
//!
//! Both filters are separable and run in time independent of the window
//! width; edge windows are truncated to the grid.

mod dilate;
mod element;
mod erode;
mod extrema;
mod opening;

pub use dilate::{dilate, Dilate, DilateParams};
pub use element::StructuringElement;
pub use erode::{erode, Erode, ErodeParams};
pub use opening::{opening, Opening, OpeningParams};
