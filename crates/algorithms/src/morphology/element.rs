//! Structuring element for morphological operations
//!
//! Ground filtering only needs the flat square element: every cell of a
//! `side x side` block centred on the pixel takes part.

use dsm2dtm_core::{Error, Result};

/// Flat square structuring element of odd side `2 * radius + 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    radius: usize,
}

impl Default for StructuringElement {
    fn default() -> Self {
        Self::square(1)
    }
}

impl StructuringElement {
    /// Square element of given radius (side = 2*radius + 1).
    ///
    /// Radius 0 is the 1x1 identity element.
    pub fn square(radius: usize) -> Self {
        Self { radius }
    }

    /// Square element from a window width in pixels, which must be odd
    pub fn from_window(window_pixels: usize) -> Result<Self> {
        if window_pixels % 2 == 0 {
            return Err(Error::invalid_parameter(
                "window_pixels",
                window_pixels,
                "window width must be odd and at least 1",
            ));
        }
        Ok(Self::square(window_pixels / 2))
    }

    /// Half-width of the element
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Full width of the element in pixels
    pub fn side(&self) -> usize {
        2 * self.radius + 1
    }

    /// Whether the element only covers the centre pixel
    pub fn is_identity(&self) -> bool {
        self.radius == 0
    }
}
