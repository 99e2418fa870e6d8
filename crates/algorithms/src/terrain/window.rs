//! Metric search radius to an odd pixel window

use dsm2dtm_core::{Error, Result};
use serde::Serialize;

/// Window width in pixels covering at least `radius_m` metres
///
/// `ceil(radius_m / resolution)`, bumped to the next odd number so the
/// element has a centre pixel. A radius below one pixel gives 1.
pub fn window_pixels(radius_m: f64, resolution: f64) -> Result<usize> {
    if !(radius_m.is_finite() && radius_m > 0.0) {
        return Err(Error::invalid_parameter(
            "search_radius_meters",
            radius_m,
            "must be a finite value greater than zero",
        ));
    }
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(Error::invalid_parameter(
            "resolution",
            resolution,
            "must be a finite value greater than zero",
        ));
    }

    let pixels = ((radius_m / resolution).ceil() as usize).max(1);
    Ok(if pixels % 2 == 0 { pixels + 1 } else { pixels })
}

/// Window derived from a metric radius at a given resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSpec {
    /// Odd window width in pixels
    pub pixels: usize,
    /// Requested search radius in metres
    pub meters: f64,
    /// Resolution the window was sized for
    pub resolution: f64,
}

impl WindowSpec {
    pub fn new(radius_m: f64, resolution: f64) -> Result<Self> {
        Ok(Self {
            pixels: window_pixels(radius_m, resolution)?,
            meters: radius_m,
            resolution,
        })
    }
}
