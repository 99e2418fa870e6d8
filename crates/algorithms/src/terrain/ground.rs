//! Ground surface extraction by grayscale opening
//!
//! Nodata cells would otherwise act as deep pits (a -9999 sentinel) and
//! drag the erosion down around every gap, so they are first replaced by
//! the global median of the valid samples. The opening then runs on a
//! gap-free surface and the original mask is put back afterwards.

use dsm2dtm_core::raster::Raster;
use dsm2dtm_core::{Algorithm, Error, RasterElement, Result};
use tracing::debug;

use crate::morphology::{opening, StructuringElement};

/// Parameters for the ground filter
#[derive(Debug, Clone)]
pub struct GroundFilterParams {
    /// Odd window width in pixels
    pub window_pixels: usize,
}

impl Default for GroundFilterParams {
    fn default() -> Self {
        Self { window_pixels: 3 }
    }
}

/// Nodata-aware morphological ground filter
#[derive(Debug, Clone, Default)]
pub struct GroundFilter;

impl Algorithm for GroundFilter {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = GroundFilterParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "GroundFilter"
    }

    fn description(&self) -> &'static str {
        "Bare-ground surface by median imputation, grayscale opening and nodata restore"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        ground_filter(&input, params.window_pixels)
    }
}

/// Median of every sample that is neither NaN nor the nodata sentinel
///
/// Even counts take the mean of the two middle values.
pub fn valid_median(raster: &Raster<f64>) -> Result<f64> {
    let mut values: Vec<f64> = raster.valid_values().collect();
    let n = values.len();
    if n == 0 {
        return Err(Error::AllNodata);
    }

    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        return Ok(upper);
    }
    let below = lower
        .iter()
        .copied()
        .max_by(f64::total_cmp)
        .unwrap_or(upper);
    Ok((below + upper) / 2.0)
}

/// Copy of `raster` with every nodata/NaN cell set to `value`, plus the number of cells replaced
pub fn fill_nodata(raster: &Raster<f64>, value: f64) -> (Raster<f64>, usize) {
    let mut filled = raster.clone();
    let mut count = 0;
    let nodata = raster.nodata();
    filled.data_mut().mapv_inplace(|v| {
        if v.is_nodata(nodata) {
            count += 1;
            value
        } else {
            v
        }
    });
    (filled, count)
}

/// Impute nodata with the valid median, then open with a square `window_pixels` element
///
/// The result is gap-free; no mask is restored.
pub fn open_surface(raster: &Raster<f64>, window_pixels: usize) -> Result<Raster<f64>> {
    let element = StructuringElement::from_window(window_pixels)?;
    let median = valid_median(raster)?;
    let (filled, imputed) = fill_nodata(raster, median);

    debug!(
        rows = raster.rows(),
        cols = raster.cols(),
        window_pixels,
        median,
        imputed,
        "Opening elevation surface"
    );

    opening(&filled, &element)
}

/// Ground surface with the input's nodata cells restored
pub fn ground_filter(raster: &Raster<f64>, window_pixels: usize) -> Result<Raster<f64>> {
    let mut ground = open_surface(raster, window_pixels)?;
    restore_nodata(&mut ground, raster)?;
    Ok(ground)
}

/// Force every cell that is nodata/NaN in `source` to the source sentinel
///
/// Returns the number of cells masked. Without a sentinel the cells become NaN.
pub fn restore_nodata(output: &mut Raster<f64>, source: &Raster<f64>) -> Result<usize> {
    let (er, ec) = source.shape();
    let (ar, ac) = output.shape();
    if (er, ec) != (ar, ac) {
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    let sentinel = source.nodata().unwrap_or(f64::NAN);
    let mut masked = 0;
    ndarray::Zip::from(output.data_mut())
        .and(source.data())
        .for_each(|out, &src| {
            if source.is_nodata(src) {
                *out = sentinel;
                masked += 1;
            }
        });
    output.set_nodata(source.nodata());
    Ok(masked)
}
