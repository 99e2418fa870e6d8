//! Pixel budget guard and block-average downsampling
//!
//! A grid larger than the budget is reduced by an integer factor so that the
//! morphological pass works on at most about `max_pixels` cells.

use crate::maybe_rayon::*;
use dsm2dtm_core::raster::Raster;
use dsm2dtm_core::{Error, Result};
use ndarray::Array2;

/// Integer downsampling factor that brings `rows * cols` within `max_pixels`
///
/// Returns 1 when the grid already fits, otherwise
/// `ceil(sqrt(rows * cols / max_pixels))`, which is at least 2.
pub fn downsample_factor(rows: usize, cols: usize, max_pixels: usize) -> Result<usize> {
    if max_pixels == 0 {
        return Err(Error::invalid_parameter(
            "max_pixels",
            max_pixels,
            "pixel budget must be greater than zero",
        ));
    }

    let total = rows * cols;
    if total <= max_pixels {
        return Ok(1);
    }

    let mut factor = ((total as f64 / max_pixels as f64).sqrt().ceil() as usize).max(2);
    // Guard against the float ratio landing just below an exact square
    while factor * factor * max_pixels < total {
        factor += 1;
    }

    if rows / factor == 0 || cols / factor == 0 {
        return Err(Error::invalid_parameter(
            "max_pixels",
            max_pixels,
            format!(
                "a {}x{} grid cannot be reduced by a factor of {} without losing an axis",
                cols, rows, factor
            ),
        ));
    }

    Ok(factor)
}

/// Mean of the valid samples in each `factor x factor` block
///
/// The output has `rows / factor` by `cols / factor` cells (the partial
/// blocks at the bottom and right edges are dropped), its transform is the
/// input transform with pixels `factor` times larger, and it keeps the CRS
/// and nodata sentinel. A block without valid samples becomes nodata.
pub fn block_average(raster: &Raster<f64>, factor: usize) -> Result<Raster<f64>> {
    if factor == 0 {
        return Err(Error::invalid_parameter(
            "factor",
            factor,
            "downsampling factor must be at least 1",
        ));
    }
    if factor == 1 {
        return Ok(raster.clone());
    }

    let (rows, cols) = raster.shape();
    let out_rows = rows / factor;
    let out_cols = cols / factor;
    if out_rows == 0 || out_cols == 0 {
        return Err(Error::invalid_parameter(
            "factor",
            factor,
            format!("larger than the {}x{} grid", cols, rows),
        ));
    }

    let fill = raster.nodata().unwrap_or(f64::NAN);
    let data = raster.data();

    let output_data: Vec<f64> = (0..out_rows)
        .into_par_iter()
        .flat_map(|out_row| {
            let mut row_data = vec![fill; out_cols];
            let r0 = out_row * factor;

            for (out_col, cell) in row_data.iter_mut().enumerate() {
                let c0 = out_col * factor;
                let mut sum = 0.0;
                let mut count = 0usize;

                for r in r0..r0 + factor {
                    for c in c0..c0 + factor {
                        let v = data[(r, c)];
                        if !raster.is_nodata(v) {
                            sum += v;
                            count += 1;
                        }
                    }
                }

                if count > 0 {
                    *cell = sum / count as f64;
                }
            }

            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((out_rows, out_cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    let mut output = Raster::from_array(array);
    output.set_transform(raster.transform().scaled(factor));
    output.set_crs(raster.crs().cloned());
    output.set_nodata(raster.nodata());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dsm2dtm_core::{GeoTransform, CRS};

    #[test]
    fn test_factor_within_budget() {
        assert_eq!(downsample_factor(100, 100, 10_000).unwrap(), 1);
        assert_eq!(downsample_factor(3000, 5000, 15_000_000).unwrap(), 1);
    }

    #[test]
    fn test_factor_over_budget() {
        assert_eq!(downsample_factor(5000, 5000, 1_000_000).unwrap(), 5);
        assert_eq!(downsample_factor(500, 500, 10_000).unwrap(), 5);
        // Just over budget still needs factor 2
        assert_eq!(downsample_factor(101, 100, 10_000).unwrap(), 2);
        // 7000x7000 / 15M: sqrt(3.27) -> 2
        assert_eq!(downsample_factor(7000, 7000, 15_000_000).unwrap(), 2);
    }

    #[test]
    fn test_factor_result_fits_budget() {
        for &(rows, cols, budget) in &[(1234usize, 987usize, 5000usize), (4000, 300, 777), (60, 5000, 99)] {
            let f = downsample_factor(rows, cols, budget).unwrap();
            assert!((rows / f) * (cols / f) <= budget, "{}x{} / {} -> {}", rows, cols, budget, f);
        }
    }

    #[test]
    fn test_factor_invalid() {
        assert!(downsample_factor(10, 10, 0).is_err());
        // A 1-row strip cannot be reduced by 2 or more
        assert!(matches!(
            downsample_factor(1, 1000, 10),
            Err(Error::InvalidParameter { name: "max_pixels", .. })
        ));
    }

    #[test]
    fn test_block_average_values_and_geometry() {
        let mut raster: Raster<f64> = Raster::new(5, 4);
        raster.set_transform(GeoTransform::new(1000.0, 2000.0, 0.5, -0.5));
        raster.set_crs(Some(CRS::from_epsg(32630)));
        raster.set_nodata(Some(-9999.0));
        for r in 0..5 {
            for c in 0..4 {
                raster.set(r, c, (r * 4 + c) as f64).unwrap();
            }
        }

        let out = block_average(&raster, 2).unwrap();
        // Last row is a partial block and is dropped
        assert_eq!(out.shape(), (2, 2));
        assert_relative_eq!(out.get(0, 0).unwrap(), (0.0 + 1.0 + 4.0 + 5.0) / 4.0);
        assert_relative_eq!(out.get(1, 1).unwrap(), (10.0 + 11.0 + 14.0 + 15.0) / 4.0);
        assert_relative_eq!(out.transform().pixel_width, 1.0);
        assert_relative_eq!(out.transform().pixel_height, -1.0);
        assert_relative_eq!(out.transform().origin_x, 1000.0);
        assert_eq!(out.crs().map(|c| c.epsg()), Some(32630));
        assert_eq!(out.nodata(), Some(-9999.0));
    }

    #[test]
    fn test_block_average_skips_nodata() {
        let mut raster: Raster<f64> = Raster::filled(4, 4, 2.0);
        raster.set_nodata(Some(-9999.0));
        raster.set(0, 0, -9999.0).unwrap();
        raster.set(0, 1, 8.0).unwrap();
        for r in 2..4 {
            for c in 2..4 {
                raster.set(r, c, f64::NAN).unwrap();
            }
        }

        let out = block_average(&raster, 2).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), (8.0 + 2.0 + 2.0) / 3.0);
        assert_eq!(out.get(1, 1).unwrap(), -9999.0);
        assert_eq!(out.get(0, 1).unwrap(), 2.0);
    }

    #[test]
    fn test_block_average_factor_one_is_copy() {
        let raster: Raster<f64> = Raster::filled(3, 3, 1.5);
        let out = block_average(&raster, 1).unwrap();
        assert_eq!(out.data(), raster.data());
        assert!(block_average(&raster, 0).is_err());
        assert!(block_average(&raster, 4).is_err());
    }
}
