//! Bilinear resampling of a coarse grid onto a finer target grid
//!
//! Used to bring a ground surface filtered on a downsampled grid back to the
//! source pixel grid. Each target pixel centre is located on the coarse grid
//! through the two affine transforms and interpolated from the four
//! surrounding coarse cell centres.

use crate::maybe_rayon::*;
use dsm2dtm_core::raster::{GeoTransform, Raster};
use dsm2dtm_core::{Error, Result, CRS};
use ndarray::Array2;

/// Resample `coarse` onto the grid described by `target_transform` and `target_shape`
///
/// - Sample positions outside the coarse cell-centre extent are clamped to it.
/// - Nodata neighbours are dropped and the remaining weights renormalised;
///   a pixel with no valid weighted neighbour becomes nodata.
/// - The output carries the target transform, `target_crs` and the coarse
///   nodata sentinel.
///
/// Fails with `GeometryMismatch` when either transform is rotated or
/// degenerate, when the axis orientations differ, when the CRSs are not
/// equivalent, or when the grids do not overlap.
pub fn reconcile(
    coarse: &Raster<f64>,
    target_transform: &GeoTransform,
    target_shape: (usize, usize),
    target_crs: Option<&CRS>,
) -> Result<Raster<f64>> {
    let (rows, cols) = target_shape;
    if coarse.is_empty() || rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    check_geometry(coarse, target_transform, target_shape, target_crs)?;

    let (coarse_rows, coarse_cols) = coarse.shape();
    let source = coarse.transform();
    let data = coarse.data();
    let fill = coarse.nodata().unwrap_or(f64::NAN);
    let max_u = (coarse_cols - 1) as f64;
    let max_v = (coarse_rows - 1) as f64;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![fill; cols];

            for (col, cell) in row_data.iter_mut().enumerate() {
                let (x, y) = target_transform.pixel_to_geo(col, row);
                let (fc, fr) = source.geo_to_pixel(x, y);

                // Coarse cell centres sit at half-integer pixel coordinates
                let u = (fc - 0.5).clamp(0.0, max_u);
                let v = (fr - 0.5).clamp(0.0, max_v);

                let c0 = (u.floor() as usize).min(coarse_cols - 1);
                let r0 = (v.floor() as usize).min(coarse_rows - 1);
                let c1 = (c0 + 1).min(coarse_cols - 1);
                let r1 = (r0 + 1).min(coarse_rows - 1);
                let dx = u - c0 as f64;
                let dy = v - r0 as f64;

                let neighbours = [
                    (r0, c0, (1.0 - dx) * (1.0 - dy)),
                    (r0, c1, dx * (1.0 - dy)),
                    (r1, c0, (1.0 - dx) * dy),
                    (r1, c1, dx * dy),
                ];

                let mut sum = 0.0;
                let mut weight = 0.0;
                for (r, c, w) in neighbours {
                    if w <= 0.0 {
                        continue;
                    }
                    let value = data[(r, c)];
                    if !coarse.is_nodata(value) {
                        sum += w * value;
                        weight += w;
                    }
                }

                if weight > 0.0 {
                    *cell = sum / weight;
                }
            }

            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    let mut output = Raster::from_array(array);
    output.set_transform(*target_transform);
    output.set_crs(target_crs.cloned());
    output.set_nodata(coarse.nodata());
    Ok(output)
}

fn check_geometry(
    coarse: &Raster<f64>,
    target: &GeoTransform,
    target_shape: (usize, usize),
    target_crs: Option<&CRS>,
) -> Result<()> {
    let source = coarse.transform();

    for (label, gt) in [("source", source), ("target", target)] {
        if !gt.is_axis_aligned() {
            return Err(Error::GeometryMismatch(format!(
                "{} transform is rotated",
                label
            )));
        }
        if gt.determinant() == 0.0 || !gt.determinant().is_finite() {
            return Err(Error::GeometryMismatch(format!(
                "{} transform is degenerate",
                label
            )));
        }
    }

    if source.pixel_width.signum() != target.pixel_width.signum()
        || source.pixel_height.signum() != target.pixel_height.signum()
    {
        return Err(Error::GeometryMismatch(
            "source and target grids have different axis orientation".to_string(),
        ));
    }

    match (coarse.crs(), target_crs) {
        (Some(a), Some(b)) if a != b => {
            return Err(Error::GeometryMismatch(format!(
                "CRS differs: {} vs {}",
                a, b
            )));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(Error::GeometryMismatch(
                "only one of the grids has a CRS".to_string(),
            ));
        }
        _ => {}
    }

    let (rows, cols) = target_shape;
    let source_bounds = coarse.bounds();
    let target_bounds = target.bounds(cols, rows);
    if !source_bounds.intersects(&target_bounds) {
        return Err(Error::GeometryMismatch(format!(
            "grids do not overlap: {:?} vs {:?}",
            source_bounds, target_bounds
        )));
    }

    Ok(())
}
