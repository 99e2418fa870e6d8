//! Canopy Height Model: surface minus ground

use dsm2dtm_core::raster::Raster;
use dsm2dtm_core::Result;
use ndarray::Zip;
use tracing::warn;

/// Canopy heights plus diagnostics about cells where the ground rose above the surface
#[derive(Debug, Clone)]
pub struct CanopyHeight {
    /// `dsm - dtm`, nodata where either input is nodata
    pub raster: Raster<f64>,
    /// Number of valid cells with a negative height
    pub negative_cells: usize,
    /// Lowest valid height, `None` when every cell is nodata
    pub min_height: Option<f64>,
}

/// Per-cell `dsm - dtm`
///
/// Cells that are nodata or NaN in either input get the DSM sentinel.
/// Negative heights are kept as computed and reported through
/// `negative_cells` and a warning.
pub fn canopy_height(dsm: &Raster<f64>, dtm: &Raster<f64>) -> Result<CanopyHeight> {
    dsm.ensure_same_grid(dtm)?;

    let sentinel = dsm.nodata().unwrap_or(f64::NAN);
    let mut negative_cells = 0usize;
    let mut min_height: Option<f64> = None;

    let heights = Zip::from(dsm.data())
        .and(dtm.data())
        .map_collect(|&surface, &ground| {
            if dsm.is_nodata(surface) || dtm.is_nodata(ground) {
                return sentinel;
            }
            let h = surface - ground;
            if h < 0.0 {
                negative_cells += 1;
            }
            if min_height.is_none_or(|m| h < m) {
                min_height = Some(h);
            }
            h
        });

    if negative_cells > 0 {
        warn!(
            negative_cells,
            min_height = min_height.unwrap_or_default(),
            "Ground surface lies above the DSM in some cells"
        );
    }

    Ok(CanopyHeight {
        raster: dsm.with_data(heights)?,
        negative_cells,
        min_height,
    })
}
