//! Morphological erosion (minimum filter)
//!
//! Replaces each pixel with the minimum value in its structuring element
//! neighborhood. Shrinks bright regions and enlarges dark regions.

use dsm2dtm_core::raster::Raster;
use dsm2dtm_core::{Algorithm, Error, Result};

use super::element::StructuringElement;
use super::extrema::{filter_2d, Extremum};

/// Parameters for morphological erosion
#[derive(Debug, Clone, Default)]
pub struct ErodeParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Erosion algorithm
#[derive(Debug, Clone, Default)]
pub struct Erode;

impl Algorithm for Erode {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ErodeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Erode"
    }

    fn description(&self) -> &'static str {
        "Morphological erosion (minimum filter over a square element)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        erode(&input, &params.element)
    }
}

/// Perform morphological erosion on a raster
///
/// Each output pixel is the minimum of the in-grid cells under the element;
/// near the edges the window is truncated. Values are taken as they are, so
/// nodata must be imputed beforehand (see [`crate::terrain::open_surface`]).
/// Transform, CRS and nodata are carried over to the output.
///
/// # Arguments
/// * `raster` - Input raster
/// * `element` - Structuring element defining the neighborhood
pub fn erode(raster: &Raster<f64>, element: &StructuringElement) -> Result<Raster<f64>> {
    let data = filter_2d(raster.data(), element.radius(), Extremum::Min)?;
    raster.with_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsm2dtm_core::GeoTransform;

    fn make_raster(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_erode_uniform() {
        let raster = make_raster(7, 7, 5.0);
        let result = erode(&raster, &StructuringElement::square(1)).unwrap();
        assert!(
            result.data().iter().all(|&v| v == 5.0),
            "Uniform erosion should preserve every value"
        );
    }

    #[test]
    fn test_erode_picks_minimum() {
        let mut raster = make_raster(7, 7, 10.0);
        raster.set(3, 4, 2.0).unwrap();

        let result = erode(&raster, &StructuringElement::square(1)).unwrap();
        // Cell (3,3) has neighbor (3,4)=2.0 → min should be 2.0
        let val = result.get(3, 3).unwrap();
        assert_eq!(val, 2.0, "Erosion should pick minimum neighbor, got {}", val);
        // (3,1) is two columns away
        assert_eq!(result.get(3, 1).unwrap(), 10.0);
    }

    #[test]
    fn test_erode_truncates_at_edges() {
        let mut raster = make_raster(5, 5, 10.0);
        raster.set(0, 0, 1.0).unwrap();

        let result = erode(&raster, &StructuringElement::square(1)).unwrap();
        // Corner windows only see in-grid cells, no NaN border
        assert_eq!(result.get(0, 0).unwrap(), 1.0);
        assert_eq!(result.get(1, 1).unwrap(), 1.0);
        assert_eq!(result.get(2, 2).unwrap(), 10.0);
        assert!(result.data().iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_erode_keeps_metadata() {
        let mut raster = make_raster(6, 4, 3.0);
        raster.set_nodata(Some(-9999.0));
        let result = erode(&raster, &StructuringElement::square(2)).unwrap();
        assert_eq!(result.shape(), (6, 4));
        assert_eq!(result.nodata(), Some(-9999.0));
        assert_eq!(result.transform(), raster.transform());
    }

    #[test]
    fn test_erode_single_pixel() {
        let raster = make_raster(1, 1, 5.0);
        let result = erode(&raster, &StructuringElement::square(3)).unwrap();
        assert_eq!(result.get(0, 0).unwrap(), 5.0);
    }

    #[test]
    fn test_erode_algorithm_trait() {
        let mut raster = make_raster(5, 5, 8.0);
        raster.set(2, 2, 1.0).unwrap();
        let result = Erode.execute_default(raster).unwrap();
        assert_eq!(Erode.name(), "Erode");
        assert_eq!(result.get(1, 1).unwrap(), 1.0);
        assert_eq!(result.get(0, 0).unwrap(), 8.0);
    }
}
