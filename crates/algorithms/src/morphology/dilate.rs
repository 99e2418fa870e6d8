//! Morphological dilation (maximum filter)
//!
//! Replaces each pixel with the maximum value in its structuring element
//! neighborhood. Enlarges bright regions and shrinks dark regions.

use dsm2dtm_core::raster::Raster;
use dsm2dtm_core::{Algorithm, Error, Result};

use super::element::StructuringElement;
use super::extrema::{filter_2d, Extremum};

/// Parameters for morphological dilation
#[derive(Debug, Clone, Default)]
pub struct DilateParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Dilation algorithm
#[derive(Debug, Clone, Default)]
pub struct Dilate;

impl Algorithm for Dilate {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = DilateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Dilate"
    }

    fn description(&self) -> &'static str {
        "Morphological dilation (maximum filter over a square element)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dilate(&input, &params.element)
    }
}

/// Perform morphological dilation on a raster
///
/// Each output pixel is the maximum of the in-grid cells under the element.
/// Same edge and nodata conventions as [`super::erode`].
pub fn dilate(raster: &Raster<f64>, element: &StructuringElement) -> Result<Raster<f64>> {
    let data = filter_2d(raster.data(), element.radius(), Extremum::Max)?;
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
    fn test_dilate_picks_maximum() {
        let mut raster = make_raster(7, 7, 1.0);
        raster.set(3, 3, 9.0).unwrap();

        let result = dilate(&raster, &StructuringElement::square(1)).unwrap();
        for r in 2..=4 {
            for c in 2..=4 {
                assert_eq!(result.get(r, c).unwrap(), 9.0, "({}, {})", r, c);
            }
        }
        assert_eq!(result.get(1, 1).unwrap(), 1.0);
        assert_eq!(result.get(5, 3).unwrap(), 1.0);
    }

    #[test]
    fn test_dilate_square_reaches_diagonal() {
        let mut raster = make_raster(9, 9, 0.0);
        raster.set(4, 4, 3.0).unwrap();
        let result = dilate(&raster, &StructuringElement::square(2)).unwrap();
        assert_eq!(result.get(2, 2).unwrap(), 3.0);
        assert_eq!(result.get(6, 6).unwrap(), 3.0);
        assert_eq!(result.get(1, 4).unwrap(), 0.0);
    }

    #[test]
    fn test_dilate_element_larger_than_raster() {
        let mut raster = make_raster(3, 3, 5.0);
        raster.set(2, 0, 7.0).unwrap();
        let result = dilate(&raster, &StructuringElement::square(4)).unwrap();
        assert!(result.data().iter().all(|&v| v == 7.0));
    }

    #[test]
    fn test_dilate_identity_element() {
        let mut raster = make_raster(4, 4, 2.0);
        raster.set(0, 3, 6.0).unwrap();
        let result = dilate(&raster, &StructuringElement::square(0)).unwrap();
        assert_eq!(result.data(), raster.data());
    }
}
