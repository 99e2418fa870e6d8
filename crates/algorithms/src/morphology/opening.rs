//! Morphological opening (erosion followed by dilation)
//!
//! Removes bright features narrower than the element (trees, buildings on
//! an elevation surface) while keeping the shape of wider regions.

use dsm2dtm_core::raster::Raster;
use dsm2dtm_core::{Algorithm, Error, Result};

use super::dilate::dilate;
use super::element::StructuringElement;
use super::erode::erode;

/// Parameters for morphological opening
#[derive(Debug, Clone, Default)]
pub struct OpeningParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Opening algorithm
#[derive(Debug, Clone, Default)]
pub struct Opening;

impl Algorithm for Opening {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = OpeningParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Opening"
    }

    fn description(&self) -> &'static str {
        "Morphological opening (erosion then dilation) to remove small bright features"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        opening(&input, &params.element)
    }
}

/// Perform morphological opening on a raster
///
/// Opening = erode then dilate with the same element. The result never
/// exceeds the input, and opening an opened raster changes nothing.
pub fn opening(raster: &Raster<f64>, element: &StructuringElement) -> Result<Raster<f64>> {
    let eroded = erode(raster, element)?;
    dilate(&eroded, element)
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

    /// Direct definition: min over the window, then max over the window
    fn brute_opening(raster: &Raster<f64>, radius: usize) -> Vec<f64> {
        let (rows, cols) = raster.shape();
        let window = |data: &[f64], init: f64, pick: fn(f64, f64) -> f64| -> Vec<f64> {
            let mut out = vec![init; rows * cols];
            for r in 0..rows {
                for c in 0..cols {
                    for rr in r.saturating_sub(radius)..=(r + radius).min(rows - 1) {
                        for cc in c.saturating_sub(radius)..=(c + radius).min(cols - 1) {
                            out[r * cols + c] = pick(out[r * cols + c], data[rr * cols + cc]);
                        }
                    }
                }
            }
            out
        };
        let input: Vec<f64> = raster.data().iter().copied().collect();
        let eroded = window(&input, f64::INFINITY, f64::min);
        window(&eroded, f64::NEG_INFINITY, f64::max)
    }

    #[test]
    fn test_opening_removes_bright_spot() {
        let mut raster = make_raster(11, 11, 5.0);
        raster.set(5, 5, 100.0).unwrap();

        let result = opening(&raster, &StructuringElement::square(1)).unwrap();
        let val = result.get(5, 5).unwrap();
        assert_eq!(val, 5.0, "Opening should remove single bright pixel, got {}", val);
    }

    #[test]
    fn test_opening_preserves_large_bright_region() {
        let mut raster = make_raster(11, 11, 5.0);
        // 3x3 block, as wide as the element
        for r in 4..7 {
            for c in 4..7 {
                raster.set(r, c, 100.0).unwrap();
            }
        }

        let result = opening(&raster, &StructuringElement::square(1)).unwrap();
        assert_eq!(result.data(), raster.data());
    }

    #[test]
    fn test_opening_matches_brute_force() {
        let (rows, cols) = (19, 27);
        let mut raster = make_raster(rows, cols, 0.0);
        let mut state = 42u64;
        for r in 0..rows {
            for c in 0..cols {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                raster.set(r, c, ((state >> 40) % 500) as f64 * 0.1).unwrap();
            }
        }

        for radius in [1usize, 2, 3] {
            let result = opening(&raster, &StructuringElement::square(radius)).unwrap();
            let expected = brute_opening(&raster, radius);
            let actual: Vec<f64> = result.data().iter().copied().collect();
            assert_eq!(actual, expected, "radius {}", radius);
        }
    }

    #[test]
    fn test_opening_idempotent_and_below_input() {
        let raster = {
            let mut r = make_raster(15, 15, 0.0);
            for row in 0..15 {
                for col in 0..15 {
                    r.set(row, col, ((row * 7 + col * 13) % 17) as f64).unwrap();
                }
            }
            r
        };
        let element = StructuringElement::square(2);
        let once = opening(&raster, &element).unwrap();
        let twice = opening(&once, &element).unwrap();

        assert_eq!(once.data(), twice.data());
        for (o, x) in once.data().iter().zip(raster.data().iter()) {
            assert!(o <= x);
        }
    }

    #[test]
    fn test_opening_algorithm_trait() {
        let mut raster = make_raster(9, 9, 1.0);
        raster.set(4, 4, 50.0).unwrap();
        let params = OpeningParams {
            element: StructuringElement::square(1),
        };
        let result = Opening.execute(raster, params).unwrap();
        assert_eq!(result.get(4, 4).unwrap(), 1.0);
    }
}
