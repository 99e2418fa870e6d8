//! Separable running min/max filters
//!
//! A flat square element decomposes into a horizontal and a vertical line
//! element, so a 2D extreme filter is two passes of a 1D filter. Each line
//! pass uses the van Herk / Gil-Werman scheme: the line is cut into blocks
//! of the window width, prefix and suffix extremes are taken inside every
//! block, and any window is then answered with one comparison. The cost is
//! about three comparisons per sample regardless of the window width.
//!
//! Windows are truncated at the line ends (only in-grid samples take part),
//! implemented by padding with the identity of the operation.

use crate::maybe_rayon::*;
use dsm2dtm_core::{Error, Result};
use ndarray::Array2;

/// Which extreme a running filter keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Extremum {
    Min,
    Max,
}

impl Extremum {
    #[inline]
    fn pick(self, a: f64, b: f64) -> f64 {
        match self {
            Extremum::Min => a.min(b),
            Extremum::Max => a.max(b),
        }
    }

    /// Value that never wins a comparison
    fn identity(self) -> f64 {
        match self {
            Extremum::Min => f64::INFINITY,
            Extremum::Max => f64::NEG_INFINITY,
        }
    }
}

/// Running extreme over windows of `2 * radius + 1` samples along one line.
///
/// `out[i]` is the extreme of `input[i - radius ..= i + radius]` clipped to the line.
pub(crate) fn line_extreme(input: &[f64], radius: usize, op: Extremum, out: &mut [f64]) {
    let n = input.len();
    debug_assert_eq!(n, out.len());
    if n == 0 {
        return;
    }
    if radius == 0 {
        out.copy_from_slice(input);
        return;
    }

    let width = 2 * radius + 1;
    let padded_len = n + 2 * radius;

    let mut padded = vec![op.identity(); padded_len];
    padded[radius..radius + n].copy_from_slice(input);

    // prefix[j]: extreme from the start of j's block up to j
    let mut prefix = vec![0.0; padded_len];
    for j in 0..padded_len {
        prefix[j] = if j % width == 0 {
            padded[j]
        } else {
            op.pick(prefix[j - 1], padded[j])
        };
    }

    // suffix[j]: extreme from j up to the end of j's block
    let mut suffix = vec![0.0; padded_len];
    for j in (0..padded_len).rev() {
        suffix[j] = if j == padded_len - 1 || (j + 1) % width == 0 {
            padded[j]
        } else {
            op.pick(suffix[j + 1], padded[j])
        };
    }

    // Window [i, i + width - 1] in padded coordinates spans at most two blocks
    for (i, o) in out.iter_mut().enumerate() {
        *o = op.pick(suffix[i], prefix[i + width - 1]);
    }
}

/// Square-window extreme filter as a row pass followed by a column pass
pub(crate) fn filter_2d(data: &Array2<f64>, radius: usize, op: Extremum) -> Result<Array2<f64>> {
    let (rows, cols) = data.dim();
    if radius == 0 || data.is_empty() {
        return Ok(data.clone());
    }

    let horizontal: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let line = data.row(row).to_vec();
            let mut out = vec![0.0; cols];
            line_extreme(&line, radius, op, &mut out);
            out
        })
        .collect();
    let horizontal = Array2::from_shape_vec((rows, cols), horizontal)
        .map_err(|e| Error::Other(e.to_string()))?;

    // Column results are produced column-major, then transposed back
    let vertical: Vec<f64> = (0..cols)
        .into_par_iter()
        .flat_map(|col| {
            let line = horizontal.column(col).to_vec();
            let mut out = vec![0.0; rows];
            line_extreme(&line, radius, op, &mut out);
            out
        })
        .collect();
    let vertical = Array2::from_shape_vec((cols, rows), vertical)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(vertical.reversed_axes().as_standard_layout().into_owned())
}
