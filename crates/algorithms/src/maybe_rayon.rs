//! Row-parallel iteration switch.
//!
//! With the `parallel` feature the filters iterate rows and columns through
//! rayon. Without it (the default) `into_par_iter` is an alias for
//! `into_iter`, so the same call chains compile to plain sequential loops.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
pub trait IntoParallelIterator: IntoIterator + Sized {
    fn into_par_iter(self) -> Self::IntoIter {
        self.into_iter()
    }
}

#[cfg(not(feature = "parallel"))]
impl<I: IntoIterator> IntoParallelIterator for I {}
