//! Parallel fitting of several windows of one spectrum.
//!
//! Each window is an independent problem, so they are fit with rayon and
//! returned in input order. One failing window does not affect the others.

use rayon::prelude::*;

use crate::domain::{FitOptions, FitResult, Spectrum};
use crate::error::Result;
use crate::fit::fitter::fit_spectrum_window;

/// Fit a Gaussian in each `(min, max)` wavelength window of `spectrum`.
pub fn fit_windows(
    spectrum: &Spectrum,
    windows: &[(f64, f64)],
    options: &FitOptions,
) -> Vec<Result<FitResult>> {
    windows
        .par_iter()
        .map(|&(min, max)| fit_spectrum_window(spectrum, min, max, options))
        .collect()
}
