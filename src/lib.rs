//! `spectral-lines` library crate.
//!
//! Turns a validated 1-D spectrum into comparable, rest-frame, normalized
//! data and measures a single line on it:
//!
//! - `normalize`: continuum estimation and removal
//! - `velocity`: Doppler correction of the wavelength axis
//! - `models` / `fit`: Gaussian-plus-baseline evaluation and least-squares fitting
//! - `pipeline`: the stages chained together, single or batched
//!
//! Every stage is a pure function from input data to a new output value, so
//! spectra can be processed in parallel without coordination.

pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod velocity;

pub use domain::{
    ContinuumMethod, DopplerDirection, DopplerMode, DopplerOptions, FitOptions, FitResult,
    GaussianParameters, NormalizeMode, NormalizeOptions, Normalized, ParameterErrors, Spectrum,
};
pub use error::{Result, SpectrumError};
pub use fit::{fit_gaussian, fit_spectrum_window, fit_windows};
pub use models::gaussian;
pub use normalize::normalize;
pub use velocity::correct_radial_velocity;
