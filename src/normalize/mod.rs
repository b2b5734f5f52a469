//! Continuum normalization.
//!
//! Responsibilities:
//!
//! - estimate a slowly varying continuum (percentile, running median, or
//!   polynomial fit to line-free bins)
//! - divide it out (or subtract it), propagating uncertainties
//! - flag bins where the continuum is unusable

pub mod continuum;
pub mod normalizer;

pub use continuum::*;
pub use normalizer::*;
