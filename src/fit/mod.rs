//! Gaussian line fitting.
//!
//! Responsibilities:
//!
//! - derive a deterministic starting point from the data
//! - minimize the weighted residuals with Levenberg–Marquardt
//! - classify failures and estimate parameter uncertainties
//! - fit many windows in parallel

pub mod batch;
pub mod fitter;
pub mod guess;
mod lm;

pub use batch::*;
pub use fitter::*;
pub use guess::*;
