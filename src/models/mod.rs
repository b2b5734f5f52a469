//! Line profile models.
//!
//! Models are implemented as small, pure functions so that fitting code and
//! downstream consumers (residuals, overlays) share one evaluation path.

pub mod gaussian;

pub use gaussian::*;
