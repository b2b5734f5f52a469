//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the validated in-memory spectrum (`Spectrum`)
//! - stage configuration (`NormalizeOptions`, `DopplerOptions`, `FitOptions`)
//! - fit outputs (`GaussianParameters`, `ParameterErrors`, `FitResult`)
//! - process-wide numerical constants

pub mod constants;
pub mod spectrum;
pub mod types;

pub use constants::*;
pub use spectrum::*;
pub use types::*;
