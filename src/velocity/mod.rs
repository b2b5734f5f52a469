//! Radial-velocity correction.

pub mod doppler;

pub use doppler::*;
