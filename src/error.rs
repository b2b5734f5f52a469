//! Crate-wide error type.
//!
//! Every stage validates its own inputs and fails with one specific kind.
//! Non-convergence of a fit is *not* an error: it is reported through
//! `FitResult::converged`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpectrumError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectrumError {
    /// Malformed spectrum: length mismatch, non-monotonic or non-finite
    /// wavelength, bad uncertainty, or a fully degenerate continuum.
    #[error("invalid spectrum: {reason}")]
    InvalidSpectrum { reason: String },

    /// Velocity outside the domain of the requested Doppler relation.
    #[error("invalid velocity {velocity} (speed of light {speed_of_light}): {reason}")]
    InvalidVelocity {
        velocity: f64,
        speed_of_light: f64,
        reason: &'static str,
    },

    /// Model parameters that cannot be evaluated (e.g. `sigma <= 0`).
    #[error("invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    /// Fewer data points than free parameters.
    #[error("underdetermined fit: {points} points for {parameters} free parameters")]
    UnderdeterminedFit { points: usize, parameters: usize },

    /// Nothing to fit (e.g. constant flux over the window).
    #[error("degenerate data: {reason}")]
    DegenerateData { reason: String },

    /// The optimizer produced non-finite parameters or an invalid width.
    #[error("numerical divergence: {reason}")]
    NumericalDivergence { reason: String },

    /// A configuration value is out of range.
    #[error("invalid options: {reason}")]
    InvalidOptions { reason: String },
}

impl SpectrumError {
    pub(crate) fn spectrum(reason: impl Into<String>) -> Self {
        Self::InvalidSpectrum {
            reason: reason.into(),
        }
    }

    pub(crate) fn options(reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            reason: reason.into(),
        }
    }

    pub(crate) fn divergence(reason: impl Into<String>) -> Self {
        Self::NumericalDivergence {
            reason: reason.into(),
        }
    }

    /// Stable process exit code for front-ends that surface failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            SpectrumError::InvalidOptions { .. } => 2,
            SpectrumError::InvalidSpectrum { .. } => 3,
            SpectrumError::InvalidVelocity { .. } => 4,
            SpectrumError::InvalidParameters { .. } => 5,
            SpectrumError::UnderdeterminedFit { .. } => 6,
            SpectrumError::DegenerateData { .. } => 7,
            SpectrumError::NumericalDivergence { .. } => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let errors = [
            SpectrumError::options("x"),
            SpectrumError::spectrum("x"),
            SpectrumError::InvalidVelocity {
                velocity: 1.0,
                speed_of_light: 1.0,
                reason: "x",
            },
            SpectrumError::InvalidParameters { reason: "x".into() },
            SpectrumError::UnderdeterminedFit {
                points: 3,
                parameters: 4,
            },
            SpectrumError::DegenerateData { reason: "x".into() },
            SpectrumError::divergence("x"),
        ];
        let mut codes: Vec<u8> = errors.iter().map(|e| e.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn display_includes_reason() {
        let err = SpectrumError::UnderdeterminedFit {
            points: 3,
            parameters: 4,
        };
        assert_eq!(
            err.to_string(),
            "underdetermined fit: 3 points for 4 free parameters"
        );
    }
}
