//! Gaussian-plus-baseline line profile.
//!
//! ```text
//! f(λ) = baseline + amplitude * exp(-(λ - center)^2 / (2 sigma^2))
//! ```
//!
//! The fitter relies on two primitive operations:
//! - evaluate `f(λ)` (for residuals, overlays, and the objective)
//! - evaluate the partial derivatives of `f` (the optimizer Jacobian)
//!
//! The exponent is computed through `z = (λ - center) / sigma` rather than
//! `sigma^2`, so tiny positive widths underflow cleanly to a zero profile
//! instead of producing `0/0`.

use crate::domain::GaussianParameters;
use crate::error::{Result, SpectrumError};

fn check_sigma(sigma: f64) -> Result<()> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(SpectrumError::InvalidParameters {
            reason: format!("sigma must be finite and > 0, got {sigma}"),
        });
    }
    Ok(())
}

/// Evaluate the model at a single wavelength. Caller guarantees `sigma > 0`.
pub(crate) fn profile_at(x: f64, p: &GaussianParameters) -> f64 {
    let z = (x - p.center) / p.sigma;
    p.baseline + p.amplitude * (-0.5 * z * z).exp()
}

/// Evaluate the model over `wavelength`.
///
/// Fails with `InvalidParameters` when `sigma` is not a finite positive number.
pub fn gaussian(wavelength: &[f64], params: &GaussianParameters) -> Result<Vec<f64>> {
    check_sigma(params.sigma)?;
    Ok(wavelength.iter().map(|&x| profile_at(x, params)).collect())
}

/// `flux - model` over paired samples.
pub fn residuals(wavelength: &[f64], flux: &[f64], params: &GaussianParameters) -> Result<Vec<f64>> {
    if wavelength.len() != flux.len() {
        return Err(SpectrumError::spectrum(format!(
            "flux has {} points but wavelength has {}",
            flux.len(),
            wavelength.len()
        )));
    }
    check_sigma(params.sigma)?;
    Ok(wavelength
        .iter()
        .zip(flux)
        .map(|(&x, &y)| y - profile_at(x, params))
        .collect())
}

/// Partial derivatives `[∂f/∂amplitude, ∂f/∂center, ∂f/∂sigma, ∂f/∂baseline]`
/// at `x`. Caller guarantees `sigma > 0`.
pub fn jacobian_row(x: f64, p: &GaussianParameters) -> [f64; 4] {
    let z = (x - p.center) / p.sigma;
    let e = (-0.5 * z * z).exp();
    if e == 0.0 {
        return [0.0, 0.0, 0.0, 1.0];
    }
    let ae = p.amplitude * e;
    [e, ae * z / p.sigma, ae * z * z / p.sigma, 1.0]
}
