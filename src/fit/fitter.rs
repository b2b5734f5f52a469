//! Gaussian line fitting over a wavelength window.
//!
//! Given:
//! - wavelengths `x_i` (strictly increasing)
//! - fluxes `y_i`
//! - optional 1-sigma uncertainties `s_i` (weights `w_i = 1/s_i^2`)
//!
//! we find `θ = (amplitude, center, sigma, baseline)` minimizing
//! `Σ w_i (y_i - f(x_i; θ))^2` and classify the outcome:
//!
//! - hard failures: too few points (`UnderdeterminedFit`), flat flux
//!   (`DegenerateData`), a non-finite objective or a line that runs off the
//!   sampled range (`NumericalDivergence`)
//! - soft failure: iteration budget exhausted → `converged = false`,
//!   parameters returned, no uncertainties

use log::{debug, warn};
use nalgebra::Matrix4;

use crate::domain::spectrum::inverse_variance;
use crate::domain::{
    FitOptions, FitResult, GAUSSIAN_PARAM_COUNT, GaussianParameters, ParameterErrors, Spectrum,
    WeightSource,
};
use crate::error::{Result, SpectrumError};
use crate::fit::guess::initial_guess;
use crate::fit::lm::{Samples, minimize};

/// Fit a Gaussian-plus-baseline profile to paired samples.
pub fn fit_gaussian(
    wavelength: &[f64],
    flux: &[f64],
    uncertainty: Option<&[f64]>,
    options: &FitOptions,
) -> Result<FitResult> {
    options.validate()?;
    validate_samples(wavelength, flux, uncertainty)?;

    let weights: Vec<f64> = match (options.weights, uncertainty) {
        (WeightSource::Uncertainty, Some(s)) => {
            let w: Vec<f64> = s.iter().map(|&s| inverse_variance(s)).collect();
            if let Some(i) = w.iter().position(|w| !w.is_finite()) {
                return Err(SpectrumError::spectrum(format!(
                    "uncertainty {} at point {i} is too small to weight (1/sigma^2 overflows)",
                    s[i]
                )));
            }
            w
        }
        _ => vec![1.0; wavelength.len()],
    };

    let n_points = weights.iter().filter(|&&w| w > 0.0).count();
    if n_points < GAUSSIAN_PARAM_COUNT {
        return Err(SpectrumError::UnderdeterminedFit {
            points: n_points,
            parameters: GAUSSIAN_PARAM_COUNT,
        });
    }

    let (lo, hi) = flux
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &f| (lo.min(f), hi.max(f)));
    if hi - lo <= f64::EPSILON * lo.abs().max(hi.abs()) {
        return Err(SpectrumError::DegenerateData {
            reason: format!("flux is constant ({lo}) over {} points", flux.len()),
        });
    }

    let start = match options.initial {
        Some(p) => {
            if !p.is_finite() || !(p.sigma > 0.0) {
                return Err(SpectrumError::InvalidParameters {
                    reason: format!("initial guess must be finite with sigma > 0, got {p:?}"),
                });
            }
            p
        }
        None => initial_guess(wavelength, flux)?,
    };
    debug!("initial guess: {start:?}");

    let samples = Samples {
        x: wavelength,
        y: flux,
        w: &weights,
    };
    let outcome = minimize(
        samples,
        start.to_array(),
        &options.bounds,
        options.tolerance,
        options.max_iterations,
    )?;

    let params = GaussianParameters::from_array(outcome.params);
    if !params.is_finite() || !(params.sigma > 0.0) {
        return Err(SpectrumError::divergence(format!(
            "fit ended at invalid parameters {params:?}"
        )));
    }
    check_within_samples(&params, wavelength)?;

    let dof = n_points - GAUSSIAN_PARAM_COUNT;
    let reduced_chi2 = (dof > 0).then(|| outcome.cost / dof as f64);

    let errors = if outcome.converged {
        let scale = if options.absolute_sigma {
            Some(1.0)
        } else {
            reduced_chi2
        };
        scale.and_then(|s| standard_errors(&outcome.jtj, s))
    } else {
        warn!(
            "gaussian fit did not converge within an iteration budget of {} (rss {:.6e})",
            options.max_iterations, outcome.cost
        );
        None
    };

    Ok(FitResult {
        params,
        errors,
        converged: outcome.converged,
        rss: outcome.cost,
        reduced_chi2,
        iterations: outcome.iterations,
        n_points,
    })
}

/// Fit the bins of `spectrum` inside `[min, max]`.
pub fn fit_spectrum_window(
    spectrum: &Spectrum,
    min: f64,
    max: f64,
    options: &FitOptions,
) -> Result<FitResult> {
    let window = spectrum.window(min, max)?;
    fit_gaussian(window.wavelength(), window.flux(), window.uncertainty(), options)
}

/// A line is only measured where it was sampled: the center may sit at most
/// half a window beyond either edge and the width may not exceed the window.
fn check_within_samples(params: &GaussianParameters, wavelength: &[f64]) -> Result<()> {
    let (lo, hi) = (wavelength[0], wavelength[wavelength.len() - 1]);
    let span = hi - lo;
    let center_ok = params.center >= lo - 0.5 * span && params.center <= hi + 0.5 * span;
    if !center_ok || params.sigma > span {
        return Err(SpectrumError::divergence(format!(
            "fit ran away from the sampled range [{lo}, {hi}]: center {}, sigma {}",
            params.center, params.sigma
        )));
    }
    Ok(())
}

/// `sqrt(diag(scale * (JᵀWJ)⁻¹))`, or `None` when the matrix is singular.
fn standard_errors(jtj: &Matrix4<f64>, scale: f64) -> Option<ParameterErrors> {
    let cov = jtj.cholesky()?.inverse() * scale;
    let mut se = [0.0; 4];
    for (k, out) in se.iter_mut().enumerate() {
        let v = cov[(k, k)];
        if !(v.is_finite() && v >= 0.0) {
            return None;
        }
        *out = v.sqrt();
    }
    Some(ParameterErrors::from_array(se))
}

fn validate_samples(wavelength: &[f64], flux: &[f64], uncertainty: Option<&[f64]>) -> Result<()> {
    if flux.len() != wavelength.len() {
        return Err(SpectrumError::spectrum(format!(
            "flux has {} points but wavelength has {}",
            flux.len(),
            wavelength.len()
        )));
    }
    if wavelength.len() < GAUSSIAN_PARAM_COUNT {
        return Err(SpectrumError::UnderdeterminedFit {
            points: wavelength.len(),
            parameters: GAUSSIAN_PARAM_COUNT,
        });
    }
    if let Some(i) = wavelength.iter().zip(flux).position(|(x, y)| !(x.is_finite() && y.is_finite())) {
        return Err(SpectrumError::spectrum(format!(
            "non-finite sample at point {i}: ({}, {})",
            wavelength[i], flux[i]
        )));
    }
    if let Some(i) = wavelength.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SpectrumError::spectrum(format!(
            "wavelength not strictly increasing at point {}",
            i + 1
        )));
    }
    if let Some(s) = uncertainty {
        if s.len() != wavelength.len() {
            return Err(SpectrumError::spectrum(format!(
                "uncertainty has {} points but wavelength has {}",
                s.len(),
                wavelength.len()
            )));
        }
        if let Some(i) = s.iter().position(|&s| s.is_nan() || s <= 0.0) {
            return Err(SpectrumError::spectrum(format!(
                "uncertainty at point {i} must be > 0, got {}",
                s[i]
            )));
        }
    }
    Ok(())
}
