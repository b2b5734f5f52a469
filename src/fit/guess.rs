//! Deterministic starting point for the Gaussian fitter.
//!
//! - `baseline`: median flux over the outer 10% of the window on each side
//!   (at least one point per side)
//! - `amplitude`, `center`: the sample deviating most from the baseline,
//!   signed (peak → emission, trough → absorption)
//! - `sigma`: zeroth moment of the baseline-subtracted profile divided by
//!   `amplitude * sqrt(2π)`, clamped to `[median spacing, half-width]`;
//!   falls back to a quarter of the half-width when the moment is unusable
//!   (e.g. noise flips the sign of the integral)

use crate::domain::GaussianParameters;
use crate::error::{Result, SpectrumError};
use crate::math::{median, median_mut};

/// Fraction of the window used on each side to estimate the baseline.
const EDGE_FRACTION: f64 = 0.1;

/// Fallback `sigma` as a fraction of the window half-width.
const SIGMA_HALF_WIDTH_FRACTION: f64 = 0.25;

/// Initial parameters for paired samples sorted by wavelength.
///
/// Needs at least 2 points of equal length; the fitter has already checked
/// ordering and finiteness by the time it gets here.
pub fn initial_guess(wavelength: &[f64], flux: &[f64]) -> Result<GaussianParameters> {
    let n = wavelength.len();
    if flux.len() != n || n < 2 {
        return Err(SpectrumError::spectrum(format!(
            "initial guess needs at least 2 paired points, got {n} wavelengths and {} fluxes",
            flux.len()
        )));
    }
    let edge = ((n as f64 * EDGE_FRACTION) as usize).max(1);

    let edges: Vec<f64> = flux[..edge].iter().chain(&flux[n - edge..]).copied().collect();
    let baseline = median(&edges).unwrap_or(flux[0]);

    let (i_max, i_min) = extrema(flux);
    let ext = if flux[i_max] - baseline >= baseline - flux[i_min] {
        i_max
    } else {
        i_min
    };
    let amplitude = flux[ext] - baseline;
    let center = wavelength[ext];

    let half_width = 0.5 * (wavelength[n - 1] - wavelength[0]);
    let fallback = SIGMA_HALF_WIDTH_FRACTION * half_width;

    let mut spacings: Vec<f64> = wavelength.windows(2).map(|w| w[1] - w[0]).collect();
    let min_sigma = median_mut(&mut spacings).unwrap_or(fallback);

    let area: f64 = wavelength
        .windows(2)
        .zip(flux.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * ((y[0] - baseline) + (y[1] - baseline)))
        .sum();
    let moment = area / (amplitude * (2.0 * std::f64::consts::PI).sqrt());

    let sigma = if moment.is_finite() && moment > 0.0 && min_sigma < half_width {
        moment.clamp(min_sigma, half_width)
    } else {
        fallback
    };

    Ok(GaussianParameters::new(amplitude, center, sigma, baseline))
}

fn extrema(values: &[f64]) -> (usize, usize) {
    let mut i_max = 0;
    let mut i_min = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[i_max] {
            i_max = i;
        }
        if v < values[i_min] {
            i_min = i;
        }
    }
    (i_max, i_min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gaussian;

    fn window(n: usize, lo: f64, hi: f64) -> Vec<f64> {
        (0..n).map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn emission_line_guess_is_close() {
        let truth = GaussianParameters::new(5.0, 6563.0, 2.0, 1.0);
        let x = window(81, 6543.0, 6583.0);
        let y = gaussian(&x, &truth).unwrap();
        let g = initial_guess(&x, &y).unwrap();
        assert!((g.baseline - 1.0).abs() < 1e-6);
        assert!((g.amplitude - 5.0).abs() < 1e-9);
        assert!((g.center - 6563.0).abs() < 1e-9);
        assert!((g.sigma - 2.0).abs() < 0.05);
    }

    #[test]
    fn absorption_line_gets_negative_amplitude() {
        let truth = GaussianParameters::new(-0.6, 5000.0, 0.8, 1.0);
        let x = window(60, 4990.0, 5010.0);
        let y = gaussian(&x, &truth).unwrap();
        let g = initial_guess(&x, &y).unwrap();
        assert!(g.amplitude < 0.0);
        assert!((g.center - 5000.0).abs() < 0.5);
    }

    #[test]
    fn guess_is_deterministic() {
        let x = window(30, 0.0, 10.0);
        let y: Vec<f64> = x.iter().map(|v| (v * 1.7).sin()).collect();
        assert_eq!(initial_guess(&x, &y).unwrap(), initial_guess(&x, &y).unwrap());
    }

    #[test]
    fn rejects_short_or_mismatched_input() {
        assert!(matches!(
            initial_guess(&[], &[]),
            Err(SpectrumError::InvalidSpectrum { .. })
        ));
        assert!(initial_guess(&[1.0, 2.0, 3.0], &[1.0, 2.0]).is_err());
        assert!(initial_guess(&[1.0], &[1.0]).is_err());
    }

    #[test]
    fn falls_back_when_moment_is_unusable() {
        // Antisymmetric profile: zero integral.
        let x = window(21, -10.0, 10.0);
        let y: Vec<f64> = x.iter().map(|&v| if v > 0.0 { 1.0 } else if v < 0.0 { -1.0 } else { 0.0 }).collect();
        let g = initial_guess(&x, &y).unwrap();
        assert!((g.sigma - 2.5).abs() < 1e-12);
    }
}
