//! Continuum removal (divide or subtract).

use log::{info, warn};

use crate::domain::{NormalizeMode, NormalizeOptions, Normalized, Spectrum};
use crate::error::{Result, SpectrumError};
use crate::normalize::continuum::estimate_continuum;

/// Estimate the continuum of `spectrum` and remove it.
///
/// In divide mode, bins whose continuum is zero (relative to
/// `options.min_continuum`) or non-finite are dropped from the output and
/// listed in `Normalized::flagged`. This is a warning, not a failure, unless
/// fewer than two bins survive.
pub fn normalize(spectrum: &Spectrum, options: &NormalizeOptions) -> Result<Normalized> {
    options.validate()?;

    let continuum = estimate_continuum(spectrum, &options.method)?;
    let flux = spectrum.flux();
    let sigma = spectrum.uncertainty();

    let scale = continuum
        .iter()
        .filter(|c| c.is_finite())
        .fold(0.0_f64, |acc, c| acc.max(c.abs()));
    let threshold = options.min_continuum * scale;

    let degenerate = |c: f64| match options.mode {
        NormalizeMode::Divide => !c.is_finite() || c.abs() <= threshold,
        NormalizeMode::Subtract => !c.is_finite(),
    };

    let (kept, flagged): (Vec<usize>, Vec<usize>) =
        (0..spectrum.len()).partition(|&i| !degenerate(continuum[i]));

    if kept.len() < 2 {
        return Err(SpectrumError::spectrum(format!(
            "continuum is degenerate at {} of {} bins",
            flagged.len(),
            spectrum.len()
        )));
    }
    if !flagged.is_empty() {
        warn!(
            "continuum degenerate at {} of {} bins; dropped from normalized spectrum",
            flagged.len(),
            spectrum.len()
        );
    }

    let base = if flagged.is_empty() {
        spectrum.clone()
    } else {
        spectrum.select(&kept)?
    };
    let cont: Vec<f64> = kept.iter().map(|&i| continuum[i]).collect();

    let (new_flux, new_sigma): (Vec<f64>, Option<Vec<f64>>) = match options.mode {
        NormalizeMode::Divide => (
            kept.iter().zip(&cont).map(|(&i, c)| flux[i] / c).collect(),
            sigma.map(|s| kept.iter().zip(&cont).map(|(&i, c)| s[i] / c.abs()).collect()),
        ),
        NormalizeMode::Subtract => (
            kept.iter().zip(&cont).map(|(&i, c)| flux[i] - c).collect(),
            sigma.map(|s| kept.iter().map(|&i| s[i]).collect()),
        ),
    };

    let normalized = base.with_flux(new_flux, new_sigma)?;
    info!(
        "normalized {} bins ({:?} mode, {} flagged)",
        normalized.len(),
        options.mode,
        flagged.len()
    );

    Ok(Normalized {
        spectrum: normalized,
        flagged,
        continuum: options.return_continuum.then_some(continuum),
    })
}
