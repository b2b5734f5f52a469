//! Continuum estimation.
//!
//! Every method returns one continuum value per input bin so that the
//! normalizer can divide or subtract elementwise.

use log::debug;

use crate::domain::{ContinuumMethod, Spectrum};
use crate::error::{Result, SpectrumError};
use crate::math::{percentile, polyfit, running_median};

/// Estimate the continuum at every bin of `spectrum`.
pub fn estimate_continuum(spectrum: &Spectrum, method: &ContinuumMethod) -> Result<Vec<f64>> {
    let flux = spectrum.flux();
    match method {
        ContinuumMethod::Percentile { percentile: q } => {
            let level = percentile(flux, *q).ok_or_else(|| {
                SpectrumError::options(format!("percentile must be within [0, 100], got {q}"))
            })?;
            Ok(vec![level; flux.len()])
        }
        ContinuumMethod::MedianFilter { window } => {
            if *window == 0 || window % 2 == 0 {
                return Err(SpectrumError::options(format!(
                    "median window must be odd and > 0, got {window}"
                )));
            }
            Ok(running_median(flux, *window))
        }
        ContinuumMethod::Polynomial {
            degree,
            exclude,
            clip_sigma,
            clip_iterations,
        } => polynomial_continuum(spectrum, *degree, exclude, *clip_sigma, *clip_iterations),
    }
}

fn polynomial_continuum(
    spectrum: &Spectrum,
    degree: usize,
    exclude: &[(f64, f64)],
    clip_sigma: Option<f64>,
    clip_iterations: usize,
) -> Result<Vec<f64>> {
    let wl = spectrum.wavelength();
    let flux = spectrum.flux();
    let weights = spectrum.weights();
    let (first, last) = spectrum.range();
    let mid = 0.5 * (first + last);
    let half_span = 0.5 * (last - first);
    let min_bins = degree + 2;

    // Line-free bins carrying information.
    let mut keep: Vec<usize> = (0..wl.len())
        .filter(|&i| !exclude.iter().any(|&(lo, hi)| wl[i] >= lo && wl[i] <= hi))
        .filter(|&i| weights.as_ref().is_none_or(|w| w[i] > 0.0))
        .collect();

    if keep.len() < min_bins {
        return Err(SpectrumError::spectrum(format!(
            "polynomial continuum of degree {degree} needs at least {min_bins} line-free bins, got {}",
            keep.len()
        )));
    }

    let rounds = if clip_sigma.is_some() { clip_iterations } else { 0 };
    let mut round = 0;
    loop {
        let x: Vec<f64> = keep.iter().map(|&i| wl[i]).collect();
        let y: Vec<f64> = keep.iter().map(|&i| flux[i]).collect();
        let w: Option<Vec<f64>> = weights.as_ref().map(|w| keep.iter().map(|&i| w[i]).collect());

        let poly = polyfit(&x, &y, w.as_deref(), degree, mid, half_span).ok_or_else(|| {
            SpectrumError::spectrum(format!(
                "polynomial continuum of degree {degree} is singular on {} bins",
                keep.len()
            ))
        })?;

        let Some(k) = clip_sigma.filter(|_| round < rounds) else {
            return Ok(wl.iter().map(|&v| poly.eval(v)).collect());
        };

        let resid: Vec<f64> = x.iter().zip(&y).map(|(&xi, &yi)| yi - poly.eval(xi)).collect();
        let rms = (resid.iter().map(|r| r * r).sum::<f64>() / resid.len() as f64).sqrt();
        let survivors: Vec<usize> = keep
            .iter()
            .zip(&resid)
            .filter(|(_, r)| r.abs() <= k * rms)
            .map(|(&i, _)| i)
            .collect();

        round += 1;
        if survivors.len() == keep.len() || survivors.len() < min_bins {
            // Nothing clipped, or clipping would leave the fit underdetermined.
            return Ok(wl.iter().map(|&v| poly.eval(v)).collect());
        }
        debug!(
            "continuum clip round {round}: kept {} of {} bins (rms {rms:.3e})",
            survivors.len(),
            keep.len()
        );
        keep = survivors;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(flux: Vec<f64>) -> Spectrum {
        let wl: Vec<f64> = (0..flux.len()).map(|i| 4000.0 + i as f64 * 0.5).collect();
        Spectrum::new(wl, flux, None).unwrap()
    }

    #[test]
    fn percentile_gives_flat_continuum() {
        let s = spectrum(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let c = estimate_continuum(&s, &ContinuumMethod::Percentile { percentile: 50.0 }).unwrap();
        assert_eq!(c, vec![3.0; 5]);
    }

    #[test]
    fn polynomial_ignores_excluded_line() {
        // Linear continuum with a deep absorption line in the middle.
        let n = 101;
        let flux: Vec<f64> = (0..n)
            .map(|i| {
                let cont = 2.0 + 0.01 * i as f64;
                if (45..=55).contains(&i) { cont * 0.3 } else { cont }
            })
            .collect();
        let s = spectrum(flux);
        let wl = s.wavelength().to_vec();
        let method = ContinuumMethod::Polynomial {
            degree: 1,
            exclude: vec![(wl[44], wl[56])],
            clip_sigma: None,
            clip_iterations: 0,
        };
        let c = estimate_continuum(&s, &method).unwrap();
        for i in 0..n {
            assert!((c[i] - (2.0 + 0.01 * i as f64)).abs() < 1e-9);
        }
    }

    #[test]
    fn sigma_clipping_rejects_unmasked_line() {
        let n = 201;
        let flux: Vec<f64> = (0..n)
            .map(|i| if (95..=105).contains(&i) { 0.2 } else { 1.0 })
            .collect();
        let s = spectrum(flux);
        let method = ContinuumMethod::Polynomial {
            degree: 0,
            exclude: Vec::new(),
            clip_sigma: Some(2.0),
            clip_iterations: 5,
        };
        let c = estimate_continuum(&s, &method).unwrap();
        assert!(c.iter().all(|&v| (v - 1.0).abs() < 1e-9));
    }

    #[test]
    fn polynomial_needs_enough_free_bins() {
        let s = spectrum(vec![1.0; 5]);
        let method = ContinuumMethod::Polynomial {
            degree: 4,
            exclude: Vec::new(),
            clip_sigma: None,
            clip_iterations: 0,
        };
        assert!(matches!(
            estimate_continuum(&s, &method),
            Err(SpectrumError::InvalidSpectrum { .. })
        ));
    }
}
