//! Seeded synthetic spectra: sloped continuum, Gaussian lines, white noise.
//!
//! Lines are defined in the rest frame and shifted to the observed frame with
//! the same Doppler relation the corrector uses, so a generated spectrum can
//! be pushed through the whole pipeline and compared against known truth.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::domain::{DopplerMode, SPEED_OF_LIGHT_KM_S, Spectrum};
use crate::error::{Result, SpectrumError};
use crate::velocity::doppler_factor;

/// A rest-frame line, relative to the continuum (`-0.4` = 40% deep absorption).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticLine {
    pub depth: f64,
    pub center: f64,
    pub sigma: f64,
}

/// Recipe for a synthetic spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub wavelength_min: f64,
    pub wavelength_max: f64,
    pub bins: usize,
    /// Continuum at `wavelength_min`.
    pub continuum_level: f64,
    /// Continuum slope per wavelength unit.
    pub continuum_slope: f64,
    pub lines: Vec<SyntheticLine>,
    /// Standard deviation of the additive noise; 0 gives a noiseless
    /// spectrum without an uncertainty array.
    pub noise_sd: f64,
    /// Radial velocity (km/s) applied to the lines.
    pub velocity: f64,
    pub doppler_mode: DopplerMode,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            wavelength_min: 6500.0,
            wavelength_max: 6620.0,
            bins: 1200,
            continuum_level: 100.0,
            continuum_slope: 0.05,
            lines: vec![SyntheticLine {
                depth: -0.5,
                center: 6562.8,
                sigma: 1.5,
            }],
            noise_sd: 0.5,
            velocity: 0.0,
            doppler_mode: DopplerMode::Relativistic,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleSpectrum {
    pub spectrum: Spectrum,
    /// Noise-free continuum on the generated grid.
    pub continuum: Vec<f64>,
    /// Line centers after the Doppler shift.
    pub observed_centers: Vec<f64>,
}

pub fn generate_spectrum(spec: &SyntheticSpec, seed: u64) -> Result<SampleSpectrum> {
    if spec.bins < 2 {
        return Err(SpectrumError::options("synthetic spectrum needs at least 2 bins"));
    }
    if !(spec.wavelength_min.is_finite()
        && spec.wavelength_max.is_finite()
        && spec.wavelength_min > 0.0
        && spec.wavelength_max > spec.wavelength_min)
    {
        return Err(SpectrumError::options(format!(
            "invalid synthetic wavelength range [{}, {}]",
            spec.wavelength_min, spec.wavelength_max
        )));
    }
    if !(spec.noise_sd.is_finite() && spec.noise_sd >= 0.0) {
        return Err(SpectrumError::options(format!(
            "noise_sd must be finite and >= 0, got {}",
            spec.noise_sd
        )));
    }
    if let Some(line) = spec.lines.iter().find(|l| !(l.sigma > 0.0)) {
        return Err(SpectrumError::InvalidParameters {
            reason: format!("synthetic line sigma must be > 0, got {}", line.sigma),
        });
    }

    let factor = doppler_factor(spec.velocity, spec.doppler_mode, SPEED_OF_LIGHT_KM_S)?;
    let observed: Vec<SyntheticLine> = spec
        .lines
        .iter()
        .map(|l| SyntheticLine {
            depth: l.depth,
            center: l.center * factor,
            sigma: l.sigma * factor,
        })
        .collect();

    let step = (spec.wavelength_max - spec.wavelength_min) / (spec.bins - 1) as f64;
    let wavelength: Vec<f64> = (0..spec.bins)
        .map(|i| spec.wavelength_min + step * i as f64)
        .collect();
    let continuum: Vec<f64> = wavelength
        .iter()
        .map(|w| spec.continuum_level + spec.continuum_slope * (w - spec.wavelength_min))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, spec.noise_sd)
        .map_err(|e| SpectrumError::options(format!("noise distribution error: {e}")))?;

    let flux: Vec<f64> = wavelength
        .iter()
        .zip(&continuum)
        .map(|(&w, &c)| {
            let profile: f64 = observed
                .iter()
                .map(|l| {
                    let z = (w - l.center) / l.sigma;
                    l.depth * (-0.5 * z * z).exp()
                })
                .sum();
            c * (1.0 + profile) + normal.sample(&mut rng)
        })
        .collect();

    let uncertainty = (spec.noise_sd > 0.0).then(|| vec![spec.noise_sd; spec.bins]);
    let spectrum = Spectrum::new(wavelength, flux, uncertainty)?;

    Ok(SampleSpectrum {
        spectrum,
        continuum,
        observed_centers: observed.iter().map(|l| l.center).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_spectrum() {
        let spec = SyntheticSpec::default();
        let a = generate_spectrum(&spec, 11).unwrap();
        let b = generate_spectrum(&spec, 11).unwrap();
        let c = generate_spectrum(&spec, 12).unwrap();
        assert_eq!(a.spectrum, b.spectrum);
        assert_ne!(a.spectrum, c.spectrum);
    }

    #[test]
    fn noiseless_spectrum_has_no_uncertainty() {
        let spec = SyntheticSpec {
            noise_sd: 0.0,
            lines: Vec::new(),
            ..SyntheticSpec::default()
        };
        let s = generate_spectrum(&spec, 0).unwrap();
        assert!(s.spectrum.uncertainty().is_none());
        assert_eq!(s.spectrum.flux(), s.continuum.as_slice());
    }

    #[test]
    fn lines_are_redshifted() {
        let spec = SyntheticSpec {
            velocity: 1000.0,
            ..SyntheticSpec::default()
        };
        let s = generate_spectrum(&spec, 0).unwrap();
        assert!(s.observed_centers[0] > 6562.8);
    }
}
