//! The validated spectrum shared between stages.
//!
//! A `Spectrum` is immutable once built: every stage returns a new instance,
//! so the input can be kept around for comparison.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrumError};

/// Wavelength / flux samples with optional 1-sigma uncertainties.
///
/// Invariants (checked by [`Spectrum::new`]):
/// - at least 2 bins, all arrays the same length
/// - wavelength finite and strictly increasing
/// - flux finite
/// - uncertainty non-negative and not NaN (`+inf` marks an unusable bin)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpectrum")]
pub struct Spectrum {
    wavelength: Vec<f64>,
    flux: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uncertainty: Option<Vec<f64>>,
}

/// Unchecked wire form of a spectrum.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSpectrum {
    pub wavelength: Vec<f64>,
    pub flux: Vec<f64>,
    #[serde(default)]
    pub uncertainty: Option<Vec<f64>>,
}

impl TryFrom<RawSpectrum> for Spectrum {
    type Error = SpectrumError;

    fn try_from(raw: RawSpectrum) -> Result<Self> {
        Spectrum::new(raw.wavelength, raw.flux, raw.uncertainty)
    }
}

impl Spectrum {
    pub fn new(wavelength: Vec<f64>, flux: Vec<f64>, uncertainty: Option<Vec<f64>>) -> Result<Self> {
        validate_wavelength(&wavelength)?;

        if flux.len() != wavelength.len() {
            return Err(SpectrumError::spectrum(format!(
                "flux has {} bins but wavelength has {}",
                flux.len(),
                wavelength.len()
            )));
        }
        if let Some(i) = flux.iter().position(|f| !f.is_finite()) {
            return Err(SpectrumError::spectrum(format!(
                "non-finite flux {} at bin {i}",
                flux[i]
            )));
        }

        if let Some(sigma) = &uncertainty {
            if sigma.len() != wavelength.len() {
                return Err(SpectrumError::spectrum(format!(
                    "uncertainty has {} bins but wavelength has {}",
                    sigma.len(),
                    wavelength.len()
                )));
            }
            if let Some(i) = sigma.iter().position(|s| s.is_nan() || *s < 0.0) {
                return Err(SpectrumError::spectrum(format!(
                    "uncertainty {} at bin {i} must be non-negative",
                    sigma[i]
                )));
            }
        }

        Ok(Self {
            wavelength,
            flux,
            uncertainty,
        })
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn uncertainty(&self) -> Option<&[f64]> {
        self.uncertainty.as_deref()
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    /// Always false for a constructed spectrum; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Wavelength coverage `(first, last)`.
    pub fn range(&self) -> (f64, f64) {
        (self.wavelength[0], self.wavelength[self.len() - 1])
    }

    /// Inverse-variance weights, or `None` when no uncertainty is attached.
    ///
    /// Infinite uncertainty yields weight 0; zero uncertainty yields `inf`,
    /// which the fitter rejects.
    pub fn weights(&self) -> Option<Vec<f64>> {
        self.uncertainty
            .as_ref()
            .map(|sigma| sigma.iter().map(|&s| inverse_variance(s)).collect())
    }

    /// Bins with `min <= wavelength <= max`, as a new spectrum.
    pub fn window(&self, min: f64, max: f64) -> Result<Spectrum> {
        if !(min.is_finite() && max.is_finite() && max > min) {
            return Err(SpectrumError::options(format!(
                "invalid wavelength window [{min}, {max}]"
            )));
        }
        let start = self.wavelength.partition_point(|&w| w < min);
        let end = self.wavelength.partition_point(|&w| w <= max);
        if end.saturating_sub(start) < 2 {
            return Err(SpectrumError::spectrum(format!(
                "window [{min}, {max}] holds {} bins, need at least 2",
                end.saturating_sub(start)
            )));
        }
        Ok(Spectrum {
            wavelength: self.wavelength[start..end].to_vec(),
            flux: self.flux[start..end].to_vec(),
            uncertainty: self.uncertainty.as_ref().map(|s| s[start..end].to_vec()),
        })
    }

    /// Same flux/uncertainty on a new wavelength axis.
    pub fn with_wavelength(&self, wavelength: Vec<f64>) -> Result<Spectrum> {
        Spectrum::new(wavelength, self.flux.clone(), self.uncertainty.clone())
    }

    /// Same wavelength axis with new flux/uncertainty.
    pub fn with_flux(&self, flux: Vec<f64>, uncertainty: Option<Vec<f64>>) -> Result<Spectrum> {
        Spectrum::new(self.wavelength.clone(), flux, uncertainty)
    }

    /// Keep only the bins at `indices` (ascending, in range).
    pub(crate) fn select(&self, indices: &[usize]) -> Result<Spectrum> {
        let pick = |v: &[f64]| indices.iter().map(|&i| v[i]).collect::<Vec<f64>>();
        Spectrum::new(
            pick(self.wavelength.as_slice()),
            pick(self.flux.as_slice()),
            self.uncertainty.as_deref().map(pick),
        )
    }
}

pub(crate) fn inverse_variance(sigma: f64) -> f64 {
    if sigma.is_infinite() {
        0.0
    } else {
        1.0 / (sigma * sigma)
    }
}

fn validate_wavelength(wavelength: &[f64]) -> Result<()> {
    if wavelength.len() < 2 {
        return Err(SpectrumError::spectrum(format!(
            "need at least 2 bins, got {}",
            wavelength.len()
        )));
    }
    if let Some(i) = wavelength.iter().position(|w| !w.is_finite()) {
        return Err(SpectrumError::spectrum(format!(
            "non-finite wavelength {} at bin {i}",
            wavelength[i]
        )));
    }
    if let Some(i) = wavelength.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SpectrumError::spectrum(format!(
            "wavelength not strictly increasing at bin {}: {} -> {}",
            i + 1,
            wavelength[i],
            wavelength[i + 1]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Spectrum {
        let w: Vec<f64> = (0..n).map(|i| 5000.0 + i as f64).collect();
        let f: Vec<f64> = (0..n).map(|i| 1.0 + 0.01 * i as f64).collect();
        Spectrum::new(w, f, None).unwrap()
    }

    #[test]
    fn rejects_non_increasing_wavelength() {
        let err = Spectrum::new(vec![1.0, 2.0, 2.0], vec![1.0; 3], None).unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidSpectrum { .. }));

        let err = Spectrum::new(vec![3.0, 2.0, 1.0], vec![1.0; 3], None).unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidSpectrum { .. }));
    }

    #[test]
    fn rejects_length_mismatch_and_short_input() {
        assert!(Spectrum::new(vec![1.0, 2.0], vec![1.0], None).is_err());
        assert!(Spectrum::new(vec![1.0], vec![1.0], None).is_err());
        assert!(Spectrum::new(vec![1.0, 2.0], vec![1.0, 1.0], Some(vec![0.1])).is_err());
    }

    #[test]
    fn rejects_nan_wavelength_and_negative_uncertainty() {
        assert!(Spectrum::new(vec![1.0, f64::NAN], vec![1.0, 1.0], None).is_err());
        assert!(Spectrum::new(vec![1.0, 2.0], vec![1.0, 1.0], Some(vec![0.1, -0.1])).is_err());
    }

    #[test]
    fn infinite_uncertainty_gives_zero_weight() {
        let s = Spectrum::new(vec![1.0, 2.0], vec![1.0, 1.0], Some(vec![0.5, f64::INFINITY])).unwrap();
        let w = s.weights().unwrap();
        assert!((w[0] - 4.0).abs() < 1e-12);
        assert_eq!(w[1], 0.0);
    }

    #[test]
    fn window_is_inclusive() {
        let s = ramp(20);
        let w = s.window(5003.0, 5007.0).unwrap();
        assert_eq!(w.len(), 5);
        assert_eq!(w.range(), (5003.0, 5007.0));
        assert!(s.window(5003.2, 5003.8).is_err());
    }

    #[test]
    fn deserialize_validates() {
        let ok = r#"{"wavelength":[1.0,2.0],"flux":[1.0,2.0]}"#;
        let s: Spectrum = serde_json::from_str(ok).unwrap();
        assert_eq!(s.len(), 2);

        let bad = r#"{"wavelength":[2.0,1.0],"flux":[1.0,2.0]}"#;
        assert!(serde_json::from_str::<Spectrum>(bad).is_err());
    }
}
