//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between stages in-memory
//! - exported by downstream consumers (JSON, tables, plots)
//! - reloaded later for comparisons

use serde::{Deserialize, Serialize};

use crate::domain::constants::{
    DEFAULT_FIT_TOLERANCE, DEFAULT_MAX_ITERATIONS, DEFAULT_MEDIAN_WINDOW, DEFAULT_MIN_CONTINUUM,
    FWHM_PER_SIGMA, SPEED_OF_LIGHT_KM_S,
};
use crate::domain::spectrum::Spectrum;
use crate::error::{Result, SpectrumError};

/// How the continuum estimate is removed from the flux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// `flux / continuum`: lines become fractional depths/heights around 1.0.
    Divide,
    /// `flux - continuum`: lines sit on a zero baseline.
    Subtract,
}

/// How the continuum level is estimated at each bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum ContinuumMethod {
    /// Flat continuum at a flux percentile (0..=100).
    ///
    /// High percentiles (80–95) suit absorption spectra, since lines pull
    /// flux *below* the continuum.
    Percentile { percentile: f64 },
    /// Running median with an odd window (in bins), truncated at the edges.
    MedianFilter { window: usize },
    /// Weighted polynomial fit to the line-free bins.
    Polynomial {
        degree: usize,
        /// Wavelength ranges (inclusive) left out of the fit, e.g. known lines.
        #[serde(default)]
        exclude: Vec<(f64, f64)>,
        /// Reject bins further than `clip_sigma` RMS from the fit and refit.
        #[serde(default)]
        clip_sigma: Option<f64>,
        /// Number of clip-and-refit rounds (ignored without `clip_sigma`).
        #[serde(default)]
        clip_iterations: usize,
    },
}

impl Default for ContinuumMethod {
    fn default() -> Self {
        ContinuumMethod::MedianFilter {
            window: DEFAULT_MEDIAN_WINDOW,
        }
    }
}

/// Continuum normalization options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    pub method: ContinuumMethod,
    pub mode: NormalizeMode,
    /// Relative threshold below which a continuum value counts as zero
    /// (divide mode only).
    pub min_continuum: f64,
    /// Return the continuum estimate alongside the normalized spectrum.
    pub return_continuum: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            method: ContinuumMethod::default(),
            mode: NormalizeMode::Divide,
            min_continuum: DEFAULT_MIN_CONTINUUM,
            return_continuum: false,
        }
    }
}

impl NormalizeOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_continuum.is_finite() && self.min_continuum >= 0.0) {
            return Err(SpectrumError::options(format!(
                "min_continuum must be finite and >= 0, got {}",
                self.min_continuum
            )));
        }
        match &self.method {
            ContinuumMethod::Percentile { percentile } => {
                if !(0.0..=100.0).contains(percentile) {
                    return Err(SpectrumError::options(format!(
                        "percentile must be within [0, 100], got {percentile}"
                    )));
                }
            }
            ContinuumMethod::MedianFilter { window } => {
                if *window == 0 || window % 2 == 0 {
                    return Err(SpectrumError::options(format!(
                        "median window must be odd and > 0, got {window}"
                    )));
                }
            }
            ContinuumMethod::Polynomial {
                exclude,
                clip_sigma,
                ..
            } => {
                if let Some((lo, hi)) = exclude.iter().find(|(lo, hi)| !(lo.is_finite() && hi.is_finite() && hi >= lo)) {
                    return Err(SpectrumError::options(format!(
                        "invalid exclusion range [{lo}, {hi}]"
                    )));
                }
                if let Some(k) = clip_sigma {
                    if !(k.is_finite() && *k > 0.0) {
                        return Err(SpectrumError::options(format!(
                            "clip_sigma must be finite and > 0, got {k}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Output of continuum normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    /// Normalized spectrum (degenerate bins removed in divide mode).
    pub spectrum: Spectrum,
    /// Indices (into the input spectrum) of bins dropped for a zero or
    /// non-finite continuum.
    pub flagged: Vec<usize>,
    /// Continuum estimate on the input grid, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuum: Option<Vec<f64>>,
}

/// Direction of the Doppler transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DopplerDirection {
    ObservedToRest,
    RestToObserved,
}

/// Doppler relation used to map wavelengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DopplerMode {
    /// `λ_obs = λ_rest (1 + v/c)`.
    Classical,
    /// `λ_obs = λ_rest sqrt((1 + v/c) / (1 - v/c))`.
    Relativistic,
}

/// Radial-velocity correction options.
///
/// Velocities are positive for receding sources (redshift) and expressed in
/// the same units as `speed_of_light` (km/s by default).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DopplerOptions {
    pub direction: DopplerDirection,
    pub mode: DopplerMode,
    pub speed_of_light: f64,
}

impl Default for DopplerOptions {
    fn default() -> Self {
        Self {
            direction: DopplerDirection::ObservedToRest,
            mode: DopplerMode::Relativistic,
            speed_of_light: SPEED_OF_LIGHT_KM_S,
        }
    }
}

impl DopplerOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.speed_of_light.is_finite() && self.speed_of_light > 0.0) {
            return Err(SpectrumError::options(format!(
                "speed of light must be finite and > 0, got {}",
                self.speed_of_light
            )));
        }
        Ok(())
    }
}

/// Parameters of `baseline + amplitude * exp(-(λ - center)^2 / (2 sigma^2))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianParameters {
    /// Positive for emission, negative for absorption.
    pub amplitude: f64,
    pub center: f64,
    pub sigma: f64,
    pub baseline: f64,
}

impl GaussianParameters {
    pub fn new(amplitude: f64, center: f64, sigma: f64, baseline: f64) -> Self {
        Self {
            amplitude,
            center,
            sigma,
            baseline,
        }
    }

    /// Parameter vector in optimizer order: amplitude, center, sigma, baseline.
    pub fn to_array(self) -> [f64; 4] {
        [self.amplitude, self.center, self.sigma, self.baseline]
    }

    pub fn from_array(p: [f64; 4]) -> Self {
        Self::new(p[0], p[1], p[2], p[3])
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Full width at half maximum.
    pub fn fwhm(&self) -> f64 {
        FWHM_PER_SIGMA * self.sigma
    }

    /// Integrated line flux (above the baseline).
    pub fn area(&self) -> f64 {
        self.amplitude * self.sigma * (2.0 * std::f64::consts::PI).sqrt()
    }

    /// Equivalent width, positive for absorption. `None` for a zero baseline.
    pub fn equivalent_width(&self) -> Option<f64> {
        if self.baseline == 0.0 || !self.baseline.is_finite() {
            None
        } else {
            Some(-self.area() / self.baseline)
        }
    }
}

/// One-sigma standard errors of [`GaussianParameters`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterErrors {
    pub amplitude: f64,
    pub center: f64,
    pub sigma: f64,
    pub baseline: f64,
}

impl ParameterErrors {
    pub fn from_array(p: [f64; 4]) -> Self {
        Self {
            amplitude: p[0],
            center: p[1],
            sigma: p[2],
            baseline: p[3],
        }
    }
}

/// Closed interval constraint on one parameter. Defaults to unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub min: f64,
    pub max: f64,
}

impl Default for Bound {
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }
}

impl Bound {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, v: f64) -> f64 {
        v.max(self.min).min(self.max)
    }
}

/// Per-parameter box constraints for the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterBounds {
    pub amplitude: Bound,
    pub center: Bound,
    pub sigma: Bound,
    pub baseline: Bound,
}

impl ParameterBounds {
    pub fn to_array(self) -> [Bound; 4] {
        [self.amplitude, self.center, self.sigma, self.baseline]
    }

    pub fn clamp(&self, p: [f64; 4]) -> [f64; 4] {
        let b = self.to_array();
        [
            b[0].clamp(p[0]),
            b[1].clamp(p[1]),
            b[2].clamp(p[2]),
            b[3].clamp(p[3]),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let names = ["amplitude", "center", "sigma", "baseline"];
        for (name, b) in names.iter().zip(self.to_array()) {
            if b.min.is_nan() || b.max.is_nan() || b.min > b.max {
                return Err(SpectrumError::options(format!(
                    "invalid bound for {name}: [{}, {}]",
                    b.min, b.max
                )));
            }
        }
        if self.sigma.max <= 0.0 {
            return Err(SpectrumError::options(format!(
                "sigma upper bound must be > 0, got {}",
                self.sigma.max
            )));
        }
        Ok(())
    }
}

/// Where per-point fit weights come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightSource {
    /// `w_i = 1 / sigma_i^2` when uncertainties are available, else uniform.
    Uncertainty,
    /// `w_i = 1` regardless of uncertainties.
    Uniform,
}

/// Gaussian fitter options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Starting point; derived from the data when absent.
    pub initial: Option<GaussianParameters>,
    pub bounds: ParameterBounds,
    pub weights: WeightSource,
    /// Relative tolerance on both the parameter step and the reduction of
    /// the residual sum of squares.
    pub tolerance: f64,
    /// Solver patience: at most `5 * max_iterations` residual evaluations.
    pub max_iterations: usize,
    /// Treat uncertainties as absolute: do not rescale the covariance by the
    /// reduced chi-square.
    pub absolute_sigma: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            initial: None,
            bounds: ParameterBounds::default(),
            weights: WeightSource::Uncertainty,
            tolerance: DEFAULT_FIT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            absolute_sigma: false,
        }
    }
}

impl FitOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SpectrumError::options(format!(
                "tolerance must be finite and > 0, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(SpectrumError::options("max_iterations must be > 0"));
        }
        self.bounds.validate()
    }
}

/// Output of a Gaussian fit.
///
/// When `converged` is false the parameters are the last optimizer iterate and
/// must be treated as unreliable; `errors` is then always `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub params: GaussianParameters,
    /// Standard errors from the fit covariance (absent if not converged or
    /// the covariance is singular / has no degrees of freedom).
    pub errors: Option<ParameterErrors>,
    pub converged: bool,
    /// Weighted residual sum of squares at `params`.
    pub rss: f64,
    /// `rss / (n - 4)`, absent with zero degrees of freedom.
    pub reduced_chi2: Option<f64>,
    /// Residual evaluations spent by the optimizer.
    pub iterations: usize,
    pub n_points: usize,
}
