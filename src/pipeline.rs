//! End-to-end processing of one spectrum:
//! normalize -> (measure velocity) -> rest-frame correction -> line fit.
//!
//! Every intermediate is returned so callers can inspect or plot each stage.

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{DopplerOptions, FitOptions, FitResult, NormalizeOptions, Normalized, Spectrum};
use crate::error::Result;
use crate::fit::fit_spectrum_window;
use crate::velocity::{correct_radial_velocity, velocity_from_shift};

/// Where the radial velocity for the rest-frame correction comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum VelocitySource {
    /// Leave the wavelength axis untouched.
    None,
    /// A velocity known in advance (same units as the speed of light).
    Known { velocity: f64 },
    /// Fit a reference line in an observed-frame window and derive the
    /// velocity from its shift relative to `rest_wavelength`.
    Measured {
        rest_wavelength: f64,
        window: (f64, f64),
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub normalize: NormalizeOptions,
    pub doppler: DopplerOptions,
    pub velocity: VelocitySource,
    /// Rest-frame window containing the line of interest.
    pub line_window: (f64, f64),
    pub fit: FitOptions,
}

impl PipelineConfig {
    /// Defaults for every stage, no velocity correction.
    pub fn new(line_window: (f64, f64)) -> Self {
        Self {
            normalize: NormalizeOptions::default(),
            doppler: DopplerOptions::default(),
            velocity: VelocitySource::None,
            line_window,
            fit: FitOptions::default(),
        }
    }
}

/// All computed outputs of a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub normalized: Normalized,
    /// Velocity applied to the wavelength axis (if any).
    pub velocity: Option<f64>,
    /// Reference-line fit behind a measured velocity.
    pub reference_fit: Option<FitResult>,
    pub rest_frame: Spectrum,
    pub line_fit: FitResult,
}

/// Run every stage on `spectrum`.
pub fn run(spectrum: &Spectrum, config: &PipelineConfig) -> Result<PipelineOutput> {
    // 1) Continuum normalization.
    let normalized = crate::normalize::normalize(spectrum, &config.normalize)?;

    // 2) Resolve the radial velocity.
    let (velocity, reference_fit) = match config.velocity {
        VelocitySource::None => (None, None),
        VelocitySource::Known { velocity } => (Some(velocity), None),
        VelocitySource::Measured {
            rest_wavelength,
            window: (min, max),
        } => {
            let reference = fit_spectrum_window(&normalized.spectrum, min, max, &config.fit)?;
            if !reference.converged {
                warn!("reference line fit did not converge; measured velocity is unreliable");
            }
            let velocity = velocity_from_shift(
                reference.params.center,
                rest_wavelength,
                config.doppler.mode,
                config.doppler.speed_of_light,
            )?;
            info!(
                "measured velocity {velocity:.3} from line at {:.4} (rest {rest_wavelength})",
                reference.params.center
            );
            (Some(velocity), Some(reference))
        }
    };

    // 3) Rest-frame correction.
    let rest_frame = match velocity {
        Some(v) => correct_radial_velocity(&normalized.spectrum, v, &config.doppler)?,
        None => normalized.spectrum.clone(),
    };

    // 4) Line fit.
    let (min, max) = config.line_window;
    let line_fit = fit_spectrum_window(&rest_frame, min, max, &config.fit)?;
    info!(
        "line fit: center {:.4}, sigma {:.4}, amplitude {:.4}, converged {}",
        line_fit.params.center, line_fit.params.sigma, line_fit.params.amplitude, line_fit.converged
    );

    Ok(PipelineOutput {
        normalized,
        velocity,
        reference_fit,
        rest_frame,
        line_fit,
    })
}

/// Run the pipeline over many spectra in parallel; results keep input order.
pub fn run_batch(spectra: &[Spectrum], config: &PipelineConfig) -> Vec<Result<PipelineOutput>> {
    spectra.par_iter().map(|s| run(s, config)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SyntheticSpec, generate_spectrum};
    use crate::domain::ContinuumMethod;
    use crate::error::SpectrumError;

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::new((6552.0, 6574.0));
        config.normalize.method = ContinuumMethod::Polynomial {
            degree: 1,
            exclude: vec![(6540.0, 6590.0)],
            clip_sigma: None,
            clip_iterations: 0,
        };
        config
    }

    #[test]
    fn known_velocity_moves_line_to_rest_wavelength() {
        let spec = SyntheticSpec {
            velocity: 600.0,
            ..SyntheticSpec::default()
        };
        let sample = generate_spectrum(&spec, 3).unwrap();
        let mut config = config();
        config.velocity = VelocitySource::Known { velocity: 600.0 };

        let out = run(&sample.spectrum, &config).unwrap();
        assert_eq!(out.velocity, Some(600.0));
        assert!(out.line_fit.converged);
        assert!((out.line_fit.params.center - 6562.8).abs() < 0.05);
        assert!((out.line_fit.params.baseline - 1.0).abs() < 0.01);
        assert!((out.line_fit.params.amplitude + 0.5).abs() < 0.02);
    }

    #[test]
    fn measured_velocity_matches_injected_shift() {
        let spec = SyntheticSpec {
            velocity: -450.0,
            ..SyntheticSpec::default()
        };
        let sample = generate_spectrum(&spec, 5).unwrap();
        let mut config = config();
        config.velocity = VelocitySource::Measured {
            rest_wavelength: 6562.8,
            window: (6545.0, 6570.0),
        };

        let out = run(&sample.spectrum, &config).unwrap();
        let v = out.velocity.unwrap();
        assert!((v + 450.0).abs() < 5.0, "measured {v}");
        assert!(out.reference_fit.unwrap().converged);
        assert!((out.line_fit.params.center - 6562.8).abs() < 0.02);
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let good = generate_spectrum(&SyntheticSpec::default(), 1).unwrap().spectrum;
        let flat = Spectrum::new(
            (0..200).map(|i| 6500.0 + i as f64 * 0.5).collect(),
            vec![0.0; 200],
            None,
        )
        .unwrap();
        let out = run_batch(&[good, flat], &config());
        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(SpectrumError::InvalidSpectrum { .. })));
    }
}
