//! Doppler transforms between observed and rest-frame wavelengths.
//!
//! With `β = v / c` (positive = receding):
//!
//! - classical:    `λ_obs = λ_rest (1 + β)`
//! - relativistic: `λ_obs = λ_rest sqrt((1 + β) / (1 - β))`
//!
//! Both factors are positive on their domain, so the transform preserves the
//! ordering of the wavelength grid. Only the axis is remapped; flux is never
//! resampled.

use crate::domain::{DopplerDirection, DopplerMode, DopplerOptions, Spectrum};
use crate::error::{Result, SpectrumError};

/// Observed / rest wavelength ratio for velocity `v`.
pub fn doppler_factor(velocity: f64, mode: DopplerMode, speed_of_light: f64) -> Result<f64> {
    let invalid = |reason| SpectrumError::InvalidVelocity {
        velocity,
        speed_of_light,
        reason,
    };
    if !velocity.is_finite() {
        return Err(invalid("velocity must be finite"));
    }
    let beta = velocity / speed_of_light;
    match mode {
        DopplerMode::Classical => {
            if beta <= -1.0 {
                return Err(invalid("classical Doppler requires v > -c"));
            }
            Ok(1.0 + beta)
        }
        DopplerMode::Relativistic => {
            if beta.abs() >= 1.0 {
                return Err(invalid("relativistic Doppler requires |v| < c"));
            }
            Ok(((1.0 + beta) / (1.0 - beta)).sqrt())
        }
    }
}

/// Shift a single wavelength.
pub fn shift_wavelength(wavelength: f64, velocity: f64, options: &DopplerOptions) -> Result<f64> {
    options.validate()?;
    let factor = doppler_factor(velocity, options.mode, options.speed_of_light)?;
    Ok(apply(wavelength, factor, options.direction))
}

fn apply(wavelength: f64, factor: f64, direction: DopplerDirection) -> f64 {
    match direction {
        DopplerDirection::ObservedToRest => wavelength / factor,
        DopplerDirection::RestToObserved => wavelength * factor,
    }
}

/// Remap the wavelength axis of `spectrum`; flux and uncertainty carry over.
pub fn correct_radial_velocity(
    spectrum: &Spectrum,
    velocity: f64,
    options: &DopplerOptions,
) -> Result<Spectrum> {
    options.validate()?;
    let factor = doppler_factor(velocity, options.mode, options.speed_of_light)?;
    let wavelength = spectrum
        .wavelength()
        .iter()
        .map(|&w| apply(w, factor, options.direction))
        .collect();
    // Re-validate: extreme factors can overflow or collapse adjacent bins.
    spectrum.with_wavelength(wavelength)
}

/// Radial velocity implied by a line observed at `observed` with rest
/// wavelength `rest`.
pub fn velocity_from_shift(
    observed: f64,
    rest: f64,
    mode: DopplerMode,
    speed_of_light: f64,
) -> Result<f64> {
    if !(observed.is_finite() && rest.is_finite() && observed > 0.0 && rest > 0.0) {
        return Err(SpectrumError::InvalidParameters {
            reason: format!("wavelengths must be finite and > 0, got observed={observed}, rest={rest}"),
        });
    }
    let ratio = observed / rest;
    let beta = match mode {
        DopplerMode::Classical => ratio - 1.0,
        DopplerMode::Relativistic => {
            let r2 = ratio * ratio;
            (r2 - 1.0) / (r2 + 1.0)
        }
    };
    Ok(beta * speed_of_light)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SPEED_OF_LIGHT_KM_S;

    fn opts(direction: DopplerDirection, mode: DopplerMode) -> DopplerOptions {
        DopplerOptions {
            direction,
            mode,
            speed_of_light: SPEED_OF_LIGHT_KM_S,
        }
    }

    fn spectrum() -> Spectrum {
        let wl: Vec<f64> = (0..50).map(|i| 6500.0 + i as f64 * 2.5).collect();
        let flux: Vec<f64> = (0..50).map(|i| 1.0 - 0.001 * i as f64).collect();
        Spectrum::new(wl, flux, Some(vec![0.01; 50])).unwrap()
    }

    #[test]
    fn classical_redshift_moves_to_shorter_rest_wavelength() {
        let s = spectrum();
        let v = 300.0;
        let out = correct_radial_velocity(&s, v, &opts(DopplerDirection::ObservedToRest, DopplerMode::Classical)).unwrap();
        let expected = s.wavelength()[0] / (1.0 + v / SPEED_OF_LIGHT_KM_S);
        assert!((out.wavelength()[0] - expected).abs() < 1e-9);
        assert_eq!(out.flux(), s.flux());
        assert_eq!(out.uncertainty(), s.uncertainty());
    }

    #[test]
    fn round_trip_reproduces_grid() {
        let s = spectrum();
        let c = SPEED_OF_LIGHT_KM_S;
        for mode in [DopplerMode::Classical, DopplerMode::Relativistic] {
            for v in [-0.9 * c, -1234.5, 0.0, 42.0, 0.5 * c, 0.999 * c] {
                let rest = correct_radial_velocity(&s, v, &opts(DopplerDirection::ObservedToRest, mode)).unwrap();
                let back = correct_radial_velocity(&rest, v, &opts(DopplerDirection::RestToObserved, mode)).unwrap();
                for (a, b) in s.wavelength().iter().zip(back.wavelength()) {
                    assert!((a - b).abs() <= 1e-9 * a, "mode {mode:?} v {v}");
                }
            }
        }
    }

    #[test]
    fn relativistic_rejects_light_speed() {
        let s = spectrum();
        let o = opts(DopplerDirection::ObservedToRest, DopplerMode::Relativistic);
        for v in [SPEED_OF_LIGHT_KM_S, 2.0 * SPEED_OF_LIGHT_KM_S, -SPEED_OF_LIGHT_KM_S] {
            assert!(matches!(
                correct_radial_velocity(&s, v, &o),
                Err(SpectrumError::InvalidVelocity { .. })
            ));
        }
        assert!(correct_radial_velocity(&s, f64::NAN, &o).is_err());
    }

    #[test]
    fn classical_allows_superluminal_recession_only() {
        let s = spectrum();
        let o = opts(DopplerDirection::ObservedToRest, DopplerMode::Classical);
        assert!(correct_radial_velocity(&s, 2.0 * SPEED_OF_LIGHT_KM_S, &o).is_ok());
        assert!(matches!(
            correct_radial_velocity(&s, -SPEED_OF_LIGHT_KM_S, &o),
            Err(SpectrumError::InvalidVelocity { .. })
        ));
    }

    #[test]
    fn velocity_from_shift_inverts_factor() {
        let rest = 6562.8;
        for mode in [DopplerMode::Classical, DopplerMode::Relativistic] {
            let v = 2500.0;
            let o = opts(DopplerDirection::RestToObserved, mode);
            let observed = shift_wavelength(rest, v, &o).unwrap();
            let measured = velocity_from_shift(observed, rest, mode, SPEED_OF_LIGHT_KM_S).unwrap();
            assert!((measured - v).abs() < 1e-6);
        }
    }
}
