//! Levenberg–Marquardt fit of the Gaussian-plus-baseline model.
//!
//! The minimization is delegated to the `levenberg-marquardt` crate (a MINPACK
//! port). This module adapts the weighted line problem to it:
//!
//! ```text
//! r_i(u) = sqrt(w_i) * (f(x_i; θ(u)) - y_i)
//! ```
//!
//! Implementation choices:
//! - Bounds are a change of variables: the solver moves an unbounded vector
//!   `u` and every parameter is `θ_k = T_k(u_k)`. Two-sided bounds use a sine
//!   map, one-sided bounds a square-root map, equal bounds fix the parameter.
//! - `sigma` is always bounded below by 0, so the profile stays defined.
//! - Zero-weight samples are dropped before the solve.
//! - The solver's `ftol`/`xtol` are both set from the fit tolerance; its
//!   patience is the iteration budget.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use log::debug;
use nalgebra::storage::Owned;
use nalgebra::{DVector, Dyn, Matrix4, OMatrix, U4, Vector4};

use crate::domain::{Bound, GaussianParameters, ParameterBounds};
use crate::error::{Result, SpectrumError};
use crate::models::gaussian::{jacobian_row, profile_at};

/// Weighted samples the model is fit to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Samples<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub w: &'a [f64],
}

#[derive(Debug, Clone)]
pub(crate) struct Outcome {
    pub params: [f64; 4],
    pub converged: bool,
    /// Residual evaluations spent by the solver.
    pub iterations: usize,
    /// Weighted residual sum of squares at `params`.
    pub cost: f64,
    /// `JᵀWJ` at `params` in parameter space, for the covariance.
    pub jtj: Matrix4<f64>,
}

impl Samples<'_> {
    fn cost(&self, p: &[f64; 4]) -> f64 {
        let g = GaussianParameters::from_array(*p);
        self.x
            .iter()
            .zip(self.y)
            .zip(self.w)
            .filter(|(_, w)| **w > 0.0)
            .map(|((&x, &y), &w)| {
                let r = y - profile_at(x, &g);
                w * r * r
            })
            .sum()
    }

    fn normal_matrix(&self, p: &[f64; 4]) -> Matrix4<f64> {
        let g = GaussianParameters::from_array(*p);
        let mut jtj = Matrix4::<f64>::zeros();
        for (&x, &w) in self.x.iter().zip(self.w) {
            if w == 0.0 {
                continue;
            }
            let row = Vector4::from(jacobian_row(x, &g));
            jtj += row * row.transpose() * w;
        }
        jtj
    }
}

/// Map between a bounded parameter and the solver's unbounded coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Transform {
    Free,
    Fixed(f64),
    Lower(f64),
    Upper(f64),
    Both(f64, f64),
}

impl Transform {
    fn from_bound(b: Bound) -> Self {
        match (b.min.is_finite(), b.max.is_finite()) {
            (true, true) if b.min == b.max => Transform::Fixed(b.min),
            (true, true) => Transform::Both(b.min, b.max),
            (true, false) => Transform::Lower(b.min),
            (false, true) => Transform::Upper(b.max),
            (false, false) => Transform::Free,
        }
    }

    /// `v` must already lie inside the bound.
    fn to_internal(self, v: f64) -> f64 {
        match self {
            Transform::Free => v,
            Transform::Fixed(_) => 0.0,
            Transform::Lower(lo) => ((v - lo + 1.0).powi(2) - 1.0).sqrt(),
            Transform::Upper(hi) => ((hi - v + 1.0).powi(2) - 1.0).sqrt(),
            Transform::Both(lo, hi) => (2.0 * (v - lo) / (hi - lo) - 1.0).clamp(-1.0, 1.0).asin(),
        }
    }

    fn to_external(self, u: f64) -> f64 {
        match self {
            Transform::Free => u,
            Transform::Fixed(v) => v,
            Transform::Lower(lo) => lo - 1.0 + (u * u + 1.0).sqrt(),
            Transform::Upper(hi) => hi + 1.0 - (u * u + 1.0).sqrt(),
            Transform::Both(lo, hi) => lo + 0.5 * (u.sin() + 1.0) * (hi - lo),
        }
    }

    /// `dθ/du`
    fn derivative(self, u: f64) -> f64 {
        match self {
            Transform::Free => 1.0,
            Transform::Fixed(_) => 0.0,
            Transform::Lower(_) => u / (u * u + 1.0).sqrt(),
            Transform::Upper(_) => -u / (u * u + 1.0).sqrt(),
            Transform::Both(lo, hi) => 0.5 * u.cos() * (hi - lo),
        }
    }
}

fn transforms(bounds: &ParameterBounds) -> [Transform; 4] {
    let sigma = Bound::new(bounds.sigma.min.max(0.0), bounds.sigma.max);
    [
        Transform::from_bound(bounds.amplitude),
        Transform::from_bound(bounds.center),
        Transform::from_bound(sigma),
        Transform::from_bound(bounds.baseline),
    ]
}

/// Gaussian line problem in solver coordinates.
struct LineProblem {
    x: Vec<f64>,
    y: Vec<f64>,
    sqrt_w: Vec<f64>,
    transforms: [Transform; 4],
    internal: Vector4<f64>,
}

impl LineProblem {
    fn new(samples: Samples<'_>, transforms: [Transform; 4], start: [f64; 4]) -> Self {
        let mut x = Vec::with_capacity(samples.x.len());
        let mut y = Vec::with_capacity(samples.x.len());
        let mut sqrt_w = Vec::with_capacity(samples.x.len());
        for ((&xi, &yi), &wi) in samples.x.iter().zip(samples.y).zip(samples.w) {
            if wi > 0.0 {
                x.push(xi);
                y.push(yi);
                sqrt_w.push(wi.sqrt());
            }
        }
        let internal = Vector4::from_fn(|k, _| transforms[k].to_internal(start[k]));
        Self {
            x,
            y,
            sqrt_w,
            transforms,
            internal,
        }
    }

    fn external(&self) -> [f64; 4] {
        std::array::from_fn(|k| self.transforms[k].to_external(self.internal[k]))
    }
}

impl LeastSquaresProblem<f64, Dyn, U4> for LineProblem {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, U4>;
    type ParameterStorage = Owned<f64, U4>;

    fn set_params(&mut self, u: &Vector4<f64>) {
        self.internal.copy_from(u);
    }

    fn params(&self) -> Vector4<f64> {
        self.internal
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let g = GaussianParameters::from_array(self.external());
        if !(g.sigma > 0.0) {
            return None;
        }
        let r = DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(&self.y)
                .zip(&self.sqrt_w)
                .map(|((&x, &y), &sw)| sw * (profile_at(x, &g) - y)),
        );
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian(&self) -> Option<OMatrix<f64, Dyn, U4>> {
        let g = GaussianParameters::from_array(self.external());
        if !(g.sigma > 0.0) {
            return None;
        }
        let chain: [f64; 4] = std::array::from_fn(|k| self.transforms[k].derivative(self.internal[k]));
        let mut jac = OMatrix::<f64, Dyn, U4>::zeros(self.x.len());
        for (i, (&x, &sw)) in self.x.iter().zip(&self.sqrt_w).enumerate() {
            let row = jacobian_row(x, &g);
            for k in 0..4 {
                jac[(i, k)] = sw * row[k] * chain[k];
            }
        }
        jac.iter().all(|v| v.is_finite()).then_some(jac)
    }
}

/// Run Levenberg–Marquardt from `start`.
///
/// Exhausting the budget is reported as `converged = false`, not as an
/// error. Errors are reserved for a non-finite objective.
pub(crate) fn minimize(
    samples: Samples<'_>,
    start: [f64; 4],
    bounds: &ParameterBounds,
    tolerance: f64,
    max_iterations: usize,
) -> Result<Outcome> {
    let transforms = transforms(bounds);
    let problem = LineProblem::new(samples, transforms, bounds.clamp(start));

    let start_cost = problem.residuals().map(|r| r.norm_squared());
    if !start_cost.is_some_and(f64::is_finite) {
        return Err(SpectrumError::divergence(format!(
            "objective is not finite at the starting point {:?}",
            problem.external()
        )));
    }

    let (problem, report) = LevenbergMarquardt::new()
        .with_ftol(tolerance)
        .with_xtol(tolerance)
        .with_patience(max_iterations)
        .minimize(problem);

    let converged = match &report.termination {
        reason if reason.was_successful() => true,
        TerminationReason::LostPatience => false,
        TerminationReason::Numerical(what) | TerminationReason::User(what) => {
            return Err(SpectrumError::divergence(format!(
                "solver hit a non-finite {what} after {} evaluations",
                report.number_of_evaluations
            )));
        }
        other => {
            return Err(SpectrumError::divergence(format!("solver stopped: {other:?}")));
        }
    };

    let params = problem.external();
    if params.iter().any(|v| !v.is_finite()) {
        return Err(SpectrumError::divergence(format!(
            "parameters diverged to {params:?}"
        )));
    }
    let cost = samples.cost(&params);

    debug!(
        "levenberg-marquardt finished: {:?}, evaluations={}, cost={cost:.6e}",
        report.termination, report.number_of_evaluations
    );

    Ok(Outcome {
        params,
        converged,
        iterations: report.number_of_evaluations,
        cost,
        jtj: samples.normal_matrix(&params),
    })
}
