//! Weighted linear least squares.
//!
//! Used for polynomial continuum fits:
//!
//! ```text
//! minimize Σ w_i (y_i - Σ_k c_k u_i^k)^2,   u_i = (x_i - mid) / half_span
//! ```
//!
//! Rows are scaled by `sqrt(w_i)` and the resulting ordinary problem is solved
//! by SVD, which copes with tall and nearly collinear design matrices.
//! Rescaling `x` to `[-1, 1]` keeps the Vandermonde columns well conditioned
//! at optical wavelengths (`x ~ 10^3..10^4`).

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// A fitted polynomial in the rescaled coordinate `u = (x - mid) / half_span`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
    mid: f64,
    half_span: f64,
}

impl Polynomial {
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        let u = (x - self.mid) / self.half_span;
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * u + c)
    }
}

/// Weighted polynomial fit of `degree` to `(x, y)`.
///
/// `mid` / `half_span` define the rescaling and are usually taken from the
/// full spectrum so the polynomial can be evaluated everywhere.
/// Returns `None` when the system is underdetermined or singular.
pub fn polyfit(
    x: &[f64],
    y: &[f64],
    w: Option<&[f64]>,
    degree: usize,
    mid: f64,
    half_span: f64,
) -> Option<Polynomial> {
    let n = x.len();
    let p = degree + 1;
    if n < p || y.len() != n || !(half_span > 0.0) {
        return None;
    }

    let mut xw = DMatrix::<f64>::zeros(n, p);
    let mut yw = DVector::<f64>::zeros(n);
    for i in 0..n {
        let sw = w.map_or(1.0, |w| w[i].sqrt());
        let u = (x[i] - mid) / half_span;
        let mut pow = 1.0;
        for k in 0..p {
            xw[(i, k)] = pow * sw;
            pow *= u;
        }
        yw[i] = y[i] * sw;
    }

    let coeffs = solve_least_squares(&xw, &yw)?;
    Some(Polynomial {
        coeffs: coeffs.iter().copied().collect(),
        mid,
        half_span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn polyfit_recovers_quadratic_at_optical_wavelengths() {
        let x: Vec<f64> = (0..200).map(|i| 6000.0 + i as f64 * 5.0).collect();
        let truth = |v: f64| 1.0 + 2e-4 * (v - 6000.0) - 1e-7 * (v - 6000.0).powi(2);
        let y: Vec<f64> = x.iter().map(|&v| truth(v)).collect();

        let poly = polyfit(&x, &y, None, 2, 6497.5, 497.5).unwrap();
        assert_eq!(poly.degree(), 2);
        for &v in &[6000.0, 6321.0, 6995.0] {
            assert!((poly.eval(v) - truth(v)).abs() < 1e-9);
        }
    }

    #[test]
    fn polyfit_rejects_underdetermined() {
        assert!(polyfit(&[1.0, 2.0], &[1.0, 2.0], None, 2, 1.5, 0.5).is_none());
    }

    #[test]
    fn zero_weight_points_are_ignored() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 1.0, 1.0, 100.0];
        let w = [1.0, 1.0, 1.0, 0.0];
        let poly = polyfit(&x, &y, Some(&w), 0, 1.5, 1.5).unwrap();
        assert!((poly.eval(3.0) - 1.0).abs() < 1e-10);
    }
}
