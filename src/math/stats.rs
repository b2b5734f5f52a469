//! Order statistics used by continuum estimation and initial guesses.

use std::cmp::Ordering;

fn sort_f64(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

/// Median of `values` (reordered in place). `None` if empty.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    sort_f64(values);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    median_mut(&mut values.to_vec())
}

/// Percentile `q` in `[0, 100]`, linearly interpolated between order
/// statistics (the usual "linear" definition).
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sort_f64(&mut sorted);
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Running median with an odd `window`; the window is truncated at the edges.
pub fn running_median(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let half = window / 2;
    let mut buf = Vec::with_capacity(window.min(n));
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            buf.clear();
            buf.extend_from_slice(&values[lo..hi]);
            median_mut(&mut buf).unwrap_or(values[i])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 0.0), Some(1.0));
        assert_eq!(percentile(&v, 100.0), Some(5.0));
        assert_eq!(percentile(&v, 50.0), Some(3.0));
        assert!((percentile(&v, 90.0).unwrap() - 4.6).abs() < 1e-12);
        assert_eq!(percentile(&v, 101.0), None);
    }

    #[test]
    fn running_median_removes_spike() {
        let v = [1.0, 1.0, 1.0, 50.0, 1.0, 1.0, 1.0];
        let m = running_median(&v, 3);
        assert!(m.iter().all(|&x| x == 1.0));
    }

    #[test]
    fn running_median_truncates_at_edges() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        let m = running_median(&v, 5);
        assert_eq!(m, vec![2.0, 2.5, 3.0, 3.5, 4.0]);
    }
}
