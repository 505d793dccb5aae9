//! Closed-form statistics over short time series.
//!
//! All routines are total: degenerate input (too few points, constant series, zero
//! denominators) resolves to a neutral value instead of NaN.

use serde::{Deserialize, Serialize};

use crate::types::EPSILON;

/// Ordinary least squares fit `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n)
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Fits `(x, y)` pairs. Fewer than two points, or no spread in x, yields all zeros.
pub fn fit(points: &[(f64, f64)]) -> Regression {
    if points.len() < 2 {
        return Regression::default();
    }

    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denominator = n * sum_xx - sum_x.powi(2);
    if denominator.abs() < EPSILON {
        return Regression::default();
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let r_squared = if ss_tot < EPSILON {
        0.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    Regression {
        slope,
        intercept,
        r_squared,
    }
}

/// Fits a series against its index `0..n`.
pub fn fit_series(values: &[f64]) -> Regression {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, *v))
        .collect();
    fit(&points)
}

/// Weighted average of the most recent points.
///
/// `weights` ascend towards the most recent point. With fewer points than weights, only the
/// trailing weights are used and renormalized.
pub fn weighted_moving_average(values: &[f64], weights: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if weights.is_empty() {
        return mean(values);
    }

    let k = weights.len().min(values.len());
    let recent = &values[values.len() - k..];
    let used = &weights[weights.len() - k..];
    let total: f64 = used.iter().sum();
    if total < EPSILON {
        return mean(recent);
    }

    recent
        .iter()
        .zip(used)
        .map(|(v, w)| v * (w / total))
        .sum()
}

pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Mean discrete second derivative; 0 with fewer than three points.
pub fn acceleration(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let second: Vec<f64> = values
        .windows(3)
        .map(|w| w[2] - 2.0 * w[1] + w[0])
        .collect();
    mean(&second)
}

/// Population standard deviation of the trailing `window` points (whole series when 0).
pub fn moving_std_dev(values: &[f64], window: usize) -> f64 {
    if window == 0 || window >= values.len() {
        return population_std_dev(values);
    }
    population_std_dev(&values[values.len() - window..])
}

/// Trailing simple moving average at every index, using the points available so far.
pub fn moving_average_series(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            mean(&values[start..=i])
        })
        .collect()
}

/// Pearson correlation coefficient. Pairs beyond the shorter slice are ignored; degenerate
/// input returns 0.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = mean(xs);
    let mean_y = mean(ys);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator < EPSILON || !denominator.is_finite() {
        return 0.0;
    }
    (cov / denominator).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_fit_perfect_line() {
        let points: Vec<(f64, f64)> = (0..10).map(|x| (x as f64, 2.0 * x as f64 + 3.0)).collect();
        let r = fit(&points);
        assert!((r.slope - 2.0).abs() < TOL);
        assert!((r.intercept - 3.0).abs() < TOL);
        assert!((r.r_squared - 1.0).abs() < TOL);
        assert!((r.predict(20.0) - 43.0).abs() < TOL);
    }

    #[test]
    fn test_fit_degenerate_inputs() {
        assert_eq!(fit(&[]), Regression::default());
        assert_eq!(fit(&[(1.0, 5.0)]), Regression::default());
        assert_eq!(fit(&[(2.0, 1.0), (2.0, 9.0)]), Regression::default());
    }

    #[test]
    fn test_fit_constant_series_has_zero_r_squared() {
        let r = fit_series(&[60.0, 60.0, 60.0, 60.0]);
        assert!(r.slope.abs() < TOL);
        assert!((r.intercept - 60.0).abs() < TOL);
        assert_eq!(r.r_squared, 0.0);
    }

    #[test]
    fn test_fit_noisy_series_partial_fit() {
        let r = fit_series(&[50.0, 65.0, 55.0, 75.0, 70.0]);
        assert!(r.slope > 0.0);
        assert!(r.r_squared > 0.0 && r.r_squared < 1.0);
    }

    #[test]
    fn test_weighted_moving_average_full_window() {
        // (10*1 + 20*2 + 30*3) / 6
        let wma = weighted_moving_average(&[10.0, 20.0, 30.0], &[1.0, 2.0, 3.0]);
        assert!((wma - 140.0 / 6.0).abs() < TOL);
    }

    #[test]
    fn test_weighted_moving_average_truncates_weights() {
        // Only the trailing weights 4 and 5 apply to two points.
        let wma = weighted_moving_average(&[10.0, 20.0], &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((wma - (10.0 * 4.0 + 20.0 * 5.0) / 9.0).abs() < TOL);
    }

    #[test]
    fn test_weighted_moving_average_uses_recent_points() {
        let wma = weighted_moving_average(&[0.0, 0.0, 0.0, 50.0, 50.0], &[1.0, 1.0]);
        assert!((wma - 50.0).abs() < TOL);
        assert_eq!(weighted_moving_average(&[], &[1.0]), 0.0);
        assert_eq!(weighted_moving_average(&[4.0, 6.0], &[0.0, 0.0]), 5.0);
    }

    #[test]
    fn test_acceleration() {
        assert_eq!(acceleration(&[1.0, 2.0]), 0.0);
        // linear: zero second derivative
        assert!(acceleration(&[1.0, 3.0, 5.0, 7.0]).abs() < TOL);
        // quadratic x^2: second difference is 2
        assert!((acceleration(&[0.0, 1.0, 4.0, 9.0, 16.0]) - 2.0).abs() < TOL);
    }

    #[test]
    fn test_population_std_dev_divides_by_n() {
        let sd = population_std_dev(&[50.0, 60.0, 70.0, 80.0, 90.0]);
        assert!((sd - 200f64.sqrt()).abs() < TOL);
        assert_eq!(population_std_dev(&[]), 0.0);
    }

    #[test]
    fn test_moving_std_dev_trailing_window() {
        let values = [0.0, 100.0, 50.0, 50.0];
        assert_eq!(moving_std_dev(&values, 2), 0.0);
        assert!(moving_std_dev(&values, 0) > 0.0);
        assert_eq!(moving_std_dev(&values, 10), population_std_dev(&values));
    }

    #[test]
    fn test_moving_average_series() {
        let series = moving_average_series(&[10.0, 20.0, 30.0, 40.0], 2);
        assert_eq!(series, vec![10.0, 15.0, 25.0, 35.0]);
        assert!(moving_average_series(&[], 3).is_empty());
    }

    #[test]
    fn test_pearson_identities() {
        let xs = [1.0, 4.0, 2.0, 8.0, 5.0];
        let neg: Vec<f64> = xs.iter().map(|x| -x).collect();
        assert!((pearson(&xs, &xs) - 1.0).abs() < TOL);
        assert!((pearson(&xs, &neg) + 1.0).abs() < TOL);
        let constant = [3.0; 5];
        let r = pearson(&constant, &xs);
        assert_eq!(r, 0.0);
        assert!(!r.is_nan());
    }

    #[test]
    fn test_pearson_short_input() {
        assert_eq!(pearson(&[1.0], &[2.0]), 0.0);
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0]) - 1.0).abs() < TOL);
    }

    #[test]
    fn test_first_differences() {
        assert_eq!(first_differences(&[1.0, 4.0, 2.0]), vec![3.0, -2.0]);
        assert!(first_differences(&[1.0]).is_empty());
    }
}
