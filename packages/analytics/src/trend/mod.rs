//! Trend Analysis
//!
//! Regression, weighted moving average, acceleration, moving standard deviation and
//! Pearson correlation over session series.
//!
//! - [`stats`] - the numeric routines, each usable on its own
//! - [`patterns`] - windowed plateau / breakthrough / slump / volatility detection

pub mod patterns;
pub mod stats;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::config::TrendParams;
use crate::sanitize::round_to;
use crate::timeline::PerformanceTimelinePoint;
use crate::types::{TrendDirection, MAX_SCORE};

pub use patterns::{detect_patterns, DetectedPattern, PatternKind};
pub use stats::Regression;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysisResult {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Weighted recent change per session
    pub velocity: f64,
    pub acceleration: f64,
    /// `1 - min(1, std/100)` over the trailing window
    pub stability_factor: f64,
    pub direction: TrendDirection,
    pub weighted_average: f64,
    pub volatility: f64,
    pub sample_size: usize,
}

impl TrendAnalysisResult {
    pub fn regression(&self) -> Regression {
        Regression {
            slope: self.slope,
            intercept: self.intercept,
            r_squared: self.r_squared,
        }
    }
}

pub fn classify_direction(acceleration: f64, threshold: f64) -> TrendDirection {
    if acceleration > threshold {
        TrendDirection::Accelerating
    } else if acceleration < -threshold {
        TrendDirection::Decelerating
    } else {
        TrendDirection::Steady
    }
}

pub fn stability_factor(std_dev: f64) -> f64 {
    1.0 - (std_dev / MAX_SCORE).min(1.0)
}

/// Trend of a series ordered oldest first. Short series yield neutral values.
pub fn analyze(values: &[f64], params: &TrendParams) -> TrendAnalysisResult {
    let regression = stats::fit_series(values);
    let velocity =
        stats::weighted_moving_average(&stats::first_differences(values), &params.wma_weights);
    let acceleration = stats::acceleration(values);
    let volatility = stats::moving_std_dev(values, params.std_window);

    TrendAnalysisResult {
        slope: regression.slope,
        intercept: regression.intercept,
        r_squared: regression.r_squared,
        velocity: round_to(velocity, 2),
        acceleration: round_to(acceleration, 2),
        stability_factor: round_to(stability_factor(volatility), 3),
        direction: classify_direction(acceleration, params.acceleration_threshold),
        weighted_average: round_to(stats::weighted_moving_average(values, &params.wma_weights), 1),
        volatility: round_to(volatility, 2),
        sample_size: values.len(),
    }
}

// ==================== Correlations ====================

/// Session attribute correlated against the session score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CorrelationFactor {
    HintsPerWord,
    SessionSize,
    SecondsPerWord,
    HourOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Weak,
    Moderate,
    Strong,
}

impl CorrelationStrength {
    pub fn of(coefficient: f64) -> Self {
        let r = coefficient.abs();
        if r >= 0.7 {
            CorrelationStrength::Strong
        } else if r >= 0.4 {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Weak
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationFinding {
    pub factor: CorrelationFactor,
    pub coefficient: f64,
    pub strength: CorrelationStrength,
    pub sample_size: usize,
    pub description: String,
}

fn describe(factor: CorrelationFactor, coefficient: f64, strength: CorrelationStrength) -> String {
    if strength == CorrelationStrength::Weak {
        return match factor {
            CorrelationFactor::HintsPerWord => "Hint usage has little bearing on your scores",
            CorrelationFactor::SessionSize => "Session length has little bearing on your scores",
            CorrelationFactor::SecondsPerWord => "Answer speed has little bearing on your scores",
            CorrelationFactor::HourOfDay => "Time of day has little bearing on your scores",
        }
        .to_string();
    }
    let positive = coefficient > 0.0;
    match (factor, positive) {
        (CorrelationFactor::HintsPerWord, true) => {
            "Sessions with more hints end with higher scores"
        }
        (CorrelationFactor::HintsPerWord, false) => {
            "Sessions with more hints end with lower scores"
        }
        (CorrelationFactor::SessionSize, true) => {
            "Longer sessions go together with higher scores"
        }
        (CorrelationFactor::SessionSize, false) => "Longer sessions go together with lower scores",
        (CorrelationFactor::SecondsPerWord, true) => "Taking more time per word pays off",
        (CorrelationFactor::SecondsPerWord, false) => {
            "Faster answers go together with higher scores"
        }
        (CorrelationFactor::HourOfDay, true) => "Later sessions score higher",
        (CorrelationFactor::HourOfDay, false) => "Earlier sessions score higher",
    }
    .to_string()
}

fn finding(
    factor: CorrelationFactor,
    pairs: &[(f64, f64)],
    params: &TrendParams,
) -> Option<CorrelationFinding> {
    if pairs.len() < params.min_correlation_points.max(2) {
        return None;
    }
    let xs: Vec<f64> = pairs.iter().map(|(x, _)| *x).collect();
    let ys: Vec<f64> = pairs.iter().map(|(_, y)| *y).collect();
    let coefficient = round_to(stats::pearson(&xs, &ys), 2);
    let strength = CorrelationStrength::of(coefficient);
    Some(CorrelationFinding {
        factor,
        coefficient,
        strength,
        sample_size: pairs.len(),
        description: describe(factor, coefficient, strength),
    })
}

/// Pearson correlation of session score against hints, size, pace and hour of day.
///
/// Pace only uses sessions with a real clock measurement.
pub fn correlation_findings(
    timeline: &[PerformanceTimelinePoint],
    params: &TrendParams,
) -> Vec<CorrelationFinding> {
    let hints: Vec<(f64, f64)> = timeline
        .iter()
        .filter(|p| p.total_words > 0)
        .map(|p| (p.hints_per_word(), p.percentage))
        .collect();
    let sizes: Vec<(f64, f64)> = timeline
        .iter()
        .map(|p| (p.total_words as f64, p.percentage))
        .collect();
    let pace: Vec<(f64, f64)> = timeline
        .iter()
        .filter(|p| !p.is_estimated)
        .map(|p| (p.avg_time_per_word, p.percentage))
        .collect();
    let hours: Vec<(f64, f64)> = timeline
        .iter()
        .map(|p| (p.timestamp.hour() as f64, p.percentage))
        .collect();

    [
        finding(CorrelationFactor::HintsPerWord, &hints, params),
        finding(CorrelationFactor::SessionSize, &sizes, params),
        finding(CorrelationFactor::SecondsPerWord, &pace, params),
        finding(CorrelationFactor::HourOfDay, &hours, params),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsParams;
    use crate::timeline::build_performance_timeline;
    use crate::types::{Difficulty, TestSessionSummary};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_linear_series_is_steady() {
        let result = analyze(&[50.0, 60.0, 70.0, 80.0, 90.0], &TrendParams::default());
        assert!((result.slope - 10.0).abs() < 1e-9);
        assert!((result.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(result.velocity, 10.0);
        assert_eq!(result.acceleration, 0.0);
        assert_eq!(result.direction, TrendDirection::Steady);
        assert_eq!(result.volatility, 14.14);
        assert_eq!(result.stability_factor, 0.859);
    }

    #[test]
    fn test_accelerating_and_decelerating() {
        let params = TrendParams::default();
        assert_eq!(
            analyze(&[40.0, 41.0, 44.0, 50.0, 60.0], &params).direction,
            TrendDirection::Accelerating
        );
        assert_eq!(
            analyze(&[40.0, 60.0, 72.0, 78.0, 80.0], &params).direction,
            TrendDirection::Decelerating
        );
    }

    #[test]
    fn test_empty_series_is_neutral() {
        let result = analyze(&[], &TrendParams::default());
        assert_eq!(result.slope, 0.0);
        assert_eq!(result.velocity, 0.0);
        assert_eq!(result.stability_factor, 1.0);
        assert_eq!(result.direction, TrendDirection::Steady);
        assert_eq!(result.sample_size, 0);
    }

    #[test]
    fn test_stability_factor_bounds() {
        assert_eq!(stability_factor(0.0), 1.0);
        assert_eq!(stability_factor(250.0), 0.0);
        assert!((stability_factor(20.0) - 0.8).abs() < 1e-12);
    }

    fn session(
        hour: u32,
        percentage: f64,
        hints: u32,
        total_time_ms: Option<u64>,
    ) -> TestSessionSummary {
        TestSessionSummary {
            id: format!("s{hour}"),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
                + Duration::days(hour as i64),
            percentage,
            correct_words: 0,
            incorrect_words: 0,
            total_words: 10,
            hints_used: hints,
            total_time_ms,
            difficulty: Difficulty::Medium,
            test_type: "standard".to_string(),
            selected_chapters: vec![],
            wrong_words: vec![],
            word_timings: vec![],
        }
    }

    #[test]
    fn test_correlation_findings() {
        let sessions = vec![
            session(8, 90.0, 0, None),
            session(10, 80.0, 2, None),
            session(12, 70.0, 4, None),
            session(14, 60.0, 6, None),
        ];
        let timeline = build_performance_timeline(&sessions, &MetricsParams::default());
        let findings = correlation_findings(&timeline, &TrendParams::default());

        let hints = findings
            .iter()
            .find(|f| f.factor == CorrelationFactor::HintsPerWord)
            .unwrap();
        assert_eq!(hints.coefficient, -1.0);
        assert_eq!(hints.strength, CorrelationStrength::Strong);
        assert_eq!(hints.description, "Sessions with more hints end with lower scores");

        // constant session size: degenerate, reported as 0 not NaN
        let size = findings
            .iter()
            .find(|f| f.factor == CorrelationFactor::SessionSize)
            .unwrap();
        assert_eq!(size.coefficient, 0.0);
        assert_eq!(size.strength, CorrelationStrength::Weak);

        // no real timings at all
        assert!(!findings
            .iter()
            .any(|f| f.factor == CorrelationFactor::SecondsPerWord));
    }

    #[test]
    fn test_correlations_need_minimum_points() {
        let sessions = vec![session(8, 90.0, 0, Some(30_000)), session(9, 70.0, 3, Some(60_000))];
        let timeline = build_performance_timeline(&sessions, &MetricsParams::default());
        assert!(correlation_findings(&timeline, &TrendParams::default()).is_empty());
    }
}
