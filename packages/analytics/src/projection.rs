//! Projection Engine
//!
//! Extrapolates the session accuracy regression over fixed horizons. Confidence comes from
//! the fit quality (R²) and sets the width of the optimistic/pessimistic band.
//!
//! Milestone probabilities are fixed labels taken from configuration. They are a heuristic
//! for display, not a statistically derived likelihood.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ProjectionParams;
use crate::sanitize::{clamp_percent, round_to, safe_ratio};
use crate::trend::stats::{self, Regression};
use crate::types::{MilestoneProbability, Timeframe, MAX_SCORE};

const DAYS_PER_STEP: f64 = 7.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// One observation of the projected series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedMetrics {
    pub accuracy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_index: Option<f64>,
    pub change_from_current: f64,
    /// Sessions expected within the horizon at the historical pace
    pub expected_sessions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub threshold: f64,
    pub label: String,
    pub estimated_days: u32,
    pub estimated_date: DateTime<Utc>,
    pub probability: MilestoneProbability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub timeframe: Timeframe,
    pub days: u32,
    pub projected_metrics: ProjectedMetrics,
    pub confidence: u32,
    pub optimistic_bound: f64,
    pub pessimistic_bound: f64,
    pub milestones: Vec<Milestone>,
}

/// Index position `days` ahead of a series of length `n`.
fn horizon_x(n: usize, days: u32) -> f64 {
    n as f64 + days as f64 / DAYS_PER_STEP
}

pub fn confidence(regression: &Regression, floor: u32) -> u32 {
    let raw = (regression.r_squared * MAX_SCORE).round();
    (raw.max(0.0) as u32).clamp(floor.min(100), 100)
}

/// `(optimistic, pessimistic)` around `value`.
pub fn uncertainty_band(value: f64, confidence: u32, band_factor: f64) -> (f64, f64) {
    let range = value * (100.0 - confidence as f64) / 100.0 * band_factor;
    ((value + range).min(MAX_SCORE), (value - range).max(0.0))
}

/// Sessions per day over the observed span. Spans shorter than a day count as one day.
fn session_rate(series: &[SeriesPoint]) -> f64 {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return 0.0;
    };
    let span_days = (last.timestamp - first.timestamp).num_seconds() as f64 / SECONDS_PER_DAY;
    safe_ratio(series.len() as f64, span_days.max(1.0), 0.0)
}

/// Thresholds crossed between `current` and `projected`. A milestone whose date falls outside
/// the representable calendar is dropped.
fn milestones(
    current: f64,
    projected: f64,
    days: u32,
    anchor: DateTime<Utc>,
    params: &ProjectionParams,
) -> Vec<Milestone> {
    if projected <= current {
        return Vec::new();
    }
    params
        .milestones
        .iter()
        .filter(|rule| current < rule.threshold && projected >= rule.threshold)
        .filter_map(|rule| {
            let fraction = (rule.threshold - current) / (projected - current);
            let estimated_days = ((fraction * days as f64).ceil() as u32).max(1);
            let estimated_date =
                anchor.checked_add_signed(Duration::days(estimated_days as i64))?;
            Some(Milestone {
                threshold: rule.threshold,
                label: rule.label.clone(),
                estimated_days,
                estimated_date,
                probability: rule.probability,
            })
        })
        .collect()
}

/// Projects `accuracy` (chronological) over `timeframe`.
///
/// `index_series` is the per-session Performance Index; it is projected alongside when it has
/// enough points. Returns `None` below `params.min_points` observations.
pub fn project(
    accuracy: &[SeriesPoint],
    index_series: Option<&[f64]>,
    timeframe: Timeframe,
    params: &ProjectionParams,
) -> Option<ProjectionResult> {
    let min_points = params.min_points.max(2);
    if accuracy.len() < min_points {
        return None;
    }
    let last = accuracy.last()?;
    let days = timeframe.days();
    let values: Vec<f64> = accuracy.iter().map(|p| p.value).collect();

    let regression = stats::fit_series(&values);
    let projected = clamp_percent(regression.predict(horizon_x(values.len(), days)));
    let confidence = confidence(&regression, params.confidence_floor);
    let (optimistic, pessimistic) = uncertainty_band(projected, confidence, params.band_factor);

    let performance_index = index_series
        .filter(|series| series.len() >= min_points)
        .map(|series| {
            let fit = stats::fit_series(series);
            round_to(clamp_percent(fit.predict(horizon_x(series.len(), days))), 1)
        });

    Some(ProjectionResult {
        timeframe,
        days,
        projected_metrics: ProjectedMetrics {
            accuracy: round_to(projected, 1),
            performance_index,
            change_from_current: round_to(projected - last.value, 1),
            expected_sessions: (session_rate(accuracy) * days as f64).round() as u32,
        },
        confidence,
        optimistic_bound: round_to(optimistic, 1),
        pessimistic_bound: round_to(pessimistic, 1),
        milestones: milestones(last.value, projected, days, last.timestamp, params),
    })
}

/// Projections for every horizon, or an empty list when history is too short.
pub fn project_all(
    accuracy: &[SeriesPoint],
    index_series: Option<&[f64]>,
    params: &ProjectionParams,
) -> Vec<ProjectionResult> {
    Timeframe::ALL
        .into_iter()
        .filter_map(|timeframe| project(accuracy, index_series, timeframe, params))
        .collect()
}
