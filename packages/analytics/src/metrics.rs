//! Session Metrics
//!
//! Precision, consistency, hint efficiency, speed and difficulty handling, blended into the
//! Performance Index. Each weighted term is rounded before summing so that the displayed
//! breakdown always adds up to the displayed index.

use serde::{Deserialize, Serialize};

use crate::aggregate::HintUsageDetail;
use crate::config::{AnalyticsConfig, MetricWeights, MetricsParams, SpeedTable};
use crate::sanitize::{round_to, safe_ratio, to_score};
use crate::timeline::{build_performance_timeline, PerformanceTimelinePoint};
use crate::trend::stats::{fit_series, mean, population_std_dev};
use crate::types::TestSessionSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricComponent {
    Precision,
    Consistency,
    Efficiency,
    Speed,
    Difficulty,
}

/// One weighted term of the Performance Index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownEntry {
    pub component: MetricComponent,
    pub value: u32,
    pub weight: f64,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub accuracy: u32,
    pub consistency: u32,
    pub hint_efficiency: u32,
    pub speed_score: u32,
    pub performance_index: u32,
    pub best_streak: u32,
    /// Recent-half mean minus oldest-half mean, percentage points
    pub improvement_trend: f64,
    /// Regression slope of session scores, points per session
    pub learning_velocity: f64,
    pub difficulty_score: u32,
    /// Speed was derived from estimated per-word times only
    pub speed_estimated: bool,
    pub sessions_analyzed: u32,
    pub calculation_breakdown: Vec<BreakdownEntry>,
}

pub fn precision(percentages: &[f64]) -> u32 {
    to_score(mean(percentages))
}

/// 100 minus the population standard deviation; a single sample is perfectly consistent.
pub fn consistency(percentages: &[f64]) -> u32 {
    if percentages.len() < 2 {
        return 100;
    }
    to_score(100.0 - population_std_dev(percentages))
}

pub fn hint_efficiency(detail: Option<&HintUsageDetail>, sessions: &[TestSessionSummary]) -> u32 {
    if let Some(detail) = detail.filter(|d| d.total_words_attempted > 0) {
        return to_score(
            100.0 * detail.words_without_hints as f64 / detail.total_words_attempted as f64,
        );
    }

    let total_words: u64 = sessions.iter().map(|s| s.total_words as u64).sum();
    if total_words == 0 {
        return 100;
    }
    let total_hints: u64 = sessions.iter().map(|s| s.hints_used as u64).sum();
    let penalty = (100.0 * total_hints as f64 / total_words as f64).round();
    to_score(100.0 - penalty)
}

/// Speed score from mean seconds per word. Real timings win over estimates when both exist.
pub fn speed_score(timeline: &[PerformanceTimelinePoint], table: &SpeedTable) -> (u32, bool) {
    let real: Vec<f64> = timeline
        .iter()
        .filter(|p| !p.is_estimated)
        .map(|p| p.avg_time_per_word)
        .collect();
    if !real.is_empty() {
        return (table.score(mean(&real)), false);
    }
    let estimated: Vec<f64> = timeline.iter().map(|p| p.avg_time_per_word).collect();
    (table.score(mean(&estimated)), true)
}

/// Mean score over large sessions plus a flat bonus, capped at 100.
pub fn difficulty_score(sessions: &[TestSessionSummary], params: &MetricsParams) -> u32 {
    let large: Vec<f64> = sessions
        .iter()
        .filter(|s| s.total_words >= params.large_session_words)
        .map(|s| s.percentage)
        .collect();
    if large.is_empty() {
        return params.default_difficulty_score.min(100);
    }
    to_score(mean(&large) + params.difficulty_bonus)
}

/// Longest run of consecutive sessions at or above `threshold`.
pub fn best_streak(percentages: &[f64], threshold: f64) -> u32 {
    let mut best = 0u32;
    let mut run = 0u32;
    for &p in percentages {
        if p >= threshold {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

pub fn improvement_trend(percentages: &[f64], half_cap: usize) -> f64 {
    let half = half_cap.min(percentages.len() / 2);
    if half == 0 {
        return 0.0;
    }
    let oldest = mean(&percentages[..half]);
    let recent = mean(&percentages[percentages.len() - half..]);
    round_to(recent - oldest, 1)
}

pub fn learning_velocity(percentages: &[f64]) -> f64 {
    round_to(fit_series(percentages).slope, 1)
}

/// Weighted sum with every term rounded on its own.
pub fn performance_index(
    components: [(MetricComponent, u32); 5],
    weights: &MetricWeights,
) -> (u32, Vec<BreakdownEntry>) {
    let breakdown: Vec<BreakdownEntry> = components
        .into_iter()
        .map(|(component, value)| {
            let weight = match component {
                MetricComponent::Precision => weights.precision,
                MetricComponent::Consistency => weights.consistency,
                MetricComponent::Efficiency => weights.efficiency,
                MetricComponent::Speed => weights.speed,
                MetricComponent::Difficulty => weights.difficulty,
            };
            BreakdownEntry {
                component,
                value,
                weight,
                points: (value as f64 * weight).round().max(0.0) as u32,
            }
        })
        .collect();
    let index = breakdown.iter().map(|b| b.points).sum::<u32>().min(100);
    (index, breakdown)
}

/// `None` only when there are no sessions.
pub fn compute_metrics(
    timeline: &[PerformanceTimelinePoint],
    sessions: &[TestSessionSummary],
    hint_detail: Option<&HintUsageDetail>,
    config: &AnalyticsConfig,
) -> Option<PerformanceMetrics> {
    if sessions.is_empty() {
        return None;
    }

    let rebuilt;
    let timeline = if timeline.is_empty() {
        rebuilt = build_performance_timeline(sessions, &config.metrics);
        rebuilt.as_slice()
    } else {
        timeline
    };

    let percentages: Vec<f64> = timeline.iter().map(|p| p.percentage).collect();

    let accuracy = precision(&percentages);
    let consistency = consistency(&percentages);
    let hint_efficiency = hint_efficiency(hint_detail, sessions);
    let (speed_score, speed_estimated) = speed_score(timeline, &config.speed);
    let difficulty_score = difficulty_score(sessions, &config.metrics);

    let (performance_index, calculation_breakdown) = performance_index(
        [
            (MetricComponent::Precision, accuracy),
            (MetricComponent::Consistency, consistency),
            (MetricComponent::Efficiency, hint_efficiency),
            (MetricComponent::Speed, speed_score),
            (MetricComponent::Difficulty, difficulty_score),
        ],
        &config.weights,
    );

    Some(PerformanceMetrics {
        accuracy,
        consistency,
        hint_efficiency,
        speed_score,
        performance_index,
        best_streak: best_streak(&percentages, config.metrics.streak_threshold),
        improvement_trend: improvement_trend(&percentages, config.metrics.trend_half_cap),
        learning_velocity: learning_velocity(&percentages),
        difficulty_score,
        speed_estimated,
        sessions_analyzed: timeline.len() as u32,
        calculation_breakdown,
    })
}

/// Performance Index after each session, computed from session-level hint counts.
pub fn session_index_series(
    timeline: &[PerformanceTimelinePoint],
    sessions: &[TestSessionSummary],
    config: &AnalyticsConfig,
) -> Vec<f64> {
    let mut ordered: Vec<&TestSessionSummary> = sessions.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    let ordered: Vec<TestSessionSummary> = ordered.into_iter().cloned().collect();

    (1..=timeline.len().min(ordered.len()))
        .filter_map(|n| compute_metrics(&timeline[..n], &ordered[..n], None, config))
        .map(|m| m.performance_index as f64)
        .collect()
}

/// Share of sessions whose per-word time is an estimate, 0..=1.
pub fn estimated_share(timeline: &[PerformanceTimelinePoint]) -> f64 {
    let estimated = timeline.iter().filter(|p| p.is_estimated).count();
    safe_ratio(estimated as f64, timeline.len() as f64, 0.0)
}
