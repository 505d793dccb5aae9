//! Learner profile: a descriptive classification recomputed on every run.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::config::ProfileParams;
use crate::metrics::PerformanceMetrics;
use crate::sanitize::round_to;
use crate::timeline::PerformanceTimelinePoint;
use crate::trend::stats::mean;
use crate::types::{Difficulty, MS_PER_SECOND};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearnerType {
    Consistent,
    Fast,
    Methodical,
    Improving,
    Struggling,
    Developing,
}

impl LearnerType {
    pub fn description(&self) -> &'static str {
        match self {
            LearnerType::Consistent => "Delivers steady, accurate results session after session",
            LearnerType::Fast => "Answers quickly without sacrificing accuracy",
            LearnerType::Methodical => "Takes time over each word and gets it right",
            LearnerType::Improving => "Recent sessions are clearly better than earlier ones",
            LearnerType::Struggling => "Accuracy is low; smaller, focused sessions will help",
            LearnerType::Developing => "Still building a recognisable pattern",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub learner_type: LearnerType,
    /// Best-scoring difficulty with enough sessions; `medium` without data
    pub preferred_difficulty: Difficulty,
    pub optimal_session_length_minutes: f64,
    /// UTC hours, best first
    pub peak_performance_hours: Vec<u32>,
    pub description: String,
}

pub fn learner_type(metrics: Option<&PerformanceMetrics>, params: &ProfileParams) -> LearnerType {
    let Some(m) = metrics else {
        return LearnerType::Developing;
    };
    let accurate = m.accuracy >= params.strong_accuracy;

    if m.accuracy < params.struggling_accuracy {
        LearnerType::Struggling
    } else if m.improvement_trend >= params.improving_trend {
        LearnerType::Improving
    } else if accurate && !m.speed_estimated && m.speed_score >= params.fast_speed {
        LearnerType::Fast
    } else if accurate && m.consistency >= params.steady_consistency {
        LearnerType::Consistent
    } else if accurate && !m.speed_estimated && m.speed_score < params.slow_speed {
        LearnerType::Methodical
    } else {
        LearnerType::Developing
    }
}

pub fn preferred_difficulty(
    timeline: &[PerformanceTimelinePoint],
    params: &ProfileParams,
) -> Difficulty {
    let mut best: Option<(Difficulty, f64)> = None;
    for difficulty in Difficulty::ALL {
        let scores: Vec<f64> = timeline
            .iter()
            .filter(|p| p.difficulty == difficulty)
            .map(|p| p.percentage)
            .collect();
        if scores.is_empty() || scores.len() < params.min_sessions_per_difficulty {
            continue;
        }
        let avg = mean(&scores);
        if best.map_or(true, |(_, top)| avg > top) {
            best = Some((difficulty, avg));
        }
    }
    best.map(|(d, _)| d).unwrap_or_default()
}

/// Mean duration of the best-scoring quarter of timed sessions.
pub fn optimal_session_length(
    timeline: &[PerformanceTimelinePoint],
    params: &ProfileParams,
) -> f64 {
    let mut timed: Vec<(f64, f64)> = timeline
        .iter()
        .filter_map(|p| {
            p.total_time_ms
                .map(|ms| (p.percentage, ms as f64 / MS_PER_SECOND / 60.0))
        })
        .collect();
    if timed.is_empty() {
        return params.default_session_minutes;
    }
    timed.sort_by(|a, b| b.0.total_cmp(&a.0));
    let top = timed.len().div_ceil(4);
    let minutes: Vec<f64> = timed.iter().take(top).map(|(_, m)| *m).collect();
    round_to(mean(&minutes), 1)
}

pub fn peak_hours(timeline: &[PerformanceTimelinePoint], count: usize) -> Vec<u32> {
    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for point in timeline {
        by_hour
            .entry(point.timestamp.hour())
            .or_default()
            .push(point.percentage);
    }
    let mut ranked: Vec<(u32, f64)> = by_hour
        .into_iter()
        .map(|(hour, scores)| (hour, mean(&scores)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(count)
        .map(|(hour, _)| hour)
        .collect()
}

pub fn classify(
    metrics: Option<&PerformanceMetrics>,
    timeline: &[PerformanceTimelinePoint],
    params: &ProfileParams,
) -> LearnerProfile {
    let learner_type = learner_type(metrics, params);
    LearnerProfile {
        learner_type,
        preferred_difficulty: preferred_difficulty(timeline, params),
        optimal_session_length_minutes: optimal_session_length(timeline, params),
        peak_performance_hours: peak_hours(timeline, params.peak_hours),
        description: learner_type.description().to_string(),
    }
}
