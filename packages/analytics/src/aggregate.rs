//! Attempt Aggregation
//!
//! Folds one word's attempt history into point statistics: accuracy, current streak,
//! recency, hint share, mastery status and a first-half/second-half trend.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AggregationParams;
use crate::sanitize::{round_to, safe_ratio, to_score};
use crate::types::{AttemptRecord, PreAggregated, Word, WordPerformance, MS_PER_SECOND};

/// Mastery classification of a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordStatus {
    New,
    Promising,
    Struggling,
    Consolidated,
    Critical,
    Inconsistent,
    Improving,
}

impl WordStatus {
    pub fn needs_review(&self) -> bool {
        matches!(self, WordStatus::Critical | WordStatus::Struggling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordTrend {
    Improving,
    Declining,
    Stable,
}

/// Per-word result handed to the UI, catalog fields merged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPerformanceAnalysis {
    pub word_id: String,
    pub english: String,
    pub italian: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub learned: bool,
    pub difficult: bool,
    pub has_performance_data: bool,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub incorrect_attempts: u32,
    pub accuracy: u32,
    /// Mean seconds per attempt, rounded
    pub avg_time_seconds: u32,
    pub hints_used: u32,
    /// This word's share of the learner's hint usage across all words
    pub hints_percentage: u32,
    pub current_streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
    pub status: WordStatus,
    pub trend: WordTrend,
    /// Counters came from the cached pre-aggregate rather than the attempt list
    pub from_pre_aggregated: bool,
}

impl WordPerformanceAnalysis {
    /// Explicit record for a word that has never been attempted.
    pub fn empty(word: &Word) -> Self {
        Self {
            word_id: word.id.clone(),
            english: word.english.clone(),
            italian: word.italian.clone(),
            chapter: word.chapter.clone(),
            group: word.group.clone(),
            learned: word.learned,
            difficult: word.difficult,
            has_performance_data: false,
            total_attempts: 0,
            correct_attempts: 0,
            incorrect_attempts: 0,
            accuracy: 0,
            avg_time_seconds: 0,
            hints_used: 0,
            hints_percentage: 0,
            current_streak: 0,
            last_attempt: None,
            status: WordStatus::New,
            trend: WordTrend::Stable,
            from_pre_aggregated: false,
        }
    }
}

/// Attempt-level hint usage across all words, used by the efficiency metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintUsageDetail {
    pub words_without_hints: u32,
    pub total_words_attempted: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordSummary {
    pub total_words: u32,
    pub words_with_data: u32,
    pub by_status: BTreeMap<WordStatus, u32>,
    /// Critical and struggling words, weakest first
    pub needs_review: Vec<String>,
    pub average_accuracy: f64,
}

fn usable_pre_aggregate(pre: &PreAggregated) -> bool {
    if pre.total_attempts == 0 || pre.correct_attempts > pre.total_attempts {
        return false;
    }
    let expected = to_score(100.0 * pre.correct_attempts as f64 / pre.total_attempts as f64);
    pre.accuracy == expected && pre.average_response_time_ms.is_finite()
}

/// Trailing run of correct attempts, most recent attempt last.
pub fn current_streak(attempts: &[AttemptRecord]) -> u32 {
    attempts.iter().rev().take_while(|a| a.correct).count() as u32
}

fn accuracy_of(attempts: &[AttemptRecord]) -> f64 {
    let correct = attempts.iter().filter(|a| a.correct).count() as f64;
    safe_ratio(100.0 * correct, attempts.len() as f64, 0.0)
}

pub fn word_trend(attempts: &[AttemptRecord], params: &AggregationParams) -> WordTrend {
    if attempts.len() < params.trend_min_attempts.max(2) {
        return WordTrend::Stable;
    }
    let (first, second) = attempts.split_at(attempts.len() / 2);
    let delta = accuracy_of(second) - accuracy_of(first);
    if delta > params.trend_delta {
        WordTrend::Improving
    } else if delta < -params.trend_delta {
        WordTrend::Declining
    } else {
        WordTrend::Stable
    }
}

pub fn classify_status(
    total_attempts: u32,
    accuracy: u32,
    streak: u32,
    params: &AggregationParams,
) -> WordStatus {
    if total_attempts == 0 {
        WordStatus::New
    } else if total_attempts < params.min_attempts_for_status {
        if streak > 0 {
            WordStatus::Promising
        } else {
            WordStatus::Struggling
        }
    } else if accuracy >= params.consolidated_accuracy && streak >= params.consolidated_streak {
        WordStatus::Consolidated
    } else if accuracy <= params.critical_accuracy {
        WordStatus::Critical
    } else if accuracy <= params.inconsistent_accuracy {
        WordStatus::Inconsistent
    } else {
        // above the inconsistent cut-off without a consolidating streak
        WordStatus::Improving
    }
}

pub fn aggregate(
    word: &Word,
    performance: Option<&WordPerformance>,
    total_user_hints: u32,
    params: &AggregationParams,
) -> WordPerformanceAnalysis {
    let Some(performance) = performance else {
        return WordPerformanceAnalysis::empty(word);
    };
    let attempts = performance.attempts.as_slice();

    let pre = performance.pre_aggregated.filter(usable_pre_aggregate);
    let (total, correct, accuracy, avg_time_seconds) = match pre {
        Some(pre) => (
            pre.total_attempts,
            pre.correct_attempts,
            pre.accuracy,
            (pre.average_response_time_ms / MS_PER_SECOND).round().max(0.0) as u32,
        ),
        None => {
            let total = attempts.len() as u32;
            let correct = attempts.iter().filter(|a| a.correct).count() as u32;
            let mean_ms = safe_ratio(
                attempts.iter().map(|a| a.time_spent_ms as f64).sum(),
                total as f64,
                0.0,
            );
            (
                total,
                correct,
                to_score(safe_ratio(100.0 * correct as f64, total as f64, 0.0)),
                (mean_ms / MS_PER_SECOND).round() as u32,
            )
        }
    };

    if total == 0 {
        return WordPerformanceAnalysis::empty(word);
    }

    let hints_used = performance.hints_used();
    let hints_percentage = to_score(safe_ratio(
        100.0 * hints_used as f64,
        total_user_hints as f64,
        0.0,
    ));
    let streak = current_streak(attempts);

    WordPerformanceAnalysis {
        has_performance_data: true,
        total_attempts: total,
        correct_attempts: correct,
        incorrect_attempts: total - correct,
        accuracy,
        avg_time_seconds,
        hints_used,
        hints_percentage,
        current_streak: streak,
        last_attempt: attempts.last().map(|a| a.timestamp),
        status: classify_status(total, accuracy, streak, params),
        trend: word_trend(attempts, params),
        from_pre_aggregated: pre.is_some(),
        ..WordPerformanceAnalysis::empty(word)
    }
}

pub fn total_hints(performances: &HashMap<String, WordPerformance>) -> u32 {
    performances
        .values()
        .map(WordPerformance::hints_used)
        .fold(0u32, u32::saturating_add)
}

/// `None` when no attempt detail exists for any word.
pub fn hint_usage_detail(
    performances: &HashMap<String, WordPerformance>,
) -> Option<HintUsageDetail> {
    let (without, total) = performances
        .values()
        .flat_map(|p| p.attempts.iter())
        .fold((0u32, 0u32), |(without, total), a| {
            (without + u32::from(!a.used_hint), total + 1)
        });
    (total > 0).then_some(HintUsageDetail {
        words_without_hints: without,
        total_words_attempted: total,
    })
}

pub fn summarize(analyses: &[WordPerformanceAnalysis]) -> WordSummary {
    let mut by_status = BTreeMap::new();
    for analysis in analyses {
        *by_status.entry(analysis.status).or_insert(0u32) += 1;
    }

    let with_data: Vec<&WordPerformanceAnalysis> =
        analyses.iter().filter(|a| a.has_performance_data).collect();
    let average_accuracy = safe_ratio(
        with_data.iter().map(|a| a.accuracy as f64).sum(),
        with_data.len() as f64,
        0.0,
    );

    let mut review: Vec<&WordPerformanceAnalysis> = analyses
        .iter()
        .filter(|a| a.status.needs_review())
        .collect();
    review.sort_by(|a, b| {
        a.accuracy
            .cmp(&b.accuracy)
            .then_with(|| a.word_id.cmp(&b.word_id))
    });

    WordSummary {
        total_words: analyses.len() as u32,
        words_with_data: with_data.len() as u32,
        by_status,
        needs_review: review.into_iter().map(|a| a.word_id.clone()).collect(),
        average_accuracy: round_to(average_accuracy, 1),
    }
}
