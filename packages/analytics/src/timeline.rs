//! Timeline Reconstruction
//!
//! Two timelines are built here:
//! - the session timeline, each session enriched with seconds per word (real or estimated)
//! - the per-word attempt timeline, taken from recorded attempts when they exist and otherwise
//!   reconstructed from session summaries
//!
//! Chart series carry a cumulative accuracy that is always recomputed over the points kept,
//! so a windowed chart never inherits the full-history running value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MetricsParams;
use crate::sanitize::{round_to, safe_ratio, to_score};
use crate::types::{
    AttemptRecord, Difficulty, TestSessionSummary, Word, WordPerformance, MS_PER_SECOND,
};

// ==================== Session timeline ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceTimelinePoint {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub percentage: f64,
    pub correct_words: u32,
    pub incorrect_words: u32,
    pub total_words: u32,
    pub hints_used: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_ms: Option<u64>,
    pub difficulty: Difficulty,
    pub test_type: String,
    /// Seconds per word, one decimal
    pub avg_time_per_word: f64,
    pub is_estimated: bool,
}

impl PerformanceTimelinePoint {
    pub fn hints_per_word(&self) -> f64 {
        safe_ratio(self.hints_used as f64, self.total_words as f64, 0.0)
    }
}

fn estimated_seconds(session: &TestSessionSummary, params: &MetricsParams) -> f64 {
    params.pace.seconds_for(session.difficulty)
}

/// Sessions in chronological order, oldest first.
pub fn build_performance_timeline(
    sessions: &[TestSessionSummary],
    params: &MetricsParams,
) -> Vec<PerformanceTimelinePoint> {
    let mut ordered: Vec<&TestSessionSummary> = sessions.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    ordered
        .into_iter()
        .map(|session| {
            let (avg_time_per_word, is_estimated) = match session.total_time_ms {
                Some(ms) if session.total_words > 0 => {
                    (ms as f64 / MS_PER_SECOND / session.total_words as f64, false)
                }
                _ => (estimated_seconds(session, params), true),
            };
            PerformanceTimelinePoint {
                session_id: session.id.clone(),
                timestamp: session.timestamp,
                percentage: session.percentage,
                correct_words: session.correct_words,
                incorrect_words: session.incorrect_words,
                total_words: session.total_words,
                hints_used: session.hints_used,
                total_time_ms: session.total_time_ms,
                difficulty: session.difficulty,
                test_type: session.test_type.clone(),
                avg_time_per_word: round_to(avg_time_per_word, 1),
                is_estimated,
            }
        })
        .collect()
}

// ==================== Word timeline ====================

/// Where an attempt in a word timeline came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttemptSource {
    /// Stored per-word attempt log
    Recorded,
    /// Word listed among the session's wrong answers
    WrongAnswer,
    /// Per-word timing captured by the session
    SessionTiming,
    /// Chapter was drilled and the word was not marked wrong
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineAttempt {
    #[serde(flatten)]
    pub record: AttemptRecord,
    pub source: AttemptSource,
    /// Hint usage or timing was derived from session aggregates
    pub is_estimated: bool,
    /// Timing is backed by a real clock measurement
    pub has_real_time: bool,
    /// Exact hint share behind `hints_count`; fractional when split across a session
    #[serde(default)]
    pub hint_share: f64,
}

/// Session aggregates left over for words without explicit per-word detail.
struct SessionShare {
    hints_per_word: f64,
    ms_per_word: f64,
    from_clock: bool,
}

impl SessionShare {
    fn of(session: &TestSessionSummary, params: &MetricsParams) -> Self {
        let timed_hints = session
            .word_timings
            .iter()
            .fold(0u32, |acc, t| acc.saturating_add(t.hints_count));
        let timed_ms = session
            .word_timings
            .iter()
            .fold(0u64, |acc, t| acc.saturating_add(t.time_spent_ms));
        let candidates = session
            .total_words
            .saturating_sub(session.word_timings.len() as u32)
            .max(1) as f64;

        let remaining_hints = session.hints_used.saturating_sub(timed_hints) as f64;
        let (ms_per_word, from_clock) = match session.total_time_ms {
            Some(total) => (total.saturating_sub(timed_ms) as f64 / candidates, true),
            None => (estimated_seconds(session, params) * MS_PER_SECOND, false),
        };

        Self {
            hints_per_word: remaining_hints / candidates,
            ms_per_word,
            from_clock,
        }
    }

    /// Equal split of the session's unattributed hints and time.
    ///
    /// Whole hints are floored so the counts never exceed the session total; the exact
    /// share is kept in `hint_share`.
    fn estimate(
        &self,
        session: &TestSessionSummary,
        correct: bool,
        source: AttemptSource,
    ) -> TimelineAttempt {
        let hints_count = self.hints_per_word.floor() as u32;
        TimelineAttempt {
            record: AttemptRecord {
                timestamp: session.timestamp,
                correct,
                used_hint: hints_count > 0,
                hints_count,
                time_spent_ms: self.ms_per_word.round().max(0.0) as u64,
                test_id: Some(session.id.clone()),
            },
            source,
            is_estimated: true,
            has_real_time: self.from_clock,
            hint_share: self.hints_per_word,
        }
    }
}

fn reconstruct_attempt(
    word: &Word,
    session: &TestSessionSummary,
    params: &MetricsParams,
) -> Option<TimelineAttempt> {
    let marked_wrong = session.marked_wrong(&word.id);

    if let Some(timing) = session.timing_for(&word.id) {
        let (correct, source) = if marked_wrong {
            (false, AttemptSource::WrongAnswer)
        } else {
            (timing.correct.unwrap_or(true), AttemptSource::SessionTiming)
        };
        return Some(TimelineAttempt {
            record: AttemptRecord {
                timestamp: session.timestamp,
                correct,
                used_hint: timing.used_hint,
                hints_count: timing.hints_count,
                time_spent_ms: timing.time_spent_ms,
                test_id: Some(session.id.clone()),
            },
            source,
            is_estimated: false,
            has_real_time: true,
            hint_share: timing.hints_count as f64,
        });
    }

    if marked_wrong {
        let share = SessionShare::of(session, params);
        return Some(share.estimate(session, false, AttemptSource::WrongAnswer));
    }

    let drilled = word
        .chapter
        .as_deref()
        .is_some_and(|chapter| session.includes_chapter(chapter));
    drilled.then(|| {
        SessionShare::of(session, params).estimate(session, true, AttemptSource::Inferred)
    })
}

/// Chronological attempts for one word.
///
/// Recorded attempts are authoritative and returned as-is. Without them, each session
/// contributes at most one attempt: a wrong-answer entry marks it incorrect, a timing
/// record is used verbatim, and a drilled chapter implies a correct answer whose hints and
/// time are an equal split of what the session did not attribute elsewhere.
pub fn build_word_timeline(
    word: &Word,
    performance: Option<&WordPerformance>,
    sessions: &[TestSessionSummary],
    params: &MetricsParams,
) -> Vec<TimelineAttempt> {
    if let Some(perf) = performance.filter(|p| !p.attempts.is_empty()) {
        return perf
            .attempts
            .iter()
            .map(|record| TimelineAttempt {
                record: record.clone(),
                source: AttemptSource::Recorded,
                is_estimated: false,
                has_real_time: record.time_spent_ms > 0,
                hint_share: record.hints_count as f64,
            })
            .collect();
    }

    let mut ordered: Vec<&TestSessionSummary> = sessions.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let timeline: Vec<TimelineAttempt> = ordered
        .into_iter()
        .filter_map(|session| reconstruct_attempt(word, session, params))
        .collect();
    tracing::debug!(
        word_id = %word.id,
        attempts = timeline.len(),
        "reconstructed word timeline"
    );
    timeline
}

// ==================== Chart series ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    /// 1-based position within the series
    pub index: u32,
    pub timestamp: DateTime<Utc>,
    /// Day/month label
    pub label: String,
    pub correct: bool,
    /// Running accuracy over the points of this series
    pub cumulative_accuracy: u32,
    pub time_seconds: f64,
    pub hints_count: u32,
    pub is_estimated: bool,
}

fn recompute_cumulative(points: &mut [ChartPoint]) {
    let mut correct = 0u32;
    for (i, point) in points.iter_mut().enumerate() {
        if point.correct {
            correct += 1;
        }
        point.index = i as u32 + 1;
        point.cumulative_accuracy = to_score(100.0 * correct as f64 / (i + 1) as f64);
    }
}

pub fn to_chart_series(attempts: &[TimelineAttempt]) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = attempts
        .iter()
        .map(|a| ChartPoint {
            index: 0,
            timestamp: a.record.timestamp,
            label: a.record.timestamp.format("%d/%m").to_string(),
            correct: a.record.correct,
            cumulative_accuracy: 0,
            time_seconds: round_to(a.record.time_spent_ms as f64 / MS_PER_SECOND, 1),
            hints_count: a.record.hints_count,
            is_estimated: a.is_estimated,
        })
        .collect();
    recompute_cumulative(&mut points);
    points
}

/// Keeps the most recent `n` points and recomputes cumulative accuracy over that window.
pub fn limit_chart_data(series: &[ChartPoint], n: usize) -> Vec<ChartPoint> {
    let start = series.len().saturating_sub(n);
    let mut window = series[start..].to_vec();
    recompute_cumulative(&mut window);
    window
}
