//! Data Sanitization
//!
//! Ingestion boundary between best-effort stored history and the analytics pipeline.
//!
//! Functions:
//! - Numeric guards (finite checks, safe ratios, score rounding)
//! - Raw record validation (`Raw*` -> normalized records)
//! - Snapshot normalization with rejection counts

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordRejection;
use crate::types::{
    AttemptRecord, Difficulty, PreAggregated, TestSessionSummary, Word, WordPerformance,
    WordTiming, EPSILON, MAX_SCORE,
};

// ==================== Numeric guards ====================

pub fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

/// `num / den`, or `default` when the denominator is (close to) zero
pub fn safe_ratio(num: f64, den: f64, default: f64) -> f64 {
    if den.abs() < EPSILON || !num.is_finite() || !den.is_finite() {
        default
    } else {
        num / den
    }
}

/// Rounds a percentage-style value into an integer score in `[0, 100]`
pub fn to_score(value: f64) -> u32 {
    finite_or(value, 0.0).clamp(0.0, MAX_SCORE).round() as u32
}

pub fn clamp_percent(value: f64) -> f64 {
    finite_or(value, 0.0).clamp(0.0, MAX_SCORE)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (finite_or(value, 0.0) * factor).round() / factor
}

/// Non-negative integer count from a loosely typed number
pub fn to_count(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round().min(u32::MAX as f64) as u32
}

fn to_millis(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round().min(u64::MAX as f64) as u64
}

// ==================== Raw records ====================

/// Instant as stored: epoch milliseconds or RFC 3339 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawInstant {
    Millis(i64),
    Iso(DateTime<Utc>),
    Other(serde_json::Value),
}

impl RawInstant {
    pub fn resolve(&self) -> Result<DateTime<Utc>, RecordRejection> {
        match self {
            RawInstant::Millis(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .ok_or(RecordRejection::InvalidTimestamp),
            RawInstant::Iso(dt) => Ok(*dt),
            RawInstant::Other(_) => Err(RecordRejection::InvalidTimestamp),
        }
    }
}

impl From<DateTime<Utc>> for RawInstant {
    fn from(dt: DateTime<Utc>) -> Self {
        RawInstant::Iso(dt)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawAttempt {
    pub timestamp: Option<RawInstant>,
    pub correct: Option<bool>,
    pub used_hint: Option<bool>,
    pub hints_count: Option<f64>,
    pub time_spent_ms: Option<f64>,
    pub test_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawWordPerformance {
    pub attempts: Vec<RawAttempt>,
    pub total_attempts: Option<f64>,
    pub correct_attempts: Option<f64>,
    pub accuracy: Option<f64>,
    #[serde(alias = "averageResponseTime")]
    pub average_response_time_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawWordTiming {
    pub word_id: Option<String>,
    pub time_spent_ms: Option<f64>,
    pub used_hint: Option<bool>,
    pub hints_count: Option<f64>,
    pub correct: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTestSession {
    pub id: Option<String>,
    pub timestamp: Option<RawInstant>,
    pub percentage: Option<f64>,
    pub correct_words: Option<f64>,
    pub incorrect_words: Option<f64>,
    pub total_words: Option<f64>,
    pub hints_used: Option<f64>,
    pub total_time_ms: Option<f64>,
    pub difficulty: Option<String>,
    pub test_type: Option<String>,
    pub selected_chapters: Vec<String>,
    pub wrong_words: Vec<String>,
    pub word_timings: Vec<RawWordTiming>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawWord {
    pub id: Option<String>,
    pub english: Option<String>,
    pub italian: Option<String>,
    pub chapter: Option<String>,
    pub group: Option<String>,
    pub learned: Option<bool>,
    pub difficult: Option<bool>,
}

/// Everything the persistence collaborator hands over for one learner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub sessions: Vec<RawTestSession>,
    pub word_performances: HashMap<String, RawWordPerformance>,
    pub catalog: Vec<RawWord>,
}

// ==================== Validation ====================

fn resolve_timestamp(raw: Option<&RawInstant>) -> Result<DateTime<Utc>, RecordRejection> {
    raw.ok_or(RecordRejection::MissingTimestamp)?.resolve()
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn validate_attempt(raw: &RawAttempt) -> Result<AttemptRecord, RecordRejection> {
    let timestamp = resolve_timestamp(raw.timestamp.as_ref())?;
    let correct = raw.correct.ok_or(RecordRejection::MissingOutcome)?;
    let flagged = raw.used_hint.unwrap_or(false);
    let hints_count = match raw.hints_count.map(to_count) {
        Some(count) => count,
        None if flagged => 1,
        None => 0,
    };

    Ok(AttemptRecord {
        timestamp,
        correct,
        used_hint: flagged || hints_count > 0,
        hints_count,
        time_spent_ms: raw.time_spent_ms.map(to_millis).unwrap_or(0),
        test_id: non_empty(raw.test_id.as_ref()),
    })
}

fn validate_timing(raw: &RawWordTiming) -> Option<WordTiming> {
    let word_id = non_empty(raw.word_id.as_ref())?;
    let hints_count = raw.hints_count.map(to_count).unwrap_or(0);
    Some(WordTiming {
        word_id,
        time_spent_ms: raw.time_spent_ms.map(to_millis).unwrap_or(0),
        used_hint: raw.used_hint.unwrap_or(false) || hints_count > 0,
        hints_count,
        correct: raw.correct,
    })
}

pub fn validate_session(raw: &RawTestSession) -> Result<TestSessionSummary, RecordRejection> {
    let timestamp = resolve_timestamp(raw.timestamp.as_ref())?;

    let correct_words = raw.correct_words.map(to_count).unwrap_or(0);
    let incorrect_words = raw.incorrect_words.map(to_count).unwrap_or(0);
    let total_words = raw
        .total_words
        .map(to_count)
        .filter(|t| *t > 0)
        .unwrap_or(correct_words.saturating_add(incorrect_words));

    let percentage = match raw.percentage.filter(|p| p.is_finite()) {
        Some(p) => clamp_percent(p),
        None if total_words > 0 => {
            clamp_percent(100.0 * correct_words as f64 / total_words as f64)
        }
        None => return Err(RecordRejection::MissingScore),
    };

    let id = non_empty(raw.id.as_ref())
        .unwrap_or_else(|| format!("session-{}", timestamp.timestamp_millis()));

    Ok(TestSessionSummary {
        id,
        timestamp,
        percentage,
        correct_words,
        incorrect_words,
        total_words,
        hints_used: raw.hints_used.map(to_count).unwrap_or(0),
        total_time_ms: raw.total_time_ms.map(to_millis).filter(|ms| *ms > 0),
        difficulty: raw
            .difficulty
            .as_deref()
            .and_then(|d| d.parse::<Difficulty>().ok())
            .unwrap_or_default(),
        test_type: non_empty(raw.test_type.as_ref())
            .unwrap_or_else(|| "standard".to_string()),
        selected_chapters: raw
            .selected_chapters
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        wrong_words: raw
            .wrong_words
            .iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect(),
        word_timings: raw.word_timings.iter().filter_map(validate_timing).collect(),
    })
}

pub fn validate_word(raw: &RawWord) -> Result<Word, RecordRejection> {
    let id = non_empty(raw.id.as_ref()).ok_or(RecordRejection::MissingId)?;
    Ok(Word {
        id,
        english: raw.english.clone().unwrap_or_default(),
        italian: raw.italian.clone().unwrap_or_default(),
        chapter: non_empty(raw.chapter.as_ref()),
        group: non_empty(raw.group.as_ref()),
        learned: raw.learned.unwrap_or(false),
        difficult: raw.difficult.unwrap_or(false),
    })
}

fn pre_aggregated(raw: &RawWordPerformance) -> Option<PreAggregated> {
    let total = raw.total_attempts.filter(|v| v.is_finite())?;
    let correct = raw.correct_attempts.filter(|v| v.is_finite())?;
    let accuracy = raw.accuracy.filter(|v| v.is_finite())?;
    let average = raw.average_response_time_ms.filter(|v| v.is_finite())?;
    if total < 0.0 || correct < 0.0 || accuracy < 0.0 || average < 0.0 {
        return None;
    }
    Some(PreAggregated {
        total_attempts: to_count(total),
        correct_attempts: to_count(correct),
        accuracy: to_count(accuracy),
        average_response_time_ms: average,
    })
}

/// Normalizes one word's stored history; returns the record and the number of dropped attempts.
pub fn normalize_performance(word_id: &str, raw: &RawWordPerformance) -> (WordPerformance, usize) {
    let mut rejected = 0usize;
    let attempts: Vec<AttemptRecord> = raw
        .attempts
        .iter()
        .filter_map(|a| match validate_attempt(a) {
            Ok(record) => Some(record),
            Err(reason) => {
                tracing::debug!(word_id, %reason, "dropping attempt");
                rejected += 1;
                None
            }
        })
        .collect();

    let mut performance = WordPerformance::new(word_id, attempts);
    performance.pre_aggregated = pre_aggregated(raw);
    (performance, rejected)
}

// ==================== Snapshot ====================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionCounts {
    pub sessions: usize,
    pub attempts: usize,
    pub words: usize,
}

impl RejectionCounts {
    pub fn total(&self) -> usize {
        self.sessions + self.attempts + self.words
    }
}

/// Fully validated learner data, sessions oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSnapshot {
    pub sessions: Vec<TestSessionSummary>,
    pub performances: HashMap<String, WordPerformance>,
    pub catalog: Vec<Word>,
    pub rejected: RejectionCounts,
}

pub fn normalize_sessions(raw: &[RawTestSession]) -> (Vec<TestSessionSummary>, usize) {
    let mut rejected = 0usize;
    let mut sessions: Vec<TestSessionSummary> = raw
        .iter()
        .filter_map(|s| match validate_session(s) {
            Ok(session) => Some(session),
            Err(reason) => {
                tracing::debug!(id = ?s.id, %reason, "dropping session");
                rejected += 1;
                None
            }
        })
        .collect();
    sessions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    (sessions, rejected)
}

pub fn normalize_snapshot(snapshot: &AnalyticsSnapshot) -> NormalizedSnapshot {
    let (sessions, rejected_sessions) = normalize_sessions(&snapshot.sessions);

    let mut rejected_attempts = 0usize;
    let mut performances = HashMap::with_capacity(snapshot.word_performances.len());
    for (word_id, raw) in &snapshot.word_performances {
        let trimmed = word_id.trim();
        if trimmed.is_empty() {
            rejected_attempts += raw.attempts.len();
            continue;
        }
        let (performance, dropped) = normalize_performance(trimmed, raw);
        rejected_attempts += dropped;
        performances.insert(trimmed.to_string(), performance);
    }

    let mut rejected_words = 0usize;
    let catalog: Vec<Word> = snapshot
        .catalog
        .iter()
        .filter_map(|w| validate_word(w).map_err(|_| rejected_words += 1).ok())
        .collect();

    let rejected = RejectionCounts {
        sessions: rejected_sessions,
        attempts: rejected_attempts,
        words: rejected_words,
    };
    if rejected.total() > 0 {
        tracing::warn!(
            sessions = rejected.sessions,
            attempts = rejected.attempts,
            words = rejected.words,
            "malformed records dropped during normalization"
        );
    }

    NormalizedSnapshot {
        sessions,
        performances,
        catalog,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: i64) -> Option<RawInstant> {
        Some(RawInstant::Millis(ms))
    }

    // ==================== numeric guards ====================

    #[test]
    fn test_safe_ratio_defaults_on_zero() {
        assert_eq!(safe_ratio(5.0, 0.0, 100.0), 100.0);
        assert_eq!(safe_ratio(5.0, 2.0, 0.0), 2.5);
        assert_eq!(safe_ratio(f64::NAN, 2.0, 7.0), 7.0);
    }

    #[test]
    fn test_to_score_clamps_and_rounds() {
        assert_eq!(to_score(66.6), 67);
        assert_eq!(to_score(-4.0), 0);
        assert_eq!(to_score(140.0), 100);
        assert_eq!(to_score(f64::NAN), 0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(30.04, 1), 30.0);
        assert_eq!(round_to(-2.25, 1), -2.3);
    }

    // ==================== validation ====================

    #[test]
    fn test_session_without_timestamp_rejected() {
        let raw = RawTestSession {
            percentage: Some(80.0),
            ..Default::default()
        };
        assert_eq!(validate_session(&raw), Err(RecordRejection::MissingTimestamp));
    }

    #[test]
    fn test_session_percentage_recomputed_from_counts() {
        let raw = RawTestSession {
            timestamp: ts(1_700_000_000_000),
            correct_words: Some(3.0),
            incorrect_words: Some(1.0),
            ..Default::default()
        };
        let session = validate_session(&raw).unwrap();
        assert_eq!(session.total_words, 4);
        assert_eq!(session.percentage, 75.0);
        assert_eq!(session.id, "session-1700000000000");
        assert_eq!(session.difficulty, Difficulty::Medium);
        assert_eq!(session.test_type, "standard");
    }

    #[test]
    fn test_session_without_score_or_counts_rejected() {
        let raw = RawTestSession {
            timestamp: ts(1_700_000_000_000),
            ..Default::default()
        };
        assert_eq!(validate_session(&raw), Err(RecordRejection::MissingScore));
    }

    #[test]
    fn test_zero_total_time_treated_as_absent() {
        let raw = RawTestSession {
            timestamp: ts(1_700_000_000_000),
            percentage: Some(120.0),
            total_words: Some(10.0),
            total_time_ms: Some(0.0),
            ..Default::default()
        };
        let session = validate_session(&raw).unwrap();
        assert_eq!(session.total_time_ms, None);
        assert_eq!(session.percentage, 100.0);
    }

    #[test]
    fn test_attempt_hint_flags_reconciled() {
        let flagged = RawAttempt {
            timestamp: ts(0),
            correct: Some(true),
            used_hint: Some(true),
            ..Default::default()
        };
        let counted = RawAttempt {
            timestamp: ts(0),
            correct: Some(false),
            hints_count: Some(2.0),
            ..Default::default()
        };
        let a = validate_attempt(&flagged).unwrap();
        assert!(a.used_hint);
        assert_eq!(a.hints_count, 1);
        let b = validate_attempt(&counted).unwrap();
        assert!(b.used_hint);
        assert_eq!(b.hints_count, 2);
    }

    #[test]
    fn test_attempt_without_outcome_rejected() {
        let raw = RawAttempt {
            timestamp: ts(0),
            ..Default::default()
        };
        assert_eq!(validate_attempt(&raw), Err(RecordRejection::MissingOutcome));
    }

    #[test]
    fn test_pre_aggregated_requires_all_fields() {
        let partial = RawWordPerformance {
            total_attempts: Some(4.0),
            correct_attempts: Some(3.0),
            ..Default::default()
        };
        let (perf, _) = normalize_performance("w", &partial);
        assert!(perf.pre_aggregated.is_none());

        let full = RawWordPerformance {
            accuracy: Some(75.0),
            average_response_time_ms: Some(2100.0),
            ..partial
        };
        let (perf, _) = normalize_performance("w", &full);
        assert_eq!(perf.pre_aggregated.unwrap().correct_attempts, 3);
    }

    #[test]
    fn test_snapshot_from_json_counts_rejections() {
        let json = r#"{
            "sessions": [
                {"id": "a", "timestamp": "2024-05-02T10:00:00Z", "percentage": 70, "totalWords": 10},
                {"id": "b", "timestamp": 1714557600000, "percentage": 50, "totalWords": 10},
                {"id": "c", "percentage": 90},
                {"id": "d", "timestamp": "yesterday", "percentage": 90}
            ],
            "wordPerformances": {
                "w1": {"attempts": [
                    {"timestamp": "2024-05-01T10:00:00Z", "correct": true, "timeSpentMs": 1500},
                    {"correct": false}
                ]}
            },
            "catalog": [{"id": "w1", "english": "house", "italian": "casa"}, {"english": "nameless"}]
        }"#;
        let snapshot: AnalyticsSnapshot = serde_json::from_str(json).unwrap();
        let normalized = normalize_snapshot(&snapshot);

        assert_eq!(normalized.sessions.len(), 2);
        assert_eq!(normalized.sessions[0].id, "b");
        assert_eq!(normalized.rejected.sessions, 2);
        assert_eq!(normalized.rejected.attempts, 1);
        assert_eq!(normalized.rejected.words, 1);
        assert_eq!(normalized.performances["w1"].attempts.len(), 1);
        assert_eq!(normalized.catalog[0].italian, "casa");
    }
}
