//! Common Types and Constants
//!
//! Normalized input records shared by every analytics stage, plus the small enums that
//! several stages agree on. Records here are produced by [`crate::sanitize`] and are fully
//! populated: downstream code never has to second-guess a missing field.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

/// Milliseconds per second
pub const MS_PER_SECOND: f64 = 1000.0;

/// Upper bound of every percentage-style score
pub const MAX_SCORE: f64 = 100.0;

// ==================== Attempts ====================

/// One recorded try at recalling a single word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub timestamp: DateTime<Utc>,
    pub correct: bool,
    pub used_hint: bool,
    pub hints_count: u32,
    pub time_spent_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
}

/// Counters cached by the persistence layer for a word.
///
/// Only carried when every field was present in the stored record; whether the values are
/// coherent is decided by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreAggregated {
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub accuracy: u32,
    pub average_response_time_ms: f64,
}

/// Attempt history of one word, oldest attempt first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPerformance {
    pub word_id: String,
    pub attempts: Vec<AttemptRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_aggregated: Option<PreAggregated>,
}

impl WordPerformance {
    pub fn new(word_id: impl Into<String>, mut attempts: Vec<AttemptRecord>) -> Self {
        attempts.sort_by_key(|a| a.timestamp);
        Self {
            word_id: word_id.into(),
            attempts,
            pre_aggregated: None,
        }
    }

    /// Total hints across attempts, saturating at `u32::MAX`
    pub fn hints_used(&self) -> u32 {
        self.attempts
            .iter()
            .fold(0u32, |acc, a| acc.saturating_add(a.hints_count))
    }
}

// ==================== Catalog ====================

/// Catalog entry for a word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: String,
    pub english: String,
    pub italian: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub learned: bool,
    pub difficult: bool,
}

impl Word {
    /// Bare entry for a word id that has no catalog record.
    pub fn unlisted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            english: String::new(),
            italian: String::new(),
            chapter: None,
            group: None,
            learned: false,
            difficult: false,
        }
    }
}

// ==================== Sessions ====================

/// Quiz difficulty selected for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "facile" => Ok(Difficulty::Easy),
            "medium" | "normal" | "medio" => Ok(Difficulty::Medium),
            "hard" | "difficile" => Ok(Difficulty::Hard),
            _ => Err(()),
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

/// Per-word timing captured during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTiming {
    pub word_id: String,
    pub time_spent_ms: u64,
    pub used_hint: bool,
    pub hints_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

/// One completed quiz run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSessionSummary {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Score in `[0, 100]`
    pub percentage: f64,
    pub correct_words: u32,
    pub incorrect_words: u32,
    pub total_words: u32,
    pub hints_used: u32,
    /// Absent when the session was recorded without a timer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_ms: Option<u64>,
    pub difficulty: Difficulty,
    pub test_type: String,
    pub selected_chapters: Vec<String>,
    /// Words answered incorrectly in this session
    #[serde(default)]
    pub wrong_words: Vec<String>,
    #[serde(default)]
    pub word_timings: Vec<WordTiming>,
}

impl TestSessionSummary {
    pub fn has_real_time(&self) -> bool {
        self.total_time_ms.is_some() && self.total_words > 0
    }

    pub fn timing_for(&self, word_id: &str) -> Option<&WordTiming> {
        self.word_timings.iter().find(|t| t.word_id == word_id)
    }

    pub fn marked_wrong(&self, word_id: &str) -> bool {
        self.wrong_words.iter().any(|w| w == word_id)
    }

    pub fn includes_chapter(&self, chapter: &str) -> bool {
        self.selected_chapters.iter().any(|c| c == chapter)
    }
}

// ==================== Shared enums ====================

/// Direction derived from the second derivative of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Accelerating,
    Decelerating,
    Steady,
}

/// Projection horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Timeframe {
    Week,
    Month,
    TwoMonths,
    Quarter,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Week,
        Timeframe::Month,
        Timeframe::TwoMonths,
        Timeframe::Quarter,
    ];

    pub fn days(&self) -> u32 {
        match self {
            Timeframe::Week => 7,
            Timeframe::Month => 30,
            Timeframe::TwoMonths => 60,
            Timeframe::Quarter => 90,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.days() == days)
    }
}

/// Fixed likelihood label attached to a projected milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneProbability {
    High,
    Medium,
    Low,
}
