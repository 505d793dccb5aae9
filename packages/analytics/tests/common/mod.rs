//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use vocab_analytics::sanitize::{
    AnalyticsSnapshot, RawAttempt, RawInstant, RawTestSession, RawWord, RawWordPerformance,
};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 18, 30, 0).unwrap()
}

pub fn raw_session(day: i64, percentage: f64, total_words: u32) -> RawTestSession {
    let correct = (percentage / 100.0 * total_words as f64).round();
    RawTestSession {
        id: Some(format!("session-{day}")),
        timestamp: Some(RawInstant::from(base_time() + Duration::days(day))),
        percentage: Some(percentage),
        correct_words: Some(correct),
        incorrect_words: Some(total_words as f64 - correct),
        total_words: Some(total_words as f64),
        hints_used: Some(0.0),
        difficulty: Some("medium".to_string()),
        test_type: Some("standard".to_string()),
        selected_chapters: vec!["1".to_string()],
        ..Default::default()
    }
}

pub fn raw_attempt(minute: i64, correct: bool, hints: u32) -> RawAttempt {
    RawAttempt {
        timestamp: Some(RawInstant::from(base_time() + Duration::minutes(minute))),
        correct: Some(correct),
        used_hint: Some(hints > 0),
        hints_count: Some(hints as f64),
        time_spent_ms: Some(4000.0),
        test_id: None,
    }
}

pub fn raw_word(id: &str, chapter: &str) -> RawWord {
    RawWord {
        id: Some(id.to_string()),
        english: Some(format!("{id}-en")),
        italian: Some(format!("{id}-it")),
        chapter: Some(chapter.to_string()),
        ..Default::default()
    }
}

/// Five untimed sessions at 50, 60, 70, 80, 90 percent, ten words each.
pub fn rising_snapshot() -> AnalyticsSnapshot {
    AnalyticsSnapshot {
        sessions: [50.0, 60.0, 70.0, 80.0, 90.0]
            .iter()
            .enumerate()
            .map(|(day, p)| raw_session(day as i64, *p, 10))
            .collect(),
        word_performances: HashMap::new(),
        catalog: vec![raw_word("casa", "1")],
    }
}

/// One word answered correct, correct, incorrect.
pub fn single_word_snapshot() -> AnalyticsSnapshot {
    let mut performances = HashMap::new();
    performances.insert(
        "casa".to_string(),
        RawWordPerformance {
            attempts: vec![
                raw_attempt(0, true, 0),
                raw_attempt(10, true, 0),
                raw_attempt(20, false, 0),
            ],
            ..Default::default()
        },
    );
    AnalyticsSnapshot {
        sessions: vec![],
        word_performances: performances,
        catalog: vec![raw_word("casa", "1")],
    }
}
