//! Property-Based Tests for the analytics pipeline
//!
//! Tests the following invariants:
//! - Bounds: every score and the Performance Index stay within 0..=100
//! - Pearson: symmetric, within [-1, 1], never NaN
//! - Regression: R² within [0, 1]; stability factor within [0, 1]
//! - Projection: bounds bracket the projected value inside 0..=100
//! - Idempotence: the same snapshot always yields the same report

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use vocab_analytics::aggregate::aggregate;
use vocab_analytics::config::{AggregationParams, ProjectionParams, TrendParams};
use vocab_analytics::engine::AnalyticsEngine;
use vocab_analytics::projection::{project_all, SeriesPoint};
use vocab_analytics::sanitize::{AnalyticsSnapshot, RawInstant, RawTestSession};
use vocab_analytics::timeline::{limit_chart_data, to_chart_series, AttemptSource, TimelineAttempt};
use vocab_analytics::trend::{analyze, stats};
use vocab_analytics::{AttemptRecord, Word, WordPerformance};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_percentage() -> impl Strategy<Value = f64> {
    (0u32..=1000u32).prop_map(|v| v as f64 / 10.0)
}

fn arb_series(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_percentage(), 0..max_len)
}

fn arb_raw_session() -> impl Strategy<Value = RawTestSession> {
    (
        0i64..=120,                              // day offset
        0i64..=23,                               // hour
        proptest::option::of(-20.0f64..=140.0),  // percentage, possibly out of range
        0u32..=40,                               // total words
        0u32..=60,                               // hints
        proptest::option::of(0u32..=900_000),    // total time ms
        prop_oneof![Just("easy"), Just("medium"), Just("hard"), Just("??")],
    )
        .prop_map(|(day, hour, percentage, total, hints, time, difficulty)| {
            let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::days(day)
                + Duration::hours(hour);
            RawTestSession {
                id: Some(format!("s-{day}-{hour}")),
                timestamp: Some(RawInstant::from(timestamp)),
                percentage,
                correct_words: Some((total / 2) as f64),
                incorrect_words: Some((total - total / 2) as f64),
                total_words: Some(total as f64),
                hints_used: Some(hints as f64),
                total_time_ms: time.map(|t| t as f64),
                difficulty: Some(difficulty.to_string()),
                selected_chapters: vec!["1".to_string()],
                ..Default::default()
            }
        })
}

fn arb_snapshot() -> impl Strategy<Value = AnalyticsSnapshot> {
    prop::collection::vec(arb_raw_session(), 0..12).prop_map(|sessions| AnalyticsSnapshot {
        sessions,
        ..Default::default()
    })
}

fn arb_attempts() -> impl Strategy<Value = Vec<AttemptRecord>> {
    prop::collection::vec((any::<bool>(), 0u32..=3, 0u64..=20_000), 0..20).prop_map(|raw| {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        raw.into_iter()
            .enumerate()
            .map(|(i, (correct, hints, ms))| AttemptRecord {
                timestamp: start + Duration::minutes(i as i64),
                correct,
                used_hint: hints > 0,
                hints_count: hints,
                time_spent_ms: ms,
                test_id: None,
            })
            .collect()
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// PBT-1: every metric of any snapshot stays within 0..=100
    #[test]
    fn metrics_stay_in_bounds(snapshot in arb_snapshot()) {
        let report = AnalyticsEngine::default().analyze(&snapshot);
        if let Some(m) = &report.metrics {
            let scores = [
                m.accuracy,
                m.consistency,
                m.hint_efficiency,
                m.speed_score,
                m.difficulty_score,
                m.performance_index,
            ];
            for value in scores {
                prop_assert!(value <= 100, "metric out of range: {}", value);
            }
            let points: u32 = m.calculation_breakdown.iter().map(|b| b.points).sum();
            prop_assert_eq!(points.min(100), m.performance_index);
        } else {
            prop_assert!(report.timeline.is_empty());
        }
        prop_assert!((0.0..=1.0).contains(&report.trend.stability_factor));
        prop_assert!((0.0..=1.0).contains(&report.trend.r_squared));
        for point in &report.timeline {
            prop_assert!((0.0..=100.0).contains(&point.percentage));
        }
    }

    /// PBT-2: Pearson correlation is symmetric and bounded
    #[test]
    fn pearson_symmetric_and_bounded(
        pairs in prop::collection::vec((arb_percentage(), arb_percentage()), 0..30)
    ) {
        let xs: Vec<f64> = pairs.iter().map(|(x, _)| *x).collect();
        let ys: Vec<f64> = pairs.iter().map(|(_, y)| *y).collect();
        let r = stats::pearson(&xs, &ys);
        prop_assert!(!r.is_nan());
        prop_assert!((-1.0..=1.0).contains(&r));
        prop_assert!((r - stats::pearson(&ys, &xs)).abs() < 1e-9);
    }

    /// PBT-3: trend analysis never produces NaN
    #[test]
    fn trend_analysis_is_finite(values in arb_series(40)) {
        let result = analyze(&values, &TrendParams::default());
        prop_assert!(result.slope.is_finite());
        prop_assert!(result.intercept.is_finite());
        prop_assert!(result.velocity.is_finite());
        prop_assert!(result.acceleration.is_finite());
        prop_assert!((0.0..=1.0).contains(&result.r_squared));
        prop_assert!((0.0..=1.0).contains(&result.stability_factor));
    }

    /// PBT-4: projected values and bands stay inside 0..=100
    #[test]
    fn projections_are_bracketed(values in arb_series(30)) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let series: Vec<SeriesPoint> = values
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint { timestamp: start + Duration::days(i as i64), value: *v })
            .collect();
        let params = ProjectionParams::default();
        let results = project_all(&series, None, &params);
        if values.len() < params.min_points {
            prop_assert!(results.is_empty());
        } else {
            prop_assert_eq!(results.len(), 4);
        }
        for r in &results {
            let value = r.projected_metrics.accuracy;
            prop_assert!((0.0..=100.0).contains(&value));
            prop_assert!(r.pessimistic_bound <= value + 1e-9);
            prop_assert!(r.optimistic_bound + 1e-9 >= value);
            prop_assert!(r.optimistic_bound <= 100.0);
            prop_assert!(r.pessimistic_bound >= 0.0);
            prop_assert!((params.confidence_floor..=100).contains(&r.confidence));
            for m in &r.milestones {
                prop_assert!(m.estimated_days >= 1 && m.estimated_days <= r.days);
            }
        }
    }

    /// PBT-5: aggregation keeps scores bounded and the streak within the history
    #[test]
    fn aggregation_in_bounds(attempts in arb_attempts(), extra_hints in 0u32..50) {
        let perf = WordPerformance::new("w", attempts);
        let total = perf.hints_used() + extra_hints;
        let word = Word::unlisted("w");
        let analysis = aggregate(&word, Some(&perf), total, &AggregationParams::default());
        prop_assert!(analysis.accuracy <= 100);
        prop_assert!(analysis.hints_percentage <= 100);
        prop_assert!(analysis.current_streak <= analysis.total_attempts);
        prop_assert_eq!(analysis.has_performance_data, !perf.attempts.is_empty());
    }

    /// PBT-6: windowed chart accuracy always matches the window itself
    #[test]
    fn windowed_chart_is_self_consistent(attempts in arb_attempts(), n in 1usize..10) {
        let timeline: Vec<TimelineAttempt> = attempts
            .into_iter()
            .map(|record| TimelineAttempt {
                hint_share: record.hints_count as f64,
                record,
                source: AttemptSource::Recorded,
                is_estimated: false,
                has_real_time: true,
            })
            .collect();
        let window = limit_chart_data(&to_chart_series(&timeline), n);
        prop_assert!(window.len() <= n);
        if let Some(last) = window.last() {
            let correct = window.iter().filter(|p| p.correct).count() as f64;
            let expected = (100.0 * correct / window.len() as f64).round() as u32;
            prop_assert_eq!(last.cumulative_accuracy, expected);
        }
    }

    /// PBT-7: the same snapshot always produces the same report
    #[test]
    fn analysis_is_idempotent(snapshot in arb_snapshot()) {
        let engine = AnalyticsEngine::default();
        let first = engine.analyze(&snapshot);
        let second = engine.analyze(&snapshot);
        prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }
}
