//! Analytics Engine
//!
//! Runs the full pipeline over one learner's data snapshot:
//!
//! ```text
//! normalize -> (word aggregation || session timeline) -> metrics -> trend
//!           -> projection -> profile -> insights
//! ```
//!
//! The engine holds configuration only. Every call works on its own snapshot, so independent
//! learners can be analysed on a rayon pool without coordination.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::aggregate::{self, WordPerformanceAnalysis, WordSummary};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::insight::{self, InsightBundle};
use crate::metrics::{self, PerformanceMetrics};
use crate::profile::{self, LearnerProfile};
use crate::projection::{self, ProjectionResult, SeriesPoint};
use crate::sanitize::{
    normalize_snapshot, round_to, AnalyticsSnapshot, NormalizedSnapshot, RawTestSession, RawWord,
    RawWordPerformance,
};
use crate::timeline::{self, ChartPoint, PerformanceTimelinePoint};
use crate::trend::{self, stats, CorrelationFinding, DetectedPattern, TrendAnalysisResult};
use crate::types::Word;

// ==================== Data source ====================

/// Persistence collaborator that supplies a learner's history.
pub trait AnalyticsSource {
    fn get_test_sessions(&self, user_id: &str) -> Result<Vec<RawTestSession>>;

    fn get_word_performances(&self, user_id: &str) -> Result<HashMap<String, RawWordPerformance>>;

    fn get_word_catalog(&self, user_id: &str) -> Result<Vec<RawWord>>;

    /// Fetches all three collections for one learner.
    fn snapshot(&self, user_id: &str) -> Result<AnalyticsSnapshot> {
        Ok(AnalyticsSnapshot {
            sessions: self.get_test_sessions(user_id)?,
            word_performances: self.get_word_performances(user_id)?,
            catalog: self.get_word_catalog(user_id)?,
        })
    }
}

/// In-memory source keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    users: HashMap<String, AnalyticsSnapshot>,
}

impl SnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user_id: impl Into<String>, snapshot: AnalyticsSnapshot) {
        self.users.insert(user_id.into(), snapshot);
    }

    /// Parses a JSON object of `{ "<userId>": <snapshot>, ... }`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let users: HashMap<String, AnalyticsSnapshot> = serde_json::from_str(json)?;
        Ok(Self { users })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn user_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.users.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn user(&self, user_id: &str) -> Result<&AnalyticsSnapshot> {
        self.users
            .get(user_id)
            .ok_or_else(|| AnalyticsError::Source(format!("unknown user: {user_id}")))
    }
}

impl AnalyticsSource for SnapshotSource {
    fn get_test_sessions(&self, user_id: &str) -> Result<Vec<RawTestSession>> {
        Ok(self.user(user_id)?.sessions.clone())
    }

    fn get_word_performances(&self, user_id: &str) -> Result<HashMap<String, RawWordPerformance>> {
        Ok(self.user(user_id)?.word_performances.clone())
    }

    fn get_word_catalog(&self, user_id: &str) -> Result<Vec<RawWord>> {
        Ok(self.user(user_id)?.catalog.clone())
    }
}

// ==================== Report ====================

/// Session series point for the trend chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionChartPoint {
    pub index: u32,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub percentage: f64,
    pub moving_average: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_index: Option<f64>,
    pub is_estimated: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    pub sessions_analyzed: usize,
    pub words_analyzed: usize,
    pub rejected_sessions: usize,
    pub rejected_attempts: usize,
    pub rejected_words: usize,
    /// Sessions whose per-word time is estimated
    pub estimated_sessions: usize,
    pub estimated_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub words: Vec<WordPerformanceAnalysis>,
    pub word_summary: WordSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PerformanceMetrics>,
    pub timeline: Vec<PerformanceTimelinePoint>,
    pub session_chart: Vec<SessionChartPoint>,
    pub trend: TrendAnalysisResult,
    pub patterns: Vec<DetectedPattern>,
    pub correlations: Vec<CorrelationFinding>,
    pub projections: Vec<ProjectionResult>,
    pub profile: LearnerProfile,
    pub insights: InsightBundle,
    pub data_quality: DataQuality,
}

impl AnalyticsReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ==================== Engine ====================

#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

/// Catalog words followed by attempted words missing from the catalog, sorted by id.
fn known_words(data: &NormalizedSnapshot) -> Vec<Word> {
    let mut words = data.catalog.clone();
    let listed: HashSet<&str> = data.catalog.iter().map(|w| w.id.as_str()).collect();
    let mut unlisted: Vec<&String> = data
        .performances
        .keys()
        .filter(|id| !listed.contains(id.as_str()))
        .collect();
    unlisted.sort_unstable();
    words.extend(unlisted.into_iter().map(Word::unlisted));
    words
}

fn session_chart(
    timeline: &[PerformanceTimelinePoint],
    index_series: &[f64],
    window: usize,
) -> Vec<SessionChartPoint> {
    let percentages: Vec<f64> = timeline.iter().map(|p| p.percentage).collect();
    let averages = stats::moving_average_series(&percentages, window);
    timeline
        .iter()
        .zip(averages)
        .enumerate()
        .map(|(i, (point, moving_average))| SessionChartPoint {
            index: i as u32 + 1,
            session_id: point.session_id.clone(),
            timestamp: point.timestamp,
            label: point.timestamp.format("%d/%m").to_string(),
            percentage: point.percentage,
            moving_average: round_to(moving_average, 1),
            performance_index: index_series.get(i).copied(),
            is_estimated: point.is_estimated,
        })
        .collect()
}

impl AnalyticsEngine {
    /// Engine with a validated configuration.
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine configured from `VOCAB_ANALYTICS_CONFIG`, or defaults.
    pub fn from_env() -> Result<Self> {
        Self::new(AnalyticsConfig::from_env()?)
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn analyze(&self, snapshot: &AnalyticsSnapshot) -> AnalyticsReport {
        self.analyze_normalized(&normalize_snapshot(snapshot))
    }

    pub fn analyze_normalized(&self, data: &NormalizedSnapshot) -> AnalyticsReport {
        let config = &self.config;
        let words = known_words(data);
        let span = info_span!(
            "analyze",
            sessions = data.sessions.len(),
            words = words.len()
        );
        let _enter = span.enter();

        let total_hints = aggregate::total_hints(&data.performances);
        let (analyses, timeline) = rayon::join(
            || {
                words
                    .par_iter()
                    .map(|word| {
                        aggregate::aggregate(
                            word,
                            data.performances.get(&word.id),
                            total_hints,
                            &config.aggregation,
                        )
                    })
                    .collect::<Vec<_>>()
            },
            || timeline::build_performance_timeline(&data.sessions, &config.metrics),
        );
        let word_summary = aggregate::summarize(&analyses);
        debug!(
            words = analyses.len(),
            with_data = word_summary.words_with_data,
            "aggregated words"
        );

        let hint_detail = aggregate::hint_usage_detail(&data.performances);
        let metrics =
            metrics::compute_metrics(&timeline, &data.sessions, hint_detail.as_ref(), config);
        let index_series = metrics::session_index_series(&timeline, &data.sessions, config);

        let percentages: Vec<f64> = timeline.iter().map(|p| p.percentage).collect();
        let trend = trend::analyze(&percentages, &config.trend);
        let patterns = trend::detect_patterns(&percentages, &config.trend);
        let correlations = trend::correlation_findings(&timeline, &config.trend);
        debug!(
            slope = trend.slope,
            r_squared = trend.r_squared,
            patterns = patterns.len(),
            "trend analysed"
        );

        let accuracy_series: Vec<SeriesPoint> = timeline
            .iter()
            .map(|p| SeriesPoint {
                timestamp: p.timestamp,
                value: p.percentage,
            })
            .collect();
        let projections =
            projection::project_all(&accuracy_series, Some(&index_series), &config.projection);

        let profile = profile::classify(metrics.as_ref(), &timeline, &config.profile);
        let insights = insight::synthesize(
            metrics.as_ref(),
            &trend,
            Some(&word_summary),
            &patterns,
            &config.insight,
        );

        let estimated_sessions = timeline.iter().filter(|p| p.is_estimated).count();
        let data_quality = DataQuality {
            sessions_analyzed: timeline.len(),
            words_analyzed: analyses.len(),
            rejected_sessions: data.rejected.sessions,
            rejected_attempts: data.rejected.attempts,
            rejected_words: data.rejected.words,
            estimated_sessions,
            estimated_share: round_to(metrics::estimated_share(&timeline), 3),
        };

        info!(
            performance_index = metrics.as_ref().map(|m| m.performance_index),
            projections = projections.len(),
            "analytics report ready"
        );

        AnalyticsReport {
            words: analyses,
            word_summary,
            metrics,
            session_chart: session_chart(
                &timeline,
                &index_series,
                config.trend.moving_average_window,
            ),
            timeline,
            trend,
            patterns,
            correlations,
            projections,
            profile,
            insights,
            data_quality,
        }
    }

    /// Fetches the learner's snapshot from `source` and analyses it.
    pub fn analyze_user<S>(&self, source: &S, user_id: &str) -> Result<AnalyticsReport>
    where
        S: AnalyticsSource + ?Sized,
    {
        let snapshot = source.snapshot(user_id)?;
        Ok(self.analyze(&snapshot))
    }

    /// Analyses independent snapshots in parallel. Output order follows input order.
    pub fn analyze_many(&self, snapshots: &[AnalyticsSnapshot]) -> Vec<AnalyticsReport> {
        snapshots.par_iter().map(|s| self.analyze(s)).collect()
    }

    /// Chart series for one word, optionally limited to the most recent `limit` points.
    pub fn word_chart(
        &self,
        snapshot: &AnalyticsSnapshot,
        word_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChartPoint>> {
        let word_id = word_id.trim();
        if word_id.is_empty() {
            return Err(AnalyticsError::Validation("word id must not be empty".to_string()));
        }
        let data = normalize_snapshot(snapshot);
        let word = data
            .catalog
            .iter()
            .find(|w| w.id == word_id)
            .cloned()
            .unwrap_or_else(|| Word::unlisted(word_id));

        let attempts = timeline::build_word_timeline(
            &word,
            data.performances.get(word_id),
            &data.sessions,
            &self.config.metrics,
        );
        let series = timeline::to_chart_series(&attempts);
        Ok(match limit {
            Some(n) => timeline::limit_chart_data(&series, n),
            None => series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_json() -> &'static str {
        r#"{
            "sessions": [
                {"id": "a", "timestamp": "2024-05-01T09:00:00Z", "percentage": 60, "correctWords": 6, "incorrectWords": 4, "totalWords": 10, "selectedChapters": ["1"], "wrongWords": ["w2"]},
                {"id": "b", "timestamp": "2024-05-02T09:00:00Z", "percentage": 70, "correctWords": 7, "incorrectWords": 3, "totalWords": 10, "selectedChapters": ["1"]},
                {"id": "c", "timestamp": "2024-05-03T09:00:00Z", "percentage": 80, "correctWords": 8, "incorrectWords": 2, "totalWords": 10, "selectedChapters": ["1"]},
                {"timestamp": null, "percentage": 99}
            ],
            "wordPerformances": {
                "w1": {"attempts": [
                    {"timestamp": "2024-05-01T09:01:00Z", "correct": true, "timeSpentMs": 4000},
                    {"timestamp": "2024-05-02T09:01:00Z", "correct": true, "usedHint": true, "hintsCount": 1, "timeSpentMs": 6000},
                    {"timestamp": "2024-05-03T09:01:00Z", "correct": true, "timeSpentMs": 5000}
                ]},
                "orphan": {"attempts": [{"timestamp": "2024-05-03T09:02:00Z", "correct": false}]}
            },
            "catalog": [
                {"id": "w1", "english": "house", "italian": "casa", "chapter": "1"},
                {"id": "w2", "english": "dog", "italian": "cane", "chapter": "1"},
                {"id": "w3", "english": "cat", "italian": "gatto", "chapter": "2"}
            ]
        }"#
    }

    fn snapshot() -> AnalyticsSnapshot {
        serde_json::from_str(snapshot_json()).unwrap()
    }

    #[test]
    fn test_report_shape() {
        let report = AnalyticsEngine::default().analyze(&snapshot());

        let ids: Vec<&str> = report.words.iter().map(|w| w.word_id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "w2", "w3", "orphan"]);
        assert!(!report.words[1].has_performance_data);

        assert_eq!(report.data_quality.sessions_analyzed, 3);
        assert_eq!(report.data_quality.rejected_sessions, 1);
        assert_eq!(report.data_quality.estimated_sessions, 3);
        assert_eq!(report.data_quality.estimated_share, 1.0);

        let metrics = report.metrics.as_ref().unwrap();
        assert_eq!(metrics.accuracy, 70);
        // 3 of 4 recorded attempts without hints
        assert_eq!(metrics.hint_efficiency, 75);

        assert_eq!(report.session_chart.len(), 3);
        assert_eq!(report.session_chart[2].moving_average, 70.0);
        assert_eq!(report.projections.len(), 4);
        assert!(!report.insights.recommendation.is_empty());
    }

    #[test]
    fn test_empty_snapshot_degrades() {
        let report = AnalyticsEngine::default().analyze(&AnalyticsSnapshot::default());
        assert!(report.metrics.is_none());
        assert!(report.projections.is_empty());
        assert!(report.words.is_empty());
        assert_eq!(report.insights.recommendations.len(), 1);
    }

    #[test]
    fn test_word_chart_reconstructs_from_sessions() {
        let engine = AnalyticsEngine::default();
        let chart = engine.word_chart(&snapshot(), "w2", None).unwrap();
        let outcomes: Vec<bool> = chart.iter().map(|p| p.correct).collect();
        assert_eq!(outcomes, vec![false, true, true]);
        assert!(chart.iter().all(|p| p.is_estimated || !p.correct));

        let window = engine.word_chart(&snapshot(), "w2", Some(2)).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[1].cumulative_accuracy, 100);

        assert!(matches!(
            engine.word_chart(&snapshot(), "  ", None),
            Err(AnalyticsError::Validation(_))
        ));
    }

    #[test]
    fn test_snapshot_source() {
        let mut source = SnapshotSource::new();
        source.insert("u1", snapshot());
        let engine = AnalyticsEngine::default();

        let report = engine.analyze_user(&source, "u1").unwrap();
        assert_eq!(report, engine.analyze(&snapshot()));
        assert!(matches!(
            engine.analyze_user(&source, "nobody"),
            Err(AnalyticsError::Source(_))
        ));
        assert_eq!(source.user_ids(), vec!["u1"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalyticsConfig::default();
        config.weights.precision = 0.9;
        assert!(matches!(
            AnalyticsEngine::new(config),
            Err(AnalyticsError::Config(_))
        ));
    }
}
