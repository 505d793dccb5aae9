//! Analytics configuration
//!
//! Every weight, threshold and step table used by the pipeline lives here and is passed
//! explicitly to the functions that need it. Partial JSON documents are accepted: missing
//! sections fall back to their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::types::{Difficulty, MilestoneProbability};

/// Environment variable pointing at a JSON configuration file
pub const CONFIG_PATH_ENV: &str = "VOCAB_ANALYTICS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricWeights {
    pub precision: f64,
    pub consistency: f64,
    pub efficiency: f64,
    pub speed: f64,
    pub difficulty: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            precision: 0.30,
            consistency: 0.25,
            efficiency: 0.20,
            speed: 0.15,
            difficulty: 0.10,
        }
    }
}

impl MetricWeights {
    pub fn sum(&self) -> f64 {
        self.precision + self.consistency + self.efficiency + self.speed + self.difficulty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedStep {
    pub max_seconds: f64,
    pub score: u32,
}

/// Seconds-per-word to speed score, evaluated as inclusive upper bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeedTable {
    pub steps: Vec<SpeedStep>,
    pub slowest_score: u32,
}

impl Default for SpeedTable {
    fn default() -> Self {
        let step = |max_seconds, score| SpeedStep { max_seconds, score };
        Self {
            steps: vec![
                step(3.0, 100),
                step(5.0, 90),
                step(8.0, 80),
                step(12.0, 70),
                step(15.0, 60),
                step(20.0, 50),
                step(25.0, 40),
            ],
            slowest_score: 30,
        }
    }
}

impl SpeedTable {
    pub fn score(&self, seconds_per_word: f64) -> u32 {
        if !seconds_per_word.is_finite() {
            return self.slowest_score;
        }
        self.steps
            .iter()
            .find(|s| seconds_per_word <= s.max_seconds)
            .map(|s| s.score)
            .unwrap_or(self.slowest_score)
    }
}

/// Per-word pace assumed when a session carries no timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EstimatedPace {
    pub easy_seconds: f64,
    pub medium_seconds: f64,
    pub hard_seconds: f64,
}

impl Default for EstimatedPace {
    fn default() -> Self {
        Self {
            easy_seconds: 6.0,
            medium_seconds: 8.0,
            hard_seconds: 12.0,
        }
    }
}

impl EstimatedPace {
    pub fn seconds_for(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.easy_seconds,
            Difficulty::Medium => self.medium_seconds,
            Difficulty::Hard => self.hard_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsParams {
    /// Session score counted towards the best streak
    pub streak_threshold: f64,
    /// Minimum words for a session to count as a difficulty test
    pub large_session_words: u32,
    pub difficulty_bonus: f64,
    pub default_difficulty_score: u32,
    /// Cap on each half compared by the improvement trend
    pub trend_half_cap: usize,
    pub pace: EstimatedPace,
}

impl Default for MetricsParams {
    fn default() -> Self {
        Self {
            streak_threshold: 75.0,
            large_session_words: 20,
            difficulty_bonus: 10.0,
            default_difficulty_score: 70,
            trend_half_cap: 5,
            pace: EstimatedPace::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregationParams {
    pub min_attempts_for_status: u32,
    pub consolidated_accuracy: u32,
    pub consolidated_streak: u32,
    pub critical_accuracy: u32,
    pub inconsistent_accuracy: u32,
    pub trend_min_attempts: usize,
    /// Percentage-point change between halves that counts as a trend
    pub trend_delta: f64,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            min_attempts_for_status: 3,
            consolidated_accuracy: 90,
            consolidated_streak: 3,
            critical_accuracy: 30,
            inconsistent_accuracy: 60,
            trend_min_attempts: 4,
            trend_delta: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrendParams {
    /// Ascending weights, last weight applies to the most recent point
    pub wma_weights: Vec<f64>,
    pub std_window: usize,
    pub moving_average_window: usize,
    pub acceleration_threshold: f64,
    pub pattern_window: usize,
    pub plateau_range: f64,
    pub shift_delta: f64,
    pub volatility_std: f64,
    pub min_correlation_points: usize,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            wma_weights: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            std_window: 5,
            moving_average_window: 3,
            acceleration_threshold: 0.1,
            pattern_window: 3,
            plateau_range: 5.0,
            shift_delta: 10.0,
            volatility_std: 15.0,
            min_correlation_points: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneRule {
    pub threshold: f64,
    pub label: String,
    pub probability: MilestoneProbability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectionParams {
    pub min_points: usize,
    pub confidence_floor: u32,
    pub band_factor: f64,
    pub milestones: Vec<MilestoneRule>,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            min_points: 3,
            confidence_floor: 10,
            band_factor: 0.2,
            milestones: vec![
                MilestoneRule {
                    threshold: 70.0,
                    label: "Solid recall (70%)".to_string(),
                    probability: MilestoneProbability::High,
                },
                MilestoneRule {
                    threshold: 85.0,
                    label: "Mastery (85%)".to_string(),
                    probability: MilestoneProbability::Medium,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsightThresholds {
    pub accuracy_strength: u32,
    pub accuracy_weak: u32,
    pub consistency_strength: u32,
    pub consistency_weak: u32,
    pub efficiency_strength: u32,
    pub efficiency_weak: u32,
    pub speed_strength: u32,
    pub speed_weak: u32,
    pub difficulty_strength: u32,
    pub streak_strength: u32,
    pub trend_delta: f64,
    pub stability_weak: f64,
    pub accuracy_goal: u32,
    pub index_goal_step: u32,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            accuracy_strength: 80,
            accuracy_weak: 70,
            consistency_strength: 80,
            consistency_weak: 60,
            efficiency_strength: 80,
            efficiency_weak: 60,
            speed_strength: 80,
            speed_weak: 50,
            difficulty_strength: 85,
            streak_strength: 5,
            trend_delta: 5.0,
            stability_weak: 0.7,
            accuracy_goal: 80,
            index_goal_step: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileParams {
    pub default_session_minutes: f64,
    pub peak_hours: usize,
    pub min_sessions_per_difficulty: usize,
    pub struggling_accuracy: u32,
    pub improving_trend: f64,
    pub strong_accuracy: u32,
    pub fast_speed: u32,
    pub steady_consistency: u32,
    pub slow_speed: u32,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            default_session_minutes: 15.0,
            peak_hours: 3,
            min_sessions_per_difficulty: 2,
            struggling_accuracy: 60,
            improving_trend: 10.0,
            strong_accuracy: 75,
            fast_speed: 80,
            steady_consistency: 85,
            slow_speed: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyticsConfig {
    pub weights: MetricWeights,
    pub speed: SpeedTable,
    pub metrics: MetricsParams,
    pub aggregation: AggregationParams,
    pub trend: TrendParams,
    pub projection: ProjectionParams,
    pub insight: InsightThresholds,
    pub profile: ProfileParams,
}

impl AnalyticsConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by [`CONFIG_PATH_ENV`], or the defaults when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                let raw = std::fs::read_to_string(path.trim())?;
                let config = Self::from_json_str(&raw)?;
                tracing::info!(path = %path.trim(), "loaded analytics config");
                Ok(config)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let weights = [
            self.weights.precision,
            self.weights.consistency,
            self.weights.efficiency,
            self.weights.speed,
            self.weights.difficulty,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AnalyticsError::Config(
                "metric weights must be finite and non-negative".to_string(),
            ));
        }
        if (self.weights.sum() - 1.0).abs() > 1e-6 {
            return Err(AnalyticsError::Config(format!(
                "metric weights must sum to 1, got {:.4}",
                self.weights.sum()
            )));
        }
        if self.speed.steps.is_empty() {
            return Err(AnalyticsError::Config("speed table is empty".to_string()));
        }
        let ascending = self
            .speed
            .steps
            .windows(2)
            .all(|w| w[0].max_seconds < w[1].max_seconds && w[0].score >= w[1].score);
        if !ascending {
            return Err(AnalyticsError::Config(
                "speed table must ascend in seconds and descend in score".to_string(),
            ));
        }
        if self.trend.wma_weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AnalyticsError::Config(
                "moving average weights must be finite and non-negative".to_string(),
            ));
        }
        if self.projection.confidence_floor > 100 {
            return Err(AnalyticsError::Config(
                "confidence floor must be within 0..=100".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalyticsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_speed_table_boundaries_are_inclusive() {
        let table = SpeedTable::default();
        assert_eq!(table.score(0.5), 100);
        assert_eq!(table.score(3.0), 100);
        assert_eq!(table.score(3.01), 90);
        assert_eq!(table.score(25.0), 40);
        assert_eq!(table.score(25.5), 30);
        assert_eq!(table.score(f64::NAN), 30);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalyticsConfig::from_json_str(r#"{"metrics":{"streakThreshold":80}}"#)
            .expect("partial config");
        assert_eq!(config.metrics.streak_threshold, 80.0);
        assert_eq!(config.metrics.large_session_words, 20);
        assert_eq!(config.weights, MetricWeights::default());
    }

    #[test]
    fn test_unbalanced_weights_rejected() {
        let err = AnalyticsConfig::from_json_str(r#"{"weights":{"precision":0.9}}"#)
            .expect_err("weights sum above 1");
        assert!(matches!(err, AnalyticsError::Config(_)));
    }

    #[test]
    fn test_unordered_speed_table_rejected() {
        let mut config = AnalyticsConfig::default();
        config.speed.steps.swap(0, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"{"projection":{"confidenceFloor":20}}"#).unwrap();
        std::env::set_var(CONFIG_PATH_ENV, file.path());
        let config = AnalyticsConfig::from_env();
        std::env::remove_var(CONFIG_PATH_ENV);
        assert_eq!(config.unwrap().projection.confidence_floor, 20);
    }

    #[test]
    fn test_pace_by_difficulty() {
        let pace = EstimatedPace::default();
        assert!(pace.seconds_for(Difficulty::Easy) < pace.seconds_for(Difficulty::Hard));
    }
}
