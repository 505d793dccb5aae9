//! # vocab-analytics - learning analytics for vocabulary drills
//!
//! Turns a learner's raw, noisy and partially missing quiz history into:
//!
//! - **Word mastery** - per-word accuracy, streak, hint share, status and trend
//! - **Performance Index** - weighted composite of precision, consistency, hint efficiency,
//!   speed and difficulty handling, with a per-term breakdown
//! - **Trend analysis** - regression with R², weighted moving average, acceleration,
//!   stability, Pearson correlations and windowed pattern detection
//! - **Projections** - 7/30/60/90 day extrapolation with confidence bands and milestones
//! - **Insights** - strengths, improvement areas, goals, recommendations and a learner profile
//!
//! ## Design
//!
//! - **Pure** - every stage is a function of its explicit inputs and configuration
//! - **Total** - sparse or degenerate history yields documented neutral values, never errors
//! - **Deterministic** - identical snapshots produce identical reports
//! - **Parallel-safe** - no shared mutable state; batches run on rayon
//!
//! ## Modules
//!
//! - [`sanitize`] - raw record ingestion, validation and numeric guards
//! - [`aggregate`] - per-word attempt aggregation
//! - [`timeline`] - session and word timelines, chart windowing
//! - [`metrics`] - session metrics and the Performance Index
//! - [`trend`] - statistics, trend analysis, correlations and patterns
//! - [`projection`] - forward projections
//! - [`insight`] - rule-based insights
//! - [`profile`] - learner profile
//! - [`engine`] - full pipeline and the data source contract
//! - [`config`] - every weight and threshold
//! - [`logging`] - tracing subscriber setup
//!
//! ## Example
//!
//! ```rust
//! use vocab_analytics::{AnalyticsEngine, AnalyticsSnapshot};
//!
//! let snapshot: AnalyticsSnapshot = serde_json::from_str(r#"{
//!     "sessions": [
//!         {"timestamp": "2024-05-01T09:00:00Z", "percentage": 60, "totalWords": 10},
//!         {"timestamp": "2024-05-02T09:00:00Z", "percentage": 70, "totalWords": 10},
//!         {"timestamp": "2024-05-03T09:00:00Z", "percentage": 80, "totalWords": 10}
//!     ]
//! }"#).unwrap();
//!
//! let report = AnalyticsEngine::default().analyze(&snapshot);
//! assert_eq!(report.metrics.unwrap().accuracy, 70);
//! assert_eq!(report.projections.len(), 4);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod insight;
pub mod logging;
pub mod metrics;
pub mod profile;
pub mod projection;
pub mod sanitize;
pub mod timeline;
pub mod trend;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use aggregate::{WordPerformanceAnalysis, WordStatus, WordSummary, WordTrend};
pub use config::AnalyticsConfig;
pub use engine::{AnalyticsEngine, AnalyticsReport, AnalyticsSource, DataQuality, SnapshotSource};
pub use error::{AnalyticsError, Result};
pub use insight::{InsightBundle, Recommendation};
pub use metrics::PerformanceMetrics;
pub use profile::{LearnerProfile, LearnerType};
pub use projection::ProjectionResult;
pub use sanitize::AnalyticsSnapshot;
pub use timeline::{ChartPoint, PerformanceTimelinePoint};
pub use trend::TrendAnalysisResult;
