//! Insight Synthesis
//!
//! Fixed-threshold rules over computed metrics and trends. Every rule is evaluated
//! independently; the result always carries at least one recommendation.
//!
//! | Rule | Fires when | Output |
//! |---|---|---|
//! | accuracy | `>= accuracy_strength` / `< accuracy_weak` | strength / improvement |
//! | consistency | `>= consistency_strength` / `< consistency_weak` | strength / improvement |
//! | hint efficiency | `>= efficiency_strength` / `< efficiency_weak` | strength / improvement |
//! | speed | `>= speed_strength` / `< speed_weak` | strength / improvement |
//! | difficulty handling | `>= difficulty_strength` | strength |
//! | best streak | `>= streak_strength` sessions | strength |
//! | improvement trend | `>= +trend_delta` / `<= -trend_delta` | strength / improvement |
//! | stability | `< stability_weak` with two or more sessions | improvement |
//! | words to review | any critical or struggling word | improvement |
//! | patterns | plateau or slump reaching the latest session | improvement |

use serde::{Deserialize, Serialize};

use crate::aggregate::{WordStatus, WordSummary};
use crate::config::InsightThresholds;
use crate::metrics::PerformanceMetrics;
use crate::trend::patterns::{is_ongoing, DetectedPattern, PatternKind};
use crate::trend::TrendAnalysisResult;

pub const FALLBACK_RECOMMENDATION: &str = "Keep practicing regularly to build a reliable trend";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsightCategory {
    Accuracy,
    Consistency,
    HintEfficiency,
    Speed,
    Difficulty,
    Streak,
    Progress,
    Stability,
    Vocabulary,
    Routine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub category: InsightCategory,
    pub title: String,
    pub description: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub priority: RecommendationPriority,
    pub category: InsightCategory,
    pub title: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub category: InsightCategory,
    pub title: String,
    pub current: f64,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightBundle {
    pub strengths: Vec<Insight>,
    pub improvements: Vec<Insight>,
    pub goals: Vec<Goal>,
    /// Highest priority first
    pub recommendations: Vec<Recommendation>,
    /// Headline of the top recommendation
    pub recommendation: String,
}

fn insight(category: InsightCategory, title: &str, description: String, value: f64) -> Insight {
    Insight {
        category,
        title: title.to_string(),
        description,
        value,
    }
}

fn recommendation(
    priority: RecommendationPriority,
    category: InsightCategory,
    title: &str,
    actions: &[&str],
) -> Recommendation {
    Recommendation {
        priority,
        category,
        title: title.to_string(),
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

#[derive(Default)]
struct Findings {
    strengths: Vec<Insight>,
    improvements: Vec<Insight>,
    recommendations: Vec<Recommendation>,
}

impl Findings {
    fn metric_rules(&mut self, m: &PerformanceMetrics, t: &InsightThresholds) {
        use InsightCategory::*;
        use RecommendationPriority::*;

        if m.accuracy >= t.accuracy_strength {
            self.strengths.push(insight(
                Accuracy,
                "Excellent precision",
                format!("Average accuracy of {}% across recent sessions", m.accuracy),
                m.accuracy as f64,
            ));
        } else if m.accuracy < t.accuracy_weak {
            self.improvements.push(insight(
                Accuracy,
                "Accuracy below target",
                format!("Average accuracy is {}%, under the {}% mark", m.accuracy, t.accuracy_weak),
                m.accuracy as f64,
            ));
            self.recommendations.push(recommendation(
                High,
                Accuracy,
                "Focus on accuracy before pace",
                &[
                    "Review incorrect words right after each session",
                    "Run shorter sessions on a single chapter",
                ],
            ));
        }

        if m.consistency >= t.consistency_strength {
            self.strengths.push(insight(
                Consistency,
                "Steady results",
                format!("Consistency score of {}", m.consistency),
                m.consistency as f64,
            ));
        } else if m.consistency < t.consistency_weak {
            self.improvements.push(insight(
                Consistency,
                "Results vary a lot between sessions",
                format!("Consistency score of {}", m.consistency),
                m.consistency as f64,
            ));
            self.recommendations.push(recommendation(
                Medium,
                Consistency,
                "Build a regular routine",
                &[
                    "Practice at the same time each day",
                    "Keep session size similar from one day to the next",
                ],
            ));
        }

        if m.hint_efficiency >= t.efficiency_strength {
            self.strengths.push(insight(
                HintEfficiency,
                "Independent recall",
                format!("{}% of answers given without hints", m.hint_efficiency),
                m.hint_efficiency as f64,
            ));
        } else if m.hint_efficiency < t.efficiency_weak {
            self.improvements.push(insight(
                HintEfficiency,
                "Heavy reliance on hints",
                format!("Hint efficiency of {}", m.hint_efficiency),
                m.hint_efficiency as f64,
            ));
            self.recommendations.push(recommendation(
                Medium,
                HintEfficiency,
                "Try recalling before asking for a hint",
                &[
                    "Wait a few seconds before opening a hint",
                    "Repeat hinted words in the next session",
                ],
            ));
        }

        if m.speed_score >= t.speed_strength {
            self.strengths.push(insight(
                Speed,
                "Quick responses",
                format!("Speed score of {}", m.speed_score),
                m.speed_score as f64,
            ));
        } else if m.speed_score < t.speed_weak {
            self.improvements.push(insight(
                Speed,
                "Slow responses",
                format!("Speed score of {}", m.speed_score),
                m.speed_score as f64,
            ));
            self.recommendations.push(recommendation(
                Low,
                Speed,
                "Work on response speed",
                &["Drill words you already know to build automatic recall"],
            ));
        }

        if m.difficulty_score >= t.difficulty_strength {
            self.strengths.push(insight(
                Difficulty,
                "Handles long sessions well",
                format!("Difficulty handling score of {}", m.difficulty_score),
                m.difficulty_score as f64,
            ));
        }

        if m.best_streak >= t.streak_strength {
            self.strengths.push(insight(
                Streak,
                "Strong session streak",
                format!("{} consecutive sessions above threshold", m.best_streak),
                m.best_streak as f64,
            ));
        }

        if m.improvement_trend >= t.trend_delta {
            self.strengths.push(insight(
                Progress,
                "Clear improvement",
                format!(
                    "Recent sessions are {:+.1} points above earlier ones",
                    m.improvement_trend
                ),
                m.improvement_trend,
            ));
        } else if m.improvement_trend <= -t.trend_delta {
            self.improvements.push(insight(
                Progress,
                "Recent results are dropping",
                format!(
                    "Recent sessions are {:+.1} points below earlier ones",
                    m.improvement_trend
                ),
                m.improvement_trend,
            ));
            self.recommendations.push(recommendation(
                High,
                Progress,
                "Go back to material you had mastered",
                &["Review consolidated words before adding new chapters"],
            ));
        }
    }

    fn trend_rules(&mut self, trend: &TrendAnalysisResult, t: &InsightThresholds) {
        if trend.sample_size >= 2 && trend.stability_factor < t.stability_weak {
            self.improvements.push(insight(
                InsightCategory::Stability,
                "Unstable recent performance",
                format!(
                    "Stability factor of {:.2} over the latest sessions",
                    trend.stability_factor
                ),
                trend.stability_factor,
            ));
            self.recommendations.push(recommendation(
                RecommendationPriority::Medium,
                InsightCategory::Stability,
                "Stabilise your recent sessions",
                &["Keep difficulty fixed until results settle"],
            ));
        }
    }

    fn vocabulary_rules(&mut self, summary: &WordSummary) {
        if summary.needs_review.is_empty() {
            return;
        }
        let critical = summary
            .by_status
            .get(&WordStatus::Critical)
            .copied()
            .unwrap_or(0);
        self.improvements.push(insight(
            InsightCategory::Vocabulary,
            "Words need review",
            format!(
                "{} words are critical or struggling ({} critical)",
                summary.needs_review.len(),
                critical
            ),
            summary.needs_review.len() as f64,
        ));
        let priority = if critical > 0 {
            RecommendationPriority::High
        } else {
            RecommendationPriority::Medium
        };
        self.recommendations.push(recommendation(
            priority,
            InsightCategory::Vocabulary,
            "Review your weakest words",
            &["Start the next session with the words listed for review"],
        ));
    }

    fn pattern_rules(&mut self, patterns: &[DetectedPattern], series_len: usize) {
        if is_ongoing(patterns, PatternKind::Slump, series_len) {
            self.improvements.push(insight(
                InsightCategory::Routine,
                "Recent slump",
                "Scores dropped noticeably over the latest sessions".to_string(),
                0.0,
            ));
            self.recommendations.push(recommendation(
                RecommendationPriority::High,
                InsightCategory::Routine,
                "Ease off and consolidate",
                &["Lower the session size for a few days"],
            ));
        } else if is_ongoing(patterns, PatternKind::Plateau, series_len) {
            self.improvements.push(insight(
                InsightCategory::Routine,
                "Plateau",
                "Scores have stayed flat over the latest sessions".to_string(),
                0.0,
            ));
            self.recommendations.push(recommendation(
                RecommendationPriority::Low,
                InsightCategory::Routine,
                "Add new material to break the plateau",
                &["Include one new chapter in your next session"],
            ));
        }
    }
}

fn goals(
    metrics: Option<&PerformanceMetrics>,
    summary: Option<&WordSummary>,
    t: &InsightThresholds,
) -> Vec<Goal> {
    let mut goals = Vec::new();
    if let Some(m) = metrics {
        if m.accuracy < t.accuracy_goal {
            goals.push(Goal {
                category: InsightCategory::Accuracy,
                title: format!("Reach {}% accuracy", t.accuracy_goal),
                current: m.accuracy as f64,
                target: t.accuracy_goal as f64,
            });
        }
        let step = t.index_goal_step.max(1);
        if m.performance_index < 100 {
            let target = ((m.performance_index / step + 1) * step).min(100);
            goals.push(Goal {
                category: InsightCategory::Progress,
                title: format!("Raise the Performance Index to {target}"),
                current: m.performance_index as f64,
                target: target as f64,
            });
        }
    }
    if let Some(s) = summary {
        if !s.needs_review.is_empty() {
            goals.push(Goal {
                category: InsightCategory::Vocabulary,
                title: "Clear the review list".to_string(),
                current: s.needs_review.len() as f64,
                target: 0.0,
            });
        }
    }
    goals
}

/// Evaluates every rule. Never fails; without metrics only trend and vocabulary rules run.
pub fn synthesize(
    metrics: Option<&PerformanceMetrics>,
    trend: &TrendAnalysisResult,
    summary: Option<&WordSummary>,
    patterns: &[DetectedPattern],
    thresholds: &InsightThresholds,
) -> InsightBundle {
    let mut findings = Findings::default();
    if let Some(m) = metrics {
        findings.metric_rules(m, thresholds);
    }
    findings.trend_rules(trend, thresholds);
    if let Some(s) = summary {
        findings.vocabulary_rules(s);
    }
    findings.pattern_rules(patterns, trend.sample_size);

    let mut recommendations = findings.recommendations;
    recommendations.sort_by_key(|r| r.priority);
    if recommendations.is_empty() {
        recommendations.push(recommendation(
            RecommendationPriority::Low,
            InsightCategory::Routine,
            FALLBACK_RECOMMENDATION,
            &["Complete a session every day"],
        ));
    }
    let recommendation = recommendations
        .first()
        .map(|r| r.title.clone())
        .unwrap_or_else(|| FALLBACK_RECOMMENDATION.to_string());

    InsightBundle {
        strengths: findings.strengths,
        improvements: findings.improvements,
        goals: goals(metrics, summary, thresholds),
        recommendations,
        recommendation,
    }
}
