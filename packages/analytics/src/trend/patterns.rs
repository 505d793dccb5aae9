//! Windowed pattern detection over a score series.

use serde::{Deserialize, Serialize};

use crate::config::TrendParams;
use crate::sanitize::round_to;
use crate::trend::stats::{mean, population_std_dev};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Scores stay within a narrow band
    Plateau,
    /// Window mean jumps up
    Breakthrough,
    /// Window mean drops
    Slump,
    /// Scores swing widely within a window
    Volatile,
}

/// A pattern spanning the inclusive index range `start..=end` of the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPattern {
    pub kind: PatternKind,
    pub start_index: usize,
    pub end_index: usize,
    /// Range for plateaus, mean shift for breakthroughs and slumps, std dev for volatility
    pub magnitude: f64,
}

fn push_merged(patterns: &mut Vec<DetectedPattern>, next: DetectedPattern) {
    if let Some(last) = patterns.last_mut() {
        if last.kind == next.kind && next.start_index <= last.end_index {
            last.end_index = last.end_index.max(next.end_index);
            if next.magnitude.abs() > last.magnitude.abs() {
                last.magnitude = next.magnitude;
            }
            return;
        }
    }
    patterns.push(next);
}

fn range(window: &[f64]) -> f64 {
    let max = window.iter().copied().fold(f64::MIN, f64::max);
    let min = window.iter().copied().fold(f64::MAX, f64::min);
    max - min
}

/// Scans trailing windows for plateaus, breakthroughs, slumps and volatile stretches.
///
/// Overlapping detections of the same kind are merged into one span. Results are ordered by
/// kind, then by position.
pub fn detect_patterns(values: &[f64], params: &TrendParams) -> Vec<DetectedPattern> {
    let w = params.pattern_window.max(2);
    if values.len() < w {
        return Vec::new();
    }

    let mut plateaus = Vec::new();
    let mut volatile = Vec::new();
    for start in 0..=values.len() - w {
        let window = &values[start..start + w];
        let end = start + w - 1;
        let spread = range(window);
        if spread <= params.plateau_range {
            push_merged(
                &mut plateaus,
                DetectedPattern {
                    kind: PatternKind::Plateau,
                    start_index: start,
                    end_index: end,
                    magnitude: round_to(spread, 1),
                },
            );
        }
        let std = population_std_dev(window);
        if std > params.volatility_std {
            push_merged(
                &mut volatile,
                DetectedPattern {
                    kind: PatternKind::Volatile,
                    start_index: start,
                    end_index: end,
                    magnitude: round_to(std, 1),
                },
            );
        }
    }

    let mut breakthroughs = Vec::new();
    let mut slumps = Vec::new();
    if values.len() >= 2 * w {
        for split in w..=values.len() - w {
            let before = mean(&values[split - w..split]);
            let after = mean(&values[split..split + w]);
            let shift = after - before;
            let pattern = |kind| DetectedPattern {
                kind,
                start_index: split - w,
                end_index: split + w - 1,
                magnitude: round_to(shift, 1),
            };
            if shift >= params.shift_delta {
                push_merged(&mut breakthroughs, pattern(PatternKind::Breakthrough));
            } else if shift <= -params.shift_delta {
                push_merged(&mut slumps, pattern(PatternKind::Slump));
            }
        }
    }

    let mut patterns = plateaus;
    patterns.extend(breakthroughs);
    patterns.extend(slumps);
    patterns.extend(volatile);
    patterns
}

/// Whether the most recent point sits inside a detected pattern of `kind`.
pub fn is_ongoing(patterns: &[DetectedPattern], kind: PatternKind, series_len: usize) -> bool {
    series_len > 0
        && patterns
            .iter()
            .any(|p| p.kind == kind && p.end_index == series_len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(patterns: &[DetectedPattern]) -> Vec<PatternKind> {
        patterns.iter().map(|p| p.kind).collect()
    }

    #[test]
    fn test_short_series_has_no_patterns() {
        assert!(detect_patterns(&[70.0, 72.0], &TrendParams::default()).is_empty());
    }

    #[test]
    fn test_plateau_merged_into_one_span() {
        let values = [70.0, 72.0, 71.0, 73.0, 70.0];
        let patterns = detect_patterns(&values, &TrendParams::default());
        assert_eq!(kinds(&patterns), vec![PatternKind::Plateau]);
        assert_eq!(patterns[0].start_index, 0);
        assert_eq!(patterns[0].end_index, 4);
        assert_eq!(patterns[0].magnitude, 3.0);
        assert!(is_ongoing(&patterns, PatternKind::Plateau, values.len()));
    }

    #[test]
    fn test_breakthrough_detected() {
        let values = [50.0, 52.0, 51.0, 80.0, 82.0, 81.0];
        let patterns = detect_patterns(&values, &TrendParams::default());
        let shift = patterns
            .iter()
            .find(|p| p.kind == PatternKind::Breakthrough)
            .expect("breakthrough");
        assert_eq!(shift.start_index, 0);
        assert_eq!(shift.end_index, 5);
        assert_eq!(shift.magnitude, 30.0);
        assert!(!patterns.iter().any(|p| p.kind == PatternKind::Slump));
        // the level before and after the jump are separate plateaus
        let plateaus = patterns
            .iter()
            .filter(|p| p.kind == PatternKind::Plateau)
            .count();
        assert_eq!(plateaus, 2);
    }

    #[test]
    fn test_slump_and_volatility() {
        let values = [90.0, 20.0, 95.0, 30.0, 35.0, 25.0];
        let patterns = detect_patterns(&values, &TrendParams::default());
        let found = kinds(&patterns);
        assert!(found.contains(&PatternKind::Slump));
        assert!(found.contains(&PatternKind::Volatile));
        assert!(!is_ongoing(&patterns, PatternKind::Breakthrough, values.len()));
    }
}
