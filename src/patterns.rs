//! Learning pattern tracker: named append-only series with summary statistics.

use std::collections::BTreeMap;

use crate::memory_types::PatternStats;

/// Pattern names every store tracks.
pub const DEFAULT_PATTERNS: [&str; 5] = [
    "story_coherence",
    "character_consistency",
    "scene_vividness",
    "music_relevance",
    "user_satisfaction",
];

/// Fixed set of named numeric series.
///
/// Names are declared up front; updates to any other name are ignored.
#[derive(Debug, Clone)]
pub struct PatternTracker {
    series: BTreeMap<String, Vec<f64>>,
}

impl Default for PatternTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS)
    }
}

impl PatternTracker {
    /// Declare the tracked pattern names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PatternTracker {
            series: names.into_iter().map(|n| (n.into(), Vec::new())).collect(),
        }
    }

    /// Append `value` to `name`. Returns `false` (and records nothing) for undeclared names.
    pub fn update(&mut self, name: &str, value: f64) -> bool {
        match self.series.get_mut(name) {
            Some(values) => {
                values.push(value);
                true
            }
            None => false,
        }
    }

    /// Summary statistics for every declared pattern.
    pub fn stats(&self) -> BTreeMap<String, PatternStats> {
        self.series
            .iter()
            .map(|(name, values)| (name.clone(), summarize(values)))
            .collect()
    }
}

fn summarize(values: &[f64]) -> PatternStats {
    if values.is_empty() {
        return PatternStats::default();
    }
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    PatternStats {
        mean,
        std: variance.sqrt(),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        count,
    }
}
