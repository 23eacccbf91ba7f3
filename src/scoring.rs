//! Composite performance scoring.
//!
//! Citations and h-index are each normalized against the dataset maximum, blended
//! with fixed weights, and bucketed into High / Medium / Low.

use crate::record::{Category, DerivedScores, ScientistRecord};
use serde::{Deserialize, Serialize};

/// Weights and category thresholds for the performance score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub citation_weight: f64,
    pub hindex_weight: f64,
    /// Scores at or above this are High
    pub high_threshold: f64,
    /// Scores at or above this (and below `high_threshold`) are Medium
    pub medium_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            citation_weight: 0.6,
            hindex_weight: 0.4,
            high_threshold: 0.66,
            medium_threshold: 0.33,
        }
    }
}

impl ScoringConfig {
    /// Bucket a performance score
    pub fn classify(&self, score: f64) -> Category {
        if score >= self.high_threshold {
            Category::High
        } else if score >= self.medium_threshold {
            Category::Medium
        } else {
            Category::Low
        }
    }
}

/// Compute derived scores for every record, in record order.
///
/// Pure function of the fetched values: calling it twice on the same records gives
/// the same output. Zero is a valid value and takes part in the maximum. When the
/// maximum is zero or no record has a value, that dimension is undefined everywhere.
pub fn compute_derived(records: &[ScientistRecord], config: &ScoringConfig) -> Vec<DerivedScores> {
    let max_citations = positive_max(records.iter().filter_map(|r| r.fetched_citations));
    let max_hindex = positive_max(records.iter().filter_map(|r| r.fetched_hindex));

    records
        .iter()
        .map(|record| {
            let norm_citations = normalize(record.fetched_citations, max_citations);
            let norm_hindex = normalize(record.fetched_hindex, max_hindex);

            let performance_score = match (norm_citations, norm_hindex) {
                (Some(c), Some(h)) => Some(config.citation_weight * c + config.hindex_weight * h),
                _ => None,
            };

            DerivedScores {
                norm_citations,
                norm_hindex,
                performance_score,
                category: performance_score.map(|s| config.classify(s)),
            }
        })
        .collect()
}

fn positive_max(values: impl Iterator<Item = u64>) -> Option<u64> {
    values.max().filter(|&m| m > 0)
}

fn normalize(value: Option<u64>, max: Option<u64>) -> Option<f64> {
    Some(value? as f64 / max? as f64)
}
