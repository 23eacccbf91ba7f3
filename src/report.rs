//! Read-only dashboard projections over a scored dataset.

use crate::record::{Category, Dataset, ScientistRecord};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::cmp::Ordering;

/// Number of entries on the leaderboard
pub const LEADERBOARD_SIZE: usize = 10;

/// Headline metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub scientists: usize,
    /// Mean fetched h-index over records that have one
    pub mean_hindex: Option<f64>,
    /// Sum of fetched citations over records that have one, saturating at `u64::MAX`
    pub total_citations: u64,
    /// Share of records with a fetched h-index, in percent
    pub coverage_pct: f64,
    /// Mean performance score over scored records
    pub mean_score: Option<f64>,
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub fetched_hindex: Option<u64>,
    pub fetched_citations: Option<u64>,
    pub performance_score: Option<f64>,
    pub category: Option<Category>,
}

/// Category bucket label; `Unscored` collects records without a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CategoryLabel {
    High,
    Medium,
    Low,
    Unscored,
}

impl CategoryLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unscored => "Unscored",
        }
    }
}

impl From<Option<Category>> for CategoryLabel {
    fn from(category: Option<Category>) -> Self {
        match category {
            Some(Category::High) => Self::High,
            Some(Category::Medium) => Self::Medium,
            Some(Category::Low) => Self::Low,
            None => Self::Unscored,
        }
    }
}

/// Data quality counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    pub missing_links: usize,
    pub missing_metrics: usize,
}

/// Everything the dashboard renders
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub summary: Summary,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub categories: Vec<(CategoryLabel, usize)>,
    pub quality: DataQuality,
    pub generated_at: DateTime<Local>,
}

impl DashboardView {
    pub fn build(dataset: &Dataset) -> Self {
        Self {
            summary: summarize(dataset),
            leaderboard: leaderboard(dataset, LEADERBOARD_SIZE),
            categories: category_distribution(dataset),
            quality: data_quality(dataset),
            generated_at: Local::now(),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn summarize(dataset: &Dataset) -> Summary {
    let records = &dataset.records;
    let with_hindex = records.iter().filter(|r| r.fetched_hindex.is_some()).count();

    Summary {
        scientists: records.len(),
        mean_hindex: mean(records.iter().filter_map(|r| r.fetched_hindex).map(|v| v as f64)),
        total_citations: records
            .iter()
            .filter_map(|r| r.fetched_citations)
            .fold(0, u64::saturating_add),
        coverage_pct: if records.is_empty() {
            0.0
        } else {
            with_hindex as f64 / records.len() as f64 * 100.0
        },
        mean_score: mean(records.iter().filter_map(|r| r.scores.performance_score)),
    }
}

/// Top `limit` records by performance score, descending.
///
/// Records without a score sort after every scored record. Ties keep dataset order.
pub fn leaderboard(dataset: &Dataset, limit: usize) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&ScientistRecord> = dataset.records.iter().collect();
    ranked.sort_by(|a, b| {
        match (a.scores.performance_score, b.scores.performance_score) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, r)| LeaderboardEntry {
            rank: i + 1,
            name: r.name.clone(),
            fetched_hindex: r.fetched_hindex,
            fetched_citations: r.fetched_citations,
            performance_score: r.scores.performance_score,
            category: r.scores.category,
        })
        .collect()
}

/// Record count per category, in High / Medium / Low / Unscored order; empty buckets omitted
pub fn category_distribution(dataset: &Dataset) -> Vec<(CategoryLabel, usize)> {
    [
        CategoryLabel::High,
        CategoryLabel::Medium,
        CategoryLabel::Low,
        CategoryLabel::Unscored,
    ]
    .into_iter()
    .map(|label| {
        let count = dataset
            .records
            .iter()
            .filter(|r| CategoryLabel::from(r.scores.category) == label)
            .count();
        (label, count)
    })
    .filter(|(_, count)| *count > 0)
    .collect()
}

pub fn data_quality(dataset: &Dataset) -> DataQuality {
    DataQuality {
        missing_links: dataset.records.iter().filter(|r| r.profile_link.is_none()).count(),
        missing_metrics: dataset.records.iter().filter(|r| r.fetched_hindex.is_none()).count(),
    }
}

/// Format an integer with thousands separators
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoringConfig;
    use crate::store::{MemoryStore, RecordStore};

    fn scored(csv: &str) -> Dataset {
        let mut dataset = MemoryStore::new(csv).load().expect("load");
        dataset.refresh_scores(&ScoringConfig::default());
        dataset
    }

    fn fifteen() -> Dataset {
        let mut csv = String::from(
            "Full Name of Scientist,Google Scholar Profile Link,Fetched H-index,Fetched Citations\n",
        );
        for i in 1..=15u64 {
            if i % 5 == 0 {
                // every fifth scientist has no metrics
                csv.push_str(&format!("S{},,,\n", i));
            } else {
                csv.push_str(&format!("S{},https://x?user=S{},{},{}\n", i, i, i, i * 100));
            }
        }
        scored(&csv)
    }

    #[test]
    fn test_leaderboard_top_ten_descending() {
        let dataset = fifteen();
        let board = leaderboard(&dataset, LEADERBOARD_SIZE);
        assert_eq!(board.len(), 10);

        let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["S14", "S13", "S12", "S11", "S9", "S8", "S7", "S6", "S4", "S3"]);
        assert!(board.windows(2).all(|w| w[0].performance_score >= w[1].performance_score));
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].performance_score, Some(1.0));
    }

    #[test]
    fn test_leaderboard_unscored_last_in_input_order() {
        let dataset = fifteen();
        let board = leaderboard(&dataset, 15);
        let tail: Vec<&str> = board[12..].iter().map(|e| e.name.as_str()).collect();
        assert_eq!(tail, vec!["S5", "S10", "S15"]);
        assert!(board[12..].iter().all(|e| e.performance_score.is_none()));
    }

    #[test]
    fn test_leaderboard_ties_keep_input_order() {
        let dataset = scored(
            "Full Name of Scientist,Fetched H-index,Fetched Citations\nB,5,50\nA,5,50\nC,10,100\n",
        );
        let names: Vec<String> = leaderboard(&dataset, 10).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_summary() {
        let dataset = scored(
            "Full Name of Scientist,Google Scholar Profile Link,Fetched H-index,Fetched Citations\n\
             A,l,10,1000\n\
             B,l,20,3000\n\
             C,,,\n\
             D,l,,\n",
        );
        let summary = summarize(&dataset);
        assert_eq!(summary.scientists, 4);
        assert_eq!(summary.mean_hindex, Some(15.0));
        assert_eq!(summary.total_citations, 4000);
        assert_eq!(summary.coverage_pct, 50.0);

        // A: 0.6 * 1/3 + 0.4 * 0.5, B: 1.0
        let expected = (0.6 / 3.0 + 0.2 + 1.0) / 2.0;
        let mean_score = summary.mean_score.expect("scored");
        assert!((mean_score - expected).abs() < 1e-12);

        assert_eq!(
            data_quality(&dataset),
            DataQuality {
                missing_links: 1,
                missing_metrics: 2
            }
        );
    }

    #[test]
    fn test_summary_of_empty_dataset() {
        let dataset = scored("Full Name of Scientist\n");
        let summary = summarize(&dataset);
        assert_eq!(summary.scientists, 0);
        assert_eq!(summary.mean_hindex, None);
        assert_eq!(summary.total_citations, 0);
        assert_eq!(summary.coverage_pct, 0.0);
        assert_eq!(summary.mean_score, None);
    }

    #[test]
    fn test_category_distribution() {
        let dataset = fifteen();
        let distribution = category_distribution(&dataset);
        let total: usize = distribution.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 15);
        assert!(distribution.contains(&(CategoryLabel::Unscored, 3)));
        assert_eq!(distribution[0].0, CategoryLabel::High);
    }

    #[test]
    fn test_category_distribution_omits_empty_buckets() {
        let dataset = scored("Full Name of Scientist,Fetched H-index,Fetched Citations\nA,3,30\n");
        assert_eq!(category_distribution(&dataset), vec![(CategoryLabel::High, 1)]);
    }

    #[test]
    fn test_total_citations_saturates() {
        let dataset = scored(
            "Full Name of Scientist,Fetched H-index,Fetched Citations\n\
             A,1,18446744073709551615\n\
             B,2,18446744073709551615\n\
             C,3,1e20\n",
        );
        let summary = summarize(&dataset);
        assert_eq!(summary.total_citations, u64::MAX);
        assert_eq!(dataset.records[2].fetched_citations, None);
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }
}
