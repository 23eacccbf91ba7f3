//! Scientist records and the dataset they live in.
//!
//! A dataset is a header-driven table: the name, profile link and fetched
//! metric columns are typed, every other roster column is passed through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Column holding the scientist's name (dashboard roster)
pub const NAME_COLUMN: &str = "Full Name of Scientist";

/// Alternate name column used by the form-response roster
pub const ALT_NAME_COLUMN: &str = "Name of the Scientist";

/// Column holding the Google Scholar profile link
pub const LINK_COLUMN: &str = "Google Scholar Profile Link";

/// Column written by the fetcher with the h-index
pub const HINDEX_COLUMN: &str = "Fetched H-index";

/// Column written by the fetcher with the citation count
pub const CITATIONS_COLUMN: &str = "Fetched Citations";

/// Performance category derived from the performance score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    High,
    Medium,
    Low,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values derived by the scoring engine. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedScores {
    pub norm_citations: Option<f64>,
    pub norm_hindex: Option<f64>,
    pub performance_score: Option<f64>,
    pub category: Option<Category>,
}

/// One row of the dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScientistRecord {
    /// Display name; not guaranteed unique
    pub name: String,
    /// Google Scholar profile link, `None` when the cell is empty
    pub profile_link: Option<String>,
    pub fetched_hindex: Option<u64>,
    pub fetched_citations: Option<u64>,
    /// Derived scores, recomputed after every load or mutation
    pub scores: DerivedScores,
    /// Raw cells of the row, aligned with the schema headers
    #[serde(skip)]
    pub row: Vec<String>,
}

impl ScientistRecord {
    /// Whether both fetched metrics are present
    pub fn has_metrics(&self) -> bool {
        self.fetched_hindex.is_some()
    }

    /// Set both fetched metrics at once
    pub fn set_metrics(&mut self, hindex: u64, citations: u64) {
        self.fetched_hindex = Some(hindex);
        self.fetched_citations = Some(citations);
    }

    /// Clear both fetched metrics at once
    pub fn clear_metrics(&mut self) {
        self.fetched_hindex = None;
        self.fetched_citations = None;
    }
}

/// Column layout of a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub headers: Vec<String>,
    pub name_idx: Option<usize>,
    pub link_idx: Option<usize>,
    pub hindex_idx: usize,
    pub citations_idx: usize,
}

impl Schema {
    /// Resolve the typed columns from a header row.
    ///
    /// The fetched metric columns are appended when the roster does not have them yet.
    pub fn from_headers<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let find = |headers: &[String], name: &str| headers.iter().position(|h| h.trim() == name);

        let name_idx = find(&headers, NAME_COLUMN).or_else(|| find(&headers, ALT_NAME_COLUMN));
        let link_idx = find(&headers, LINK_COLUMN);

        let hindex_idx = match find(&headers, HINDEX_COLUMN) {
            Some(idx) => idx,
            None => {
                headers.push(HINDEX_COLUMN.to_string());
                headers.len() - 1
            }
        };
        let citations_idx = match find(&headers, CITATIONS_COLUMN) {
            Some(idx) => idx,
            None => {
                headers.push(CITATIONS_COLUMN.to_string());
                headers.len() - 1
            }
        };

        Self {
            headers,
            name_idx,
            link_idx,
            hindex_idx,
            citations_idx,
        }
    }

    /// Build a typed record from raw cells. `position` is the 0-based row index.
    pub fn parse_row(&self, mut row: Vec<String>, position: usize) -> ScientistRecord {
        row.resize(self.headers.len(), String::new());

        let name = self
            .name_idx
            .map(|i| row[i].trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Scientist {}", position + 1));

        let profile_link = self
            .link_idx
            .map(|i| row[i].trim().to_string())
            .filter(|l| !l.is_empty());

        ScientistRecord {
            name,
            profile_link,
            fetched_hindex: parse_metric(&row[self.hindex_idx]),
            fetched_citations: parse_metric(&row[self.citations_idx]),
            scores: DerivedScores::default(),
            row,
        }
    }

    /// Raw cells for a record, with the link and fetched metrics written back.
    ///
    /// The name cell is kept as read: names are never edited, and a synthesized
    /// `Scientist N` must not leak into the file.
    pub fn render_row(&self, record: &ScientistRecord) -> Vec<String> {
        let mut row = record.row.clone();
        row.resize(self.headers.len(), String::new());

        if let Some(i) = self.link_idx {
            row[i] = record.profile_link.clone().unwrap_or_default();
        }
        row[self.hindex_idx] = record.fetched_hindex.map(|v| v.to_string()).unwrap_or_default();
        row[self.citations_idx] = record
            .fetched_citations
            .map(|v| v.to_string())
            .unwrap_or_default();

        row
    }
}

/// A loaded roster: schema plus records in file order
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub schema: Schema,
    pub records: Vec<ScientistRecord>,
}

impl Dataset {
    pub fn new(schema: Schema, records: Vec<ScientistRecord>) -> Self {
        Self { schema, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recompute derived scores for every record
    pub fn refresh_scores(&mut self, config: &crate::scoring::ScoringConfig) {
        let scores = crate::scoring::compute_derived(&self.records, config);
        for (record, derived) in self.records.iter_mut().zip(scores) {
            record.scores = derived;
        }
    }
}

/// Parse a fetched metric cell.
///
/// Empty, non-numeric, negative, non-finite and out-of-range cells are treated
/// as missing. Float-formatted integers such as `"12.0"` are accepted.
pub fn parse_metric(cell: &str) -> Option<u64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }

    if let Ok(v) = cell.parse::<u64>() {
        return Some(v);
    }

    match cell.parse::<f64>() {
        // u64::MAX rounds up to 2^64 as f64, so anything at or above it is out of range
        Ok(v) if v.is_finite() && v >= 0.0 && v < u64::MAX as f64 => Some(v.trunc() as u64),
        _ => {
            debug!(cell, "Ignoring non-numeric metric value");
            None
        }
    }
}
