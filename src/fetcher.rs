//! Batch metric fetcher.
//!
//! Walks the roster in order, looks every scientist up once, and records the
//! h-index and citation count (or empty values) next to the roster columns.
//! Requests are strictly serialized with a fixed pause after each one; a failed
//! row is logged and left empty, it never stops the batch.

use crate::error::Result;
use crate::gscholar::{fetch_metrics, AuthorLookup, LookupOutcome};
use crate::profile::extract_author_id;
use crate::record::Dataset;
use crate::store::RecordStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Default pause after each lookup, in seconds
pub const DEFAULT_DELAY_SECS: u64 = 10;

/// What happened to one roster row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    Fetched { hindex: u64, citations: u64 },
    Failed { reason: String },
    /// No usable author id in the profile link; the service was not contacted
    MissingLink,
}

/// Per-row results of a batch run, in roster order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub rows: Vec<(String, RowStatus)>,
}

impl BatchReport {
    pub fn fetched(&self) -> usize {
        self.count(|s| matches!(s, RowStatus::Fetched { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, RowStatus::Failed { .. }))
    }

    pub fn missing_links(&self) -> usize {
        self.count(|s| matches!(s, RowStatus::MissingLink))
    }

    fn count(&self, pred: impl Fn(&RowStatus) -> bool) -> usize {
        self.rows.iter().filter(|(_, s)| pred(s)).count()
    }
}

/// Serial roster fetcher
pub struct BatchFetcher {
    lookup: Arc<dyn AuthorLookup>,
    delay: Duration,
}

impl BatchFetcher {
    /// Create a fetcher that pauses `delay` after every lookup
    pub fn new(lookup: Arc<dyn AuthorLookup>, delay: Duration) -> Self {
        Self { lookup, delay }
    }

    /// Fetch metrics for every record of `dataset`, in place.
    ///
    /// Rows with an author id are looked up and followed by the fixed delay, whether
    /// the lookup succeeded or not. Rows without one (or with an empty one) are
    /// cleared and skipped without a delay.
    pub async fn run(&self, dataset: &mut Dataset) -> BatchReport {
        let mut report = BatchReport::default();
        let total = dataset.len();

        info!(total, delay_secs = self.delay.as_secs_f64(), "Starting Google Scholar metric extraction");

        for (idx, record) in dataset.records.iter_mut().enumerate() {
            info!(row = idx + 1, total, name = %record.name, "Processing");

            let author_id = extract_author_id(record.profile_link.as_deref())
                .filter(|id| !id.is_empty());

            let Some(author_id) = author_id else {
                warn!(name = %record.name, "Invalid or missing Scholar link");
                record.clear_metrics();
                report.rows.push((record.name.clone(), RowStatus::MissingLink));
                continue;
            };

            let status = match fetch_metrics(self.lookup.as_ref(), &author_id).await {
                LookupOutcome::Fetched(m) => {
                    info!(name = %record.name, hindex = m.hindex, citations = m.citations, "Fetched metrics");
                    record.set_metrics(m.hindex, m.citations);
                    RowStatus::Fetched {
                        hindex: m.hindex,
                        citations: m.citations,
                    }
                }
                LookupOutcome::Failed { reason } => {
                    warn!(name = %record.name, author_id = %author_id, error = %reason, "Error fetching data");
                    record.clear_metrics();
                    RowStatus::Failed { reason }
                }
            };
            report.rows.push((record.name.clone(), status));

            tokio::time::sleep(self.delay).await;
        }

        info!(
            fetched = report.fetched(),
            failed = report.failed(),
            missing_links = report.missing_links(),
            "Fetching complete"
        );

        report
    }

    /// Load the roster from `input`, fetch every row, and save the augmented dataset to `output`.
    pub async fn fetch_roster(
        &self,
        input: &dyn RecordStore,
        output: &dyn RecordStore,
    ) -> Result<BatchReport> {
        let mut dataset = input.load()?;
        let report = self.run(&mut dataset).await;
        output.save(&dataset)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gscholar::testing::{Canned, StubLookup};
    use crate::store::MemoryStore;

    const ROSTER: &str = "\
Timestamp,Name of the Scientist,Google Scholar Profile Link,Division
t1,Dr. One,https://scholar.google.com/citations?user=ONE&hl=en,A
t2,Dr. Two,https://scholar.google.com/citations?user=TWO,B
t3,Dr. Three,https://scholar.google.com/citations?user=THREE&hl=en,C
t4,Dr. Four,https://scholar.google.com/citations?user=FOUR,D
t5,Dr. Five,https://scholar.google.com/citations?user=FIVE,E
";

    fn stub_for_roster() -> StubLookup {
        StubLookup::new()
            .with("ONE", 10, 100)
            .with("TWO", 20, 200)
            .with_canned("THREE", Canned::FillError("connection reset".to_string()))
            .with("FOUR", 40, 400)
            .with("FIVE", 50, 500)
    }

    #[tokio::test]
    async fn test_failed_row_does_not_affect_others() -> Result<()> {
        let input = MemoryStore::new(ROSTER);
        let output = MemoryStore::default();
        let fetcher = BatchFetcher::new(Arc::new(stub_for_roster()), Duration::ZERO);

        let report = fetcher.fetch_roster(&input, &output).await?;
        assert_eq!(report.fetched(), 4);
        assert_eq!(report.failed(), 1);

        let dataset = output.load()?;
        let names: Vec<&str> = dataset.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Dr. One", "Dr. Two", "Dr. Three", "Dr. Four", "Dr. Five"]);

        let metrics: Vec<(Option<u64>, Option<u64>)> = dataset
            .records
            .iter()
            .map(|r| (r.fetched_hindex, r.fetched_citations))
            .collect();
        assert_eq!(
            metrics,
            vec![
                (Some(10), Some(100)),
                (Some(20), Some(200)),
                (None, None),
                (Some(40), Some(400)),
                (Some(50), Some(500)),
            ]
        );

        let text = output.contents();
        assert!(text
            .lines()
            .next()
            .is_some_and(|h| h.ends_with(",Division,Fetched H-index,Fetched Citations")));
        assert!(text.contains("t3,Dr. Three,https://scholar.google.com/citations?user=THREE&hl=en,C,,"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_links_skip_service() -> Result<()> {
        let roster = "\
Name of the Scientist,Google Scholar Profile Link
Dr. None,
Dr. Bad,https://example.com/profile/123
Dr. Empty,https://scholar.google.com/citations?user=&hl=en
Dr. Ok,https://scholar.google.com/citations?user=OK
";
        let lookup = Arc::new(StubLookup::new().with("OK", 3, 30));
        let fetcher = BatchFetcher::new(lookup.clone(), Duration::ZERO);
        let mut dataset = MemoryStore::new(roster).load()?;

        let report = fetcher.run(&mut dataset).await;
        assert_eq!(report.missing_links(), 3);
        assert_eq!(report.fetched(), 1);
        assert_eq!(lookup.calls(), 1);
        assert_eq!(report.rows[2], ("Dr. Empty".to_string(), RowStatus::MissingLink));
        assert_eq!(dataset.records[3].fetched_hindex, Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn test_whitespace_id_reaches_service() -> Result<()> {
        let roster = "\
Name of the Scientist,Google Scholar Profile Link
Dr. Space,https://scholar.google.com/citations?user= &hl=en
";
        let lookup = Arc::new(StubLookup::new());
        let fetcher = BatchFetcher::new(lookup.clone(), Duration::ZERO);
        let mut dataset = MemoryStore::new(roster).load()?;

        let report = fetcher.run(&mut dataset).await;
        assert_eq!(lookup.calls(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.missing_links(), 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_follows_every_lookup() -> Result<()> {
        let roster = "\
Name of the Scientist,Google Scholar Profile Link
Dr. One,https://scholar.google.com/citations?user=ONE
Dr. None,
Dr. Unknown,https://scholar.google.com/citations?user=UNKNOWN
Dr. Two,https://scholar.google.com/citations?user=TWO
";
        let fetcher = BatchFetcher::new(
            Arc::new(stub_for_roster()),
            Duration::from_secs(DEFAULT_DELAY_SECS),
        );
        let mut dataset = MemoryStore::new(roster).load()?;

        let started = tokio::time::Instant::now();
        let report = fetcher.run(&mut dataset).await;

        // Three rows reached the service (one of them failed), one had no link
        assert_eq!(report.failed(), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(3 * DEFAULT_DELAY_SECS));
        Ok(())
    }

    #[tokio::test]
    async fn test_rerun_clears_stale_metrics_on_failure() -> Result<()> {
        let csv = "\
Full Name of Scientist,Google Scholar Profile Link,Fetched H-index,Fetched Citations
Dr. Three,https://scholar.google.com/citations?user=THREE,9,90
";
        let fetcher = BatchFetcher::new(Arc::new(stub_for_roster()), Duration::ZERO);
        let mut dataset = MemoryStore::new(csv).load()?;
        fetcher.run(&mut dataset).await;
        assert_eq!(dataset.records[0].fetched_hindex, None);
        assert_eq!(dataset.records[0].fetched_citations, None);
        Ok(())
    }
}
