//! Manual correction of a record whose metrics could not be fetched.
//!
//! The operator picks a scientist without metrics and pastes a profile link.
//! The lookup runs synchronously; only on success is the record patched, the
//! whole dataset persisted, and the scores refreshed. Any failure leaves both
//! the in-memory dataset and the file untouched.
//!
//! There is no locking: two updates racing on the same file can lose one of them.

use crate::error::{MetricsError, Result};
use crate::gscholar::{fetch_metrics, AuthorLookup, AuthorMetrics, LookupOutcome};
use crate::profile::extract_author_id;
use crate::record::Dataset;
use crate::scoring::ScoringConfig;
use crate::store::RecordStore;
use serde::Serialize;
use tracing::{info, warn};

/// Successful update of one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    /// Position of the updated record in the dataset
    pub index: usize,
    pub name: String,
    pub profile_link: String,
    pub hindex: u64,
    pub citations: u64,
}

impl UpdateOutcome {
    /// Operator-facing confirmation message
    pub fn message(&self) -> String {
        format!(
            "Updated successfully | h-index: {}, citations: {}",
            self.hindex, self.citations
        )
    }
}

/// Names of the records that can be updated (no fetched h-index), in dataset order
pub fn missing_candidates(dataset: &Dataset) -> Vec<&str> {
    dataset
        .records
        .iter()
        .filter(|r| !r.has_metrics())
        .map(|r| r.name.as_str())
        .collect()
}

/// Fetch metrics for the first record named `name` that has none, and persist them.
///
/// Errors are user-facing: `Validation` for a bad link, `NotFound` for an unknown
/// or already-complete scientist, `Api` when the lookup fails.
pub async fn update_missing_record(
    store: &dyn RecordStore,
    lookup: &dyn AuthorLookup,
    scoring: &ScoringConfig,
    dataset: &mut Dataset,
    name: &str,
    link: &str,
) -> Result<UpdateOutcome> {
    let link = link.trim();
    if link.is_empty() {
        return Err(MetricsError::Validation(
            "Please enter a valid Google Scholar link.".to_string(),
        ));
    }

    let index = dataset
        .records
        .iter()
        .position(|r| r.name == name && !r.has_metrics())
        .ok_or_else(|| {
            MetricsError::NotFound(format!("No scientist named '{}' is missing metrics", name))
        })?;

    let author_id = extract_author_id(Some(link))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            MetricsError::Validation(format!(
                "Link does not contain a Google Scholar author id (user=...): {}",
                link
            ))
        })?;

    info!(scientist = name, author_id = %author_id, "Fetching metrics for manual update");

    let AuthorMetrics { hindex, citations } = match fetch_metrics(lookup, &author_id).await {
        LookupOutcome::Fetched(m) => m,
        LookupOutcome::Failed { reason } => {
            warn!(scientist = name, author_id = %author_id, error = %reason, "Manual update failed");
            return Err(MetricsError::Api {
                code: 502,
                message: format!("Failed to fetch data: {}", reason),
            });
        }
    };

    let mut patched = dataset.clone();
    let record = &mut patched.records[index];
    record.profile_link = Some(link.to_string());
    record.set_metrics(hindex, citations);

    store.save(&patched)?;

    patched.refresh_scores(scoring);
    *dataset = patched;

    info!(scientist = name, hindex, citations, "Record updated");

    Ok(UpdateOutcome {
        index,
        name: name.to_string(),
        profile_link: link.to_string(),
        hindex,
        citations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gscholar::testing::StubLookup;
    use crate::store::MemoryStore;

    const DATA: &str = "\
Full Name of Scientist,Google Scholar Profile Link,Fetched H-index,Fetched Citations
Dr. A,https://scholar.google.com/citations?user=AAA,20,1000
Dr. B,,,
Dr. C,https://scholar.google.com/citations?user=CCC,5,50
Dr. D,https://scholar.google.com/citations?user=typo,,
";

    fn load(store: &MemoryStore) -> Dataset {
        let mut dataset = store.load().expect("load");
        dataset.refresh_scores(&ScoringConfig::default());
        dataset
    }

    #[test]
    fn test_missing_candidates() {
        let dataset = load(&MemoryStore::new(DATA));
        assert_eq!(missing_candidates(&dataset), vec!["Dr. B", "Dr. D"]);
    }

    #[tokio::test]
    async fn test_update_patches_only_selected_record() -> Result<()> {
        let store = MemoryStore::new(DATA);
        let lookup = StubLookup::new().with("NEWB", 12, 300);
        let mut dataset = load(&store);
        let before = dataset.clone();

        let outcome = update_missing_record(
            &store,
            &lookup,
            &ScoringConfig::default(),
            &mut dataset,
            "Dr. B",
            "  https://scholar.google.com/citations?user=NEWB&hl=en ",
        )
        .await?;

        assert_eq!(outcome.index, 1);
        assert_eq!(outcome.message(), "Updated successfully | h-index: 12, citations: 300");

        let b = &dataset.records[1];
        assert_eq!(b.fetched_hindex, Some(12));
        assert_eq!(b.fetched_citations, Some(300));
        assert_eq!(
            b.profile_link.as_deref(),
            Some("https://scholar.google.com/citations?user=NEWB&hl=en")
        );
        assert!(b.scores.performance_score.is_some());

        for i in [0, 2, 3] {
            assert_eq!(dataset.records[i].fetched_hindex, before.records[i].fetched_hindex);
            assert_eq!(dataset.records[i].fetched_citations, before.records[i].fetched_citations);
            assert_eq!(dataset.records[i].profile_link, before.records[i].profile_link);
        }

        let persisted = store.load()?;
        assert_eq!(persisted.records[1].fetched_hindex, Some(12));
        assert_eq!(persisted.records[1].fetched_citations, Some(300));
        assert!(store.contents().contains("Dr. D,https://scholar.google.com/citations?user=typo,,"));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_link_is_rejected_without_lookup() {
        let store = MemoryStore::new(DATA);
        let lookup = StubLookup::new();
        let mut dataset = load(&store);

        let err = update_missing_record(
            &store,
            &lookup,
            &ScoringConfig::default(),
            &mut dataset,
            "Dr. B",
            "   ",
        )
        .await
        .expect_err("should fail");

        assert!(matches!(err, MetricsError::Validation(_)));
        assert_eq!(lookup.calls(), 0);
        assert_eq!(store.contents(), DATA);
    }

    #[tokio::test]
    async fn test_link_without_author_id_is_rejected() {
        let store = MemoryStore::new(DATA);
        let lookup = StubLookup::new();
        let mut dataset = load(&store);

        for link in ["https://example.com/me", "https://scholar.google.com/citations?user=&hl=en"] {
            let err = update_missing_record(
                &store,
                &lookup,
                &ScoringConfig::default(),
                &mut dataset,
                "Dr. B",
                link,
            )
            .await
            .expect_err("should fail");
            assert!(matches!(err, MetricsError::Validation(_)));
        }
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_leaves_state_untouched() {
        let store = MemoryStore::new(DATA);
        let lookup = StubLookup::new();
        let mut dataset = load(&store);
        let before = dataset.clone();

        let err = update_missing_record(
            &store,
            &lookup,
            &ScoringConfig::default(),
            &mut dataset,
            "Dr. D",
            "https://scholar.google.com/citations?user=STILLWRONG",
        )
        .await
        .expect_err("should fail");

        assert!(err.to_string().contains("Failed to fetch data"));
        assert_eq!(dataset, before);
        assert_eq!(store.contents(), DATA);
    }

    #[tokio::test]
    async fn test_complete_record_cannot_be_selected() {
        let store = MemoryStore::new(DATA);
        let lookup = StubLookup::new().with("X", 1, 1);
        let mut dataset = load(&store);

        let err = update_missing_record(
            &store,
            &lookup,
            &ScoringConfig::default(),
            &mut dataset,
            "Dr. A",
            "https://scholar.google.com/citations?user=X",
        )
        .await
        .expect_err("should fail");

        assert!(matches!(err, MetricsError::NotFound(_)));
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_names_update_first_missing() -> Result<()> {
        let data = "\
Full Name of Scientist,Google Scholar Profile Link,Fetched H-index,Fetched Citations
Dr. Same,https://scholar.google.com/citations?user=S1,3,30
Dr. Same,,,
Dr. Same,,,
";
        let store = MemoryStore::new(data);
        let lookup = StubLookup::new().with("S2", 4, 40);
        let mut dataset = load(&store);

        let outcome = update_missing_record(
            &store,
            &lookup,
            &ScoringConfig::default(),
            &mut dataset,
            "Dr. Same",
            "https://scholar.google.com/citations?user=S2",
        )
        .await?;

        assert_eq!(outcome.index, 1);
        assert_eq!(dataset.records[0].fetched_hindex, Some(3));
        assert_eq!(dataset.records[1].fetched_hindex, Some(4));
        assert_eq!(dataset.records[2].fetched_hindex, None);
        Ok(())
    }
}
