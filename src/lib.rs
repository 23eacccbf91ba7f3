//! # scholarboard
//!
//! Google Scholar metrics fetcher and research performance dashboard.
//!
//! ## Modules
//!
//! - [`profile`] - Author id extraction from profile links
//! - [`gscholar`] - Google Scholar profile lookup
//! - [`fetcher`] - Serial batch fetch over a roster
//! - [`record`] / [`store`] - Dataset model and CSV persistence
//! - [`scoring`] - Normalized performance score and category
//! - [`update`] - Manual single-record correction
//! - [`report`] - Summary, leaderboard, distribution, data quality
//! - [`dashboard`] - HTTP dashboard
//! - [`cookies`] - Cookie persistence
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use scholarboard::{fetcher::BatchFetcher, gscholar, store::CsvStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = gscholar::ScholarClient::new(Default::default())?;
//!     let fetcher = BatchFetcher::new(Arc::new(client), Duration::from_secs(10));
//!     let report = fetcher
//!         .fetch_roster(&CsvStore::new("roster.csv"), &CsvStore::new("scholar_metrics_fetched.csv"))
//!         .await?;
//!     println!("Fetched {} profiles", report.fetched());
//!     Ok(())
//! }
//! ```

pub mod cookies;
pub mod dashboard;
pub mod error;
pub mod fetcher;
pub mod gscholar;
pub mod profile;
pub mod record;
pub mod report;
pub mod scoring;
pub mod store;
pub mod update;

pub use error::{MetricsError, Result};
