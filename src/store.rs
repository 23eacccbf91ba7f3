//! Dataset persistence.
//!
//! The CSV file is the durable record. Every load reads it in full and every save
//! rewrites it in full; there is no locking, so two concurrent read-modify-write
//! cycles against the same file can lose an update.

use crate::error::{MetricsError, Result};
use crate::record::{Dataset, Schema};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Load/save contract shared by the batch fetcher and the dashboard
pub trait RecordStore: Send + Sync {
    /// Read the whole dataset
    fn load(&self) -> Result<Dataset>;

    /// Replace the whole dataset
    fn save(&self, dataset: &Dataset) -> Result<()>;
}

/// Parse a dataset from CSV bytes
pub fn dataset_from_reader<R: std::io::Read>(reader: R) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let schema = Schema::from_headers(headers.iter());

    let mut records = Vec::new();
    for (position, row) in rdr.records().enumerate() {
        let row = row?;
        let cells: Vec<String> = row.iter().map(str::to_string).collect();
        records.push(schema.parse_row(cells, position));
    }

    Ok(Dataset::new(schema, records))
}

/// Serialize a dataset to CSV bytes (header row first, file order preserved)
pub fn dataset_to_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    wtr.write_record(&dataset.schema.headers)?;
    for record in &dataset.records {
        wtr.write_record(dataset.schema.render_row(record))?;
    }

    wtr.into_inner()
        .map_err(|e| MetricsError::Io(e.into_error()))
}

/// Columns appended to the download export, after the persisted ones
pub const EXPORT_SCORE_COLUMNS: [&str; 4] = [
    "norm_citations",
    "norm_hindex",
    "Performance Score",
    "Performance Category",
];

/// Serialize a scored dataset for download: the persisted columns plus the derived scores.
///
/// Only for export. The stored file never carries derived values.
pub fn dataset_to_export_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    let headers = dataset
        .schema
        .headers
        .iter()
        .map(String::as_str)
        .chain(EXPORT_SCORE_COLUMNS);
    wtr.write_record(headers)?;

    let fmt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    for record in &dataset.records {
        let scores = &record.scores;
        let mut row = dataset.schema.render_row(record);
        row.extend([
            fmt(scores.norm_citations),
            fmt(scores.norm_hindex),
            fmt(scores.performance_score),
            scores.category.map(|c| c.to_string()).unwrap_or_default(),
        ]);
        wtr.write_record(&row)?;
    }

    wtr.into_inner()
        .map_err(|e| MetricsError::Io(e.into_error()))
}

/// CSV file on disk
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the CSV file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for CsvStore {
    fn load(&self) -> Result<Dataset> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            MetricsError::Config(format!("Cannot open {}: {}", self.path.display(), e))
        })?;
        let dataset = dataset_from_reader(file)?;
        debug!(path = %self.path.display(), rows = dataset.len(), "Loaded dataset");
        Ok(dataset)
    }

    fn save(&self, dataset: &Dataset) -> Result<()> {
        let bytes = dataset_to_csv(dataset)?;

        // Write next to the target and rename so readers never see a half-written file
        let tmp_path = self.path.with_extension("csv.tmp");
        std::fs::write(&tmp_path, &bytes)?;
        std::fs::rename(&tmp_path, &self.path)?;

        info!(path = %self.path.display(), rows = dataset.len(), "Saved dataset");
        Ok(())
    }
}

/// In-memory CSV text, for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
    content: Mutex<Vec<u8>>,
}

impl MemoryStore {
    pub fn new(csv_text: impl Into<Vec<u8>>) -> Self {
        Self {
            content: Mutex::new(csv_text.into()),
        }
    }

    /// Current CSV text
    pub fn contents(&self) -> String {
        self.content
            .lock()
            .map(|c| String::from_utf8_lossy(&c).into_owned())
            .unwrap_or_default()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Result<Dataset> {
        let content = self
            .content
            .lock()
            .map_err(|_| MetricsError::Config("Memory store lock poisoned".to_string()))?;
        dataset_from_reader(content.as_slice())
    }

    fn save(&self, dataset: &Dataset) -> Result<()> {
        let bytes = dataset_to_csv(dataset)?;
        let mut content = self
            .content
            .lock()
            .map_err(|_| MetricsError::Config("Memory store lock poisoned".to_string()))?;
        *content = bytes;
        Ok(())
    }
}
