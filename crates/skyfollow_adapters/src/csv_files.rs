use std::path::{Path, PathBuf};

use async_trait::async_trait;
use skyfollow_core::entities::{OutcomeRecord, SourceRecord};
use skyfollow_core::ports::{OutcomeSink, RecordSource};
use skyfollow_core::Error;
use tokio::fs;
use tracing::{debug, instrument};

/// Reads source identifiers from one column of a CSV file with a header row
pub struct CsvRecordSource {
    path: PathBuf,
    column: String,
}

impl CsvRecordSource {
    pub fn new(path: PathBuf, column: impl Into<String>) -> Self {
        Self {
            path,
            column: column.into(),
        }
    }
}

#[async_trait]
impl RecordSource for CsvRecordSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_records(&self) -> Result<Vec<SourceRecord>, Error> {
        let data = fs::read(&self.path).await.map_err(|e| {
            Error::InvalidInput(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        parse_records(&data, &self.column)
    }
}

/// Extract `column` from CSV `data`.
///
/// Cells are trimmed, a leading `@` is dropped and blank cells are skipped.
pub fn parse_records(data: &[u8], column: &str) -> Result<Vec<SourceRecord>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| Error::InvalidInput(format!("failed to read CSV header: {}", e)))?
        .clone();

    let index = headers.iter().position(|h| h == column).ok_or_else(|| {
        Error::InvalidInput(format!(
            "column '{}' not found in CSV (columns: {})",
            column,
            headers.iter().collect::<Vec<_>>().join(", ")
        ))
    })?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| Error::InvalidInput(format!("malformed CSV row: {}", e)))?;
        let value = row.get(index).unwrap_or_default().trim_start_matches('@');
        if value.is_empty() {
            continue;
        }
        records.push(SourceRecord::new(value));
    }

    debug!(count = records.len(), "parsed source records");
    Ok(records)
}

/// Writes the outcome list as CSV, replacing any existing file
pub struct CsvOutcomeSink {
    path: PathBuf,
}

impl CsvOutcomeSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OutcomeSink for CsvOutcomeSink {
    #[instrument(skip(self, outcomes), fields(path = %self.path.display(), count = outcomes.len()))]
    async fn write_outcomes(&self, outcomes: &[OutcomeRecord]) -> Result<(), Error> {
        let content = render_outcomes(outcomes)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        fs::write(&self.path, content).await?;
        debug!("outcomes written");
        Ok(())
    }
}

pub fn render_outcomes(outcomes: &[OutcomeRecord]) -> Result<Vec<u8>, Error> {
    // Header row comes from the first serialized record, so write it by hand
    // to keep it present for an empty list.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(["Twitter Handle", "Bluesky Handle", "Followed", "Message"])
        .map_err(|e| Error::Other(format!("failed to write CSV header: {}", e)))?;

    for outcome in outcomes {
        writer
            .serialize(outcome)
            .map_err(|e| Error::Other(format!("failed to serialize outcome: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| Error::Other(format!("failed to flush CSV: {}", e)))
}
