//! CSV dataset adapter: Implementation of `DatasetSource`.
//!
//! Expects a header row naming the columns, then one reference case per row.
//! Cells are kept raw: empty cells become null, plain numbers become numbers,
//! everything else stays text. Encoding happens later, with the artifact's
//! encoders.
//!
//! ```text
//! agent,gender,symptoms,human_system,severity,age,methylprednisolone_mg_initial
//! Chlorine,male,"cough, wheezing",Respiratory,Moderate,40,125
//! ```

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::StoreError;
use crate::domain::{RawRecord, RawValue};
use crate::ports::DatasetSource;

/// Parse CSV from a reader.
///
/// # Errors
/// Returns error on malformed CSV, ragged rows, or blank/duplicate headers.
pub fn parse_records<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RawRecord>, StoreError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut seen = HashSet::with_capacity(headers.len());
    for h in &headers {
        if h.is_empty() {
            return Err(StoreError::InvalidRow {
                row: 0,
                reason: "blank column header".into(),
            });
        }
        if !seen.insert(h.as_str()) {
            return Err(StoreError::InvalidRow {
                row: 0,
                reason: format!("duplicate column {h:?}"),
            });
        }
    }

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let row: RawRecord = headers
            .iter()
            .zip(record.iter())
            .map(|(h, cell)| (h.clone(), RawValue::from_cell(cell)))
            .collect();
        records.push(row);
    }
    Ok(records)
}

/// Loads reference cases from a CSV file.
#[derive(Debug, Clone)]
pub struct CsvDatasetStore {
    path: PathBuf,
    delimiter: u8,
}

impl CsvDatasetStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for CsvDatasetStore {
    type Error = StoreError;

    fn load_records(&self) -> Result<Vec<RawRecord>, StoreError> {
        let file = std::fs::File::open(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let records = parse_records(std::io::BufReader::new(file), self.delimiter)?;
        tracing::info!("Read {} reference rows from {:?}", records.len(), self.path);
        Ok(records)
    }
}
