// CSV import - replace all rows of one job with the contents of a file

use super::CollectionService;
use crate::document::Document;
use crate::error::{DocQueryError, Result};
use crate::store::DocumentStore;
use std::path::Path;

/// Field stamped on every imported row, naming the job it belongs to.
pub const JOB_FIELD: &str = "job";

pub struct ImporterService<S> {
    collections: CollectionService<S>,
}

impl<S: DocumentStore> ImporterService<S> {
    pub fn new(store: S) -> Self {
        ImporterService {
            collections: CollectionService::new(store),
        }
    }

    pub fn collections(&self) -> &CollectionService<S> {
        &self.collections
    }

    /// Import `csv_path` into `collection` as the rows of `job`.
    ///
    /// The header row names the fields and every cell is kept as a string.
    /// Existing rows of the job are removed before the new ones are written,
    /// so importing the same file twice leaves one copy. Rows whose width
    /// differs from the header are skipped with a warning.
    pub fn import(&self, collection: &str, csv_path: &Path, job: &str) -> Result<usize> {
        if csv_path.as_os_str().is_empty() {
            return Err(DocQueryError::MissingFile(
                "no CSV file given for import".to_string(),
            ));
        }
        if !csv_path.is_file() {
            return Err(DocQueryError::MissingFile(csv_path.display().to_string()));
        }
        self.collections.ensure_connected()?;

        let rows = read_rows(csv_path, job)?;
        self.collections.remove_all(collection, job)?;
        if rows.is_empty() {
            log::warn!("{} has no data rows", csv_path.display());
            return Ok(0);
        }

        let count = rows.len();
        self.collections
            .store()
            .insert_many(collection, rows)
            .map_err(|e| DocQueryError::Insert {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;
        log::info!(
            "imported {count} rows of job {job} from {} into {collection}",
            csv_path.display()
        );
        Ok(count)
    }
}

fn read_rows(csv_path: &Path, job: &str) -> Result<Vec<Document>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(csv_path)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != headers.len() {
            log::warn!(
                "skipping row {} of {}: expected {} fields, found {}",
                line + 2,
                csv_path.display(),
                headers.len(),
                record.len()
            );
            continue;
        }

        let mut row = Document::with_capacity(headers.len() + 1);
        for (header, cell) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), serde_json::Value::String(cell.to_string()));
        }
        row.insert(JOB_FIELD.to_string(), serde_json::Value::String(job.to_string()));
        rows.push(row);
    }
    Ok(rows)
}
