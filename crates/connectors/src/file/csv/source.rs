use crate::file::csv::error::FileError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{connectors::source::ExternalSource, error::SourceError};
use model::{
    pagination::{
        cursor::{PageRequest, PaginationMode},
        state::{SourceDescriptor, SourceFingerprint},
    },
    records::batch::{RawRecord, SourcePage},
};
use serde_json::{Map, Value};
use std::{fs::File, path::Path};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CsvSettings {
    /// Must be an ASCII character.
    pub delimiter: char,
}

impl Default for CsvSettings {
    fn default() -> Self {
        CsvSettings { delimiter: ',' }
    }
}

/// Local CSV file with a header row, read with counted pagination.
///
/// Every row becomes a JSON object keyed by header name. The fingerprint combines the
/// canonical path, the row count and the modification time of the file. File access runs on
/// the blocking thread pool.
#[derive(Debug, Clone, Default)]
pub struct CsvSource {
    settings: CsvSettings,
}

impl CsvSource {
    pub fn new(settings: CsvSettings) -> Self {
        CsvSource { settings }
    }

    async fn blocking<T, F>(&self, locator: &str, work: F) -> Result<T, SourceError>
    where
        T: Send + 'static,
        F: FnOnce(CsvFile) -> Result<T, FileError> + Send + 'static,
    {
        let file = CsvFile {
            path: locator.to_string(),
            delimiter: self.settings.delimiter,
        };
        let outcome = tokio::task::spawn_blocking(move || work(file))
            .await
            .map_err(|err| SourceError::Read {
                locator: locator.to_string(),
                message: err.to_string(),
            })?;
        Ok(outcome?)
    }
}

struct CsvFile {
    path: String,
    delimiter: char,
}

impl CsvFile {
    fn reader(&self) -> Result<csv::Reader<File>, FileError> {
        if !self.delimiter.is_ascii() {
            return Err(FileError::InvalidDelimiter {
                path: self.path.clone(),
                delimiter: self.delimiter,
            });
        }
        if !Path::new(&self.path).exists() {
            return Err(FileError::NotFound(self.path.clone()));
        }
        let file = File::open(&self.path)?;
        Ok(csv::ReaderBuilder::new()
            .delimiter(self.delimiter as u8)
            .has_headers(true)
            .flexible(true)
            .from_reader(file))
    }

    fn headers(&self, reader: &mut csv::Reader<File>) -> Result<Vec<String>, FileError> {
        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| self.csv_error(source))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(FileError::InvalidFormat {
                path: self.path.clone(),
                message: "missing header row".to_string(),
            });
        }
        Ok(headers)
    }

    fn describe(&self) -> Result<SourceDescriptor, FileError> {
        let length = self.count_rows()?;
        let meta = std::fs::metadata(&self.path)?;
        let uri = std::fs::canonicalize(&self.path)?.display().to_string();

        let mut fingerprint = SourceFingerprint::new(uri).with_length(length as u64);
        if let Ok(modified) = meta.modified() {
            fingerprint = fingerprint.with_last_modified(DateTime::<Utc>::from(modified));
        }

        Ok(SourceDescriptor {
            fingerprint,
            mode: PaginationMode::Counted,
            length: Some(length),
        })
    }

    fn count_rows(&self) -> Result<usize, FileError> {
        let mut reader = self.reader()?;
        self.headers(&mut reader)?;
        let mut count = 0;
        for record in reader.records() {
            record.map_err(|source| self.csv_error(source))?;
            count += 1;
        }
        Ok(count)
    }

    fn read_rows(&self, skip: usize, take: Option<usize>) -> Result<Vec<RawRecord>, FileError> {
        let mut reader = self.reader()?;
        let headers = self.headers(&mut reader)?;

        let mut rows = Vec::new();
        for record in reader.records().skip(skip) {
            if take.is_some_and(|limit| rows.len() >= limit) {
                break;
            }
            let record = record.map_err(|source| self.csv_error(source))?;
            let mut fields = Map::with_capacity(headers.len());
            for (i, header) in headers.iter().enumerate() {
                let cell = record.get(i).unwrap_or("");
                fields.insert(header.clone(), Value::String(cell.to_string()));
            }
            rows.push(Value::Object(fields));
        }
        Ok(rows)
    }

    fn csv_error(&self, source: csv::Error) -> FileError {
        FileError::CsvError {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl ExternalSource for CsvSource {
    async fn describe(&self, locator: &str) -> Result<SourceDescriptor, SourceError> {
        self.blocking(locator, |file| file.describe()).await
    }

    async fn read_batch(
        &self,
        locator: &str,
        request: &PageRequest,
    ) -> Result<SourcePage, SourceError> {
        let (skip, take) = match request {
            PageRequest::All => (0, None),
            PageRequest::Offset { start, limit } => (*start, Some(*limit)),
            PageRequest::Cursor { .. } => {
                return Err(SourceError::UnsupportedRequest {
                    mode: PaginationMode::Counted.to_string(),
                    request: request.to_string(),
                });
            }
        };
        let records = self
            .blocking(locator, move |file| file.read_rows(skip, take))
            .await?;

        debug!(path = %locator, request = %request, rows = records.len(), "Read CSV rows");
        Ok(SourcePage::new(records))
    }
}
