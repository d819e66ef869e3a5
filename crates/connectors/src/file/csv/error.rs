use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV parsing error in '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("Invalid file format in '{path}': {message}")]
    InvalidFormat { path: String, message: String },
    #[error("Delimiter {delimiter:?} for '{path}' is not an ASCII character")]
    InvalidDelimiter { path: String, delimiter: char },
}

impl FileError {
    pub fn locator(&self) -> &str {
        match self {
            FileError::NotFound(path) => path,
            FileError::CsvError { path, .. }
            | FileError::InvalidFormat { path, .. }
            | FileError::InvalidDelimiter { path, .. } => path,
            FileError::IoError(_) => "",
        }
    }
}
