use crate::file::csv::error::FileError;
use engine_core::error::{SourceError, StoreError};

impl From<FileError> for SourceError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound(path) => SourceError::NotFound(path),
            FileError::IoError(e) => SourceError::Io(e),
            other => SourceError::Read {
                locator: other.locator().to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub(crate) fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

pub(crate) fn serialization(err: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(err.to_string())
}
