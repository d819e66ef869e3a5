use engine_config::{error::ReportError, settings::error::SettingsError};
use engine_core::error::{ReconcileError, RunAborted, StateStoreError, StoreError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to open store at {path}: {message}")]
    StoreOpen { path: PathBuf, message: String },

    #[error("Failed to set up the job: {0}")]
    Job(#[from] ReconcileError),

    #[error("{0}")]
    Aborted(#[from] RunAborted),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),

    #[error("Target store error: {0}")]
    Target(#[from] StoreError),

    #[error("Failed to write report: {0}")]
    Report(#[from] ReportError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
