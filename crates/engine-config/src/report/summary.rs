use crate::error::ReportError;
use chrono::{DateTime, Utc};
use model::{
    pagination::{cursor::PaginationMode, state::BatchState},
    policy::RunPolicy,
    statistics::ProcessStatistics,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outcome of one `process` / `process_batch` invocation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunResult {
    pub job: String,
    pub run_id: String,
    pub policy: RunPolicy,
    pub statistics: ProcessStatistics,
    /// Present for batched runs only.
    pub batch: Option<BatchProgress>,
    /// Present when the destructive sweep was attempted.
    pub sweep: Option<SweepSummary>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchProgress {
    pub mode: PaginationMode,
    /// The batch this run processed.
    pub batch: usize,
    pub total_batches: Option<usize>,
    pub entities_read: u64,
    pub is_complete: bool,
    pub resumed: bool,
    pub reset_reason: Option<String>,
}

impl BatchProgress {
    pub fn new(processed: usize, next: &BatchState, reset_reason: Option<String>) -> Self {
        BatchProgress {
            mode: next.mode,
            batch: processed,
            total_batches: next.total_batches,
            entities_read: next.entities_read,
            is_complete: next.is_complete,
            resumed: reset_reason.is_none(),
            reset_reason,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub deleted: usize,
    pub failed: usize,
    pub blocked: bool,
}

impl RunResult {
    /// Whether the stream this run worked on has been fully reconciled.
    pub fn is_complete(&self) -> bool {
        self.batch.as_ref().is_none_or(|batch| batch.is_complete)
    }

    /// Two-column rows for a text table.
    pub fn rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![
            vec!["Job".to_string(), self.job.clone()],
            vec!["Run ID".to_string(), self.run_id.clone()],
            vec!["Dry run".to_string(), self.policy.dry_run.to_string()],
        ];

        if let Some(batch) = &self.batch {
            let total = batch
                .total_batches
                .map_or_else(|| "?".to_string(), |total| total.to_string());
            rows.push(vec![
                "Batch".to_string(),
                format!("{}/{} ({})", batch.batch, total, batch.mode),
            ]);
            rows.push(vec!["Entities read".to_string(), batch.entities_read.to_string()]);
            rows.push(vec!["Complete".to_string(), batch.is_complete.to_string()]);
        }

        rows.extend(
            self.statistics
                .rows()
                .into_iter()
                .map(|(name, value)| vec![name.to_string(), value.to_string()]),
        );

        if let Some(sweep) = &self.sweep {
            let sweep = if sweep.blocked {
                "blocked".to_string()
            } else {
                format!("{} deleted, {} failed", sweep.deleted, sweep.failed)
            };
            rows.push(vec!["Sweep".to_string(), sweep]);
        }

        let elapsed = self.finished_at - self.started_at;
        rows.push(vec![
            "Duration".to_string(),
            format!("{:.2}s", elapsed.num_milliseconds() as f64 / 1000.0),
        ]);
        rows
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
