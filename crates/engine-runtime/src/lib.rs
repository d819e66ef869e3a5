pub mod execution;

pub use engine_config::report::summary::RunResult;
pub use execution::{
    job::{SyncJob, SyncJobBuilder, clear_job_state, state_key},
    processor::SyncProcessor,
};
