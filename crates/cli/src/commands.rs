use clap::{Args, Subcommand};
use engine_config::settings::SyncSettings;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile a CSV file into the target store
    Sync(SyncArgs),
    /// Show the persisted batch progress of a job
    Progress {
        #[arg(long, help = "Job identifier")]
        job: String,

        #[arg(long, help = "State directory (defaults to ~/.content-sync/state)")]
        state_dir: Option<PathBuf>,

        #[arg(long, help = "Inspect the progress of dry runs instead of live runs")]
        dry_run: bool,

        #[arg(
            long,
            help = "If set, prints the progress information as JSON instead of a table"
        )]
        json: bool,
    },
    /// Discard the persisted progress and tracking index of a job
    Reset {
        #[arg(long, help = "Job identifier")]
        job: String,

        #[arg(long, help = "State directory (defaults to ~/.content-sync/state)")]
        state_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct SyncArgs {
    #[arg(long, help = "JSON settings file; flags override its values")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Job identifier, keys the persisted state")]
    pub job: Option<String>,

    #[arg(long, help = "CSV file to read")]
    pub source: Option<PathBuf>,

    #[arg(long, help = "Directory of the target store")]
    pub target: Option<PathBuf>,

    #[arg(long, help = "State directory (defaults to ~/.content-sync/state)")]
    pub state_dir: Option<PathBuf>,

    #[arg(long, help = "Column holding the unique identifier")]
    pub unique_column: Option<String>,

    #[arg(long, help = "Column holding the version; a row hash is used when omitted")]
    pub version_column: Option<String>,

    #[arg(long, help = "CSV field delimiter")]
    pub delimiter: Option<char>,

    #[arg(long, help = "Process one batch of this size per invocation")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Stop the stream after this many entities")]
    pub max_entities: Option<usize>,

    #[arg(long, help = "Count every action without writing to the target")]
    pub dry_run: bool,

    #[arg(long, help = "Update entities even when their versions match")]
    pub always_overwrite: bool,

    #[arg(long, help = "Abort on the first entity that fails")]
    pub stop_on_error: bool,

    #[arg(long, help = "Delete target entities missing from the completed stream")]
    pub delete_unprocessed: bool,

    #[arg(long, help = "Ignore persisted progress and start from the first batch")]
    pub force_restart: bool,

    #[arg(long, help = "Print the run result as JSON")]
    pub json: bool,

    #[arg(long, help = "If specified, writes the JSON run result to this file")]
    pub output: Option<PathBuf>,
}

impl SyncArgs {
    /// Settings given on the command line, layered over the settings file.
    pub fn overrides(&self) -> SyncSettings {
        SyncSettings {
            job_id: self.job.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            state_dir: self.state_dir.clone(),
            unique_column: self.unique_column.clone(),
            version_column: self.version_column.clone(),
            delimiter: self.delimiter,
            batch_size: self.batch_size,
            max_entities: self.max_entities,
            dry_run: self.dry_run,
            always_overwrite: self.always_overwrite,
            stop_on_error: self.stop_on_error,
            delete_unprocessed: self.delete_unprocessed,
        }
    }
}
