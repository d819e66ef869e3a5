use crate::{
    commands::{Commands, SyncArgs},
    error::CliError,
    reporter::ConsoleReporter,
};
use clap::Parser;
use connectors::{
    file::csv::source::{CsvSettings, CsvSource},
    kv::sled_target::SledTargetStore,
};
use engine_config::settings::{SyncSettings, validator::SettingsValidator};
use engine_core::state::{BatchStateStore, TrackingIndexStore, sled_store::SledStateStore};
use engine_processing::transform::columns::ColumnTransform;
use engine_runtime::{SyncJob, SyncProcessor, clear_job_state, state_key};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod reporter;

#[derive(Parser)]
#[command(
    name = "content-sync",
    version = "0.1.0",
    about = "Incremental content synchronization"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync(args) => sync(args).await?,
        Commands::Progress {
            job,
            state_dir,
            dry_run,
            json,
        } => {
            let store = open_state_store(&resolve_state_dir(state_dir)?)?;
            let key = state_key(&job, dry_run);
            let state = store.load_batch_state(&key).await?;
            output::print_progress(&key, state.as_ref(), json)?;
        }
        Commands::Reset { job, state_dir } => {
            let store = open_state_store(&resolve_state_dir(state_dir)?)?;
            let batches: &dyn BatchStateStore = &store;
            let tracking: &dyn TrackingIndexStore = &store;
            clear_job_state(&job, Some(batches), Some(tracking)).await?;
            info!("Cleared persisted state of job '{job}'");
        }
    }

    Ok(())
}

async fn sync(args: SyncArgs) -> Result<(), CliError> {
    let file_settings = match &args.config {
        Some(path) => SyncSettings::from_file(path)?,
        None => SyncSettings::default(),
    };
    let settings = SettingsValidator::new(default_state_dir())
        .validate(&file_settings.merge(args.overrides()))?;

    let state = Arc::new(open_state_store(&settings.state_dir)?);
    let target = Arc::new(SledTargetStore::open(&settings.target).map_err(|err| {
        CliError::StoreOpen {
            path: settings.target.clone(),
            message: err.to_string(),
        }
    })?);
    let source = CsvSource::new(CsvSettings {
        delimiter: settings.delimiter,
    });
    let transform = ColumnTransform::new(
        settings.unique_column.clone(),
        settings.version_column.clone(),
    );

    let job = SyncJob::builder(settings.job_id.clone())
        .source(Arc::new(source))
        .transform(Arc::new(transform))
        .target(target.clone())
        .state_store(state)
        .reporter(Arc::new(ConsoleReporter::new(args.json)))
        .build()?;

    let mut processor = SyncProcessor::new(job).with_policy(settings.policy);
    if args.force_restart {
        processor.force_restart();
    }

    let locator = settings.source.to_string_lossy().into_owned();
    let outcome = match settings.batch_size {
        Some(batch_size) => {
            processor
                .process_batch(&locator, batch_size, settings.max_entities)
                .await
        }
        None => processor.process(&locator).await,
    };
    // Flush whatever was written before a possible abort.
    target.flush().await?;
    let result = outcome?;

    if let Some(path) = &args.output {
        output::write_result(&result, path)?;
    }
    output::print_result(&result, args.json)?;

    if !result.is_complete() {
        info!(
            "Stream not complete yet, run the same command again to process the next batch"
        );
    }
    Ok(())
}

fn default_state_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".content-sync/state"))
}

fn resolve_state_dir(state_dir: Option<PathBuf>) -> Result<PathBuf, CliError> {
    state_dir
        .or_else(default_state_dir)
        .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into()))
}

fn open_state_store(path: &Path) -> Result<SledStateStore, CliError> {
    SledStateStore::open(path).map_err(|err| CliError::StoreOpen {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
