use crate::error::CliError;
use engine_core::reporter::render_table;
use engine_runtime::RunResult;
use model::pagination::state::BatchState;
use std::path::Path;
use tracing::info;

pub fn write_result(result: &RunResult, path: &Path) -> Result<(), CliError> {
    result.write_json(path)?;
    info!("Run result written to {}", path.display());
    Ok(())
}

pub fn print_result(result: &RunResult, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", result.to_json()?);
    } else {
        println!("{}", render_table(&["Field", "Value"], &result.rows()));
    }
    Ok(())
}

pub fn print_progress(
    key: &str,
    state: Option<&BatchState>,
    as_json: bool,
) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    let Some(state) = state else {
        println!("No persisted progress for '{key}'");
        return Ok(());
    };

    println!("Progress for '{key}':");
    println!("{}", render_table(&["Field", "Value"], &progress_rows(state)));
    Ok(())
}

fn progress_rows(state: &BatchState) -> Vec<Vec<String>> {
    let total = state
        .total_batches
        .map_or_else(|| "?".to_string(), |total| total.to_string());
    let next_offset = state.next_offset.clone().unwrap_or_else(|| "n/a".to_string());
    let processed = state
        .processed_batches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    vec![
        vec!["Mode".to_string(), state.mode.to_string()],
        vec!["Batch size".to_string(), state.batch_size.to_string()],
        vec!["Current batch".to_string(), format!("{}/{}", state.current_batch, total)],
        vec!["Processed batches".to_string(), processed],
        vec!["Next offset".to_string(), next_offset],
        vec!["Entities read".to_string(), state.entities_read.to_string()],
        vec!["Complete".to_string(), state.is_complete.to_string()],
        vec!["Source".to_string(), state.fingerprint.to_string()],
        vec!["Updated at".to_string(), state.updated_at.to_rfc3339()],
    ]
}
