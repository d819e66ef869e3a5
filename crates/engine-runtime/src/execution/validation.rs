use engine_core::error::ReconcileError;
use model::{
    pagination::{cursor::PaginationMode, state::BatchState},
    records::{batch::SourcePage, entity::SyncEntity},
};
use std::collections::HashSet;

/// Rejects a whole-stream read that returned nothing.
pub fn validate_full_page(page: &SourcePage) -> Result<(), ReconcileError> {
    if page.is_empty() {
        return Err(ReconcileError::StreamInvalid(
            "source stream is empty".to_string(),
        ));
    }
    Ok(())
}

/// Checks that a page has the shape the batch state asked for.
pub fn validate_batch_page(state: &BatchState, page: &SourcePage) -> Result<(), ReconcileError> {
    if page.is_empty() && state.is_first_batch() {
        return Err(ReconcileError::StreamInvalid(
            "source stream is empty".to_string(),
        ));
    }

    match state.mode {
        PaginationMode::Counted => {
            let expected = state.expected_len().unwrap_or(0);
            if page.len() != expected {
                return Err(ReconcileError::StreamInvalid(format!(
                    "batch {} should hold {expected} records, source returned {}",
                    state.current_batch,
                    page.len()
                )));
            }
        }
        PaginationMode::Cursor => {
            if !page.is_complete && page.next_offset.is_none() {
                return Err(ReconcileError::StreamInvalid(
                    "source reported more data without a continuation cursor".to_string(),
                ));
            }
            if !page.is_complete && page.is_empty() {
                return Err(ReconcileError::StreamInvalid(format!(
                    "source returned an empty page at cursor {:?}",
                    state.next_offset
                )));
            }
        }
    }
    Ok(())
}

/// Rejects entities that could not be matched safely: invalid unique identifiers and
/// identifiers repeated inside one batch.
pub fn validate_entities(entities: &[SyncEntity]) -> Result<(), ReconcileError> {
    let mut seen = HashSet::with_capacity(entities.len());
    for (position, entity) in entities.iter().enumerate() {
        entity.validate().map_err(|err| {
            ReconcileError::StreamInvalid(format!("entity at position {position}: {err}"))
        })?;
        if !seen.insert(entity.unique_identifier.as_str()) {
            return Err(ReconcileError::StreamInvalid(format!(
                "unique identifier '{}' appears more than once in the batch",
                entity.unique_identifier
            )));
        }
    }
    Ok(())
}
