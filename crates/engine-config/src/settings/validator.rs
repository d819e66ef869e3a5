use crate::settings::{SyncSettings, error::SettingsError, validated::ValidatedSettings};
use model::policy::RunPolicy;
use std::path::PathBuf;
use tracing::{info, warn};

const LARGE_BATCH_SIZE: usize = 100_000;

/// Validates raw settings and resolves defaults.
pub struct SettingsValidator {
    default_state_dir: Option<PathBuf>,
}

impl SettingsValidator {
    /// `default_state_dir` is used when the settings leave `state_dir` unset.
    pub fn new(default_state_dir: Option<PathBuf>) -> Self {
        Self { default_state_dir }
    }

    pub fn validate(&self, settings: &SyncSettings) -> Result<ValidatedSettings, SettingsError> {
        info!("Validating settings: {settings:?}");

        let mut errors: Vec<String> = Vec::new();

        let job_id = required_text(&settings.job_id, "job_id", &mut errors);
        let unique_column = required_text(&settings.unique_column, "unique_column", &mut errors);
        let source = required_path(&settings.source, "source", &mut errors);
        let target = required_path(&settings.target, "target", &mut errors);

        let state_dir = settings
            .state_dir
            .clone()
            .or_else(|| self.default_state_dir.clone());
        match (&target, &state_dir) {
            (_, None) => {
                errors.push("state_dir is not set and no default is available".to_string())
            }
            (Some(target), Some(state_dir)) if target == state_dir => {
                errors.push("target and state_dir must be different directories".to_string())
            }
            _ => {}
        }

        if settings
            .version_column
            .as_deref()
            .is_some_and(|column| column.trim().is_empty())
        {
            errors.push("version_column must not be empty".to_string());
        }

        let delimiter = settings.delimiter.unwrap_or(',');
        if !delimiter.is_ascii() {
            errors.push(format!("delimiter '{delimiter}' must be a single ASCII character"));
        }

        self.validate_batch_size(settings, &mut errors);

        if settings.max_entities == Some(0) {
            errors.push("max_entities must be greater than zero".to_string());
        }
        if settings.max_entities.is_some() && settings.batch_size.is_none() {
            warn!("max_entities only applies to batched runs and will be ignored");
        }

        if !errors.is_empty() {
            return Err(SettingsError::ValidationFailed(errors));
        }

        let (Some(job_id), Some(unique_column), Some(source), Some(target), Some(state_dir)) =
            (job_id, unique_column, source, target, state_dir)
        else {
            return Err(SettingsError::ValidationFailed(vec![
                "incomplete settings".to_string(),
            ]));
        };

        let validated = ValidatedSettings {
            job_id,
            source,
            target,
            state_dir,
            unique_column,
            version_column: settings.version_column.clone(),
            delimiter,
            batch_size: settings.batch_size,
            max_entities: settings.max_entities,
            policy: RunPolicy::default()
                .with_dry_run(settings.dry_run)
                .with_always_overwrite(settings.always_overwrite)
                .with_stop_on_error(settings.stop_on_error)
                .with_delete_unprocessed(settings.delete_unprocessed),
        };

        info!("Settings validation completed successfully");
        self.log_validated_settings(&validated);
        Ok(validated)
    }

    fn validate_batch_size(&self, settings: &SyncSettings, errors: &mut Vec<String>) {
        match settings.batch_size {
            Some(0) => errors.push("batch_size must be greater than zero".to_string()),
            Some(size) if size > LARGE_BATCH_SIZE => {
                warn!("Batch size {size} is very large, may cause memory issues");
            }
            _ => {}
        }
    }

    fn log_validated_settings(&self, settings: &ValidatedSettings) {
        info!(
            job = %settings.job_id,
            batch_size = ?settings.batch_size,
            max_entities = ?settings.max_entities,
            dry_run = settings.policy.dry_run,
            always_overwrite = settings.policy.always_overwrite,
            stop_on_error = settings.policy.stop_on_error,
            delete_unprocessed = settings.policy.delete_unprocessed,
            "Validated settings"
        );
    }
}

fn required_text(value: &Option<String>, name: &str, errors: &mut Vec<String>) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        _ => {
            errors.push(format!("{name} is required"));
            None
        }
    }
}

fn required_path(value: &Option<PathBuf>, name: &str, errors: &mut Vec<String>) -> Option<PathBuf> {
    match value {
        Some(path) if !path.as_os_str().is_empty() => Some(path.clone()),
        _ => {
            errors.push(format!("{name} is required"));
            None
        }
    }
}
