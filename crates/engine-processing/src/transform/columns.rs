use engine_core::{connectors::source::EntityTransform, error::TransformError};
use model::records::{batch::RawRecord, entity::SyncEntity};
use serde_json::Value;

/// Maps flat records (CSV rows, JSON objects) to entities by column name.
///
/// Without a version column the version is a blake3 hash of the whole record, so any change to
/// any field counts as a new version.
#[derive(Debug, Clone)]
pub struct ColumnTransform {
    unique_column: String,
    version_column: Option<String>,
}

impl ColumnTransform {
    pub fn new(unique_column: impl Into<String>, version_column: Option<String>) -> Self {
        Self {
            unique_column: unique_column.into(),
            version_column,
        }
    }

    fn entity(&self, index: usize, record: RawRecord) -> Result<SyncEntity, TransformError> {
        let Value::Object(fields) = &record else {
            return Err(TransformError::InvalidRecord {
                index,
                message: "expected an object".to_string(),
            });
        };

        let unique_identifier = field_text(fields.get(&self.unique_column)).ok_or_else(|| {
            TransformError::MissingField {
                index,
                field: self.unique_column.clone(),
            }
        })?;

        let version = match &self.version_column {
            Some(column) => field_text(fields.get(column)).ok_or_else(|| {
                TransformError::MissingField {
                    index,
                    field: column.clone(),
                }
            })?,
            None => content_hash(&record),
        };

        Ok(SyncEntity::new(unique_identifier, version).with_payload(record))
    }
}

impl EntityTransform for ColumnTransform {
    fn transform(&self, records: Vec<RawRecord>) -> Result<Vec<SyncEntity>, TransformError> {
        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| self.entity(index, record))
            .collect()
    }
}

fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn content_hash(record: &Value) -> String {
    blake3::hash(record.to_string().as_bytes()).to_hex().to_string()
}
