//! Records as they travel through the data store: JSON objects whose shape is
//! fixed by the collection schema. Typed structs are produced here, at the
//! store-access boundary, so the rest of the application never touches
//! dynamic values.

use serde::de::DeserializeOwned;

/// A raw store record: one JSON object per row.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record failed validation: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Validate and decode one record into its typed form.
pub fn decode<T: DeserializeOwned>(record: Record) -> Result<T, RecordError> {
    Ok(serde_json::from_value(serde_json::Value::Object(record))?)
}

/// Validate and decode a whole result set.
pub fn decode_all<T: DeserializeOwned>(records: Vec<Record>) -> Result<Vec<T>, RecordError> {
    records.into_iter().map(decode).collect()
}
