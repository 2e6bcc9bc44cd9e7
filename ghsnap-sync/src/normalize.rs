//! Record normalizer — turns raw listing entities into a keyed [`Batch`].
//!
//! Each entity gets `count = sequence`, `valid = true`, and every configured
//! scratch field reset to `""`. Raw `count` / `valid` attributes are
//! overwritten. When two entities share a key the later one wins.

use serde_json::Value;

use ghsnap_core::types::{Batch, FieldMap, Record, Settings};

use crate::error::{malformed, MalformedReason, SyncError};

/// Normalize one fetch cycle's raw entities.
///
/// Fails with [`SyncError::MalformedEntity`] on the first entity that is not
/// an object, lacks the key field, or has a non-scalar or empty key.
pub fn normalize(raw: Vec<Value>, sequence: u64, settings: &Settings) -> Result<Batch, SyncError> {
    let mut batch = Batch::new();
    for (index, entity) in raw.into_iter().enumerate() {
        let Value::Object(mut fields) = entity else {
            return Err(malformed(index, MalformedReason::NotAnObject));
        };
        let key = record_key(&fields, &settings.key_field).map_err(|r| malformed(index, r))?;

        fields.remove("count");
        fields.remove("valid");
        for scratch in &settings.scratch_fields {
            fields.insert(scratch.clone(), Value::String(String::new()));
        }

        let record = Record {
            count: sequence,
            valid: true,
            fields,
        };
        if batch.insert(key.clone(), record).is_some() {
            tracing::warn!("duplicate key '{key}' in batch #{sequence}; keeping the later entity");
        }
    }
    Ok(batch)
}

/// Stringified key of an entity.
fn record_key(fields: &FieldMap, key_field: &str) -> Result<String, MalformedReason> {
    match fields.get(key_field) {
        None => Err(MalformedReason::MissingKey {
            key_field: key_field.to_owned(),
        }),
        Some(Value::String(s)) if s.is_empty() => Err(MalformedReason::EmptyKey {
            key_field: key_field.to_owned(),
        }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Null | Value::Array(_) | Value::Object(_)) => Err(MalformedReason::NonScalarKey {
            key_field: key_field.to_owned(),
        }),
    }
}
