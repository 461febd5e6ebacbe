//! Response bodies of the ingestion API.
//!
//! Every endpoint may answer `200 OK` and still report failures in an
//! `errors` array. Entries are objects with an `error`/`description` message
//! and an optional `index` into the submitted list, or bare strings.

use serde::Deserialize;
use serde_json::Value;
use usage_metrics::SchemaDefinition;

use crate::error::{IngestError, Result};

/// Longest response body kept in an error message.
pub(crate) const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<Value>,
}

/// Body of the schema listing.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SchemaList {
    #[serde(default)]
    pub(crate) schemas: Vec<SchemaEntry>,
}

/// One listed schema, wrapped as the backend returns it.
#[derive(Debug, Deserialize)]
pub(crate) struct SchemaEntry {
    pub(crate) schema: SchemaDefinition,
}

/// Returns the application errors reported in a successful response body.
///
/// Bodies that are empty or not JSON objects carry no errors.
pub(crate) fn application_errors(body: &str) -> Vec<String> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return Vec::new();
    };
    envelope.errors.iter().map(describe).collect()
}

fn describe(entry: &Value) -> String {
    match entry {
        Value::String(message) => message.clone(),
        Value::Object(fields) => {
            let message = ["description", "error", "message"]
                .iter()
                .find_map(|key| fields.get(*key).and_then(Value::as_str))
                .map_or_else(|| entry.to_string(), str::to_string);
            match fields.get("index").and_then(Value::as_u64) {
                Some(index) => format!("#{index}: {message}"),
                None => message,
            }
        }
        other => other.to_string(),
    }
}

/// Fails with [`IngestError::Rejected`] if the body lists application errors.
pub(crate) fn ensure_accepted(body: &str) -> Result<()> {
    let errors = application_errors(body);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(IngestError::Rejected {
            reason: errors.join("; "),
        })
    }
}

/// Parses the schema listing.
pub(crate) fn parse_schema_list(body: &str) -> Result<Vec<SchemaDefinition>> {
    ensure_accepted(body)?;
    let list: SchemaList = serde_json::from_str(body).map_err(|e| IngestError::Decode {
        reason: e.to_string(),
    })?;
    Ok(list.schemas.into_iter().map(|entry| entry.schema).collect())
}

/// Shortens a body for inclusion in an error message.
pub(crate) fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}
