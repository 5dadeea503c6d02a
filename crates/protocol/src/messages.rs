use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ChecksumType, ContentHash};

/// Field name to validation messages, as returned by the registry.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Fallback message when an error body carries nothing readable.
pub const GENERIC_ERROR_MESSAGE: &str = "Something bad happened";

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Opens a new upload session for a given checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUploadRequest {
    pub checksum: ContentHash,
    pub checksum_type: ChecksumType,
    pub file_size: u64,
}

// ---------------------------------------------------------------------------
// Error payloads
// ---------------------------------------------------------------------------

/// Body of a non-2xx registry response.
///
/// Range conflicts carry the authoritative `offset` (and the declared
/// `file_size`) as numbers; validation failures carry one list of messages
/// per rejected field. Both shapes can use the same keys, so they are only
/// interpreted on access.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_field_errors: Vec<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl ApiErrorBody {
    /// Parses an error body, falling back to an empty body for non-JSON input.
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Authoritative offset of a range conflict.
    pub fn offset(&self) -> Option<u64> {
        self.fields.get("offset").and_then(serde_json::Value::as_u64)
    }

    /// Human-readable summary: `detail`, else the joined non-field errors.
    pub fn message(&self) -> String {
        if let Some(detail) = self.detail.as_deref().filter(|d| !d.is_empty()) {
            return detail.to_string();
        }
        if !self.non_field_errors.is_empty() {
            return self.non_field_errors.join(" ");
        }
        GENERIC_ERROR_MESSAGE.to_string()
    }

    /// Per-field validation messages.
    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, value) in &self.fields {
            let messages: Vec<String> = match value {
                serde_json::Value::String(s) => vec![s.clone()],
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            };
            if !messages.is_empty() {
                errors.insert(field.clone(), messages);
            }
        }
        errors
    }
}
