//! Wire types for the upload endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::UploadError;

/// Label used when an envelope carries no `type`
pub const DEFAULT_KIND: &str = "unknown";

/// One upload request: a category label and an opaque list of items
#[derive(Debug, Clone, Deserialize)]
pub struct UploadEnvelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "payload", default)]
    items: Option<Vec<Value>>,
}

impl UploadEnvelope {
    /// Parse a request body. Anything but a JSON object is rejected.
    pub fn parse(body: &[u8]) -> Result<Self, UploadError> {
        let value: Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(UploadError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(DEFAULT_KIND)
    }

    pub fn items(&self) -> &[Value] {
        self.items.as_deref().unwrap_or_default()
    }
}

/// JSON body returned for every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub msg: String,
}

impl UploadResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            msg: msg.into(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            msg: msg.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
