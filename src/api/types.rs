//! Wire types for the chat and upload endpoints.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Status value the chat endpoint uses for a successful reply.
pub const STATUS_SUCCESS: &str = "success";

// =============================================================================
// Chat
// =============================================================================

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Session identity of the sender.
    pub user_id: String,
    /// Trimmed message text.
    pub message: String,
}

/// Reply from `POST /api/chat`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// `"success"` or anything else. Missing counts as not successful.
    #[serde(default)]
    pub status: String,
    /// Bot reply text, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ChatResponse {
    /// Read a reply from any JSON value.
    ///
    /// Fields that are absent or not strings count as missing, so a reply
    /// with odd field types is a non-success reply rather than a decode
    /// failure.
    pub fn from_value(value: &Value) -> Self {
        Self {
            status: string_field(value, "status").unwrap_or_default(),
            response: string_field(value, "response"),
        }
    }

    /// Whether the backend reported success.
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

// =============================================================================
// Upload
// =============================================================================

/// Reply from `POST /api/upload`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Confirmation text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Rejection text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    /// Read a reply from any JSON value. Non-string fields count as missing.
    pub fn from_value(value: &Value) -> Self {
        Self {
            message: string_field(value, "message"),
            error: string_field(value, "error"),
        }
    }

    /// Text to show for this reply: `message` wins over `error`.
    ///
    /// Empty strings are treated as absent.
    pub fn display_text(&self) -> Option<&str> {
        non_empty(self.message.as_deref()).or_else(|| non_empty(self.error.as_deref()))
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// A single file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name as shown to the user and sent in the multipart part.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// MIME type, if known.
    pub content_type: Option<String>,
}

impl UploadFile {
    /// Build an upload from in-memory bytes, guessing the MIME type from the name.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_raw()
            .map(str::to_string);
        Self {
            file_name,
            bytes: bytes.into(),
            content_type,
        }
    }

    /// Read a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(file_name, bytes))
    }

    /// MIME type to send, defaulting to `application/octet-stream`.
    pub fn mime(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }
}
