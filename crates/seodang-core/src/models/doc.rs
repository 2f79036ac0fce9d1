//! Uploaded study document model.

use serde::{Deserialize, Serialize};

/// A stored document. `path` is server-relative; the absolute URL is derived
/// by the store on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doc {
    pub id: String,
    pub title: String,
    pub original_name: String,
    pub mime: String,
    /// File size in bytes.
    pub size: u64,
    pub path: String,
    pub uploaded_at: String,
}

/// File payload for a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}
