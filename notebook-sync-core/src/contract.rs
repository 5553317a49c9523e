//! # contract: interface between the pipelines and the remote workspace
//!
//! The batch orchestrator only talks to a workspace through the [`Uploader`]
//! trait. The HTTP client lives in the CLI crate; tests use the `mockall`
//! generated `MockUploader` or a small in-memory implementation.
//!
//! Uploads use overwrite semantics: sending a file whose name already exists in
//! the workspace replaces the previous content.

use async_trait::async_trait;
use std::path::PathBuf;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::UploadError;

/// One file to upload together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    /// Local file to send. Opened and closed by the uploader for this request only.
    pub path: PathBuf,
    /// Name the file gets in the workspace.
    pub file_name: String,
    /// Sent as the JSON `meta` form field.
    pub meta: serde_json::Value,
}

/// What the workspace answered for a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    /// Raw response body, usually JSON describing the stored file.
    pub response: String,
}

/// Writes files into, and clears, a remote workspace.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload one file with overwrite semantics.
    async fn upload_file(&self, req: UploadRequest) -> Result<UploadedFile, UploadError>;

    /// Remove every file in the workspace. Irreversible.
    async fn delete_all_files(&self) -> Result<(), UploadError>;
}
