//! # Workspace client
//!
//! HTTP implementation of [`Uploader`] for the hosted workspace API:
//!
//! - `POST {api_url}/workspaces/{workspace}/files?write_mode=OVERWRITE` with a
//!   multipart body holding the `file` and its JSON `meta`
//! - `DELETE {api_url}/workspaces/{workspace}/files`
//!
//! Every request carries the API key as a bearer token. Non-success responses
//! become [`UploadError::Status`] with the response body; nothing is retried.

use async_trait::async_trait;
use notebook_sync_core::contract::{UploadRequest, UploadedFile, Uploader};
use notebook_sync_core::error::UploadError;
use reqwest::multipart::{Form, Part};

use crate::load_config::UploadConfig;

const DELETE_ALL_TARGET: &str = "delete all files";

pub struct WorkspaceClient {
    http: reqwest::Client,
    config: UploadConfig,
}

impl WorkspaceClient {
    pub fn new(config: UploadConfig) -> Self {
        tracing::info!(
            workspace = %config.workspace,
            api_url = %config.api_url,
            api_key_set = !config.api_key.is_empty(),
            "Initialized WorkspaceClient"
        );
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn workspace(&self) -> &str {
        &self.config.workspace
    }

    fn files_url(&self) -> String {
        format!(
            "{}/workspaces/{}/files",
            self.config.api_url, self.config.workspace
        )
    }
}

#[async_trait]
impl Uploader for WorkspaceClient {
    async fn upload_file(&self, req: UploadRequest) -> Result<UploadedFile, UploadError> {
        tracing::info!(file = %req.file_name, path = %req.path.display(), workspace = %self.config.workspace, "Uploading file");

        let content = tokio::fs::read(&req.path).await.map_err(|source| {
            tracing::error!(error = ?source, path = %req.path.display(), "Failed to read file for upload");
            UploadError::Io {
                path: req.path.clone(),
                source,
            }
        })?;
        let meta = serde_json::to_string(&req.meta).map_err(|e| UploadError::Metadata {
            path: req.path.clone(),
            message: e.to_string(),
        })?;

        let file_part = Part::bytes(content)
            .file_name(req.file_name.clone())
            .mime_str("text/plain")
            .map_err(|e| transport(&req.file_name, e))?;
        let form = Form::new().part("file", file_part).text("meta", meta);

        let response = self
            .http
            .post(self.files_url())
            .query(&[("write_mode", "OVERWRITE")])
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(&req.file_name, e))?;

        let body = check_status(&req.file_name, response).await?;
        tracing::info!(file = %req.file_name, response = %body, "Successfully uploaded file");
        Ok(UploadedFile {
            file_name: req.file_name,
            response: body,
        })
    }

    async fn delete_all_files(&self) -> Result<(), UploadError> {
        tracing::info!(workspace = %self.config.workspace, "Deleting all files from workspace");
        let response = self
            .http
            .delete(self.files_url())
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| transport(DELETE_ALL_TARGET, e))?;

        check_status(DELETE_ALL_TARGET, response).await?;
        tracing::info!(workspace = %self.config.workspace, "Deleted all files from workspace");
        Ok(())
    }
}

/// Returns the response body, or a status error carrying it.
async fn check_status(target: &str, response: reqwest::Response) -> Result<String, UploadError> {
    let status = response.status();
    let body = response.text().await.map_err(|e| transport(target, e))?;
    if !status.is_success() {
        tracing::error!(target_name = target, status = %status, body = %body, "Workspace API returned error");
        return Err(UploadError::Status {
            target: target.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn transport(target: &str, e: reqwest::Error) -> UploadError {
    tracing::error!(error = ?e, target_name = target, "Workspace request failed");
    UploadError::Transport {
        target: target.to_string(),
        message: e.to_string(),
    }
}
