//! Loads the tutorial manifest and the workspace credentials.
//!
//! The manifest is read from disk; secrets (API key, workspace name) only ever
//! come from the environment and are passed on explicitly as an
//! [`UploadConfig`].

use anyhow::{Context, Result};
use notebook_sync_core::error::ConfigError;
use notebook_sync_core::manifest::{load_manifest, Manifest};
use std::env;
use std::path::Path;
use tracing::{error, info};

pub const API_KEY_VAR: &str = "DEEPSET_CLOUD_API_KEY";
pub const WORKSPACE_VAR: &str = "DEEPSET_CLOUD_WORKSPACE";
pub const API_URL_VAR: &str = "DEEPSET_CLOUD_API_URL";

pub const DEFAULT_API_URL: &str = "https://api.cloud.deepset.ai/api/v1";

/// Credentials and address of the workspace to upload to.
#[derive(Clone)]
pub struct UploadConfig {
    pub api_key: String,
    pub workspace: String,
    /// Base API URL, without a trailing slash.
    pub api_url: String,
}

impl std::fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadConfig")
            .field("api_key", &"<redacted>")
            .field("workspace", &self.workspace)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl UploadConfig {
    /// Reads the workspace, then the API key, failing on the first one that is
    /// unset or empty. The API URL is optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let workspace = required_var(WORKSPACE_VAR)?;
        let api_key = required_var(API_KEY_VAR)?;
        let api_url = env::var(API_URL_VAR)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        info!(workspace = %workspace, api_url = %api_url, "Loaded upload config from environment");
        Ok(Self {
            api_key,
            workspace,
            api_url,
        })
    }
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => {
            error!(var = name, "Required environment variable not set");
            Err(ConfigError {
                name: name.to_string(),
            })
        }
    }
}

/// Loads the manifest with CLI-level context on failure.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let path_ref = path.as_ref();
    load_manifest(path_ref).with_context(|| format!("Failed to load manifest {path_ref:?}"))
}
