//! Error types for notebook-sync.
//!
//! Each pipeline step has its own error so callers can tell a broken manifest
//! from a single bad notebook or a rejected upload. [`SyncError`] wraps them all
//! for code that drives several steps.

use std::path::PathBuf;

/// The manifest could not be read or does not have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read manifest {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path:?}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("manifest lists notebook {notebook} more than once")]
    DuplicateNotebook { notebook: String },
}

/// A notebook could not be rendered or its output could not be written.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("failed to read notebook {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("notebook {path:?} is not valid nbformat JSON: {message}")]
    Notebook { path: PathBuf, message: String },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize metadata for {notebook}: {message}")]
    Serialize { notebook: String, message: String },
}

/// A required metadata field is absent from a manifest item.
#[derive(Debug, thiserror::Error)]
#[error("tutorial {notebook} is missing required field '{field}'")]
pub struct MetadataError {
    pub notebook: String,
    pub field: &'static str,
}

/// A required configuration value (usually an environment variable) is missing.
#[derive(Debug, thiserror::Error)]
#[error("{name} env var not set")]
pub struct ConfigError {
    pub name: String,
}

/// The remote workspace rejected a request, or the request never completed.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{target} failed with status {status}: {body}")]
    Status {
        target: String,
        status: u16,
        body: String,
    },

    #[error("{target} request failed: {message}")]
    Transport { target: String, message: String },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid metadata in {path:?}: {message}")]
    Metadata { path: PathBuf, message: String },
}

/// Umbrella error for code that runs more than one pipeline step.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}
