//! Batch orchestration: convert many notebooks, upload many files, and the
//! full workspace reset-and-upload pipeline.
//!
//! # Failure policy
//! Every batch runs under a [`FailurePolicy`]. With
//! [`FailurePolicy::AbortOnFirst`] the first failing unit ends the batch and its
//! error is returned; nothing after it is started. With
//! [`FailurePolicy::CollectAll`] every unit runs and failures are listed in the
//! returned [`BatchReport`].
//!
//! Uploads are never transactional: files uploaded before an abort stay in the
//! workspace.
//!
//! # Concurrency
//! Conversion is sequential. Uploads run on a bounded pool of
//! [`BatchOptions::concurrency`] in-flight requests with no ordering guarantee.

use futures::stream::{self, StreamExt};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::contract::{UploadRequest, Uploader};
use crate::convert::{ConversionResult, Converter};
use crate::error::{SyncError, UploadError};
use crate::manifest::{Item, Manifest};
use crate::metadata::CommitDateSource;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure and return its error.
    #[default]
    AbortOnFirst,
    /// Process every unit and report all failures.
    CollectAll,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Maximum number of uploads in flight. `0` is treated as `1`.
    pub concurrency: usize,
    pub policy: FailurePolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            policy: FailurePolicy::default(),
        }
    }
}

/// Outcome of a batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<UnitFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    pub name: String,
    pub error: String,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of a conversion batch, with the converted documents in order.
#[derive(Debug, Default, Clone)]
pub struct ConversionBatch {
    pub report: BatchReport,
    pub results: Vec<ConversionResult>,
}

/// A notebook on disk paired with its manifest entry.
#[derive(Debug, Clone)]
pub struct ConversionJob<'m> {
    pub item: &'m Item,
    pub notebook_path: PathBuf,
}

/// Pairs notebook paths with manifest items. Notebooks without an entry are
/// skipped.
pub fn plan_conversions<'m>(manifest: &'m Manifest, notebooks: &[PathBuf]) -> Vec<ConversionJob<'m>> {
    notebooks
        .iter()
        .filter_map(|path| {
            let name = path.to_string_lossy();
            match manifest.find(&name) {
                Some(item) => Some(ConversionJob {
                    item,
                    notebook_path: path.clone(),
                }),
                None => {
                    warn!(path = %path.display(), "Notebook has no manifest entry, skipping");
                    None
                }
            }
        })
        .collect()
}

/// Lists tutorial notebooks in a directory: files starting with a digit and
/// ending in `.ipynb`, sorted by name.
pub fn discover_notebooks(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut notebooks: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(|c: char| c.is_ascii_digit()) && n.ends_with(".ipynb"))
                .unwrap_or(false)
        })
        .collect();
    notebooks.sort();
    info!(dir = %dir.display(), count = notebooks.len(), "Discovered notebooks");
    Ok(notebooks)
}

/// Converts every job in order.
pub fn convert_batch<D: CommitDateSource>(
    converter: &Converter<D>,
    jobs: &[ConversionJob<'_>],
    policy: FailurePolicy,
) -> Result<ConversionBatch, SyncError> {
    info!(jobs = jobs.len(), ?policy, "[CONVERT] Starting conversion batch");
    let mut batch = ConversionBatch::default();

    for job in jobs {
        match converter.convert(job.item, &job.notebook_path) {
            Ok(result) => {
                batch.report.succeeded.push(result.slug.clone());
                batch.results.push(result);
            }
            Err(e) => {
                error!(notebook = %job.item.notebook, error = %e, "[CONVERT][ERROR] Conversion failed");
                if policy == FailurePolicy::AbortOnFirst {
                    return Err(e);
                }
                batch.report.failed.push(UnitFailure {
                    name: job.item.notebook.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        succeeded = batch.report.succeeded.len(),
        failed = batch.report.failed.len(),
        "[CONVERT] Conversion batch finished"
    );
    Ok(batch)
}

/// Uploads every request through a bounded pool of concurrent requests.
pub async fn upload_batch<U>(
    uploader: &U,
    requests: Vec<UploadRequest>,
    options: &BatchOptions,
) -> Result<BatchReport, SyncError>
where
    U: Uploader + ?Sized,
{
    let concurrency = options.concurrency.max(1);
    info!(files = requests.len(), concurrency, policy = ?options.policy, "[UPLOAD] Starting upload batch");

    let mut in_flight = stream::iter(requests.into_iter().map(|req| async move {
        let name = req.file_name.clone();
        info!(file = %name, "[UPLOAD] Uploading");
        (name, uploader.upload_file(req).await)
    }))
    .buffer_unordered(concurrency);

    let mut report = BatchReport::default();
    while let Some((name, result)) = in_flight.next().await {
        match result {
            Ok(uploaded) => {
                info!(file = %name, response = %uploaded.response, "[UPLOAD] Upload succeeded");
                report.succeeded.push(name);
            }
            Err(e) => {
                error!(file = %name, error = %e, "[UPLOAD][ERROR] Upload failed");
                if options.policy == FailurePolicy::AbortOnFirst {
                    return Err(e.into());
                }
                report.failed.push(UnitFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "[UPLOAD] Upload batch finished"
    );
    Ok(report)
}

/// Removes every file from the workspace.
pub async fn empty_workspace<U>(uploader: &U) -> Result<(), UploadError>
where
    U: Uploader + ?Sized,
{
    uploader.delete_all_files().await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Failed to empty workspace");
        e
    })?;
    info!("[SYNC] Emptied workspace");
    Ok(())
}

/// Upload requests built from a text directory, and the files that could not
/// be prepared.
#[derive(Debug, Default)]
pub struct PreparedUploads {
    pub requests: Vec<UploadRequest>,
    /// File name and the error reading its sidecar.
    pub failed: Vec<(String, UploadError)>,
}

/// Builds one upload request per `*.txt` file in `text_dir`, with metadata read
/// from the `{stem}.yml` sidecar next to it. Sorted by file name.
///
/// Only an unreadable directory is an error; a missing or malformed sidecar
/// fails that one file.
pub fn collect_upload_requests(text_dir: &Path) -> Result<PreparedUploads, UploadError> {
    let mut texts: Vec<PathBuf> = fs::read_dir(text_dir)
        .map_err(|source| UploadError::Io {
            path: text_dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    texts.sort();

    let mut prepared = PreparedUploads::default();
    for path in texts {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match read_sidecar(&path.with_extension("yml")) {
            Ok(meta) => prepared.requests.push(UploadRequest {
                path,
                file_name,
                meta,
            }),
            Err(e) => prepared.failed.push((file_name, e)),
        }
    }
    Ok(prepared)
}

fn read_sidecar(path: &Path) -> Result<serde_json::Value, UploadError> {
    let content = fs::read_to_string(path).map_err(|source| {
        error!(error = ?source, path = %path.display(), "Failed to read metadata sidecar");
        UploadError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    serde_yaml::from_str(&content).map_err(|e| {
        error!(error = %e, path = %path.display(), "Failed to parse metadata sidecar");
        UploadError::Metadata {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })
}

/// Full workspace sync: delete everything remote, then upload every text file
/// in `text_dir` with its sidecar metadata.
///
/// Sidecars are read before the delete. Under [`FailurePolicy::AbortOnFirst`]
/// a bad sidecar returns its error with the workspace untouched. Under
/// [`FailurePolicy::CollectAll`] it is reported as a failed unit and the other
/// files are uploaded; when no file is uploadable the workspace is left as is.
pub async fn synchronise<U>(
    uploader: &U,
    text_dir: &Path,
    options: &BatchOptions,
) -> Result<BatchReport, SyncError>
where
    U: Uploader + ?Sized,
{
    info!(text_dir = %text_dir.display(), "[SYNC] Starting full workspace synchronisation");
    let prepared = collect_upload_requests(text_dir)?;

    let mut unprepared = Vec::with_capacity(prepared.failed.len());
    for (name, e) in prepared.failed {
        error!(file = %name, error = %e, "[SYNC][ERROR] Failed to prepare upload");
        if options.policy == FailurePolicy::AbortOnFirst {
            return Err(e.into());
        }
        unprepared.push(UnitFailure {
            name,
            error: e.to_string(),
        });
    }

    if prepared.requests.is_empty() && !unprepared.is_empty() {
        warn!(failed = unprepared.len(), "[SYNC] No file can be uploaded, keeping workspace as is");
        return Ok(BatchReport {
            succeeded: Vec::new(),
            failed: unprepared,
        });
    }

    empty_workspace(uploader).await?;
    let mut report = upload_batch(uploader, prepared.requests, options).await?;
    unprepared.append(&mut report.failed);
    report.failed = unprepared;
    Ok(report)
}
