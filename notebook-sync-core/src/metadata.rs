//! Metadata record published alongside every converted tutorial.
//!
//! The same record is used as YAML front-matter in Markdown output and as the
//! `{slug}.yml` sidecar next to plain-text output, which the uploader later
//! sends as the file's metadata.

use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::MetadataError;
use crate::manifest::{ColabSetting, GlobalConfig, Item};

/// Every tutorial is published under the same category.
pub const CATEGORY: &str = "QA";

/// Prefix applied to every alias.
pub const ALIAS_PREFIX: &str = "/tutorials/";

/// Metadata for one tutorial.
///
/// Defaults for optional manifest fields:
/// - `featured`: `false`
/// - `colab`: `[config].colab` followed by the notebook file name
/// - `lastmod`: last commit date of the notebook, or today when it has none
/// - `completion_time`: serialized as `false` when unset
/// - `level`, `weight`, `created_at`: omitted when unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorialMetadata {
    pub layout: String,
    pub featured: bool,
    pub colab: String,
    pub toc: bool,
    pub title: String,
    pub lastmod: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    pub description: String,
    pub category: String,
    pub aliases: Vec<String>,
    pub download: String,
    #[serde(default, serialize_with = "false_when_unset", deserialize_with = "string_or_false")]
    pub completion_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl TutorialMetadata {
    /// Builds the record from an item, the manifest defaults and the
    /// notebook's last-modified date.
    pub fn build(
        config: &GlobalConfig,
        item: &Item,
        lastmod: String,
    ) -> Result<Self, MetadataError> {
        let title = required(item, "title", &item.title)?;
        let description = required(item, "description", &item.description)?;

        let colab = match &item.colab {
            Some(ColabSetting::Url(url)) => url.clone(),
            _ => format!("{}{}", config.colab, item.notebook),
        };

        Ok(Self {
            layout: config.layout.clone(),
            featured: item.featured.unwrap_or(false),
            colab,
            toc: config.toc,
            title,
            lastmod,
            level: item.level.clone(),
            weight: item.weight,
            description,
            category: CATEGORY.to_string(),
            aliases: prefixed_aliases(item),
            download: format!("/downloads/{}", item.notebook),
            completion_time: item.completion_time.clone(),
            created_at: item.created_at.clone(),
        })
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Front-matter header of a Markdown tutorial page.
///
/// A smaller record than [`TutorialMetadata`]: the site renders these pages
/// with `last_updated` set to the conversion date, and `colab` always points at
/// the `[config]` base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownFrontMatter {
    pub layout: String,
    pub colab: String,
    pub toc: bool,
    pub title: String,
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    pub description: String,
    pub category: String,
    pub aliases: Vec<String>,
}

impl MarkdownFrontMatter {
    pub fn build(
        config: &GlobalConfig,
        item: &Item,
        last_updated: String,
    ) -> Result<Self, MetadataError> {
        Ok(Self {
            layout: config.layout.clone(),
            colab: format!("{}{}", config.colab, item.notebook),
            toc: config.toc,
            title: required(item, "title", &item.title)?,
            last_updated,
            level: item.level.clone(),
            weight: item.weight,
            description: required(item, "description", &item.description)?,
            category: CATEGORY.to_string(),
            aliases: prefixed_aliases(item),
        })
    }

    /// YAML block delimited by `---` lines.
    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        Ok(format!("---\n{}---\n", serde_yaml::to_string(self)?))
    }
}

fn prefixed_aliases(item: &Item) -> Vec<String> {
    item.aliases
        .iter()
        .map(|alias| format!("{ALIAS_PREFIX}{alias}"))
        .collect()
}

fn required(item: &Item, field: &'static str, value: &Option<String>) -> Result<String, MetadataError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(MetadataError {
            notebook: item.notebook.clone(),
            field,
        }),
    }
}

fn false_when_unset<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serializer.serialize_str(v),
        None => serializer.serialize_bool(false),
    }
}

fn string_or_false<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Flag(_)) | None => None,
    })
}

/// Source of the last-modified date of a notebook, as `YYYY-MM-DD`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait CommitDateSource: Send + Sync {
    /// Returns `None` when the file has no recorded history.
    fn last_commit_date(&self, path: &Path) -> Option<String>;
}

/// Asks git for the committer date of the last commit touching a file.
#[derive(Debug, Clone, Default)]
pub struct GitCommitDates {
    /// Repository to run git in; the current directory when `None`.
    pub repo_dir: Option<PathBuf>,
}

impl CommitDateSource for GitCommitDates {
    fn last_commit_date(&self, path: &Path) -> Option<String> {
        let mut command = Command::new("git");
        if let Some(dir) = &self.repo_dir {
            command.arg("-C").arg(dir);
        }
        let output = command
            .args(["log", "-1", "--pretty=format:%cs", "--"])
            .arg(path)
            .output();

        match output {
            Ok(out) if out.status.success() => {
                let date = String::from_utf8_lossy(&out.stdout).trim().to_string();
                debug!(path = %path.display(), date = %date, "Read last commit date");
                (!date.is_empty()).then_some(date)
            }
            Ok(out) => {
                warn!(
                    path = %path.display(),
                    status = %out.status,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "git log exited with non-zero code"
                );
                None
            }
            Err(e) => {
                warn!(error = ?e, path = %path.display(), "Failed to launch git log");
                None
            }
        }
    }
}

/// Today's date in the form git's `%cs` uses.
pub fn today() -> String {
    chrono::Local::now().date_naive().to_string()
}
