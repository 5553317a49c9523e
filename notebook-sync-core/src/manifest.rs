//! Tutorial manifest: the `index.toml` file that lists every tutorial notebook
//! and the defaults shared by all of them.
//!
//! ```toml
//! [config]
//! layout = "tutorial"
//! toc = true
//! colab = "https://colab.research.google.com/github/org/tutorials/blob/main/tutorials/"
//!
//! [[tutorial]]
//! title = "Build Your First QA System"
//! description = "Get started with an extractive pipeline"
//! level = "beginner"
//! weight = 10
//! notebook = "01_Basic_QA_Pipeline.ipynb"
//! created_at = 2021-08-12
//! ```

use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use crate::error::ParseError;

/// The parsed manifest. Loaded once per run and never mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub config: GlobalConfig,
    #[serde(rename = "tutorial")]
    pub items: Vec<Item>,
}

/// `[config]` section: defaults applied to every item when generating metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    pub layout: String,
    pub toc: bool,
    /// Base URL for hosted notebooks; the notebook file name is appended.
    pub colab: String,
}

/// A `colab` entry on an item is either a flag or a link override.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColabSetting {
    /// `colab = false` marks a tutorial without runnable code.
    Enabled(bool),
    /// A URL used instead of the `[config]` base URL plus notebook name.
    Url(String),
}

/// One `[[tutorial]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    /// Notebook file name, unique within the manifest.
    pub notebook: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default, deserialize_with = "date_or_string")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completion_time: Option<String>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub needs_gpu: bool,
    #[serde(default)]
    pub colab: Option<ColabSetting>,
    /// Framework version this tutorial is pinned to, e.g. `2.3.0` or `v2.3.0`.
    #[serde(default)]
    pub haystack_version: Option<String>,
    /// Major version family this tutorial belongs to.
    #[serde(default)]
    pub major_version: Option<u64>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

impl Item {
    /// Output file stem: the explicit slug, or the notebook name without `.ipynb`.
    pub fn slug(&self) -> &str {
        match &self.slug {
            Some(slug) => slug,
            None => notebook_stem(&self.notebook),
        }
    }

    /// False only when the manifest says `colab = false`.
    pub fn is_runnable(&self) -> bool {
        !matches!(self.colab, Some(ColabSetting::Enabled(false)))
    }
}

impl Manifest {
    /// Looks up an item by notebook file name. Leading directories are ignored,
    /// so `tutorials/01_x.ipynb` finds the `01_x.ipynb` entry.
    pub fn find(&self, notebook: &str) -> Option<&Item> {
        let name = file_name(notebook);
        self.items.iter().find(|item| item.notebook == name)
    }

    pub fn trace_loaded(&self) {
        info!(
            layout = %self.config.layout,
            items = self.items.len(),
            "Loaded manifest"
        );
        debug!(manifest = ?self, "Manifest loaded (full debug)");
    }
}

/// Strips any leading directories from a notebook path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Notebook file name without the `.ipynb` extension.
pub fn notebook_stem(notebook: &str) -> &str {
    let name = file_name(notebook);
    name.strip_suffix(".ipynb").unwrap_or(name)
}

/// Reads and validates a manifest file.
pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<Manifest, ParseError> {
    let path_ref = path.as_ref();
    info!(manifest_path = ?path_ref, "Loading manifest from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, manifest_path = ?path_ref, "Failed to read manifest file");
            return Err(ParseError::Io {
                path: path_ref.to_path_buf(),
                source: e,
            });
        }
    };

    let manifest = parse_manifest(&content).map_err(|e| match e {
        ParseError::Malformed { message, .. } => ParseError::Malformed {
            path: path_ref.to_path_buf(),
            message,
        },
        other => other,
    })?;
    manifest.trace_loaded();
    Ok(manifest)
}

/// Parses manifest TOML from a string.
pub fn parse_manifest(content: &str) -> Result<Manifest, ParseError> {
    let manifest: Manifest = toml::from_str(content).map_err(|e| {
        error!(error = %e, "Failed to parse manifest TOML");
        ParseError::Malformed {
            path: Default::default(),
            message: e.to_string(),
        }
    })?;

    let mut seen = HashSet::new();
    for item in &manifest.items {
        if !seen.insert(item.notebook.as_str()) {
            error!(notebook = %item.notebook, "Duplicate notebook in manifest");
            return Err(ParseError::DuplicateNotebook {
                notebook: item.notebook.clone(),
            });
        }
    }
    Ok(manifest)
}

// TOML dates (`created_at = 2021-08-12`) are not strings; accept both forms.
fn date_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<toml::Value>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        toml::Value::String(s) => s,
        other => other.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[config]
layout = "tutorial"
toc = true
colab = "https://colab.example/tutorials/"

[[tutorial]]
title = "First"
description = "The first one"
level = "beginner"
weight = 10
notebook = "01_First.ipynb"
created_at = 2021-08-12
aliases = ["first"]

[[tutorial]]
title = "Second"
description = "No code here"
notebook = "02_Second.ipynb"
colab = false
slug = "second-tutorial"
created_at = "2022-01-01"
"#;

    #[test]
    fn parses_items_in_order() {
        let manifest = parse_manifest(MANIFEST).expect("manifest should parse");
        assert_eq!(manifest.config.layout, "tutorial");
        assert!(manifest.config.toc);
        assert_eq!(manifest.items.len(), 2);
        assert_eq!(manifest.items[0].notebook, "01_First.ipynb");
        assert_eq!(manifest.items[0].weight, Some(10));
        assert_eq!(manifest.items[0].aliases, vec!["first".to_string()]);
        assert_eq!(manifest.items[1].notebook, "02_Second.ipynb");
    }

    #[test]
    fn created_at_accepts_dates_and_strings() {
        let manifest = parse_manifest(MANIFEST).unwrap();
        assert_eq!(manifest.items[0].created_at.as_deref(), Some("2021-08-12"));
        assert_eq!(manifest.items[1].created_at.as_deref(), Some("2022-01-01"));
    }

    #[test]
    fn colab_flag_and_slug() {
        let manifest = parse_manifest(MANIFEST).unwrap();
        assert!(manifest.items[0].is_runnable());
        assert!(!manifest.items[1].is_runnable());
        assert_eq!(manifest.items[0].slug(), "01_First");
        assert_eq!(manifest.items[1].slug(), "second-tutorial");
    }

    #[test]
    fn colab_url_override_is_runnable() {
        let manifest = parse_manifest(
            r#"
[config]
layout = "tutorial"
toc = false
colab = "https://colab.example/"

[[tutorial]]
notebook = "03_Url.ipynb"
colab = "https://elsewhere.example/03.ipynb"
"#,
        )
        .unwrap();
        let item = &manifest.items[0];
        assert_eq!(
            item.colab,
            Some(ColabSetting::Url("https://elsewhere.example/03.ipynb".into()))
        );
        assert!(item.is_runnable());
    }

    #[test]
    fn find_ignores_leading_directories() {
        let manifest = parse_manifest(MANIFEST).unwrap();
        assert!(manifest.find("tutorials/01_First.ipynb").is_some());
        assert!(manifest.find("01_First.ipynb").is_some());
        assert!(manifest.find("99_Missing.ipynb").is_none());
    }

    #[test]
    fn missing_config_section_is_a_parse_error() {
        let err = parse_manifest("[[tutorial]]\nnotebook = \"01_x.ipynb\"\n").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }), "got {err:?}");
    }

    #[test]
    fn missing_tutorial_list_is_a_parse_error() {
        let err = parse_manifest(
            "[config]\nlayout = \"tutorial\"\ntoc = true\ncolab = \"https://c/\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }), "got {err:?}");
    }

    #[test]
    fn duplicate_notebook_is_rejected() {
        let err = parse_manifest(
            r#"
[config]
layout = "tutorial"
toc = true
colab = "https://c/"

[[tutorial]]
notebook = "01_x.ipynb"

[[tutorial]]
notebook = "01_x.ipynb"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::DuplicateNotebook { ref notebook } if notebook == "01_x.ipynb"));
    }

    #[test]
    fn missing_file_is_an_io_parse_error() {
        let err = load_manifest("/definitely/not/here/index.toml").unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
