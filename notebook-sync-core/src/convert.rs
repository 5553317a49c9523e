//! Converts one tutorial notebook into a published document.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::{ConversionError, SyncError};
use crate::manifest::{GlobalConfig, Item};
use crate::metadata::{today, CommitDateSource, MarkdownFrontMatter, TutorialMetadata};
use crate::notebook::{strip_first_line, Notebook};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `{slug}.md`: YAML front-matter followed by the rendered notebook.
    Markdown,
    /// `{slug}.txt`: rendered notebook without its title line, metadata kept
    /// in an optional `{slug}.yml` sidecar.
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Text => "txt",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Write the `{slug}.yml` sidecar next to the body file.
    pub write_metadata: bool,
}

/// Result of converting one item.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub slug: String,
    /// Exactly what was written to `body_path`.
    pub body: String,
    pub metadata: TutorialMetadata,
    pub body_path: PathBuf,
    pub metadata_path: Option<PathBuf>,
}

/// Renders notebooks with the manifest defaults and a commit-date source.
pub struct Converter<D> {
    config: GlobalConfig,
    dates: D,
    options: ConvertOptions,
}

impl<D: CommitDateSource> Converter<D> {
    pub fn new(config: GlobalConfig, dates: D, options: ConvertOptions) -> Self {
        Self {
            config,
            dates,
            options,
        }
    }

    /// Converts the notebook at `notebook_path` described by `item`, writing
    /// the output files. Existing files are overwritten.
    pub fn convert(&self, item: &Item, notebook_path: &Path) -> Result<ConversionResult, SyncError> {
        info!(notebook = %item.notebook, path = %notebook_path.display(), format = ?self.options.format, "Processing notebook");

        let lastmod = self
            .dates
            .last_commit_date(notebook_path)
            .unwrap_or_else(today);
        let metadata = TutorialMetadata::build(&self.config, item, lastmod).map_err(|e| {
            error!(error = %e, "Tutorial metadata is incomplete");
            e
        })?;

        let notebook = read_notebook(notebook_path)?;
        let rendered = notebook.to_markdown();
        let slug = item.slug().to_string();

        let body = match self.options.format {
            OutputFormat::Markdown => {
                let front_matter = MarkdownFrontMatter::build(&self.config, item, today())?
                    .render()
                    .map_err(|e| serialize_error(item, e))?;
                format!("{front_matter}\n{rendered}")
            }
            OutputFormat::Text => strip_first_line(&rendered).to_string(),
        };

        let output_dir = &self.options.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| {
            error!(error = ?e, path = %output_dir.display(), "Failed to create output directory");
            ConversionError::Write {
                path: output_dir.clone(),
                source: e,
            }
        })?;

        let body_path = output_dir.join(format!("{slug}.{}", self.options.format.extension()));
        write_file(&body_path, &body)?;

        let metadata_path = if self.options.write_metadata {
            let path = output_dir.join(format!("{slug}.yml"));
            let yaml = metadata.to_yaml().map_err(|e| serialize_error(item, e))?;
            write_file(&path, &yaml)?;
            Some(path)
        } else {
            None
        };

        info!(notebook = %item.notebook, output = %body_path.display(), size = body.len(), "Converted notebook");
        Ok(ConversionResult {
            slug,
            body,
            metadata,
            body_path,
            metadata_path,
        })
    }
}

fn read_notebook(path: &Path) -> Result<Notebook, ConversionError> {
    let json = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to read notebook");
        ConversionError::Read {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    Notebook::from_json(&json).map_err(|e| {
        error!(error = %e, path = %path.display(), "Failed to parse notebook");
        ConversionError::Notebook {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })
}

fn write_file(path: &Path, content: &str) -> Result<(), ConversionError> {
    fs::write(path, content).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to write output file");
        ConversionError::Write {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    debug!(path = %path.display(), size = content.len(), "Wrote output file");
    Ok(())
}

fn serialize_error(item: &Item, e: serde_yaml::Error) -> ConversionError {
    ConversionError::Serialize {
        notebook: item.notebook.clone(),
        message: e.to_string(),
    }
}
