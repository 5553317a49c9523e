//! Minimal nbformat 4 reader and Markdown renderer.
//!
//! Execution outputs are never rendered. Markdown cells are copied verbatim,
//! code cells become fenced blocks and raw cells are kept only when they target
//! Markdown or HTML.

use serde::{Deserialize, Deserializer};

/// Raw-cell MIME types that make sense inside a Markdown document.
const MARKDOWN_RAW_MIMETYPES: &[&str] = &["", "text/markdown", "text/html"];

const DEFAULT_LANGUAGE: &str = "python";

#[derive(Debug, Clone, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub metadata: NotebookMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotebookMetadata {
    #[serde(default)]
    pub kernelspec: Option<KernelSpec>,
    #[serde(default)]
    pub language_info: Option<LanguageInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KernelSpec {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageInfo {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Markdown {
        #[serde(deserialize_with = "multiline")]
        source: String,
    },
    Code {
        #[serde(deserialize_with = "multiline")]
        source: String,
    },
    Raw {
        #[serde(deserialize_with = "multiline")]
        source: String,
        #[serde(default)]
        metadata: RawCellMetadata,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCellMetadata {
    #[serde(default)]
    pub raw_mimetype: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

impl RawCellMetadata {
    fn mimetype(&self) -> &str {
        self.raw_mimetype
            .as_deref()
            .or(self.format.as_deref())
            .unwrap_or("")
    }
}

impl Notebook {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn language(&self) -> &str {
        self.metadata
            .kernelspec
            .as_ref()
            .and_then(|k| k.language.as_deref())
            .or_else(|| {
                self.metadata
                    .language_info
                    .as_ref()
                    .and_then(|l| l.name.as_deref())
            })
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Renders the notebook as Markdown, without outputs.
    ///
    /// Sources are copied as they are, trailing whitespace included. Every code
    /// cell gets a fence, even an empty one; empty Markdown and raw cells are
    /// skipped.
    pub fn to_markdown(&self) -> String {
        let language = self.language();
        let blocks: Vec<String> = self
            .cells
            .iter()
            .filter_map(|cell| match cell {
                Cell::Markdown { source } => Some(source.clone()),
                Cell::Code { source } => Some(format!("```{language}\n{source}\n```")),
                Cell::Raw { source, metadata } => MARKDOWN_RAW_MIMETYPES
                    .contains(&metadata.mimetype().to_ascii_lowercase().as_str())
                    .then(|| source.clone()),
            })
            .filter(|block| !block.is_empty())
            .collect();

        let mut body = blocks.join("\n\n");
        body.push('\n');
        body
    }
}

/// Drops the first line of a rendered body; the tutorial title heading is
/// published separately as metadata.
pub fn strip_first_line(body: &str) -> &str {
    match body.split_once('\n') {
        Some((_, rest)) => rest,
        None => "",
    }
}

// nbformat stores sources either as one string or as a list of lines.
fn multiline<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Source {
        One(String),
        Lines(Vec<String>),
    }

    Ok(match Source::deserialize(deserializer)? {
        Source::One(s) => s,
        Source::Lines(lines) => lines.concat(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTEBOOK: &str = r##"{
  "cells": [
    {"cell_type": "markdown", "metadata": {}, "source": ["# Tutorial: First\n", "\n", "Intro text."]},
    {"cell_type": "code", "execution_count": 1, "metadata": {},
     "outputs": [{"output_type": "stream", "name": "stdout", "text": ["SECRET OUTPUT\n"]}],
     "source": ["import os\n", "print(os.name)"]},
    {"cell_type": "code", "execution_count": null, "metadata": {}, "outputs": [], "source": []},
    {"cell_type": "raw", "metadata": {"raw_mimetype": "text/x-python"}, "source": "not for markdown"},
    {"cell_type": "raw", "metadata": {}, "source": "kept raw"}
  ],
  "metadata": {"kernelspec": {"name": "python3", "language": "python"}},
  "nbformat": 4,
  "nbformat_minor": 5
}"##;

    #[test]
    fn renders_markdown_and_code_without_outputs() {
        let notebook = Notebook::from_json(NOTEBOOK).expect("valid notebook");
        let body = notebook.to_markdown();
        assert_eq!(
            body,
            "# Tutorial: First\n\nIntro text.\n\n```python\nimport os\nprint(os.name)\n```\n\n```python\n\n```\n\nkept raw\n"
        );
        assert!(!body.contains("SECRET OUTPUT"));
        assert!(!body.contains("not for markdown"));
    }

    #[test]
    fn keeps_trailing_whitespace_and_empty_code_cells() {
        let nb = Notebook::from_json(
            r#"{"cells": [
                {"cell_type": "markdown", "metadata": {}, "source": "Intro  \n"},
                {"cell_type": "code", "metadata": {}, "outputs": [], "source": "x = 1\n"},
                {"cell_type": "code", "metadata": {}, "outputs": [], "source": ""}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            nb.to_markdown(),
            "Intro  \n\n\n```python\nx = 1\n\n```\n\n```python\n\n```\n"
        );
    }

    #[test]
    fn language_falls_back_to_language_info_then_python() {
        let nb = Notebook::from_json(
            r#"{"cells": [], "metadata": {"language_info": {"name": "julia"}}}"#,
        )
        .unwrap();
        assert_eq!(nb.language(), "julia");

        let nb = Notebook::from_json(r#"{"cells": []}"#).unwrap();
        assert_eq!(nb.language(), "python");
    }

    #[test]
    fn unknown_cell_type_is_rejected() {
        let err = Notebook::from_json(r#"{"cells": [{"cell_type": "video", "source": ""}]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn strip_first_line_drops_heading() {
        assert_eq!(strip_first_line("# Title\n\nBody\n"), "\nBody\n");
        assert_eq!(strip_first_line("single line"), "");
    }
}
