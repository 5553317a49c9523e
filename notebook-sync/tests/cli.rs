use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

const MANIFEST: &str = r#"
[config]
layout = "tutorial"
toc = true
colab = "https://colab.research.google.com/github/org/tutorials/blob/main/tutorials/"

[[tutorial]]
title = "First Tutorial"
description = "Start here"
level = "beginner"
weight = 10
notebook = "01_First.ipynb"
completion_time = "10 min"
created_at = 2023-01-05

[[tutorial]]
title = "GPU Tutorial"
description = "Needs a GPU"
weight = 20
notebook = "02_Gpu.ipynb"
needs_gpu = true
"#;

const NOTEBOOK: &str = r##"{
  "cells": [
    {"cell_type": "markdown", "metadata": {}, "source": ["# First Tutorial\n", "Intro paragraph."]},
    {"cell_type": "code", "metadata": {}, "execution_count": null, "outputs": [], "source": ["print('hello')"]}
  ],
  "metadata": {"kernelspec": {"language": "python"}},
  "nbformat": 4,
  "nbformat_minor": 5
}"##;

/// A project directory with a manifest and one notebook under `tutorials/`.
fn project() -> TempDir {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("index.toml"), MANIFEST).unwrap();
    fs::create_dir(dir.path().join("tutorials")).unwrap();
    fs::write(dir.path().join("tutorials/01_First.ipynb"), NOTEBOOK).unwrap();
    dir
}

fn bin(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("notebook-sync").expect("Binary exists");
    cmd.current_dir(dir)
        .env_remove("DEEPSET_CLOUD_API_KEY")
        .env_remove("DEEPSET_CLOUD_WORKSPACE")
        .env_remove("DEEPSET_CLOUD_API_URL");
    cmd
}

#[test]
fn matrix_prints_json_array_without_gpu_tutorials() {
    let dir = project();
    let output = bin(dir.path())
        .args(["matrix", "--haystack-version", "v2.10.0"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let matrix: serde_json::Value = serde_json::from_slice(&output).expect("stdout is JSON");
    assert_eq!(
        matrix,
        serde_json::json!([
            {"notebook": "01_First", "haystack_version": "v2.10.0", "dependencies": []}
        ])
    );
}

#[test]
fn markdown_writes_front_matter_and_body() {
    let dir = project();
    bin(dir.path())
        .args(["markdown", "--notebooks", "tutorials/01_First.ipynb"])
        .assert()
        .success();

    let written = fs::read_to_string(dir.path().join("markdowns/01_First.md")).unwrap();
    assert!(written.starts_with("---\n"), "{written}");
    assert!(written.contains("title: First Tutorial"), "{written}");
    assert!(written.contains("last_updated:"), "{written}");
    assert!(!written.contains("download:"), "{written}");
    assert!(written.contains("# First Tutorial"), "{written}");
    assert!(written.contains("```python\nprint('hello')\n```"), "{written}");
}

#[test]
fn text_all_discovers_notebooks_and_writes_metadata() {
    let dir = project();
    bin(dir.path())
        .args([
            "text",
            "--notebooks",
            "all",
            "--write-metadata",
            "--print-metadata",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("title: First Tutorial"));

    let text = fs::read_to_string(dir.path().join("text/01_First.txt")).unwrap();
    assert!(!text.contains("# First Tutorial"), "first line is dropped: {text}");
    assert!(text.contains("Intro paragraph."));

    let meta = fs::read_to_string(dir.path().join("text/01_First.yml")).unwrap();
    assert!(meta.contains("completion_time: 10 min"), "{meta}");
}

#[test]
fn markdown_fails_on_missing_manifest() {
    let dir = tempdir().unwrap();
    bin(dir.path())
        .args(["markdown", "--notebooks", "01_First.ipynb"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to load manifest"));
}

#[test]
fn text_collect_all_converts_valid_notebooks_then_fails() {
    let dir = project();
    let manifest = format!(
        "{MANIFEST}\n[[tutorial]]\ndescription = \"No title\"\nnotebook = \"03_Untitled.ipynb\"\n"
    );
    fs::write(dir.path().join("index.toml"), manifest).unwrap();
    fs::write(dir.path().join("tutorials/03_Untitled.ipynb"), NOTEBOOK).unwrap();

    bin(dir.path())
        .args(["text", "--notebooks", "all", "--policy", "collect-all"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("1 of 2 notebooks failed to convert"));

    assert!(dir.path().join("text/01_First.txt").exists());
    assert!(!dir.path().join("text/03_Untitled.txt").exists());
}

#[test]
fn text_abort_stops_at_first_failure() {
    let dir = project();
    let manifest = format!(
        "{MANIFEST}\n[[tutorial]]\ndescription = \"No title\"\nnotebook = \"00_Untitled.ipynb\"\n"
    );
    fs::write(dir.path().join("index.toml"), manifest).unwrap();
    fs::write(dir.path().join("tutorials/00_Untitled.ipynb"), NOTEBOOK).unwrap();

    bin(dir.path())
        .args(["text", "--notebooks", "all"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing required field 'title'"));

    assert!(!dir.path().join("text/01_First.txt").exists());
}

#[tokio::test]
async fn sync_without_workspace_exits_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    bin(dir.path())
        .arg("sync")
        .env("DEEPSET_CLOUD_API_KEY", "key")
        .env("DEEPSET_CLOUD_API_URL", server.uri())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("DEEPSET_CLOUD_WORKSPACE env var not set"));
}

#[tokio::test]
async fn sync_without_api_key_exits_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    bin(dir.path())
        .arg("sync")
        .env("DEEPSET_CLOUD_WORKSPACE", "tutorials")
        .env("DEEPSET_CLOUD_API_URL", server.uri())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("DEEPSET_CLOUD_API_KEY env var not set"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use notebook_sync::cli::{run, Cli, Commands};

    // The manifest does not exist, so the command fails after the first event.
    let cli = Cli {
        command: Commands::Matrix {
            index: std::path::PathBuf::from("does-not-exist.toml"),
            notebooks: Vec::new(),
            haystack_version: "v2.10.0".into(),
            include_main: false,
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
