//! Command-line interface for notebook-sync.
//!
//! Argument parsing and process-level concerns only; conversion, matrix
//! generation and the sync pipeline live in `notebook-sync-core`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use notebook_sync_core::convert::{ConvertOptions, Converter, OutputFormat};
use notebook_sync_core::matrix::{build_matrix, MatrixOptions};
use notebook_sync_core::metadata::GitCommitDates;
use notebook_sync_core::synchronise::{
    convert_batch, discover_notebooks, plan_conversions, synchronise, BatchOptions,
    FailurePolicy, DEFAULT_CONCURRENCY,
};
use std::path::PathBuf;

use crate::load_config::{load_config, UploadConfig};
use crate::upload::WorkspaceClient;

/// CLI for notebook-sync: publish tutorial notebooks.
#[derive(Parser)]
#[clap(
    name = "notebook-sync",
    version,
    about = "Convert tutorial notebooks, generate CI matrices and sync a hosted workspace"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert notebooks to Markdown with YAML front-matter
    Markdown {
        #[clap(flatten)]
        source: SourceArgs,
        /// Directory to write `{slug}.md` files into
        #[clap(long, default_value = "markdowns")]
        output: PathBuf,
    },
    /// Convert notebooks to plain text, optionally with metadata
    Text {
        #[clap(flatten)]
        source: SourceArgs,
        /// Directory to write `{slug}.txt` files into
        #[clap(long, default_value = "text")]
        output: PathBuf,
        /// Print each tutorial's metadata to stdout
        #[clap(long)]
        print_metadata: bool,
        /// Write each tutorial's metadata to a `{slug}.yml` sidecar
        #[clap(long)]
        write_metadata: bool,
    },
    /// Print the CI test matrix as JSON
    Matrix {
        /// Path to the TOML manifest
        #[clap(long, default_value = "index.toml")]
        index: PathBuf,
        /// Only include these notebooks
        #[clap(long, num_args = 1..)]
        notebooks: Vec<String>,
        /// Version to test unpinned tutorials against, e.g. v2.10.0
        #[clap(long)]
        haystack_version: String,
        /// Also test unpinned tutorials against main
        #[clap(long)]
        include_main: bool,
    },
    /// Delete every file in the workspace, then upload all text files
    Sync {
        /// Directory holding `{slug}.txt` files and their `{slug}.yml` metadata
        #[clap(long, default_value = "text")]
        text_dir: PathBuf,
        /// Maximum number of concurrent uploads
        #[clap(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
        #[clap(long, value_enum, default_value_t = Policy::Abort)]
        policy: Policy,
    },
}

#[derive(Args)]
pub struct SourceArgs {
    /// Path to the TOML manifest
    #[clap(long, default_value = "index.toml")]
    pub index: PathBuf,
    /// Notebook paths to convert, or `all`
    #[clap(long, num_args = 1..)]
    pub notebooks: Vec<String>,
    /// Directory scanned for numbered notebooks when `--notebooks all` is given
    #[clap(long, default_value = "tutorials")]
    pub tutorials_dir: PathBuf,
    #[clap(long, value_enum, default_value_t = Policy::Abort)]
    pub policy: Policy,
}

/// What to do when one unit of a batch fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    /// Stop at the first failure
    Abort,
    /// Keep going and report every failure
    CollectAll,
}

impl From<Policy> for FailurePolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Abort => FailurePolicy::AbortOnFirst,
            Policy::CollectAll => FailurePolicy::CollectAll,
        }
    }
}

impl SourceArgs {
    fn notebook_paths(&self) -> Result<Vec<PathBuf>> {
        if self.notebooks.len() == 1 && self.notebooks[0] == "all" {
            return discover_notebooks(&self.tutorials_dir).with_context(|| {
                format!("Failed to list notebooks in {:?}", self.tutorials_dir)
            });
        }
        Ok(self.notebooks.iter().map(PathBuf::from).collect())
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Markdown { source, output } => {
            convert(&source, output, OutputFormat::Markdown, false, false)
        }
        Commands::Text {
            source,
            output,
            print_metadata,
            write_metadata,
        } => convert(
            &source,
            output,
            OutputFormat::Text,
            print_metadata,
            write_metadata,
        ),
        Commands::Matrix {
            index,
            notebooks,
            haystack_version,
            include_main,
        } => {
            let manifest = load_config(index)?;
            let options = MatrixOptions {
                version: haystack_version,
                notebooks: (!notebooks.is_empty()).then_some(notebooks),
                include_main,
            };
            let matrix = build_matrix(&manifest, &options);
            println!("{}", serde_json::to_string(&matrix)?);
            Ok(())
        }
        Commands::Sync {
            text_dir,
            concurrency,
            policy,
        } => {
            let config = match UploadConfig::from_env() {
                Ok(config) => config,
                Err(e) => {
                    println!("{e}");
                    return Err(e.into());
                }
            };
            let client = WorkspaceClient::new(config);
            tracing::info!(command = "sync", workspace = client.workspace(), "Starting synchronisation process");

            let options = BatchOptions {
                concurrency,
                policy: policy.into(),
            };
            let report = synchronise(&client, &text_dir, &options).await?;
            tracing::info!(command = "sync", ?report, "Synchronisation complete");
            println!(
                "Synchronised workspace {}: {} uploaded, {} failed",
                client.workspace(),
                report.succeeded.len(),
                report.failed.len()
            );
            if !report.is_success() {
                bail!(
                    "{} of {} uploads failed",
                    report.failed.len(),
                    report.failed.len() + report.succeeded.len()
                );
            }
            Ok(())
        }
    }
}

fn convert(
    source: &SourceArgs,
    output_dir: PathBuf,
    format: OutputFormat,
    print_metadata: bool,
    write_metadata: bool,
) -> Result<()> {
    let manifest = load_config(&source.index)?;
    let notebooks = source.notebook_paths()?;
    let jobs = plan_conversions(&manifest, &notebooks);

    let converter = Converter::new(
        manifest.config.clone(),
        GitCommitDates::default(),
        ConvertOptions {
            output_dir,
            format,
            write_metadata,
        },
    );
    let batch = convert_batch(&converter, &jobs, source.policy.into())?;

    if print_metadata {
        for result in &batch.results {
            println!("{}", result.metadata.to_yaml()?);
        }
    }

    tracing::info!(report = ?batch.report, "Conversion complete");
    if !batch.report.is_success() {
        bail!(
            "{} of {} notebooks failed to convert",
            batch.report.failed.len(),
            jobs.len()
        );
    }
    Ok(())
}
