//! CI test matrix generation: one entry per tutorial/version pair to run.

use serde::Serialize;
use tracing::info;

use crate::filter::ItemFilter;
use crate::manifest::{notebook_stem, Manifest};

#[derive(Debug, Clone)]
pub struct MatrixOptions {
    /// Version every unpinned tutorial is tested against.
    pub version: String,
    /// Restrict the matrix to these notebooks.
    pub notebooks: Option<Vec<String>>,
    /// Also test unpinned tutorials against `main`.
    pub include_main: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixEntry {
    pub notebook: String,
    pub haystack_version: String,
    pub dependencies: Vec<String>,
}

pub fn build_matrix(manifest: &Manifest, options: &MatrixOptions) -> Vec<MatrixEntry> {
    let filter = ItemFilter::for_matrix(&options.version, options.notebooks.clone());
    let mut matrix = Vec::new();

    for item in filter.select(manifest) {
        let stem = notebook_stem(&item.notebook).to_string();
        let version = item
            .haystack_version
            .as_deref()
            .unwrap_or(&options.version);

        matrix.push(MatrixEntry {
            notebook: stem.clone(),
            haystack_version: with_v_prefix(version),
            dependencies: item.dependencies.clone(),
        });

        if options.include_main && item.haystack_version.is_none() {
            matrix.push(MatrixEntry {
                notebook: stem,
                haystack_version: "main".to_string(),
                dependencies: item.dependencies.clone(),
            });
        }
    }

    info!(entries = matrix.len(), version = %options.version, "Built test matrix");
    matrix
}

fn with_v_prefix(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{version}")
    }
}
