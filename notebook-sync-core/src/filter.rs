//! Declarative selection of manifest items.

use tracing::debug;

use crate::manifest::{file_name, Item, Manifest};

/// Which predicates to apply. An item is selected only when every active
/// predicate passes; the order of items in the manifest is preserved.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Drop items marked `hidden`.
    pub skip_hidden: bool,
    /// Drop items that need a GPU.
    pub skip_gpu: bool,
    /// Drop items with `colab = false`, which have no runnable code.
    pub require_runnable: bool,
    /// Target version, e.g. `v2.10.0`. Items declaring a `major_version` must
    /// match its major number. `main` or unparsable targets match everything.
    pub version_track: Option<String>,
    /// Explicit notebook list; when set, only these notebooks are selected.
    pub include: Option<Vec<String>>,
}

impl ItemFilter {
    /// Filter used for CI matrices: every predicate active.
    pub fn for_matrix(version: &str, include: Option<Vec<String>>) -> Self {
        Self {
            skip_hidden: true,
            skip_gpu: true,
            require_runnable: true,
            version_track: Some(version.to_string()),
            include,
        }
    }

    pub fn accepts(&self, item: &Item) -> bool {
        if self.skip_hidden && item.hidden {
            debug!(notebook = %item.notebook, "Skipping hidden tutorial");
            return false;
        }
        if self.skip_gpu && item.needs_gpu {
            debug!(notebook = %item.notebook, "Skipping tutorial that needs a GPU");
            return false;
        }
        if self.require_runnable && !item.is_runnable() {
            debug!(notebook = %item.notebook, "Skipping tutorial without runnable code");
            return false;
        }
        if let (Some(family), Some(target)) = (
            item.major_version,
            self.version_track.as_deref().and_then(major_of),
        ) {
            if family != target {
                debug!(notebook = %item.notebook, family, target, "Skipping tutorial from another version family");
                return false;
            }
        }
        if let Some(include) = &self.include {
            if !include.iter().any(|n| file_name(n) == item.notebook) {
                return false;
            }
        }
        true
    }

    pub fn select<'m>(&self, manifest: &'m Manifest) -> Vec<&'m Item> {
        manifest.items.iter().filter(|item| self.accepts(item)).collect()
    }
}

/// Major number of a version string such as `v2.10.0` or `1.26`.
pub fn major_of(version: &str) -> Option<u64> {
    version
        .trim_start_matches('v')
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
}
