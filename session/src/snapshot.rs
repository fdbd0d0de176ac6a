//! Workspace snapshot cache: decides when the checker needs fresh input.
//!
//! Unsaved documents reach the checker through one workspace-wide scratch
//! file. Only one dirty document can be checked against live edits at a
//! time; switching documents rewrites the scratch file.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tycheck_types::SourceId;
use tycheck_utils::{ReplaceOptions, replace_file};

/// Scratch file location, relative to the workspace root.
pub const SCRATCH_PATH: &str = ".mypy_cache/__mypy_plugin_temp__.py";

/// Module name the checker gives the scratch file.
pub const SCRATCH_MODULE: &str = "__mypy_plugin_temp__";

#[derive(Debug)]
pub struct SnapshotCache {
    scratch_file: PathBuf,
    /// Last version stamp seen per source.
    stamps: HashMap<SourceId, u64>,
    /// Content of the last scratch write, workspace-wide.
    last_written: Option<String>,
}

impl SnapshotCache {
    #[must_use]
    pub fn new(workspace_root: &Path) -> Self {
        Self {
            scratch_file: workspace_root.join(SCRATCH_PATH),
            stamps: HashMap::new(),
            last_written: None,
        }
    }

    /// Rule for documents whose content must go through the scratch file.
    ///
    /// Skips when the stamp is unchanged. Otherwise writes the scratch file
    /// unless it already holds exactly `content`, then records the stamp.
    /// The content comparison is against the last write from *any* source:
    /// two dirty documents with identical text suppress each other's checks.
    ///
    /// A failed write records nothing, so the same stamp is tried again.
    pub fn should_write_and_check(
        &mut self,
        source: &SourceId,
        stamp: u64,
        content: &str,
    ) -> io::Result<bool> {
        if self.stamps.get(source) == Some(&stamp) {
            return Ok(false);
        }

        if self.scratch_holds(content) {
            tracing::debug!(source = %source, stamp, "Scratch already holds this content");
            self.stamps.insert(source.clone(), stamp);
            return Ok(false);
        }

        replace_file(
            &self.scratch_file,
            content.as_bytes(),
            ReplaceOptions::for_scratch(),
        )?;
        self.last_written = Some(content.to_string());
        self.stamps.insert(source.clone(), stamp);
        tracing::debug!(source = %source, stamp, bytes = content.len(), "Wrote scratch file");
        Ok(true)
    }

    /// Rule for saved documents: the checker reads the real file, so only the
    /// stamp matters. Nothing is written.
    pub fn should_check(&mut self, source: &SourceId, stamp: u64) -> bool {
        if self.stamps.get(source) == Some(&stamp) {
            return false;
        }
        self.stamps.insert(source.clone(), stamp);
        true
    }

    /// Whether the scratch file currently holds exactly `content`.
    #[must_use]
    pub fn scratch_holds(&self, content: &str) -> bool {
        self.last_written.as_deref() == Some(content)
    }

    #[must_use]
    pub fn scratch_file(&self) -> &Path {
        &self.scratch_file
    }

    /// Drop the stamp for `source` after the check it triggered never
    /// completed, so the same stamp counts as new again.
    pub fn forget(&mut self, source: &SourceId) {
        self.stamps.remove(source);
    }

    /// Forget everything; the next request for any source re-checks.
    pub fn clear(&mut self) {
        self.stamps.clear();
        self.last_written = None;
    }
}
