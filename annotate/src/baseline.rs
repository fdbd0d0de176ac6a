//! Baseline of known findings, read from `.mypy/baseline.json`.
//!
//! Entries store line numbers as offsets from the previous entry in the same
//! file, and 0-indexed columns. Baselined findings are shown softened, and
//! only while the checker still reports them.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tycheck_types::{Diagnostic, Severity, SourceId, Span};

/// Baseline location relative to the workspace root.
pub const BASELINE_PATH: &str = ".mypy/baseline.json";

#[derive(Debug, Clone, Deserialize)]
struct BaselineEntry {
    offset: u32,
    column: u32,
    message: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Baseline {
    #[serde(default)]
    files: HashMap<String, Vec<BaselineEntry>>,
}

impl Baseline {
    #[must_use]
    pub fn path(root: &Path) -> PathBuf {
        root.join(BASELINE_PATH)
    }

    /// Load the workspace baseline. `Ok(None)` if there is none.
    pub fn load(root: &Path) -> anyhow::Result<Option<Self>> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading baseline {}", path.display()))?;
        let baseline = Self::parse(&content)
            .with_context(|| format!("parsing baseline {}", path.display()))?;
        tracing::debug!(path = %path.display(), files = baseline.files.len(), "Loaded baseline");
        Ok(Some(baseline))
    }

    pub fn parse(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Baselined findings for one file, as `Info` diagnostics with absolute
    /// 1-indexed positions.
    #[must_use]
    pub fn entries_for(&self, source: &SourceId) -> Vec<Diagnostic> {
        let Some(entries) = self.files.get(source.as_str()) else {
            return Vec::new();
        };
        let mut line = 0u32;
        entries
            .iter()
            .map(|entry| {
                line = line.saturating_add(entry.offset);
                Diagnostic::new(
                    Severity::Info,
                    entry.message.clone(),
                    entry.code.clone(),
                    Span::point(line, entry.column + 1),
                )
                .into_baseline()
            })
            .collect()
    }
}

/// What to show after matching a baseline against a fresh check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Baseline entries the checker still reports.
    pub baseline: Vec<Diagnostic>,
    /// Fresh findings not covered by a shown baseline entry.
    pub fresh: Vec<Diagnostic>,
}

/// Keep baseline entries that still match a fresh finding, and fresh
/// findings that match none of those.
#[must_use]
pub fn reconcile(baseline: Vec<Diagnostic>, fresh: Vec<Diagnostic>) -> Reconciled {
    let baseline: Vec<Diagnostic> = baseline
        .into_iter()
        .filter(|entry| fresh.iter().any(|item| item.similar(entry)))
        .collect();
    let fresh = fresh
        .into_iter()
        .filter(|item| !baseline.iter().any(|entry| item.similar(entry)))
        .collect();
    Reconciled { baseline, fresh }
}
