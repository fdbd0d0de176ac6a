//! Workspace-relative source identities and inspection locations.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Path of a source file relative to the workspace root, `/`-separated.
///
/// Cache key for everything the session remembers about a file. Renames are
/// not tracked: a renamed file is a new identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Identity of `path` within `root`, or `None` if it lies outside.
    ///
    /// Both paths are normalized lexically first, so `root/a/../b.py` is `b.py`.
    #[must_use]
    pub fn relative_to(root: &Path, path: &Path) -> Option<Self> {
        let root = normalize_path(root);
        let path = if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&root.join(path))
        };
        let relative = path.strip_prefix(&root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(Self(parts.join("/")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name without extension, used as the module name in messages.
    #[must_use]
    pub fn module_stem(&self) -> &str {
        let name = self.0.rsplit('/').next().unwrap_or(&self.0);
        match name.rfind('.') {
            Some(0) | None => name,
            Some(dot) => &name[..dot],
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self(value.replace('\\', "/"))
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = Vec::new();
    for c in path.components() {
        match c {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// A range within a file, as the checker addresses it:
/// `path:line_start:col_start:line_end:col_end` (all 1-indexed).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: String,
    pub line_start: u32,
    pub col_start: u32,
    pub line_end: u32,
    pub col_end: u32,
}

impl Location {
    #[must_use]
    pub fn new(path: impl Into<String>, span: (u32, u32, u32, u32)) -> Self {
        let (line_start, col_start, line_end, col_end) = span;
        Self {
            path: path.into(),
            line_start,
            col_start,
            line_end,
            col_end,
        }
    }

    /// Same range, addressed through a different file path.
    #[must_use]
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.path, self.line_start, self.col_start, self.line_end, self.col_end
        )
    }
}
