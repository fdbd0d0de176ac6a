//! Atomic file replacement.
//!
//! Content goes to a sibling temp file which is then renamed over the target,
//! so readers see either the old bytes or the new ones. Where the platform
//! refuses to rename onto an existing file, the target is parked as `.bak`
//! for the duration of the swap and put back if the swap fails.

use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::path::Path;

use tempfile::{NamedTempFile, PersistError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModePolicy {
    /// Let the new file inherit the default umask.
    #[default]
    Default,
    /// Keep the permissions of the file being replaced, if it exists.
    PreserveExisting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileSyncPolicy {
    /// `fsync` the temp file before renaming it into place.
    SyncAll,
    /// Skip the sync. Fine for throwaway artifacts like the scratch file.
    #[default]
    SkipSync,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceOptions {
    pub file_sync: FileSyncPolicy,
    pub mode: ModePolicy,
    /// Create missing parent directories before writing.
    pub create_parents: bool,
}

impl ReplaceOptions {
    /// Options for editing a user's source file in place.
    #[must_use]
    pub fn for_source_edit() -> Self {
        Self {
            file_sync: FileSyncPolicy::SyncAll,
            mode: ModePolicy::PreserveExisting,
            create_parents: false,
        }
    }

    /// Options for the checker's scratch file.
    #[must_use]
    pub fn for_scratch() -> Self {
        Self {
            file_sync: FileSyncPolicy::SkipSync,
            mode: ModePolicy::Default,
            create_parents: true,
        }
    }
}

/// Replace `path` with `bytes` atomically.
pub fn replace_file(path: impl AsRef<Path>, bytes: &[u8], options: ReplaceOptions) -> io::Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    if options.create_parents && !parent.exists() {
        debug!(path = %parent.display(), "Creating parent directory");
        fs::create_dir_all(parent)?;
    }

    let existing_permissions = match options.mode {
        ModePolicy::PreserveExisting => fs::metadata(path).ok().map(|m| m.permissions()),
        ModePolicy::Default => None,
    };

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(bytes)?;
    if options.file_sync == FileSyncPolicy::SyncAll {
        staged.as_file().sync_all()?;
    }

    match staged.persist(path) {
        Ok(_) => {}
        Err(refused) if path.exists() => swap_via_backup(refused, path)?,
        Err(refused) => return Err(refused.error),
    }

    if let Some(permissions) = existing_permissions {
        apply_permissions(path, permissions)?;
    }
    Ok(())
}

/// Second attempt after a refused rename: move the target aside, retry, and
/// restore the original if the retry also fails.
fn swap_via_backup(refused: PersistError, path: &Path) -> io::Result<()> {
    let parked = path.with_extension("bak");
    if parked.exists() {
        fs::remove_file(&parked)?;
    }
    fs::rename(path, &parked)?;

    match refused.file.persist(path) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(&parked) {
                tracing::warn!(path = %parked.display(), "Could not remove backup: {e}");
            }
            Ok(())
        }
        Err(retry) => {
            if let Err(e) = fs::rename(&parked, path) {
                tracing::warn!(path = %path.display(), "Could not restore original: {e}");
            }
            Err(retry.error)
        }
    }
}

fn apply_permissions(path: &Path, permissions: Permissions) -> io::Result<()> {
    fs::set_permissions(path, permissions)
}
