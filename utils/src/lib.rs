//! Shared infrastructure utilities for tycheck.
//!
//! - **`atomic_write`**: replace a file's contents via temp file + rename, so
//!   the checker never observes a half-written scratch file and user sources
//!   are never truncated by a failed quick-fix write.

pub mod atomic_write;

pub use atomic_write::{FileSyncPolicy, ModePolicy, ReplaceOptions, replace_file};
