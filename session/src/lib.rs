//! Client for a long-lived type checker subprocess.
//!
//! A [`Session`] owns one checker process per workspace and answers three
//! kinds of request over its line protocol: full checks, hover-style type
//! inspections, and signature suggestions. Unsaved editor content reaches
//! the checker through a single scratch file in the workspace.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

pub mod codec;
pub mod diagnostics;
pub mod protocol;

pub(crate) mod pending;
pub(crate) mod snapshot;

mod coordinator;
mod error;
mod process;
mod registry;

pub use coordinator::{CheckReport, Session};
pub use diagnostics::{DiagnosticParser, ParseError};
pub use error::SessionError;
pub use pending::{PendingGuard, PendingRequests};
pub use process::{BOOTSTRAP_SCRIPT, ProcessManager, ProcessSpawner, SessionHandle, Spawner};
pub use protocol::Command;
pub use registry::SessionRegistry;
pub use snapshot::{SCRATCH_MODULE, SCRATCH_PATH, SnapshotCache};
