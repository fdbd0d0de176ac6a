//! Errors surfaced by a checker session.
//!
//! None of these are meant for the user: hosts map any `Err` to "no result"
//! and keep editing. Duplicate inspections and empty answers are not errors
//! at all; they come back as `None`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tycheck_types::SuggestionError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// No interpreter configured; checking is unavailable.
    #[error("no interpreter configured for the type checker")]
    NoInterpreter,

    #[error("failed to start checker with {}: {source}", interpreter.display())]
    Spawn {
        interpreter: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The subprocess exited or its pipes broke mid-exchange.
    ///
    /// The next call restarts it; the current one is not retried.
    #[error("checker process unavailable: {0}")]
    ProcessUnavailable(String),

    #[error("scratch file I/O failed: {0}")]
    Scratch(#[from] io::Error),

    #[error("{} is outside the workspace", .0.display())]
    OutsideWorkspace(PathBuf),

    #[error("checker returned no suggestion output")]
    EmptySuggestResponse,

    #[error(transparent)]
    MalformedSuggestResponse(#[from] SuggestionError),
}

impl SessionError {
    /// Whether the process itself is gone and will be restarted on next use.
    #[must_use]
    pub fn is_process_failure(&self) -> bool {
        matches!(self, Self::ProcessUnavailable(_) | Self::Spawn { .. })
    }
}
