//! Core domain types for tycheck.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The session, annotation and CLI crates all speak in these types.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod diagnostic;
mod document;
mod source;
mod suggestion;

pub use diagnostic::{Diagnostic, Severity, Span};
pub use document::{Document, LineIndex, SourceDocument, TextRange};
pub use source::{Location, SourceId};
pub use suggestion::{Signature, Suggestion, SuggestionError};
