//! Editor-side helpers built on checker results.
//!
//! Nothing here talks to the checker. These functions turn diagnostics and
//! suggestions into things an editor shows or applies: highlight ranges,
//! baseline filtering, and text edits for the two quick fixes.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

pub mod baseline;
pub mod highlight;
pub mod signature;
pub mod suppress;

mod edit;
mod python;

pub use baseline::{Baseline, Reconciled, reconcile};
pub use edit::{TextEdit, apply_edits};
pub use highlight::highlight_range;
pub use signature::{FunctionShape, ParamShape, signature_edits};
pub use suppress::suppress_edit;
