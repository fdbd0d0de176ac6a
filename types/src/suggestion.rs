//! Inferred function signatures returned by the checker's `suggest` command.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

/// `{"signature": {"arg_types": [...], "return_type": "..."}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub arg_types: Vec<String>,
    pub return_type: String,
}

#[derive(Debug, Error)]
#[error("malformed suggestion: {source}")]
pub struct SuggestionError {
    #[from]
    source: JsonError,
}

impl Suggestion {
    /// Parse one line of `suggest --json` output.
    ///
    /// The checker wraps the object in a one-element array; both shapes are
    /// accepted. The first element wins if the array has several.
    pub fn parse(line: &str) -> Result<Self, SuggestionError> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            let mut all: Vec<Self> = serde_json::from_str(trimmed)?;
            if all.is_empty() {
                return Err(SuggestionError {
                    source: JsonError::custom("empty suggestion list"),
                });
            }
            return Ok(all.swap_remove(0));
        }
        Ok(serde_json::from_str(trimmed)?)
    }

    /// Return annotation text, or `None` when the function returns `None`.
    #[must_use]
    pub fn return_annotation(&self) -> Option<&str> {
        match self.signature.return_type.as_str() {
            "None" => None,
            other => Some(other),
        }
    }
}
