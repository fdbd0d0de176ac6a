//! Parser for the checker's textual diagnostic output.
//!
//! One line per finding:
//! `path:line:col[:end_line:end_col]: severity: message[  [code]]`

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tycheck_types::{Diagnostic, Severity, SourceId, Span};

static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?):(\d+):(\d+):(?:(\d+):(\d+):)? (\w+): (\S.*?)(?: {2}\[([\w-]+)\])?$")
        .expect("valid diagnostic line regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown severity `{0}`")]
    UnknownSeverity(String),
}

/// Turns output lines for one file into [`Diagnostic`]s.
///
/// Lines for other files (library stubs, other modules) are ignored.
#[derive(Debug, Clone)]
pub struct DiagnosticParser {
    /// `"<path>:"`, the prefix every relevant line starts with.
    prefix: String,
    /// Scratch module stem and the real module stem that replaces it in messages.
    rename: Option<(String, String)>,
}

impl DiagnosticParser {
    /// Parser for diagnostics reported against the source's real path.
    #[must_use]
    pub fn for_source(source: &SourceId) -> Self {
        Self {
            prefix: format!("{source}:"),
            rename: None,
        }
    }

    /// Parser for diagnostics reported against the scratch file standing in for `source`.
    ///
    /// Scratch naming must never leak into messages, so the scratch module stem
    /// is rewritten to the real module stem.
    #[must_use]
    pub fn for_scratch(scratch_path: &str, scratch_stem: &str, source: &SourceId) -> Self {
        Self {
            prefix: format!("{scratch_path}:"),
            rename: Some((scratch_stem.to_string(), source.module_stem().to_string())),
        }
    }

    /// Parse one output line.
    ///
    /// `Ok(None)` for lines about other files or lines that don't look like
    /// diagnostics at all.
    pub fn parse_line(&self, line: &str) -> Result<Option<Diagnostic>, ParseError> {
        if !line.starts_with(&self.prefix) {
            return Ok(None);
        }
        let Some(caps) = LINE_PATTERN.captures(line) else {
            return Ok(None);
        };

        let number = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(0)
        };
        let token = &caps[6];
        let severity =
            Severity::from_token(token).ok_or_else(|| ParseError::UnknownSeverity(token.to_string()))?;

        let mut message = caps[7].to_string();
        if let Some((scratch, module)) = &self.rename {
            message = message.replace(scratch.as_str(), module);
        }

        let diagnostic = Diagnostic::new(
            severity,
            message,
            caps.get(8).map(|m| m.as_str().to_string()),
            Span::new(number(2), number(3), number(4), number(5)),
        );
        Ok(Some(if token == "baseline" {
            diagnostic.into_baseline()
        } else {
            diagnostic
        }))
    }

    /// Parse a whole output block.
    ///
    /// Bad lines are logged and skipped; the rest of the block is unaffected.
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn parse_output<S: AsRef<str>>(&self, lines: &[S]) -> Vec<Diagnostic> {
        let mut out: Vec<Diagnostic> = Vec::new();
        for line in lines {
            let line = line.as_ref();
            match self.parse_line(line) {
                Ok(Some(diagnostic)) => {
                    if !out.contains(&diagnostic) {
                        out.push(diagnostic);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(line, "Dropping checker output line: {e}");
                }
            }
        }
        out
    }
}
