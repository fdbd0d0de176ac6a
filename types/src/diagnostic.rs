//! Diagnostic records produced by the checker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    /// Known finding recorded in a baseline; shown softened.
    Info,
}

impl Severity {
    /// Map a checker severity token.
    ///
    /// `note` is demoted to a warning rather than dropped. Returns `None` for
    /// tokens the checker is not known to emit; callers decide the policy.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "error" => Some(Self::Error),
            "warning" | "note" => Some(Self::Warning),
            "baseline" => Some(Self::Info),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// 1-indexed source span as reported by the checker.
///
/// An end of `0:0` means the checker did not report an end position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line_start: u32,
    pub col_start: u32,
    pub line_end: u32,
    pub col_end: u32,
}

impl Span {
    #[must_use]
    pub fn new(line_start: u32, col_start: u32, line_end: u32, col_end: u32) -> Self {
        Self {
            line_start,
            col_start,
            line_end,
            col_end,
        }
    }

    /// A span with only a start position.
    #[must_use]
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, 0, 0)
    }

    #[must_use]
    pub fn has_end(&self) -> bool {
        self.line_end != 0
    }

    #[must_use]
    pub fn is_single_line(&self) -> bool {
        self.line_start == self.line_end
    }
}

/// A single finding, either fresh from the checker or loaded from a baseline.
///
/// Fields are private; external consumers read via accessors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    code: Option<String>,
    span: Span,
    #[serde(default)]
    baseline: bool,
}

impl Diagnostic {
    #[must_use]
    pub fn new(severity: Severity, message: String, code: Option<String>, span: Span) -> Self {
        Self {
            severity,
            message,
            code,
            span,
            baseline: false,
        }
    }

    /// Mark this diagnostic as coming from a baseline.
    #[must_use]
    pub fn into_baseline(mut self) -> Self {
        self.baseline = true;
        self
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }

    #[must_use]
    pub fn is_baseline(&self) -> bool {
        self.baseline
    }

    /// Same start position, message and code.
    ///
    /// Used to reconcile fresh diagnostics against a baseline, where end
    /// positions and severities are not recorded.
    #[must_use]
    pub fn similar(&self, other: &Self) -> bool {
        self.span.line_start == other.span.line_start
            && self.span.col_start == other.span.col_start
            && self.message == other.message
            && self.code == other.code
    }

    /// Message as shown to the user: baseline marker and code included.
    #[must_use]
    pub fn full_message(&self) -> String {
        let mut out = String::new();
        if self.baseline {
            out.push_str("baselined: ");
        }
        out.push_str(&self.message);
        if let Some(code) = &self.code {
            out.push_str(&format!(" [{code}]"));
        }
        out
    }

    /// Format as `path:line:col: severity: message [code]`.
    #[must_use]
    pub fn display_with_path(&self, path: &str) -> String {
        format!(
            "{path}:{}:{}: {}: {}",
            self.span.line_start,
            self.span.col_start,
            self.severity.label(),
            self.full_message(),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.span.line_start,
            self.span.col_start,
            self.severity.label(),
            self.full_message()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(line: u32, col: u32, msg: &str, code: Option<&str>) -> Diagnostic {
        Diagnostic::new(
            Severity::Error,
            msg.to_string(),
            code.map(String::from),
            Span::new(line, col, line, col + 4),
        )
    }

    #[test]
    fn test_severity_tokens() {
        assert_eq!(Severity::from_token("error"), Some(Severity::Error));
        assert_eq!(Severity::from_token("warning"), Some(Severity::Warning));
        assert_eq!(Severity::from_token("note"), Some(Severity::Warning));
        assert_eq!(Severity::from_token("baseline"), Some(Severity::Info));
        assert_eq!(Severity::from_token("fatal"), None);
        assert_eq!(Severity::from_token("Error"), None);
    }

    #[test]
    fn test_similar_ignores_end_and_severity() {
        let a = diag(3, 1, "Incompatible types", Some("assignment"));
        let b = Diagnostic::new(
            Severity::Info,
            "Incompatible types".to_string(),
            Some("assignment".to_string()),
            Span::point(3, 1),
        )
        .into_baseline();
        assert!(a.similar(&b));
        assert!(b.similar(&a));
    }

    #[test]
    fn test_similar_requires_same_code() {
        let a = diag(3, 1, "Incompatible types", Some("assignment"));
        let b = diag(3, 1, "Incompatible types", None);
        assert!(!a.similar(&b));
    }

    #[test]
    fn test_similar_requires_same_start() {
        let a = diag(3, 1, "m", None);
        assert!(!a.similar(&diag(4, 1, "m", None)));
        assert!(!a.similar(&diag(3, 2, "m", None)));
    }

    #[test]
    fn test_full_message() {
        assert_eq!(
            diag(1, 1, "Name undefined", Some("name-defined")).full_message(),
            "Name undefined [name-defined]"
        );
        assert_eq!(diag(1, 1, "plain", None).full_message(), "plain");
        assert_eq!(
            diag(1, 1, "old", Some("misc")).into_baseline().full_message(),
            "baselined: old [misc]"
        );
    }

    #[test]
    fn test_display_with_path() {
        let d = diag(3, 1, "Incompatible types", Some("assignment"));
        assert_eq!(
            d.display_with_path("foo.py"),
            "foo.py:3:1: error: Incompatible types [assignment]"
        );
    }

    #[test]
    fn test_span_helpers() {
        let point = Span::point(2, 5);
        assert!(!point.has_end());
        let span = Span::new(2, 5, 2, 9);
        assert!(span.has_end());
        assert!(span.is_single_line());
        assert!(!Span::new(2, 5, 4, 1).is_single_line());
    }
}
