//! Text edits produced by the quick fixes, and applying them to a buffer.

use tycheck_types::TextRange;

/// Replace `range` with `text`. An empty range is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: TextRange,
    pub text: String,
}

impl TextEdit {
    #[must_use]
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            range: TextRange::new(offset, offset),
            text: text.into(),
        }
    }

    #[must_use]
    pub fn replace(range: TextRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

/// Apply non-overlapping edits, back to front so earlier offsets stay valid.
///
/// Edits whose range falls outside `text` or off a char boundary are skipped
/// with a warning.
#[must_use]
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| {
        b.range
            .start
            .cmp(&a.range.start)
            .then(b.range.end.cmp(&a.range.end))
    });

    let mut out = text.to_string();
    for edit in ordered {
        let TextRange { start, end } = edit.range;
        if start > end || end > out.len() || !out.is_char_boundary(start) || !out.is_char_boundary(end) {
            tracing::warn!(start, end, "Skipping edit outside the text");
            continue;
        }
        out.replace_range(start..end, &edit.text);
    }
    out
}
