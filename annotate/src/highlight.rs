//! Where in the text a diagnostic should be drawn.

use tycheck_types::{Diagnostic, LineIndex, TextRange};

use crate::python;

/// Byte range to highlight for `diagnostic` in `text`.
///
/// Single-line spans cover exactly the reported columns. Anything else runs
/// from the start column to the end of the line, stopping before a trailing
/// comment. `None` when the position no longer exists in `text`, which
/// happens when the document changed after the check.
#[must_use]
pub fn highlight_range(text: &str, diagnostic: &Diagnostic) -> Option<TextRange> {
    let index = LineIndex::new(text);
    let span = diagnostic.span();
    let start = index.offset(span.line_start, span.col_start)?;

    let end = if span.is_single_line() {
        index.offset(span.line_start, span.col_end.saturating_add(1))?
    } else {
        let line = (span.line_start as usize).checked_sub(1)?;
        let line_start = index.line_start(line)?;
        let line_text = index.line_text(line)?;
        match python::comment_start(line_text) {
            Some(comment) if line_start + comment > start => {
                line_start + line_text[..comment].trim_end().len()
            }
            _ => line_start + line_text.len(),
        }
    };

    (end >= start).then(|| TextRange::new(start, end))
}
