//! "Suppress error" quick fix: add the code to a `# type: ignore[...]` comment.

use std::sync::LazyLock;

use regex::Regex;
use tycheck_types::LineIndex;

use crate::edit::TextEdit;
use crate::python;

static IGNORE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s*type\s*:\s*ignore").expect("valid ignore comment regex"));

/// Edit that silences `code` on the 1-indexed `line` of `text`.
///
/// - an existing `# type: ignore[a]` gains `, code` before its last `]`;
/// - a bare `# type: ignore` gains `[code]`;
/// - any other trailing comment gets `# type: ignore[code]  ` in front of it;
/// - otherwise `  # type: ignore[code]` is appended to the line.
///
/// `None` if the line does not exist.
#[must_use]
pub fn suppress_edit(text: &str, line: u32, code: &str) -> Option<TextEdit> {
    let index = LineIndex::new(text);
    let line = (line as usize).checked_sub(1)?;
    let line_start = index.line_start(line)?;
    let line_text = index.line_text(line)?;

    let Some(comment_at) = python::comment_start(line_text) else {
        return Some(TextEdit::insert(
            line_start + line_text.len(),
            format!("  # type: ignore[{code}]"),
        ));
    };
    let comment = &line_text[comment_at..];
    let comment_offset = line_start + comment_at;

    if !IGNORE_COMMENT.is_match(comment) {
        return Some(TextEdit::insert(
            comment_offset,
            format!("# type: ignore[{code}]  "),
        ));
    }
    if let Some(close) = comment.rfind(']') {
        return Some(TextEdit::insert(comment_offset + close, format!(", {code}")));
    }
    let ignore_end = comment.find("ignore")? + "ignore".len();
    Some(TextEdit::insert(comment_offset + ignore_end, format!("[{code}]")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::apply_edits;

    fn fixed(text: &str, line: u32, code: &str) -> String {
        let edit = suppress_edit(text, line, code).unwrap();
        apply_edits(text, &[edit])
    }

    #[test]
    fn test_no_comment_appends() {
        assert_eq!(
            fixed("a = 1\nx: int = ''\n", 2, "assignment"),
            "a = 1\nx: int = ''  # type: ignore[assignment]\n"
        );
    }

    #[test]
    fn test_existing_ignore_with_codes() {
        assert_eq!(
            fixed("f(x)  # type: ignore[arg-type]\n", 1, "call-arg"),
            "f(x)  # type: ignore[arg-type, call-arg]\n"
        );
    }

    #[test]
    fn test_bare_ignore() {
        assert_eq!(
            fixed("f(x)  #type:ignore\n", 1, "misc"),
            "f(x)  #type:ignore[misc]\n"
        );
    }

    #[test]
    fn test_other_comment_is_kept() {
        assert_eq!(
            fixed("f(x)  # noqa: E501\n", 1, "misc"),
            "f(x)  # type: ignore[misc]  # noqa: E501\n"
        );
    }

    #[test]
    fn test_hash_in_string_is_not_a_comment() {
        assert_eq!(
            fixed("s: int = '#'\n", 1, "assignment"),
            "s: int = '#'  # type: ignore[assignment]\n"
        );
    }

    #[test]
    fn test_crlf_and_missing_line() {
        assert_eq!(
            fixed("x = 1\r\n", 1, "misc"),
            "x = 1  # type: ignore[misc]\r\n"
        );
        assert!(suppress_edit("x = 1\n", 5, "misc").is_none());
        assert!(suppress_edit("x = 1\n", 0, "misc").is_none());
    }
}
