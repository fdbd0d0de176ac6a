//! Editor boundary: what the session needs to know about an open document.

use std::path::{Path, PathBuf};

/// Capabilities the host editor provides for an open document.
pub trait SourceDocument {
    /// Absolute path of the file backing the document.
    fn path(&self) -> &Path;

    /// Current in-memory text.
    fn text(&self) -> &str;

    /// Modification stamp. Changes whenever the text may have changed.
    fn version(&self) -> u64;

    /// Whether the in-memory text differs from what is on disk.
    fn has_unsaved_changes(&self) -> bool;
}

/// Half-open byte range `[start, end)` into a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// In-memory document, used by the CLI host and tests.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    text: String,
    version: u64,
    dirty: bool,
}

impl Document {
    /// A document whose text matches the file on disk.
    #[must_use]
    pub fn saved(path: impl Into<PathBuf>, text: impl Into<String>, version: u64) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            version,
            dirty: false,
        }
    }

    /// A document with edits not yet written to disk.
    #[must_use]
    pub fn unsaved(path: impl Into<PathBuf>, text: impl Into<String>, version: u64) -> Self {
        Self {
            dirty: true,
            ..Self::saved(path, text, version)
        }
    }

    /// Replace the text, bumping the version and marking the document dirty.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.version += 1;
        self.dirty = true;
    }

    /// Bump the version without changing the text (e.g. a formatting round trip).
    pub fn touch(&mut self) {
        self.version += 1;
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    #[must_use]
    pub fn line_index(&self) -> LineIndex<'_> {
        LineIndex::new(&self.text)
    }
}

impl SourceDocument for Document {
    fn path(&self) -> &Path {
        &self.path
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }
}

/// Offset <-> line/column conversion over a borrowed text.
///
/// Lines and columns handed to the checker are 1-indexed; columns count
/// characters, not bytes.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    /// Byte offset of the first character of each line.
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 0-indexed line containing `offset`. Offsets past the end map to the last line.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    /// Byte offset where the 0-indexed `line` starts.
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Byte offset just before the line terminator of the 0-indexed `line`.
    #[must_use]
    pub fn line_end(&self, line: usize) -> Option<usize> {
        let start = self.line_start(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map_or(self.text.len(), |next| next - 1);
        let end = if end > start && self.text.as_bytes()[end - 1] == b'\r' {
            end - 1
        } else {
            end
        };
        Some(end)
    }

    /// Text of the 0-indexed `line`, without its terminator.
    #[must_use]
    pub fn line_text(&self, line: usize) -> Option<&'a str> {
        let start = self.line_start(line)?;
        let end = self.line_end(line)?;
        self.text.get(start..end)
    }

    /// Characters between the start of the line and `offset` (0-indexed column).
    #[must_use]
    pub fn column(&self, offset: usize) -> usize {
        let offset = offset.min(self.text.len());
        let start = self.line_starts[self.line_of(offset)];
        self.text
            .get(start..offset)
            .map_or(offset - start, |s| s.chars().count())
    }

    /// 1-indexed `(line_start, col_start, line_end, col_end)` for a range.
    ///
    /// The end column is the number of characters before `range.end` on its
    /// line, i.e. inclusive of the last character of the range.
    #[must_use]
    pub fn span_of(&self, range: TextRange) -> (u32, u32, u32, u32) {
        (
            self.line_of(range.start) as u32 + 1,
            self.column(range.start) as u32 + 1,
            self.line_of(range.end) as u32 + 1,
            self.column(range.end) as u32,
        )
    }

    /// Byte offset of a 1-indexed line and column.
    #[must_use]
    pub fn offset(&self, line: u32, col: u32) -> Option<usize> {
        let line = (line as usize).checked_sub(1)?;
        let col = (col as usize).checked_sub(1)?;
        let start = self.line_start(line)?;
        let end = self.line_end(line)?;
        let line_text = self.text.get(start..end)?;
        if col == line_text.chars().count() {
            return Some(end);
        }
        line_text
            .char_indices()
            .nth(col)
            .map(|(i, _)| start + i)
    }
}
