//! Document model - the authoritative content and editing state of one file

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ropey::Rope;

use super::validate::{validate, ValidationReport};
use super::{DocumentId, Mode, Position, Selection};

/// The in-memory model of one open document.
///
/// Only the document registry and the mode tracker mutate this type; the
/// surface registry reads snapshots. Content changes flow through
/// [`Document::update_content`] so the dirty flag can never drift from the
/// content it describes.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    path: PathBuf,
    content: Rope,
    mode: Mode,
    is_dirty: bool,
    cursor: Position,
    scroll_offset: usize,
    selections: Vec<Selection>,
    last_modified: DateTime<Utc>,
}

/// A deep, independent snapshot of a document.
///
/// Safe to hand across a message channel: mutating the snapshot can never
/// affect the model it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentState {
    pub id: DocumentId,
    pub content: String,
    pub mode: Mode,
    pub is_dirty: bool,
    pub cursor: Position,
    pub scroll_offset: usize,
    pub selections: Vec<Selection>,
    pub last_modified: DateTime<Utc>,
}

impl Document {
    /// Create a document from content read off disk (or empty for a new file).
    pub fn new(id: DocumentId, path: PathBuf, content: &str, mode: Mode) -> Self {
        Self {
            id,
            path,
            content: Rope::from_str(content),
            mode,
            is_dirty: false,
            cursor: Position::default(),
            scroll_offset: 0,
            selections: Vec::new(),
            last_modified: Utc::now(),
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filename for user-facing messages, falling back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    pub fn content(&self) -> &Rope {
        &self.content
    }

    pub fn content_string(&self) -> String {
        self.content.to_string()
    }

    /// Replace the whole content.
    ///
    /// Marks the document dirty and bumps `last_modified` only when the new
    /// value actually differs; an identical write is a no-op and returns
    /// `false`.
    pub fn update_content(&mut self, text: &str) -> bool {
        if self.content == text {
            return false;
        }
        self.content = Rope::from_str(text);
        self.is_dirty = true;
        self.last_modified = Utc::now();
        true
    }

    /// Replace content from a successful disk read or write, leaving the
    /// document clean.
    pub(crate) fn replace_from_disk(&mut self, text: &str) {
        if self.content != text {
            self.content = Rope::from_str(text);
            self.last_modified = Utc::now();
        }
        self.is_dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, cursor: Position) {
        self.cursor = cursor;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub(crate) fn set_scroll_offset(&mut self, offset: usize) {
        self.scroll_offset = offset;
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub(crate) fn set_selections(&mut self, selections: Vec<Selection>) {
        self.selections = selections;
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Number of lines in the document
    pub fn line_count(&self) -> usize {
        self.content.len_lines()
    }

    /// Get a line as a string, without inspecting out-of-range indices
    pub fn line(&self, line_idx: usize) -> Option<String> {
        if line_idx < self.content.len_lines() {
            Some(self.content.line(line_idx).to_string())
        } else {
            None
        }
    }

    /// Convert a (line, column) position to a char offset.
    /// Uses ropey's O(log n) line_to_char method instead of O(n) iteration.
    pub fn position_to_offset(&self, pos: Position) -> usize {
        if pos.line >= self.content.len_lines() {
            return self.content.len_chars();
        }
        let line_start = self.content.line_to_char(pos.line);
        let line_len = self.line_length(pos.line);
        line_start + pos.column.min(line_len)
    }

    /// Convert a char offset to a (line, column) position.
    /// Uses ropey's O(log n) char_to_line method instead of O(n) iteration.
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let clamped = offset.min(self.content.len_chars());
        let line = self.content.char_to_line(clamped);
        let line_start = self.content.line_to_char(line);
        Position::new(line, clamped - line_start)
    }

    /// Length of a line excluding its trailing newline
    pub fn line_length(&self, line_idx: usize) -> usize {
        if line_idx >= self.content.len_lines() {
            return 0;
        }
        let line = self.content.line(line_idx);
        let len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    /// Take a deep, independent snapshot of the document
    pub fn state(&self) -> DocumentState {
        DocumentState {
            id: self.id.clone(),
            content: self.content.to_string(),
            mode: self.mode,
            is_dirty: self.is_dirty,
            cursor: self.cursor,
            scroll_offset: self.scroll_offset,
            selections: self.selections.clone(),
            last_modified: self.last_modified,
        }
    }

    /// Lightweight structural validation of the content.
    ///
    /// Positions in the report are 1-based.
    pub fn validate(&self) -> ValidationReport {
        validate(&self.content_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> Document {
        let path = PathBuf::from("/tmp/facet-doc-test.md");
        Document::new(DocumentId::from_path(&path), path, content, Mode::Edit)
    }

    // ========================================================================
    // Creation and identity
    // ========================================================================

    #[test]
    fn test_new_document_is_clean() {
        let d = doc("# Hi");
        assert!(!d.is_dirty());
        assert_eq!(d.content_string(), "# Hi");
    }

    #[test]
    fn test_new_document_default_view_state() {
        let d = doc("");
        assert_eq!(d.cursor(), Position::default());
        assert_eq!(d.scroll_offset(), 0);
        assert!(d.selections().is_empty());
    }

    #[test]
    fn test_display_name_is_filename() {
        let d = doc("");
        assert_eq!(d.display_name(), "facet-doc-test.md");
    }

    // ========================================================================
    // update_content
    // ========================================================================

    #[test]
    fn test_update_content_marks_dirty() {
        let mut d = doc("a");
        assert!(d.update_content("b"));
        assert!(d.is_dirty());
        assert_eq!(d.content_string(), "b");
    }

    #[test]
    fn test_update_content_identical_is_noop() {
        let mut d = doc("a");
        assert!(!d.update_content("a"));
        assert!(!d.is_dirty());
    }

    #[test]
    fn test_update_content_idempotent_second_write() {
        let mut d = doc("a");
        assert!(d.update_content("b"));
        d.mark_clean();
        // Same value again: dirty flag must not change, content must stay.
        assert!(!d.update_content("b"));
        assert!(!d.is_dirty());
        assert_eq!(d.content_string(), "b");
    }

    #[test]
    fn test_update_content_bumps_last_modified() {
        let mut d = doc("a");
        let before = d.last_modified();
        d.update_content("b");
        assert!(d.last_modified() >= before);
    }

    #[test]
    fn test_replace_from_disk_is_clean() {
        let mut d = doc("a");
        d.update_content("local edit");
        d.replace_from_disk("disk content");
        assert!(!d.is_dirty());
        assert_eq!(d.content_string(), "disk content");
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    #[test]
    fn test_state_is_deep_copy() {
        let mut d = doc("original");
        let mut snapshot = d.state();
        snapshot.content.push_str(" mutated");
        snapshot.cursor = Position::new(9, 9);
        assert_eq!(d.content_string(), "original");
        assert_eq!(d.cursor(), Position::default());
        // and the other way around
        d.update_content("changed");
        assert_eq!(snapshot.content, "original mutated");
    }

    #[test]
    fn test_state_carries_view_state() {
        let mut d = doc("x");
        d.set_cursor(Position::new(3, 7));
        d.set_scroll_offset(42);
        d.set_selections(vec![Selection::new(
            Position::new(0, 0),
            Position::new(0, 1),
        )]);
        let s = d.state();
        assert_eq!(s.cursor, Position::new(3, 7));
        assert_eq!(s.scroll_offset, 42);
        assert_eq!(s.selections.len(), 1);
    }

    // ========================================================================
    // Line and offset helpers
    // ========================================================================

    #[test]
    fn test_line_count() {
        assert_eq!(doc("").line_count(), 1);
        assert_eq!(doc("a\nb\nc").line_count(), 3);
    }

    #[test]
    fn test_line_length_excludes_newline() {
        let d = doc("hello\nworld\n");
        assert_eq!(d.line_length(0), 5);
        assert_eq!(d.line_length(1), 5);
    }

    #[test]
    fn test_line_out_of_bounds() {
        assert!(doc("one line").line(5).is_none());
    }

    #[test]
    fn test_offset_position_round_trip() {
        let d = doc("first\nsecond\nthird");
        for offset in 0..d.content().len_chars() {
            let pos = d.offset_to_position(offset);
            assert_eq!(d.position_to_offset(pos), offset);
        }
    }

    #[test]
    fn test_position_to_offset_clamps() {
        let d = doc("ab\ncd");
        assert_eq!(d.position_to_offset(Position::new(99, 0)), 5);
        assert_eq!(d.position_to_offset(Position::new(0, 99)), 2);
    }
}
