//! Text buffer — the authoritative sequence of lines.
//!
//! A `TextBuffer` wraps a [`ropey::Rope`] and keeps a parallel table of line
//! slots. Each slot carries a stable [`LineId`] that follows the line's
//! content through moves, plus the line's cached token sequence.
//!
//! # Change log
//!
//! Every mutation appends [`LineChange`] events describing what happened at
//! line granularity: which lines were edited, inserted or removed, and which
//! ranges of line indices shifted by how much. The buffer never re-lexes or
//! re-indexes on its own; the owner drains the log with
//! [`take_changes`](TextBuffer::take_changes) and brings its caches up to
//! date. Events are recorded in the order they must be applied.
//!
//! # Design choices
//!
//! - **Columns are char offsets.** Byte offsets never leak into the API.
//! - **Line endings are detected on load** from the first line break. Every
//!   break in the loaded text is rewritten to that style, and it is used for
//!   every break the buffer inserts afterwards. With one style throughout, no
//!   edit can fuse a `\r` and a `\n` into a single break behind the line
//!   table's back.
//! - **At least one line.** An empty buffer has one empty line; removing
//!   every line leaves one empty line behind.

use std::fmt;
use std::ops;

use mlog_syntax::Token;
use ropey::Rope;

use crate::error::{EditError, Result};
use crate::position::{Position, Range};

// ---------------------------------------------------------------------------
// Line ending detection
// ---------------------------------------------------------------------------

/// Line ending style of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEnding {
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// The style of the first line break in `text`. `Lf` when there is none.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let bytes = text.as_bytes();
        match bytes.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(i) if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') => Self::CrLf,
            Some(i) if bytes[i] == b'\r' => Self::Cr,
            _ => Self::Lf,
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lf => "LF",
            Self::CrLf => "CRLF",
            Self::Cr => "CR",
        })
    }
}

// ---------------------------------------------------------------------------
// Line identity and change events
// ---------------------------------------------------------------------------

/// Stable handle of a line. Survives moves and shifts; a line keeps its id
/// until it is removed. Ids are never reused within a buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(u64);

impl fmt::Debug for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L#{}", self.0)
    }
}

/// Line indices in `lines` (numbered before the mutation) moved by `delta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub lines: ops::Range<usize>,
    pub delta: isize,
}

impl Shift {
    /// Every line from `from` to the end of the buffer.
    #[must_use]
    pub const fn from(from: usize, delta: isize) -> Self {
        Self {
            lines: from..usize::MAX,
            delta,
        }
    }

    /// New index of `index` under this shift, if the shift covers it.
    #[inline]
    #[must_use]
    pub fn apply(&self, index: usize) -> Option<usize> {
        self.lines
            .contains(&index)
            .then(|| index.saturating_add_signed(self.delta))
    }
}

/// One line-granular change recorded by the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    /// The line's text changed in place.
    Edited(LineId),
    /// A new line now sits at index `at`.
    Inserted { id: LineId, at: usize },
    /// The line no longer exists.
    Removed(LineId),
    /// Lines were renumbered without their text changing. All shifts of one
    /// event are numbered against the same (pre-event) indices.
    Shifted(Vec<Shift>),
}

#[derive(Debug, Clone)]
struct LineSlot {
    id: LineId,
    /// `None` until the owner lexes the line, and again after each edit.
    tokens: Option<Vec<Token>>,
}

// ---------------------------------------------------------------------------
// TextBuffer
// ---------------------------------------------------------------------------

/// Rope-backed line buffer with stable line handles and a change log.
pub struct TextBuffer {
    rope: Rope,
    slots: Vec<LineSlot>,
    line_ending: LineEnding,
    next_id: u64,
    changes: Vec<LineChange>,
    modified: bool,
}

impl TextBuffer {
    // -- Construction -------------------------------------------------------

    /// An empty buffer (one empty line).
    #[must_use]
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// Create a buffer from a text blob. Every line is logged as inserted.
    /// Mixed line endings are unified to the first one found.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let line_ending = LineEnding::detect(text);
        let rope = Rope::from_str(&split_lines(text).join(line_ending.as_str()));
        let mut buf = Self {
            line_ending,
            slots: Vec::with_capacity(rope.len_lines()),
            rope,
            next_id: 0,
            changes: Vec::new(),
            modified: false,
        };
        for at in 0..buf.rope.len_lines() {
            let id = buf.fresh_id();
            buf.slots.push(LineSlot { id, tokens: None });
            buf.changes.push(LineChange::Inserted { id, at });
        }
        buf
    }

    /// Create a buffer from an ordered sequence of lines.
    #[must_use]
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = lines
            .into_iter()
            .map(|l| l.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_text(&text)
    }

    // -- Text access --------------------------------------------------------

    /// Number of lines; never zero.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.slots.len()
    }

    /// Text of a line without its line ending.
    #[must_use]
    pub fn line(&self, line: usize) -> Option<String> {
        (line < self.line_count()).then(|| {
            let start = self.rope.line_to_char(line);
            self.rope
                .slice(start..start + self.content_len(line))
                .to_string()
        })
    }

    /// Length in chars of a line, excluding its line ending.
    #[must_use]
    pub fn line_len(&self, line: usize) -> Option<usize> {
        (line < self.line_count()).then(|| self.content_len(line))
    }

    /// All lines, without line endings.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        (0..self.line_count())
            .filter_map(|i| self.line(i))
            .collect()
    }

    /// The whole text, with the buffer's line endings.
    #[must_use]
    pub fn contents(&self) -> String {
        self.rope.to_string()
    }

    #[inline]
    #[must_use]
    pub const fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// True if the text changed since creation or the last
    /// [`mark_saved`](Self::mark_saved).
    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    #[inline]
    pub const fn mark_saved(&mut self) {
        self.modified = false;
    }

    // -- Line handles and token cache ---------------------------------------

    /// Stable handle of the line currently at `line`.
    #[must_use]
    pub fn line_id(&self, line: usize) -> Option<LineId> {
        self.slots.get(line).map(|s| s.id)
    }

    /// Current index of a line handle. Linear in the buffer size; hot paths
    /// keep their own position table instead.
    #[must_use]
    pub fn index_of(&self, id: LineId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    /// Cached tokens of a line, if it has been lexed since its last edit.
    #[must_use]
    pub fn tokens(&self, line: usize) -> Option<&[Token]> {
        self.slots.get(line)?.tokens.as_deref()
    }

    /// Store the tokens of a line. Ignored for an out-of-range line.
    pub fn set_tokens(&mut self, line: usize, tokens: Vec<Token>) {
        if let Some(slot) = self.slots.get_mut(line) {
            slot.tokens = Some(tokens);
        }
    }

    // -- Change log ---------------------------------------------------------

    /// Drain the change log.
    pub fn take_changes(&mut self) -> Vec<LineChange> {
        std::mem::take(&mut self.changes)
    }

    /// Changes recorded since the last drain.
    #[must_use]
    pub fn pending_changes(&self) -> &[LineChange] {
        &self.changes
    }

    // -- Validation ---------------------------------------------------------

    /// Fail with [`EditError::OutOfRange`] unless `line` exists.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `line >= line_count()`.
    pub fn check_line(&self, line: usize) -> Result<()> {
        if line < self.slots.len() {
            Ok(())
        } else {
            Err(EditError::OutOfRange {
                line,
                line_count: self.slots.len(),
            })
        }
    }

    /// Fail unless `pos` names a line and a column at most the line's length.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for a bad line, `ColumnOutOfRange` for a bad column.
    pub fn check_position(&self, pos: Position) -> Result<()> {
        self.check_line(pos.line)?;
        let len = self.content_len(pos.line);
        if pos.col > len {
            return Err(EditError::ColumnOutOfRange {
                line: pos.line,
                col: pos.col,
                len,
            });
        }
        Ok(())
    }

    // -- Character-level editing --------------------------------------------

    /// Insert text at a position. Line breaks in `text` (any style) become
    /// the buffer's line ending and create new lines below `pos.line`.
    /// Returns the position just past the inserted text.
    ///
    /// # Errors
    ///
    /// Fails if `pos` is not a valid position.
    pub fn insert_text(&mut self, pos: Position, text: &str) -> Result<Position> {
        self.check_position(pos)?;
        if text.is_empty() {
            return Ok(pos);
        }

        let pieces = split_lines(text);
        let added = pieces.len() - 1;
        let normalized = pieces.join(self.line_ending.as_str());
        let idx = self.rope.line_to_char(pos.line) + pos.col;
        self.rope.insert(idx, &normalized);

        self.touch(pos.line);
        self.open_slots(pos.line + 1, added);
        self.modified = true;

        let end = if added == 0 {
            Position::new(pos.line, pos.col + text.chars().count())
        } else {
            Position::new(pos.line + added, pieces[added].chars().count())
        };
        Ok(end)
    }

    /// Delete the text in a range, joining its first and last lines. Returns
    /// the removed text.
    ///
    /// # Errors
    ///
    /// Fails if either end is not a valid position.
    pub fn delete_range(&mut self, range: Range) -> Result<String> {
        self.check_position(range.start)?;
        self.check_position(range.end)?;
        if range.is_empty() {
            return Ok(String::new());
        }

        let start = self.rope.line_to_char(range.start.line) + range.start.col;
        let end = self.rope.line_to_char(range.end.line) + range.end.col;
        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);

        self.close_slots(range.start.line + 1..range.end.line + 1);
        self.touch(range.start.line);
        self.modified = true;
        Ok(removed)
    }

    /// Replace the text in a range. Returns the end of the new text.
    ///
    /// # Errors
    ///
    /// Fails if either end of `range` is not a valid position.
    pub fn replace_range(&mut self, range: Range, text: &str) -> Result<Position> {
        self.check_position(range.end)?;
        self.delete_range(range)?;
        self.insert_text(range.start, text)
    }

    // -- Line-level editing -------------------------------------------------

    /// Replace the whole text of one line.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `line` does not exist.
    pub fn set_line(&mut self, line: usize, text: &str) -> Result<()> {
        self.check_line(line)?;
        if text.contains(['\n', '\r']) {
            let len = self.content_len(line);
            self.replace_range(Range::on_line(line, 0, len), text)?;
            return Ok(());
        }

        let start = self.rope.line_to_char(line);
        let len = self.content_len(line);
        self.rope.remove(start..start + len);
        self.rope.insert(start, text);
        self.touch(line);
        self.modified = true;
        Ok(())
    }

    /// Insert whole lines so the first of them lands at index `at`.
    /// `at == line_count()` appends.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `at > line_count()`.
    pub fn insert_lines<S: AsRef<str>>(&mut self, at: usize, lines: &[S]) -> Result<()> {
        let count = self.line_count();
        if at > count {
            return Err(EditError::OutOfRange {
                line: at,
                line_count: count,
            });
        }
        let pieces: Vec<&str> = lines
            .iter()
            .flat_map(|l| split_lines(l.as_ref()))
            .collect();
        if pieces.is_empty() {
            return Ok(());
        }

        let eol = self.line_ending.as_str();
        let body = pieces.join(eol);
        if at < count {
            let idx = self.rope.line_to_char(at);
            self.rope.insert(idx, &format!("{body}{eol}"));
        } else {
            let idx = self.rope.len_chars();
            self.rope.insert(idx, &format!("{eol}{body}"));
        }

        self.open_slots(at, pieces.len());
        self.modified = true;
        tracing::trace!(target: "mlog::buffer", at, count = pieces.len(), "insert_lines");
        Ok(())
    }

    /// Remove whole lines. Returns their text. Removing every line leaves a
    /// single empty line.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when the range is empty or reaches past the last line.
    pub fn remove_lines(&mut self, lines: ops::Range<usize>) -> Result<Vec<String>> {
        let count = self.line_count();
        if lines.start >= lines.end || lines.end > count {
            return Err(EditError::OutOfRange {
                line: lines.end.max(lines.start),
                line_count: count,
            });
        }
        let removed: Vec<String> = lines.clone().filter_map(|i| self.line(i)).collect();

        if lines.start == 0 && lines.end == count {
            self.rope = Rope::new();
            for slot in self.slots.drain(..) {
                self.changes.push(LineChange::Removed(slot.id));
            }
            self.open_slots(0, 1);
        } else {
            let chars = if lines.end < count {
                self.rope.line_to_char(lines.start)..self.rope.line_to_char(lines.end)
            } else {
                // Tail removal also takes the line break before the first
                // removed line.
                let prev = lines.start - 1;
                self.rope.line_to_char(prev) + self.content_len(prev)..self.rope.len_chars()
            };
            self.rope.remove(chars);
            self.close_slots(lines.clone());
        }

        self.modified = true;
        tracing::trace!(target: "mlog::buffer", start = lines.start, end = lines.end, "remove_lines");
        Ok(removed)
    }

    /// Rotate the lines of `region` so that the line at `mid` becomes the
    /// first. Moving a block up by one is `rotate(s - 1..e, s)`; down by one
    /// is `rotate(s..e + 1, e)`. Line handles and token caches travel with
    /// their text; nothing is logged as edited.
    ///
    /// # Errors
    ///
    /// `OutOfRange` unless `region.start < mid < region.end <= line_count()`.
    pub fn rotate(&mut self, region: ops::Range<usize>, mid: usize) -> Result<()> {
        let count = self.line_count();
        if region.end > count {
            return Err(EditError::OutOfRange {
                line: region.end - 1,
                line_count: count,
            });
        }
        if !(region.start < mid && mid < region.end) {
            return Err(EditError::OutOfRange {
                line: mid,
                line_count: count,
            });
        }

        let mut texts: Vec<String> = region.clone().filter_map(|i| self.line(i)).collect();
        texts.rotate_left(mid - region.start);
        let last = region.end - 1;
        let start = self.rope.line_to_char(region.start);
        let end = self.rope.line_to_char(last) + self.content_len(last);
        self.rope.remove(start..end);
        self.rope.insert(start, &texts.join(self.line_ending.as_str()));

        self.slots[region.clone()].rotate_left(mid - region.start);
        self.changes.push(LineChange::Shifted(vec![
            Shift {
                lines: mid..region.end,
                delta: -to_delta(mid - region.start),
            },
            Shift {
                lines: region.start..mid,
                delta: to_delta(region.end - mid),
            },
        ]));
        self.modified = true;
        Ok(())
    }

    // -- Internals ----------------------------------------------------------

    const fn fresh_id(&mut self) -> LineId {
        let id = LineId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Content length of an existing line, excluding `\n`, `\r\n` or `\r`.
    fn content_len(&self, line: usize) -> usize {
        let slice = self.rope.line(line);
        let total = slice.len_chars();
        match total {
            0 => 0,
            _ => match slice.char(total - 1) {
                '\n' if total >= 2 && slice.char(total - 2) == '\r' => total - 2,
                '\n' | '\r' => total - 1,
                _ => total,
            },
        }
    }

    /// Invalidate a line's tokens and log it as edited.
    fn touch(&mut self, line: usize) {
        let slot = &mut self.slots[line];
        slot.tokens = None;
        self.changes.push(LineChange::Edited(slot.id));
    }

    /// Create `n` slots starting at index `at`, shifting later slots down.
    fn open_slots(&mut self, at: usize, n: usize) {
        if n == 0 {
            return;
        }
        if at < self.slots.len() {
            self.changes
                .push(LineChange::Shifted(vec![Shift::from(at, to_delta(n))]));
        }
        for k in 0..n {
            let id = self.fresh_id();
            self.slots.insert(at + k, LineSlot { id, tokens: None });
            self.changes.push(LineChange::Inserted { id, at: at + k });
        }
    }

    /// Drop the slots of `lines`, shifting later slots up.
    fn close_slots(&mut self, lines: ops::Range<usize>) {
        if lines.is_empty() {
            return;
        }
        let n = lines.len();
        let end = lines.end;
        for slot in self.slots.drain(lines) {
            self.changes.push(LineChange::Removed(slot.id));
        }
        if end < self.slots.len() + n {
            self.changes
                .push(LineChange::Shifted(vec![Shift::from(end, -to_delta(n))]));
        }
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBuffer")
            .field("lines", &self.line_count())
            .field("chars", &self.rope.len_chars())
            .field("line_ending", &self.line_ending)
            .field("modified", &self.modified)
            .field("pending_changes", &self.changes.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Split on `\r\n`, `\r` and `\n`. Always yields at least one piece.
pub(crate) fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                pieces.push(&text[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                pieces.push(&text[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    pieces.push(&text[start..]);
    pieces
}

/// Line counts always fit in `isize`: a buffer cannot hold more lines than
/// addressable bytes.
#[allow(clippy::cast_possible_wrap)]
pub(crate) const fn to_delta(n: usize) -> isize {
    n as isize
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buf(lines: &[&str]) -> TextBuffer {
        let mut b = TextBuffer::from_lines(lines);
        b.take_changes();
        b
    }

    // -- Line endings -------------------------------------------------------

    #[test]
    fn line_ending_detect() {
        assert_eq!(LineEnding::detect("a\nb"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\r\nb"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a\rb"), LineEnding::Cr);
        assert_eq!(LineEnding::detect("none"), LineEnding::Lf);
        assert_eq!(LineEnding::CrLf.to_string(), "CRLF");
    }

    #[test]
    fn mixed_endings_are_unified_on_load() {
        let b = TextBuffer::from_text("a\rb\nc\r\nd");
        assert_eq!(b.line_ending(), LineEnding::Cr);
        assert_eq!(b.contents(), "a\rb\rc\rd");
        assert_eq!(b.lines(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn emptying_a_line_between_mixed_endings_keeps_lines() {
        let mut b = TextBuffer::from_text("a\rb\nc");
        b.take_changes();
        b.delete_range(Range::on_line(1, 0, 1)).unwrap();
        assert_eq!(b.line_count(), 3);
        assert_eq!(b.lines(), vec!["a", "", "c"]);

        b.set_line(1, "x").unwrap();
        b.set_line(1, "").unwrap();
        assert_eq!(b.lines(), vec!["a", "", "c"]);
        assert_eq!(b.line_len(2), Some(1));
    }

    #[test]
    fn split_lines_all_styles() {
        assert_eq!(split_lines("a\nb\r\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines(""), vec![""]);
        assert_eq!(split_lines("x\n"), vec!["x", ""]);
    }

    // -- Construction -------------------------------------------------------

    #[test]
    fn empty_buffer_has_one_line() {
        let b = TextBuffer::new();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line(0).as_deref(), Some(""));
        assert!(!b.is_modified());
    }

    #[test]
    fn from_lines_roundtrip() {
        let b = buf(&["jump 2 always", "print \"hi\"", "end"]);
        assert_eq!(b.line_count(), 3);
        assert_eq!(b.lines(), vec!["jump 2 always", "print \"hi\"", "end"]);
        assert_eq!(b.line_len(1), Some(10));
        assert_eq!(b.line(3), None);
    }

    #[test]
    fn construction_logs_every_line_as_inserted() {
        let mut b = TextBuffer::from_text("a\nb");
        let changes = b.take_changes();
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[1], LineChange::Inserted { at: 1, .. }));
        assert!(b.pending_changes().is_empty());
    }

    #[test]
    fn crlf_lines_strip_endings() {
        let b = TextBuffer::from_text("set a 1\r\nend\r\n");
        assert_eq!(b.line_ending(), LineEnding::CrLf);
        assert_eq!(b.lines(), vec!["set a 1", "end", ""]);
    }

    #[test]
    fn unicode_separators_do_not_split_lines() {
        let b = TextBuffer::from_text("print \"a\u{2028}b\"\nend");
        assert_eq!(b.line_count(), 2);
    }

    // -- insert_text / delete_range -----------------------------------------

    #[test]
    fn insert_within_line() {
        let mut b = buf(&["set  1"]);
        let end = b.insert_text(Position::new(0, 4), "x").unwrap();
        assert_eq!(end, Position::new(0, 5));
        assert_eq!(b.lines(), vec!["set x 1"]);
        let id = b.line_id(0).unwrap();
        assert_eq!(b.take_changes(), vec![LineChange::Edited(id)]);
        assert!(b.is_modified());
        b.mark_saved();
        assert!(!b.is_modified());
    }

    #[test]
    fn insert_with_newline_splits_line() {
        let mut b = buf(&["ab", "z"]);
        let first = b.line_id(0).unwrap();
        let end = b.insert_text(Position::new(0, 1), "1\n2\n3").unwrap();
        assert_eq!(end, Position::new(2, 1));
        assert_eq!(b.lines(), vec!["a1", "2", "3b", "z"]);
        assert_eq!(b.line_id(0), Some(first));

        let changes = b.take_changes();
        assert_eq!(changes[0], LineChange::Edited(first));
        assert_eq!(changes[1], LineChange::Shifted(vec![Shift::from(1, 2)]));
        assert!(matches!(changes[2], LineChange::Inserted { at: 1, .. }));
        assert!(matches!(changes[3], LineChange::Inserted { at: 2, .. }));
    }

    #[test]
    fn insert_normalizes_to_buffer_ending() {
        let mut b = TextBuffer::from_text("a\r\nb");
        b.insert_text(Position::new(0, 1), "x\ny").unwrap();
        assert_eq!(b.contents(), "ax\r\ny\r\nb");
    }

    #[test]
    fn insert_out_of_range() {
        let mut b = buf(&["abc"]);
        assert!(matches!(
            b.insert_text(Position::new(1, 0), "x"),
            Err(EditError::OutOfRange { line: 1, line_count: 1 })
        ));
        assert!(matches!(
            b.insert_text(Position::new(0, 4), "x"),
            Err(EditError::ColumnOutOfRange { col: 4, len: 3, .. })
        ));
    }

    #[test]
    fn delete_across_lines_joins() {
        let mut b = buf(&["one", "two", "three", "four"]);
        let removed_id = b.line_id(1).unwrap();
        let removed = b
            .delete_range(Range::new(Position::new(0, 2), Position::new(2, 1)))
            .unwrap();
        assert_eq!(removed, "e\ntwo\nt");
        assert_eq!(b.lines(), vec!["onhree", "four"]);

        let changes = b.take_changes();
        assert!(changes.contains(&LineChange::Removed(removed_id)));
        assert!(changes.contains(&LineChange::Shifted(vec![Shift::from(3, -2)])));
    }

    #[test]
    fn replace_range_in_line() {
        let mut b = buf(&["jump 0 always"]);
        let end = b.replace_range(Range::on_line(0, 5, 6), "top").unwrap();
        assert_eq!(end, Position::new(0, 8));
        assert_eq!(b.lines(), vec!["jump top always"]);
    }

    // -- Line-level editing -------------------------------------------------

    #[test]
    fn set_line_replaces_text() {
        let mut b = buf(&["a", "b"]);
        b.set_line(1, "end").unwrap();
        assert_eq!(b.lines(), vec!["a", "end"]);
        assert!(b.set_line(2, "x").is_err());
    }

    #[test]
    fn set_line_with_newline_adds_lines() {
        let mut b = buf(&["a", "b"]);
        b.set_line(0, "x\ny").unwrap();
        assert_eq!(b.lines(), vec!["x", "y", "b"]);
    }

    #[test]
    fn insert_lines_middle_and_end() {
        let mut b = buf(&["a", "c"]);
        b.insert_lines(1, &["b"]).unwrap();
        b.insert_lines(3, &["d", "e"]).unwrap();
        assert_eq!(b.lines(), vec!["a", "b", "c", "d", "e"]);
        assert!(b.insert_lines(9, &["z"]).is_err());
    }

    #[test]
    fn insert_lines_logs_shift_then_inserts() {
        let mut b = buf(&["a", "b"]);
        b.insert_lines(0, &["x"]).unwrap();
        let changes = b.take_changes();
        assert_eq!(changes[0], LineChange::Shifted(vec![Shift::from(0, 1)]));
        assert!(matches!(changes[1], LineChange::Inserted { at: 0, .. }));
    }

    #[test]
    fn remove_middle_lines() {
        let mut b = buf(&["a", "b", "c", "d"]);
        let removed = b.remove_lines(1..3).unwrap();
        assert_eq!(removed, vec!["b", "c"]);
        assert_eq!(b.lines(), vec!["a", "d"]);
    }

    #[test]
    fn remove_tail_lines() {
        let mut b = buf(&["a", "b", "c"]);
        b.remove_lines(1..3).unwrap();
        assert_eq!(b.lines(), vec!["a"]);
        assert_eq!(b.contents(), "a");
    }

    #[test]
    fn remove_all_lines_leaves_one_empty() {
        let mut b = buf(&["a", "b"]);
        let old = b.line_id(0).unwrap();
        b.remove_lines(0..2).unwrap();
        assert_eq!(b.lines(), vec![""]);
        assert_ne!(b.line_id(0), Some(old));
        let changes = b.take_changes();
        assert_eq!(changes[0], LineChange::Removed(old));
        assert!(matches!(changes.last(), Some(LineChange::Inserted { at: 0, .. })));
    }

    #[test]
    fn remove_lines_rejects_bad_ranges() {
        let mut b = buf(&["a"]);
        assert!(b.remove_lines(0..2).is_err());
        assert!(b.remove_lines(0..0).is_err());
    }

    // -- rotate -------------------------------------------------------------

    #[test]
    fn rotate_moves_block_up() {
        let mut b = buf(&["a", "b", "c", "d"]);
        let ids: Vec<_> = (0..4).map(|i| b.line_id(i).unwrap()).collect();
        b.rotate(0..3, 1).unwrap();
        assert_eq!(b.lines(), vec!["b", "c", "a", "d"]);
        assert_eq!(b.line_id(0), Some(ids[1]));
        assert_eq!(b.line_id(2), Some(ids[0]));
        assert_eq!(
            b.take_changes(),
            vec![LineChange::Shifted(vec![
                Shift { lines: 1..3, delta: -1 },
                Shift { lines: 0..1, delta: 2 },
            ])]
        );
    }

    #[test]
    fn rotate_keeps_tokens() {
        let mut b = buf(&["a", "b"]);
        b.set_tokens(0, Vec::new());
        b.rotate(0..2, 1).unwrap();
        assert!(b.tokens(1).is_some());
        assert!(b.tokens(0).is_none());
    }

    #[test]
    fn rotate_rejects_degenerate_mid() {
        let mut b = buf(&["a", "b"]);
        assert!(b.rotate(0..2, 0).is_err());
        assert!(b.rotate(0..3, 1).is_err());
    }

    // -- Handles ------------------------------------------------------------

    #[test]
    fn index_of_follows_moves() {
        let mut b = buf(&["a", "b", "c"]);
        let c = b.line_id(2).unwrap();
        b.remove_lines(0..1).unwrap();
        assert_eq!(b.index_of(c), Some(1));
    }

    #[test]
    fn shift_apply() {
        let s = Shift::from(3, -2);
        assert_eq!(s.apply(2), None);
        assert_eq!(s.apply(3), Some(1));
        assert_eq!(s.apply(100), Some(98));
    }
}
