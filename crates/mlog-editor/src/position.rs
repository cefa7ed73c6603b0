//! Text positions, ranges and selections.
//!
//! All coordinates are **0-indexed**. Columns count Unicode scalar values
//! (chars), matching the rope and the lexer's token spans. Hosts that show
//! 1-indexed coordinates convert at their boundary; `Display` does it for
//! messages.

use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A (line, column) pair. Ordered line first, then column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub const ZERO: Self = Self { line: 0, col: 0 };

    #[inline]
    #[must_use]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    /// The same column on a line `delta` lines away. Saturates at line 0.
    #[inline]
    #[must_use]
    pub const fn shifted(self, delta: isize) -> Self {
        Self {
            line: self.line.saturating_add_signed(delta),
            col: self.col,
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({}:{})", self.line, self.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// A half-open range `[start, end)`, normalized so that `start <= end`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Create a range. Panics in debug if `start > end`.
    #[inline]
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start <= end, "Range::new requires start <= end");
        Self { start, end }
    }

    /// Build a range from two positions in either order.
    #[inline]
    #[must_use]
    pub fn ordered(a: Position, b: Position) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// A zero-width range at `pos`.
    #[inline]
    #[must_use]
    pub const fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// A range on one line covering columns `[start, end)`.
    #[inline]
    #[must_use]
    pub const fn on_line(line: usize, start: usize, end: usize) -> Self {
        Self {
            start: Position::new(line, start),
            end: Position::new(line, end),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start.line == self.end.line && self.start.col == self.end.col
    }

    #[inline]
    #[must_use]
    pub fn contains(self, pos: Position) -> bool {
        pos >= self.start && pos < self.end
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Range({:?} .. {:?})", self.start, self.end)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// A selection supplied by the host: where it started (`anchor`) and where
/// the cursor is now (`active`). A caret is a selection with both equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Selection {
    pub anchor: Position,
    pub active: Position,
}

impl Selection {
    #[inline]
    #[must_use]
    pub const fn new(anchor: Position, active: Position) -> Self {
        Self { anchor, active }
    }

    /// A collapsed selection at `pos`.
    #[inline]
    #[must_use]
    pub const fn caret(pos: Position) -> Self {
        Self {
            anchor: pos,
            active: pos,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_caret(self) -> bool {
        self.anchor == self.active
    }

    /// The selected text range, start before end.
    #[inline]
    #[must_use]
    pub fn range(self) -> Range {
        Range::ordered(self.anchor, self.active)
    }

    /// The inclusive block of whole lines the selection touches.
    ///
    /// A non-empty selection ending at column 0 of a later line does not
    /// include that line: selecting lines 1–2 "by line" leaves the cursor at
    /// the start of line 3.
    #[must_use]
    pub fn line_block(self) -> (usize, usize) {
        let Range { start, end } = self.range();
        if end.line > start.line && end.col == 0 {
            (start.line, end.line - 1)
        } else {
            (start.line, end.line)
        }
    }

    /// Both ends moved `delta` lines, columns kept.
    #[inline]
    #[must_use]
    pub const fn shifted(self, delta: isize) -> Self {
        Self {
            anchor: self.anchor.shifted(delta),
            active: self.active.shifted(delta),
        }
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sel({:?} -> {:?})", self.anchor, self.active)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
