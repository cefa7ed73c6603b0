//! Error types of the editing core.
//!
//! Almost nothing here fails: partial or malformed text is tokenized best
//! effort, a search without a hit returns `None`. What remains are caller
//! contract violations (addressing a line or column that does not exist)
//! and an invalid user-supplied regular expression.

use thiserror::Error;

/// Errors returned by buffer, line, search and completion operations.
#[derive(Debug, Error)]
pub enum EditError {
    /// A line index outside `0..line_count`.
    #[error("line {line} is out of range (buffer has {line_count} lines)")]
    OutOfRange { line: usize, line_count: usize },

    /// A column past the end of an existing line.
    #[error("column {col} is out of range on line {line} ({len} chars)")]
    ColumnOutOfRange { line: usize, col: usize, len: usize },

    /// The search pattern is not a valid regular expression.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl EditError {
    /// True for the two range violations, which indicate a host bug rather
    /// than bad user input.
    #[must_use]
    pub const fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::ColumnOutOfRange { .. })
    }
}

/// Shorthand used across the crate.
pub type Result<T, E = EditError> = std::result::Result<T, E>;
