//! Search and replace over a [`TextBuffer`].
//!
//! Every search runs through the `regex` engine: literal patterns are
//! escaped first, so literal and pattern searches share one matching path.
//! Matches never cross a line boundary. Replacement text is always inserted
//! literally, never expanded as a capture template.
//!
//! [`find_all`] returns all matches in a line range, used by a host to paint
//! match highlights or show a match count.

use std::ops;
use std::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;
use regex::{Regex, RegexBuilder};

use crate::buffer::{TextBuffer, split_lines};
use crate::error::Result;
use crate::position::{Position, Range};

// ---------------------------------------------------------------------------
// Flags and direction
// ---------------------------------------------------------------------------

bitflags! {
    /// How a pattern is matched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SearchFlags: u8 {
        const CASE_SENSITIVE = 1 << 0;
        /// Matches must not touch a word character on either side.
        const WHOLE_WORD = 1 << 1;
        /// Treat the pattern as a regular expression.
        const REGEX = 1 << 2;
        /// Continue from the other end of the buffer.
        const WRAP = 1 << 3;
    }
}

impl Default for SearchFlags {
    fn default() -> Self {
        Self::WRAP
    }
}

/// Search direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SearchDirection {
    Forward,
    Backward,
}

impl SearchDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// A search match: start position and length in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub start: Position,
    pub len: usize,
}

impl Match {
    /// The matched text range.
    #[must_use]
    pub const fn range(self) -> Range {
        Range::on_line(self.start.line, self.start.col, self.start.col + self.len)
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// A compiled pattern plus the whole-word rule.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    whole_word: bool,
}

impl Matcher {
    /// Compile `pattern` under `flags`.
    ///
    /// # Errors
    ///
    /// [`EditError::InvalidPattern`](crate::error::EditError::InvalidPattern)
    /// when `REGEX` is set and the pattern does not compile.
    pub fn new(pattern: &str, flags: SearchFlags) -> Result<Self> {
        let source = if flags.contains(SearchFlags::REGEX) {
            pattern.to_owned()
        } else {
            regex::escape(pattern)
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(!flags.contains(SearchFlags::CASE_SENSITIVE))
            .build()?;
        Ok(Self {
            regex,
            whole_word: flags.contains(SearchFlags::WHOLE_WORD),
        })
    }

    /// Char-column spans `(start, end)` of the matches in one line, in
    /// order. Zero-length matches are skipped.
    #[must_use]
    pub fn line_matches(&self, line: &str) -> Vec<(usize, usize)> {
        self.regex
            .find_iter(line)
            .filter(|m| !m.is_empty())
            .filter(|m| !self.whole_word || is_whole_word(line, m.start(), m.end()))
            .map(|m| (byte_to_char(line, m.start()), byte_to_char(line, m.end())))
            .collect()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_whole_word(line: &str, start: usize, end: usize) -> bool {
    let before = line[..start].chars().next_back();
    let after = line[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

// ---------------------------------------------------------------------------
// Search functions
// ---------------------------------------------------------------------------

/// Find the next match of `pattern` from `from`.
///
/// Forward searches return the first match starting strictly after `from`;
/// backward searches the last match starting strictly before it. With
/// [`SearchFlags::WRAP`] the search continues from the other end of the
/// buffer and may come back to a match at `from` itself. An empty pattern
/// never matches.
///
/// # Errors
///
/// `OutOfRange` if `from.line` does not exist, `InvalidPattern` for a bad
/// regular expression.
pub fn find(
    buf: &TextBuffer,
    pattern: &str,
    from: Position,
    direction: SearchDirection,
    flags: SearchFlags,
) -> Result<Option<Match>> {
    buf.check_line(from.line)?;
    if pattern.is_empty() {
        return Ok(None);
    }
    let matcher = Matcher::new(pattern, flags)?;
    let wrap = flags.contains(SearchFlags::WRAP);
    let count = buf.line_count();

    let hit = |line: usize, keep: &dyn Fn(usize) -> bool, last: bool| -> Option<Match> {
        let text = buf.line(line)?;
        let mut spans = matcher.line_matches(&text).into_iter().filter(|&(s, _)| keep(s));
        let (start, end) = if last { spans.last() } else { spans.next() }?;
        Some(Match {
            start: Position::new(line, start),
            len: end - start,
        })
    };

    let found = match direction {
        SearchDirection::Forward => hit(from.line, &|s: usize| s > from.col, false)
            .or_else(|| (from.line + 1..count).find_map(|l| hit(l, &|_: usize| true, false)))
            .or_else(|| {
                wrap.then(|| {
                    (0..from.line)
                        .find_map(|l| hit(l, &|_: usize| true, false))
                        .or_else(|| hit(from.line, &|s: usize| s <= from.col, false))
                })
                .flatten()
            }),
        SearchDirection::Backward => hit(from.line, &|s: usize| s < from.col, true)
            .or_else(|| (0..from.line).rev().find_map(|l| hit(l, &|_: usize| true, true)))
            .or_else(|| {
                wrap.then(|| {
                    (from.line + 1..count)
                        .rev()
                        .find_map(|l| hit(l, &|_: usize| true, true))
                        .or_else(|| hit(from.line, &|s: usize| s >= from.col, true))
                })
                .flatten()
            }),
    };
    Ok(found)
}

/// All matches of `pattern` in a line range, in document order. Lines past
/// the end of the buffer are ignored.
///
/// # Errors
///
/// `InvalidPattern` for a bad regular expression.
pub fn find_all(
    buf: &TextBuffer,
    pattern: &str,
    lines: ops::Range<usize>,
    flags: SearchFlags,
) -> Result<Vec<Match>> {
    if pattern.is_empty() {
        return Ok(Vec::new());
    }
    let matcher = Matcher::new(pattern, flags)?;
    let end = lines.end.min(buf.line_count());
    let mut matches = Vec::new();
    for line in lines.start..end {
        let Some(text) = buf.line(line) else { continue };
        matches.extend(matcher.line_matches(&text).into_iter().map(|(s, e)| Match {
            start: Position::new(line, s),
            len: e - s,
        }));
    }
    Ok(matches)
}

/// Replace one match with literal text. Returns the end of the new text.
///
/// # Errors
///
/// Fails if the match no longer lies inside the buffer.
pub fn replace(buf: &mut TextBuffer, m: Match, replacement: &str) -> Result<Position> {
    buf.replace_range(m.range(), replacement)
}

/// Replace every match from the start of the buffer, one line at a time.
/// Returns the number of replacements.
///
/// `cancel` is checked before each line; once set, the lines already
/// rewritten stay rewritten and the rest are left alone. Text produced by a
/// replacement is never searched again.
///
/// # Errors
///
/// `InvalidPattern` for a bad regular expression.
pub fn replace_all(
    buf: &mut TextBuffer,
    pattern: &str,
    replacement: &str,
    flags: SearchFlags,
    cancel: &AtomicBool,
) -> Result<usize> {
    replace_all_until(buf, pattern, replacement, flags, || cancel.load(Ordering::Relaxed))
}

/// [`replace_all`] with the cancellation check as a closure, asked once
/// before each line.
pub(crate) fn replace_all_until(
    buf: &mut TextBuffer,
    pattern: &str,
    replacement: &str,
    flags: SearchFlags,
    mut is_cancelled: impl FnMut() -> bool,
) -> Result<usize> {
    if pattern.is_empty() {
        return Ok(0);
    }
    let matcher = Matcher::new(pattern, flags)?;
    let mut count = 0;
    let mut line = 0;
    let mut cancelled = false;

    while line < buf.line_count() {
        if is_cancelled() {
            cancelled = true;
            break;
        }
        let Some(text) = buf.line(line) else { break };
        let spans = matcher.line_matches(&text);
        if spans.is_empty() {
            line += 1;
            continue;
        }

        let mut rewritten = String::with_capacity(text.len());
        let mut last = 0;
        for &(start, end) in &spans {
            rewritten.push_str(&text[char_to_byte(&text, last)..char_to_byte(&text, start)]);
            rewritten.push_str(replacement);
            last = end;
        }
        rewritten.push_str(&text[char_to_byte(&text, last)..]);

        buf.set_line(line, &rewritten)?;
        count += spans.len();
        line += split_lines(&rewritten).len();
    }

    tracing::debug!(target: "mlog::search", pattern, count, cancelled, "replace_all");
    Ok(count)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Convert a char offset to a byte offset. Clamps to the string length.
fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(b, _)| b)
}

/// Convert a byte offset to a char offset.
fn byte_to_char(s: &str, byte_idx: usize) -> usize {
    s[..byte_idx].chars().count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditError;
    use pretty_assertions::assert_eq;

    fn buf(lines: &[&str]) -> TextBuffer {
        TextBuffer::from_lines(lines)
    }

    fn at(line: usize, col: usize, len: usize) -> Option<Match> {
        Some(Match {
            start: Position::new(line, col),
            len,
        })
    }

    const ANY_CASE: SearchFlags = SearchFlags::WRAP;

    // -- Helpers ------------------------------------------------------------

    #[test]
    fn char_byte_conversions() {
        assert_eq!(char_to_byte("héllo", 2), 3);
        assert_eq!(char_to_byte("abc", 10), 3);
        assert_eq!(byte_to_char("héllo", 3), 2);
    }

    #[test]
    fn direction_opposite() {
        assert_eq!(SearchDirection::Forward.opposite(), SearchDirection::Backward);
    }

    // -- find ---------------------------------------------------------------

    #[test]
    fn forward_starts_after_from() {
        let b = buf(&["set x x", "print x"]);
        let f = |col| find(&b, "x", Position::new(0, col), SearchDirection::Forward, ANY_CASE).unwrap();
        assert_eq!(f(0), at(0, 4, 1));
        assert_eq!(f(4), at(0, 6, 1));
        assert_eq!(f(6), at(1, 6, 1));
    }

    #[test]
    fn forward_wraps_to_start() {
        let b = buf(&["top:", "end", "jump top always"]);
        let m = find(&b, "top", Position::new(2, 5), SearchDirection::Forward, ANY_CASE).unwrap();
        assert_eq!(m, at(0, 0, 3));
    }

    #[test]
    fn forward_wrap_returns_match_at_from() {
        let b = buf(&["only here"]);
        let m = find(&b, "only", Position::ZERO, SearchDirection::Forward, ANY_CASE).unwrap();
        assert_eq!(m, at(0, 0, 4));
    }

    #[test]
    fn no_wrap_stops_at_end() {
        let b = buf(&["a x", "b"]);
        let m = find(&b, "x", Position::new(1, 0), SearchDirection::Forward, SearchFlags::empty())
            .unwrap();
        assert_eq!(m, None);
    }

    #[test]
    fn backward_finds_before_from() {
        let b = buf(&["x", "x y x"]);
        let back = |line, col| {
            find(&b, "x", Position::new(line, col), SearchDirection::Backward, ANY_CASE).unwrap()
        };
        assert_eq!(back(1, 4), at(1, 0, 1));
        assert_eq!(back(1, 5), at(1, 4, 1));
        assert_eq!(back(1, 0), at(0, 0, 1));
        // Wraps to the last match of the buffer.
        assert_eq!(back(0, 0), at(1, 4, 1));
    }

    #[test]
    fn case_sensitivity() {
        let b = buf(&["Print", "print"]);
        let m = find(&b, "print", Position::ZERO, SearchDirection::Forward, SearchFlags::CASE_SENSITIVE)
            .unwrap();
        assert_eq!(m, at(1, 0, 5));
        let m = find(&b, "PRINT", Position::new(1, 0), SearchDirection::Forward, ANY_CASE).unwrap();
        assert_eq!(m, at(0, 0, 5));
    }

    #[test]
    fn whole_word() {
        let b = buf(&["set xx x"]);
        let flags = SearchFlags::WHOLE_WORD | SearchFlags::WRAP;
        let m = find(&b, "x", Position::ZERO, SearchDirection::Forward, flags).unwrap();
        assert_eq!(m, at(0, 7, 1));
    }

    #[test]
    fn regex_pattern() {
        let b = buf(&["set a 10", "set b 200"]);
        let flags = SearchFlags::REGEX | SearchFlags::WRAP;
        let m = find(&b, r"\d{3}", Position::ZERO, SearchDirection::Forward, flags).unwrap();
        assert_eq!(m, at(1, 6, 3));
    }

    #[test]
    fn literal_pattern_is_escaped() {
        let b = buf(&["op add r a.b 1"]);
        let m = find(&b, "a.b", Position::ZERO, SearchDirection::Forward, ANY_CASE).unwrap();
        assert_eq!(m, at(0, 9, 3));
        assert_eq!(find(&b, "a+", Position::ZERO, SearchDirection::Forward, ANY_CASE).unwrap(), None);
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let b = buf(&["x"]);
        let err = find(&b, "(", Position::ZERO, SearchDirection::Forward, SearchFlags::REGEX);
        assert!(matches!(err, Err(EditError::InvalidPattern(_))));
    }

    #[test]
    fn out_of_range_from() {
        let b = buf(&["x"]);
        let err = find(&b, "x", Position::new(5, 0), SearchDirection::Forward, ANY_CASE);
        assert!(matches!(err, Err(EditError::OutOfRange { line: 5, .. })));
    }

    #[test]
    fn empty_pattern_never_matches() {
        let b = buf(&["abc"]);
        assert_eq!(find(&b, "", Position::ZERO, SearchDirection::Forward, ANY_CASE).unwrap(), None);
        assert!(find_all(&b, "", 0..1, ANY_CASE).unwrap().is_empty());
    }

    #[test]
    fn unicode_columns() {
        let b = buf(&["print \"héllo\" x"]);
        let m = find(&b, "x", Position::ZERO, SearchDirection::Forward, ANY_CASE).unwrap();
        assert_eq!(m, at(0, 14, 1));
    }

    // -- find_all -----------------------------------------------------------

    #[test]
    fn find_all_in_range() {
        let b = buf(&["x x", "y", "x"]);
        let all = find_all(&b, "x", 0..10, ANY_CASE).unwrap();
        assert_eq!(
            all,
            vec![at(0, 0, 1).unwrap(), at(0, 2, 1).unwrap(), at(2, 0, 1).unwrap()]
        );
        assert_eq!(find_all(&b, "x", 1..2, ANY_CASE).unwrap(), vec![]);
    }

    // -- replace ------------------------------------------------------------

    #[test]
    fn replace_single_match() {
        let mut b = buf(&["jump top always"]);
        let m = find(&b, "top", Position::ZERO, SearchDirection::Forward, ANY_CASE)
            .unwrap()
            .unwrap();
        let end = replace(&mut b, m, "start").unwrap();
        assert_eq!(b.lines(), vec!["jump start always"]);
        assert_eq!(end, Position::new(0, 10));
    }

    #[test]
    fn replace_all_counts_and_rewrites() {
        let mut b = buf(&["set i 0", "op add i i 1", "end"]);
        let cancel = AtomicBool::new(false);
        let n = replace_all(&mut b, "i", "counter", SearchFlags::WHOLE_WORD, &cancel).unwrap();
        assert_eq!(n, 3);
        assert_eq!(
            b.lines(),
            vec!["set counter 0", "op add counter counter 1", "end"]
        );
    }

    #[test]
    fn replace_all_is_literal_and_does_not_rescan() {
        let mut b = buf(&["a a"]);
        let cancel = AtomicBool::new(false);
        let n = replace_all(&mut b, "a", "aa", SearchFlags::empty(), &cancel).unwrap();
        assert_eq!(n, 2);
        assert_eq!(b.lines(), vec!["aa aa"]);

        let mut b = buf(&["x1"]);
        let n = replace_all(&mut b, r"(\d)", "$1", SearchFlags::REGEX, &cancel).unwrap();
        assert_eq!(n, 1);
        assert_eq!(b.lines(), vec!["x$1"]);
    }

    #[test]
    fn replace_all_with_line_breaks() {
        let mut b = buf(&["a;b", "c;d"]);
        let cancel = AtomicBool::new(false);
        let n = replace_all(&mut b, ";", "\n", SearchFlags::empty(), &cancel).unwrap();
        assert_eq!(n, 2);
        assert_eq!(b.lines(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn replace_all_cancelled_before_start() {
        let mut b = buf(&["x", "x"]);
        let cancel = AtomicBool::new(true);
        let n = replace_all(&mut b, "x", "y", SearchFlags::empty(), &cancel).unwrap();
        assert_eq!(n, 0);
        assert_eq!(b.lines(), vec!["x", "x"]);
    }

    #[test]
    fn replace_all_cancelled_midway_keeps_whole_lines() {
        let mut b = buf(&["x x", "x;x", "x", "x x"]);
        let mut checks = 0;
        let n = replace_all_until(&mut b, "x", "y", SearchFlags::empty(), || {
            checks += 1;
            checks > 2
        })
        .unwrap();
        assert_eq!(n, 4);
        assert_eq!(b.lines(), vec!["y y", "y;y", "x", "x x"]);
    }

    #[test]
    fn replace_all_cancelled_after_a_split_line() {
        let mut b = buf(&["a;b", "a;b"]);
        let mut checks = 0;
        let n = replace_all_until(&mut b, ";", "\n", SearchFlags::empty(), || {
            checks += 1;
            checks > 1
        })
        .unwrap();
        assert_eq!(n, 1);
        assert_eq!(b.lines(), vec!["a", "b", "a;b"]);
    }
}
