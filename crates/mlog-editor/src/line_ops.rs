//! Line operations — whole-line transformations driven by a selection.
//!
//! Every operation takes the buffer and the host's current [`Selection`] and
//! returns the selection the host should show afterwards, so the cursor
//! tracks the transformed content. The lines an operation acts on are the
//! selection's [line block](Selection::line_block).
//!
//! The buffer records the resulting line changes; none of these functions
//! re-lex or re-index anything themselves.

use mlog_syntax::lexer::COMMENT_MARKER;
use unicode_width::UnicodeWidthChar;

use crate::buffer::{TextBuffer, to_delta};
use crate::error::Result;
use crate::position::{Position, Selection};

/// Inserted in front of a line to comment it out.
const COMMENT_PREFIX: &str = "# ";

/// Resolve the selection's line block, checking it lies in the buffer.
fn block(buf: &TextBuffer, sel: Selection) -> Result<(usize, usize)> {
    let (first, last) = sel.line_block();
    buf.check_line(last)?;
    Ok((first, last))
}

fn block_lines(buf: &TextBuffer, first: usize, last: usize) -> Vec<String> {
    (first..=last).filter_map(|i| buf.line(i)).collect()
}

// ---------------------------------------------------------------------------
// Delete / move / duplicate
// ---------------------------------------------------------------------------

/// Delete the selected lines. The caret lands at the start of the line that
/// took their place (or the new last line).
///
/// # Errors
///
/// `OutOfRange` when the selection reaches past the buffer.
pub fn delete_lines(buf: &mut TextBuffer, sel: Selection) -> Result<Selection> {
    let (first, last) = block(buf, sel)?;
    buf.remove_lines(first..last + 1)?;
    let line = first.min(buf.line_count() - 1);
    Ok(Selection::caret(Position::new(line, 0)))
}

/// Swap the selected lines with the line above. No-op at the top.
///
/// # Errors
///
/// `OutOfRange` when the selection reaches past the buffer.
pub fn move_up(buf: &mut TextBuffer, sel: Selection) -> Result<Selection> {
    let (first, last) = block(buf, sel)?;
    if first == 0 {
        return Ok(sel);
    }
    buf.rotate(first - 1..last + 1, first)?;
    Ok(sel.shifted(-1))
}

/// Swap the selected lines with the line below. No-op at the bottom.
///
/// # Errors
///
/// `OutOfRange` when the selection reaches past the buffer.
pub fn move_down(buf: &mut TextBuffer, sel: Selection) -> Result<Selection> {
    let (first, last) = block(buf, sel)?;
    if last + 1 >= buf.line_count() {
        return Ok(sel);
    }
    buf.rotate(first..last + 2, last + 1)?;
    Ok(sel.shifted(1))
}

/// Insert a copy of the selected lines above them. The selection stays on
/// the upper copy, which occupies the original line numbers.
///
/// # Errors
///
/// `OutOfRange` when the selection reaches past the buffer.
pub fn duplicate_up(buf: &mut TextBuffer, sel: Selection) -> Result<Selection> {
    let (first, last) = block(buf, sel)?;
    let lines = block_lines(buf, first, last);
    buf.insert_lines(first, &lines)?;
    Ok(sel)
}

/// Insert a copy of the selected lines below them. The selection follows
/// the copy.
///
/// # Errors
///
/// `OutOfRange` when the selection reaches past the buffer.
pub fn duplicate_down(buf: &mut TextBuffer, sel: Selection) -> Result<Selection> {
    let (first, last) = block(buf, sel)?;
    let lines = block_lines(buf, first, last);
    buf.insert_lines(last + 1, &lines)?;
    Ok(sel.shifted(to_delta(lines.len())))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Column of the comment marker if the line is commented out.
fn comment_col(line: &str) -> Option<usize> {
    let indent = indent_len(line);
    line.chars().nth(indent).filter(|&c| c == COMMENT_MARKER).map(|_| indent)
}

fn indent_len(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

/// Comment or uncomment the selected lines.
///
/// When every non-blank line is already commented, one marker (and the
/// single space after it, if any) is removed from each. Otherwise `# ` is
/// inserted at the first non-whitespace column of each line not yet
/// commented. Blank lines take no part unless the block has nothing else,
/// in which case they are commented.
///
/// # Errors
///
/// `OutOfRange` when the selection reaches past the buffer.
pub fn toggle_comment(buf: &mut TextBuffer, sel: Selection) -> Result<Selection> {
    let (first, last) = block(buf, sel)?;
    let lines = block_lines(buf, first, last);

    let only_blank = lines.iter().all(|l| is_blank(l));
    let uncomment = !only_blank
        && lines
            .iter()
            .filter(|l| !is_blank(l))
            .all(|l| comment_col(l).is_some());

    let mut anchor = sel.anchor;
    let mut active = sel.active;

    for (offset, text) in lines.iter().enumerate() {
        let line = first + offset;
        if !only_blank && is_blank(text) {
            continue;
        }

        if uncomment {
            let Some(col) = comment_col(text) else { continue };
            let mut chars: Vec<char> = text.chars().collect();
            let removed = if chars.get(col + 1) == Some(&' ') { 2 } else { 1 };
            chars.drain(col..col + removed);
            buf.set_line(line, &chars.into_iter().collect::<String>())?;
            for pos in [&mut anchor, &mut active] {
                if pos.line == line && pos.col > col {
                    pos.col -= removed.min(pos.col - col);
                }
            }
        } else if comment_col(text).is_none() {
            let col = indent_len(text);
            let mut rewritten: String = text.chars().take(col).collect();
            rewritten.push_str(COMMENT_PREFIX);
            rewritten.extend(text.chars().skip(col));
            buf.set_line(line, &rewritten)?;
            for pos in [&mut anchor, &mut active] {
                if pos.line == line && pos.col > col {
                    pos.col += COMMENT_PREFIX.len();
                }
            }
        }
    }

    Ok(Selection::new(anchor, active))
}

// ---------------------------------------------------------------------------
// Tab
// ---------------------------------------------------------------------------

/// Display width of the first `col` chars of a line, with tab stops every
/// `tab_width` columns.
fn display_width(line: &str, col: usize, tab_width: usize) -> usize {
    line.chars().take(col).fold(0, |w, c| match c {
        '\t' => (w / tab_width + 1) * tab_width,
        _ => w + c.width().unwrap_or(0),
    })
}

/// Insert spaces up to the next tab stop. A non-empty selection is replaced
/// first, the way typed text replaces it.
///
/// # Errors
///
/// Fails if the selection does not lie in the buffer.
pub fn insert_tab(buf: &mut TextBuffer, sel: Selection, tab_width: usize) -> Result<Selection> {
    let tab_width = tab_width.max(1);
    let range = sel.range();
    buf.check_position(range.start)?;
    buf.check_position(range.end)?;
    buf.delete_range(range)?;

    let pos = range.start;
    let text = buf.line(pos.line).unwrap_or_default();
    let width = display_width(&text, pos.col, tab_width);
    let spaces = tab_width - width % tab_width;
    let end = buf.insert_text(pos, &" ".repeat(spaces))?;
    Ok(Selection::caret(end))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
