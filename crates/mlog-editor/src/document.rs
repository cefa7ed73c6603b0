//! Document — one editing session over a buffer.
//!
//! The `Document` owns the [`TextBuffer`], the [`SymbolIndex`], the
//! per-line styling cache and the [`Options`]. Hosts call one method per
//! semantic command; each method runs the operation and then
//! [flushes](Document::flush) the buffer's change log, so every cache is up
//! to date before the method returns.
//!
//! # Flush
//!
//! Flushing drains the buffer's [`LineChange`] events in order:
//!
//! - inserted and edited lines are re-lexed, restyled and re-indexed;
//! - removed lines leave the index and the styling cache;
//! - shifted lines are renumbered in the index; their tokens and styling
//!   are reused as they are.
//!
//! Every line whose index or styling changed is returned for repaint.
//!
//! # Code line numbers
//!
//! Lines holding code (anything but blank lines and comment-only lines) are
//! numbered from 0 in buffer order, the running index numeric `jump`
//! targets count in. The numbering is rebuilt at the end of every flush
//! that saw a change.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use mlog_syntax::{Highlighter, InstructionTable, StyledSpan, Token, TokenKind, tokenize};

use crate::buffer::{LineChange, LineId, TextBuffer};
use crate::complete::{self, CompletionCandidate};
use crate::error::Result;
use crate::line_ops;
use crate::options::{OptionError, Options};
use crate::position::{Position, Range, Selection};
use crate::search::{self, Match, SearchDirection};
use crate::symbols::SymbolIndex;

/// Styling of one line, for repaint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledLine {
    pub line: usize,
    pub spans: Vec<StyledSpan>,
}

/// Result of a mutating command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Where the host should put the selection.
    pub selection: Selection,
    /// Lines to repaint, in line order.
    pub repaint: Vec<StyledLine>,
}

/// Result of [`Document::replace_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceAllOutcome {
    pub count: usize,
    pub repaint: Vec<StyledLine>,
}

/// An editing session.
pub struct Document {
    buffer: TextBuffer,
    symbols: SymbolIndex,
    highlighter: Highlighter<LineId>,
    table: &'static InstructionTable,
    options: Options,
    /// Code line number of each line, by index.
    code_lines: Vec<Option<usize>>,
}

impl Document {
    // -- Construction -------------------------------------------------------

    /// Open a text blob with the stock instruction table.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self::with_table(TextBuffer::from_text(text), InstructionTable::builtin())
    }

    /// Open an ordered sequence of lines with the stock instruction table.
    #[must_use]
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_table(TextBuffer::from_lines(lines), InstructionTable::builtin())
    }

    /// Open a buffer against a specific instruction table. Every line is
    /// lexed and indexed before this returns.
    #[must_use]
    pub fn with_table(buffer: TextBuffer, table: &'static InstructionTable) -> Self {
        let mut doc = Self {
            buffer,
            symbols: SymbolIndex::new(),
            highlighter: Highlighter::new(),
            table,
            options: Options::default(),
            code_lines: Vec::new(),
        };
        doc.flush();
        doc
    }

    // -- Accessors ----------------------------------------------------------

    #[must_use]
    pub const fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    #[must_use]
    pub const fn symbols(&self) -> &SymbolIndex {
        &self.symbols
    }

    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub const fn table(&self) -> &'static InstructionTable {
        self.table
    }

    /// Apply `:set`-style option directives. Returns display lines for
    /// queries.
    ///
    /// # Errors
    ///
    /// The first [`OptionError`] encountered.
    pub fn set_option(&mut self, args: &str) -> std::result::Result<Vec<String>, OptionError> {
        self.options.set(args)
    }

    // -- Flush --------------------------------------------------------------

    /// Bring tokens, styling and symbols up to date with the buffer.
    /// Returns the lines to repaint, in line order.
    pub fn flush(&mut self) -> Vec<StyledLine> {
        let changes = self.buffer.take_changes();
        if changes.is_empty() {
            return Vec::new();
        }

        let mut dirty: HashSet<LineId> = HashSet::new();
        let mut moved: HashSet<LineId> = HashSet::new();
        for change in changes {
            match change {
                LineChange::Edited(id) => {
                    dirty.insert(id);
                }
                LineChange::Inserted { id, at } => {
                    self.symbols.track_line(id, at);
                    dirty.insert(id);
                }
                LineChange::Removed(id) => {
                    self.symbols.on_line_removed(id);
                    self.highlighter.forget(&id);
                    dirty.remove(&id);
                    moved.remove(&id);
                }
                LineChange::Shifted(shifts) => {
                    moved.extend(self.symbols.shift(&shifts));
                }
            }
        }

        let mut repaint = Vec::with_capacity(dirty.len() + moved.len());
        for &id in &dirty {
            let Some(line) = self.symbols.position_of(id) else {
                continue;
            };
            let text = self.buffer.line(line).unwrap_or_default();
            let tokens = tokenize(self.table, &text);
            self.symbols.on_line_changed(id, line, &text, &tokens);
            let spans = self.highlighter.restyle(id, &tokens).to_vec();
            self.buffer.set_tokens(line, tokens);
            repaint.push(StyledLine { line, spans });
        }
        for id in moved.difference(&dirty) {
            let Some(line) = self.symbols.position_of(*id) else {
                continue;
            };
            let spans = self.highlighter.get(id).map(<[_]>::to_vec).unwrap_or_default();
            repaint.push(StyledLine { line, spans });
        }
        repaint.sort_by_key(|s| s.line);
        self.renumber_code_lines();

        tracing::debug!(
            target: "mlog::document",
            relexed = dirty.len(),
            moved = moved.len(),
            lines = self.buffer.line_count(),
            "flush"
        );
        repaint
    }

    fn renumber_code_lines(&mut self) {
        let is_code = |tokens: &[Token]| tokens.iter().any(|t| t.kind != TokenKind::Comment);
        let mut next = 0;
        self.code_lines = (0..self.buffer.line_count())
            .map(|line| {
                let code = match self.buffer.tokens(line) {
                    Some(tokens) => is_code(tokens),
                    None => is_code(&tokenize(self.table, &self.buffer.line(line).unwrap_or_default())),
                };
                code.then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
    }

    fn outcome(&mut self, selection: Selection) -> EditOutcome {
        EditOutcome {
            selection,
            repaint: self.flush(),
        }
    }

    // -- Reads --------------------------------------------------------------

    /// Current tokens of a line.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when the line does not exist.
    pub fn tokens(&mut self, line: usize) -> Result<Vec<Token>> {
        self.flush();
        self.buffer.check_line(line)?;
        Ok(self.line_tokens(line))
    }

    fn line_tokens(&self, line: usize) -> Vec<Token> {
        self.buffer.tokens(line).map_or_else(
            || tokenize(self.table, &self.buffer.line(line).unwrap_or_default()),
            <[Token]>::to_vec,
        )
    }

    /// Current styling of a line.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when the line does not exist.
    pub fn styled_line(&mut self, line: usize) -> Result<Vec<StyledSpan>> {
        self.flush();
        self.buffer.check_line(line)?;
        let id = self.buffer.line_id(line);
        Ok(id
            .and_then(|id| self.highlighter.get(&id))
            .map(<[_]>::to_vec)
            .unwrap_or_default())
    }

    /// Code line number of a line, `None` for blank and comment-only lines.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when the line does not exist.
    pub fn code_line_number(&mut self, line: usize) -> Result<Option<usize>> {
        self.flush();
        self.buffer.check_line(line)?;
        Ok(self.code_lines.get(line).copied().flatten())
    }

    /// Styling of every line, in line order.
    pub fn styled_lines(&mut self) -> Vec<StyledLine> {
        self.flush();
        (0..self.buffer.line_count())
            .map(|line| StyledLine {
                line,
                spans: self
                    .buffer
                    .line_id(line)
                    .and_then(|id| self.highlighter.get(&id))
                    .map(<[_]>::to_vec)
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Completion candidates for the cursor at `pos`, best first.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `pos.line` does not exist.
    pub fn complete(&mut self, pos: Position) -> Result<Vec<CompletionCandidate>> {
        self.flush();
        self.buffer.check_line(pos.line)?;
        let text = self.buffer.line(pos.line).unwrap_or_default();
        let tokens = self.line_tokens(pos.line);
        Ok(complete::complete(
            self.table,
            &self.symbols,
            &text,
            &tokens,
            pos,
            self.options.maxcompletions,
        ))
    }

    /// Next match of `pattern` from `from`, using the search options.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for a bad `from` line, `InvalidPattern` for a bad
    /// regular expression.
    pub fn find(
        &self,
        pattern: &str,
        from: Position,
        direction: SearchDirection,
    ) -> Result<Option<Match>> {
        search::find(&self.buffer, pattern, from, direction, self.options.search_flags())
    }

    /// All matches of `pattern` in a line range.
    ///
    /// # Errors
    ///
    /// `InvalidPattern` for a bad regular expression.
    pub fn find_all(&self, pattern: &str, lines: std::ops::Range<usize>) -> Result<Vec<Match>> {
        search::find_all(&self.buffer, pattern, lines, self.options.search_flags())
    }

    // -- Text commands ------------------------------------------------------

    /// Insert text at a position. The caret lands after the text.
    ///
    /// # Errors
    ///
    /// Fails if `pos` is not a valid position.
    pub fn insert_text(&mut self, pos: Position, text: &str) -> Result<EditOutcome> {
        let end = self.buffer.insert_text(pos, text)?;
        Ok(self.outcome(Selection::caret(end)))
    }

    /// Delete a range. The caret lands at its start.
    ///
    /// # Errors
    ///
    /// Fails if either end is not a valid position.
    pub fn delete_range(&mut self, range: Range) -> Result<EditOutcome> {
        self.buffer.delete_range(range)?;
        Ok(self.outcome(Selection::caret(range.start)))
    }

    /// Replace the partial word of a candidate with its insertion text.
    ///
    /// # Errors
    ///
    /// Fails if the candidate's range no longer lies in the buffer.
    pub fn accept_completion(&mut self, candidate: &CompletionCandidate) -> Result<EditOutcome> {
        let end = self.buffer.replace_range(candidate.replace, &candidate.insert)?;
        Ok(self.outcome(Selection::caret(end)))
    }

    /// Replace one match. The new text ends up selected.
    ///
    /// # Errors
    ///
    /// Fails if the match no longer lies in the buffer.
    pub fn replace(&mut self, m: Match, replacement: &str) -> Result<EditOutcome> {
        let end = search::replace(&mut self.buffer, m, replacement)?;
        Ok(self.outcome(Selection::new(m.start, end)))
    }

    /// Replace every match of `pattern`, checking `cancel` between lines.
    ///
    /// # Errors
    ///
    /// `InvalidPattern` for a bad regular expression.
    pub fn replace_all(
        &mut self,
        pattern: &str,
        replacement: &str,
        cancel: &AtomicBool,
    ) -> Result<ReplaceAllOutcome> {
        self.replace_all_until(pattern, replacement, || cancel.load(Ordering::Relaxed))
    }

    fn replace_all_until(
        &mut self,
        pattern: &str,
        replacement: &str,
        is_cancelled: impl FnMut() -> bool,
    ) -> Result<ReplaceAllOutcome> {
        let flags = self.options.search_flags();
        let result =
            search::replace_all_until(&mut self.buffer, pattern, replacement, flags, is_cancelled);
        // Lines rewritten before a failure still need their caches updated.
        let repaint = self.flush();
        Ok(ReplaceAllOutcome {
            count: result?,
            repaint,
        })
    }

    // -- Line commands ------------------------------------------------------

    /// # Errors
    ///
    /// `OutOfRange` when the selection reaches past the buffer.
    pub fn delete_lines(&mut self, sel: Selection) -> Result<EditOutcome> {
        let sel = line_ops::delete_lines(&mut self.buffer, sel)?;
        Ok(self.outcome(sel))
    }

    /// # Errors
    ///
    /// `OutOfRange` when the selection reaches past the buffer.
    pub fn move_lines_up(&mut self, sel: Selection) -> Result<EditOutcome> {
        let sel = line_ops::move_up(&mut self.buffer, sel)?;
        Ok(self.outcome(sel))
    }

    /// # Errors
    ///
    /// `OutOfRange` when the selection reaches past the buffer.
    pub fn move_lines_down(&mut self, sel: Selection) -> Result<EditOutcome> {
        let sel = line_ops::move_down(&mut self.buffer, sel)?;
        Ok(self.outcome(sel))
    }

    /// # Errors
    ///
    /// `OutOfRange` when the selection reaches past the buffer.
    pub fn duplicate_lines_up(&mut self, sel: Selection) -> Result<EditOutcome> {
        let sel = line_ops::duplicate_up(&mut self.buffer, sel)?;
        Ok(self.outcome(sel))
    }

    /// # Errors
    ///
    /// `OutOfRange` when the selection reaches past the buffer.
    pub fn duplicate_lines_down(&mut self, sel: Selection) -> Result<EditOutcome> {
        let sel = line_ops::duplicate_down(&mut self.buffer, sel)?;
        Ok(self.outcome(sel))
    }

    /// # Errors
    ///
    /// `OutOfRange` when the selection reaches past the buffer.
    pub fn toggle_comment(&mut self, sel: Selection) -> Result<EditOutcome> {
        let sel = line_ops::toggle_comment(&mut self.buffer, sel)?;
        Ok(self.outcome(sel))
    }

    /// Insert spaces to the next tab stop (`tabstop` option).
    ///
    /// # Errors
    ///
    /// Fails if the selection does not lie in the buffer.
    pub fn insert_tab(&mut self, sel: Selection) -> Result<EditOutcome> {
        let sel = line_ops::insert_tab(&mut self.buffer, sel, self.options.tabstop)?;
        Ok(self.outcome(sel))
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("buffer", &self.buffer)
            .field("symbols", &self.symbols.len())
            .field("styled", &self.highlighter.len())
            .field("options", &self.options)
            .field("code_lines", &self.code_lines.iter().flatten().count())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complete::CandidateKind;
    use crate::symbols::SymbolKind;
    use mlog_syntax::{StyleTag, TokenKind};
    use pretty_assertions::assert_eq;

    fn doc(lines: &[&str]) -> Document {
        Document::from_lines(lines)
    }

    fn lines_of(outcome: &EditOutcome) -> Vec<usize> {
        outcome.repaint.iter().map(|s| s.line).collect()
    }

    fn tags(doc: &mut Document, line: usize) -> Vec<StyleTag> {
        doc.styled_line(line).unwrap().iter().map(|s| s.tag).collect()
    }

    #[test]
    fn opening_lexes_every_line() {
        let mut d = doc(&["jump 2 always", "print \"hi\"", "end"]);
        for line in 0..3 {
            assert!(d.buffer().tokens(line).is_some());
        }
        assert_eq!(
            tags(&mut d, 0),
            vec![StyleTag::Keyword, StyleTag::Number, StyleTag::Keyword]
        );
        assert!(d.flush().is_empty());
    }

    #[test]
    fn edit_restyles_only_that_line() {
        let mut d = doc(&["set x 1", "end"]);
        let out = d.insert_text(Position::new(1, 0), "# ").unwrap();
        assert_eq!(lines_of(&out), vec![1]);
        assert_eq!(out.selection, Selection::caret(Position::new(1, 2)));
        assert_eq!(tags(&mut d, 1), vec![StyleTag::Comment]);
    }

    #[test]
    fn inserting_a_line_repaints_lines_below() {
        let mut d = doc(&["a", "b", "c"]);
        let out = d.insert_text(Position::new(0, 1), "\nnew").unwrap();
        assert_eq!(lines_of(&out), vec![0, 1, 2, 3]);
        assert_eq!(d.buffer().lines(), vec!["a", "new", "b", "c"]);
    }

    #[test]
    fn symbols_follow_edits() {
        let mut d = doc(&["top:", "jump top always"]);
        assert_eq!(d.symbols().kind_of("top"), Some(SymbolKind::Label));

        d.delete_range(Range::on_line(0, 3, 4)).unwrap();
        assert_eq!(d.symbols().kind_of("top"), Some(SymbolKind::Implicit));

        d.insert_text(Position::new(0, 3), ":").unwrap();
        let top = d.symbols().get("top").unwrap();
        assert_eq!(top.kind, SymbolKind::Label);
        assert_eq!(top.defining_line, Some(0));
    }

    #[test]
    fn moves_renumber_symbols_without_relex() {
        let mut d = doc(&["set a 1", "loop:", "jump loop always"]);
        let passes = d.highlighter.passes();
        let out = d.move_lines_up(Selection::caret(Position::new(1, 0))).unwrap();
        assert_eq!(d.buffer().lines(), vec!["loop:", "set a 1", "jump loop always"]);
        assert_eq!(lines_of(&out), vec![0, 1]);
        assert_eq!(d.highlighter.passes(), passes);
        assert_eq!(d.symbols().get("loop").unwrap().defining_line, Some(0));
        assert_eq!(d.symbols().get("a").unwrap().defining_line, Some(1));
    }

    #[test]
    fn delete_lines_drops_symbols() {
        let mut d = doc(&["set a 1", "print a", "end"]);
        d.delete_lines(Selection::caret(Position::ZERO)).unwrap();
        let a = d.symbols().get("a").unwrap();
        assert_eq!(a.kind, SymbolKind::Implicit);
        assert_eq!(a.references.iter().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn completion_after_edit() {
        let mut d = doc(&["set counter 0", ""]);
        d.insert_text(Position::new(1, 0), "print co").unwrap();
        let got = d.complete(Position::new(1, 8)).unwrap();
        assert_eq!(got[0].insert, "counter");
        assert_eq!(got[0].kind, CandidateKind::Variable);

        let out = d.accept_completion(&got[0]).unwrap();
        assert_eq!(d.buffer().line(1).as_deref(), Some("print counter"));
        assert_eq!(out.selection, Selection::caret(Position::new(1, 13)));
    }

    #[test]
    fn completion_out_of_range() {
        let mut d = doc(&["end"]);
        assert!(d.complete(Position::new(3, 0)).unwrap_err().is_out_of_range());
    }

    #[test]
    fn completion_respects_limit_option() {
        let mut d = doc(&[""]);
        d.set_option("mc=2").unwrap();
        assert_eq!(d.complete(Position::ZERO).unwrap().len(), 2);
    }

    #[test]
    fn find_uses_options() {
        let mut d = doc(&["Set x 1", "set y 2"]);
        let m = d.find("set", Position::ZERO, SearchDirection::Forward).unwrap();
        assert_eq!(m.map(|m| m.start), Some(Position::new(1, 0)));
        d.set_option("noic").unwrap();
        let m = d.find("Set", Position::new(1, 0), SearchDirection::Forward).unwrap();
        assert_eq!(m.map(|m| m.start), Some(Position::new(0, 0)));
        assert_eq!(d.find_all("set", 0..2).unwrap().len(), 1);
    }

    #[test]
    fn replace_relexes_and_selects() {
        let mut d = doc(&["jump start always", "start:"]);
        let m = d
            .find("start", Position::new(1, 0), SearchDirection::Forward)
            .unwrap()
            .unwrap();
        assert_eq!(m.start, Position::new(0, 5));
        let out = d.replace(m, "begin").unwrap();
        assert_eq!(out.selection, Selection::new(Position::new(0, 5), Position::new(0, 10)));
        assert_eq!(d.symbols().kind_of("begin"), Some(SymbolKind::Implicit));
        assert_eq!(d.symbols().kind_of("start"), Some(SymbolKind::Label));
    }

    #[test]
    fn replace_all_updates_caches() {
        let mut d = doc(&["set i 0", "op add i i 1", "jump 1 lessThan i 10"]);
        let cancel = AtomicBool::new(false);
        d.set_option("ww").unwrap();
        let out = d.replace_all("i", "n", &cancel).unwrap();
        assert_eq!(out.count, 4);
        assert_eq!(out.repaint.len(), 3);
        assert!(d.symbols().get("i").is_none());
        assert_eq!(d.symbols().kind_of("n"), Some(SymbolKind::Variable));
    }

    #[test]
    fn replace_all_stopped_midway_leaves_caches_consistent() {
        let mut d = doc(&["loop:", "jump loop always", "print loop", "jump loop always"]);
        let mut checks = 0;
        let out = d
            .replace_all_until("loop", "again", || {
                checks += 1;
                checks > 2
            })
            .unwrap();
        assert_eq!(out.count, 2);
        assert_eq!(out.repaint.len(), 2);

        let lines = d.buffer().lines();
        assert_eq!(lines, vec!["again:", "jump again always", "print loop", "jump loop always"]);
        let mut fresh = Document::from_lines(&lines);
        for line in 0..lines.len() {
            assert_eq!(d.tokens(line).unwrap(), fresh.tokens(line).unwrap());
            assert_eq!(d.code_line_number(line).unwrap(), fresh.code_line_number(line).unwrap());
        }
        assert_eq!(d.styled_lines(), fresh.styled_lines());
        assert_eq!(d.symbols().all_symbols(), fresh.symbols().all_symbols());
        assert_eq!(d.symbols().kind_of("again"), Some(SymbolKind::Label));
        assert_eq!(d.symbols().kind_of("loop"), Some(SymbolKind::Implicit));
    }

    #[test]
    fn toggle_comment_restyles() {
        let mut d = doc(&["set x 1"]);
        d.toggle_comment(Selection::caret(Position::ZERO)).unwrap();
        assert_eq!(tags(&mut d, 0), vec![StyleTag::Comment]);
        assert!(d.symbols().is_empty());
    }

    #[test]
    fn insert_tab_uses_tabstop() {
        let mut d = doc(&["x"]);
        d.set_option("ts=2").unwrap();
        let out = d.insert_tab(Selection::caret(Position::new(0, 1))).unwrap();
        assert_eq!(d.buffer().line(0).as_deref(), Some("x "));
        assert_eq!(out.selection, Selection::caret(Position::new(0, 2)));
    }

    #[test]
    fn duplicate_and_delete_keep_caches_consistent() {
        let mut d = doc(&["a:", "b:", "c"]);
        d.duplicate_lines_down(Selection::new(Position::new(0, 0), Position::new(1, 1)))
            .unwrap();
        d.duplicate_lines_up(Selection::caret(Position::new(4, 0))).unwrap();
        d.delete_lines(Selection::new(Position::new(0, 0), Position::new(2, 0)))
            .unwrap();
        assert_eq!(d.buffer().lines(), vec!["a:", "b:", "c", "c"]);
        for line in 0..d.buffer().line_count() {
            let text = d.buffer().line(line).unwrap();
            let cached = d.tokens(line).unwrap();
            assert_eq!(cached, tokenize(d.table(), &text));
        }
        assert_eq!(d.symbols().get("a").unwrap().defining_line, Some(0));
    }

    // -- Code line numbers --

    fn code_lines(d: &mut Document) -> Vec<Option<usize>> {
        (0..d.buffer().line_count())
            .map(|line| d.code_line_number(line).unwrap())
            .collect()
    }

    #[test]
    fn code_lines_skip_blanks_and_comments() {
        let mut d = doc(&["set x 1", "", "# note", "loop:", "  end # done", "   "]);
        assert_eq!(
            code_lines(&mut d),
            vec![Some(0), None, None, Some(1), Some(2), None]
        );
        assert!(d.code_line_number(6).unwrap_err().is_out_of_range());
    }

    #[test]
    fn code_lines_follow_comment_toggles() {
        let mut d = doc(&["set x 1", "print x", "end"]);
        d.toggle_comment(Selection::caret(Position::new(1, 0))).unwrap();
        assert_eq!(code_lines(&mut d), vec![Some(0), None, Some(1)]);

        d.toggle_comment(Selection::caret(Position::new(1, 0))).unwrap();
        assert_eq!(code_lines(&mut d), vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn code_lines_follow_moves_and_deletes() {
        let mut d = doc(&["", "set x 1", "# c", "end"]);
        d.move_lines_up(Selection::caret(Position::new(1, 0))).unwrap();
        assert_eq!(d.buffer().lines(), vec!["set x 1", "", "# c", "end"]);
        assert_eq!(code_lines(&mut d), vec![Some(0), None, None, Some(1)]);

        d.move_lines_up(Selection::caret(Position::new(3, 0))).unwrap();
        assert_eq!(code_lines(&mut d), vec![Some(0), None, Some(1), None]);

        d.delete_lines(Selection::caret(Position::ZERO)).unwrap();
        assert_eq!(code_lines(&mut d), vec![None, Some(0), None]);
    }

    #[test]
    fn tokens_out_of_range() {
        let mut d = doc(&["end"]);
        assert!(d.tokens(1).is_err());
        assert_eq!(d.tokens(0).unwrap()[0].kind, TokenKind::Keyword);
    }
}
