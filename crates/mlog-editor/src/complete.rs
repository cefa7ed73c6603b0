//! Autocomplete — ranked candidates for the word at the cursor.
//!
//! # Context
//!
//! The cursor's context is the token that contains it or ends at it:
//!
//! | Cursor in …                      | Candidates                          |
//! |----------------------------------|-------------------------------------|
//! | a comment or string              | none                                |
//! | the first word                   | opcodes                             |
//! | a `label` slot                   | labels                              |
//! | an `output` slot                 | variables                           |
//! | a `value` slot                   | variables and built-in `@` names    |
//! | a `constant` slot                | the slot's accepted words           |
//! | anywhere else                    | every symbol and every opcode       |
//!
//! `Implicit` names (referenced, never defined) count as variables.
//!
//! # Ranking
//!
//! Candidates must start with the typed text, compared case-insensitively.
//! A case-exact prefix scores above a case-insensitive one; a defined name
//! scores above a name that is only referenced. Equal scores order shorter
//! names first, then alphabetically, except in the first word where opcodes
//! are listed alphabetically. A candidate identical to the typed text is
//! dropped.

use std::cmp::Reverse;
use std::collections::HashSet;

use mlog_syntax::lexer::slice_chars;
use mlog_syntax::{ArgKind, InstructionTable, Span, Token, TokenKind};

use crate::position::{Position, Range};
use crate::symbols::{Symbol, SymbolIndex, SymbolKind};

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// What a candidate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Opcode,
    /// An opcode's name offered past the first word, where it is plain
    /// text.
    OpcodeName,
    Label,
    Variable,
    Implicit,
    Constant,
    Builtin,
}

impl CandidateKind {
    /// Category the lexer gives the inserted text at the position it was
    /// offered for.
    #[must_use]
    pub const fn token_kind(self) -> TokenKind {
        match self {
            Self::Opcode | Self::Constant => TokenKind::Keyword,
            Self::OpcodeName | Self::Label | Self::Variable | Self::Implicit => {
                TokenKind::Identifier
            }
            Self::Builtin => TokenKind::Builtin,
        }
    }

    const fn from_symbol(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Label => Self::Label,
            SymbolKind::Variable => Self::Variable,
            SymbolKind::Implicit => Self::Implicit,
        }
    }
}

/// One completion proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    /// Text shown in the popup.
    pub display: String,
    /// Text that replaces `replace`.
    pub insert: String,
    pub kind: CandidateKind,
    /// Short description (an opcode's summary, a label's line).
    pub detail: Option<String>,
    /// Higher ranks first.
    pub score: u32,
    /// The typed partial word the insertion replaces.
    pub replace: Range,
}

/// Score for a prefix that matches case-exactly.
const EXACT_CASE: u32 = 2;
/// Score for a name with a definition (symbols) or a fixed meaning
/// (opcodes, constants, built-ins).
const DEFINED: u32 = 1;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Where in the line the cursor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Inside a comment or string, or on a number or operator.
    Nothing,
    FirstWord,
    Arg(ArgKind),
    Anywhere,
}

#[derive(Debug)]
struct Context<'a> {
    slot: Slot,
    partial: &'a str,
    /// Char column where the partial word starts.
    start: usize,
    /// Choices of a constant slot.
    choices: &'a [String],
}

fn context<'a>(
    table: &'a InstructionTable,
    line: &'a str,
    tokens: &[Token],
    col: usize,
) -> Context<'a> {
    let under = tokens
        .iter()
        .find(|t| t.span.start < col && col <= t.span.end);

    let (word, start) = match under {
        Some(t) => {
            let stop = matches!(
                t.kind,
                TokenKind::Comment | TokenKind::String | TokenKind::Number | TokenKind::Operator
            );
            if stop {
                return Context {
                    slot: Slot::Nothing,
                    partial: "",
                    start: col,
                    choices: &[],
                };
            }
            (t.word, t.span.start)
        }
        None => {
            let word = tokens
                .iter()
                .filter(|t| t.span.end <= col)
                .map(|t| t.word + 1)
                .max()
                .unwrap_or(0);
            (word, col)
        }
    };

    let partial = slice_chars(line, Span::new(start, col));
    let mut ctx = Context {
        slot: Slot::Anywhere,
        partial,
        start,
        choices: &[],
    };
    if word == 0 {
        ctx.slot = Slot::FirstWord;
        return ctx;
    }

    let spec = tokens
        .iter()
        .find(|t| t.word == 0 && t.kind == TokenKind::Keyword)
        .and_then(|t| table.lookup(t.text(line)));
    if let Some(arg) = spec.and_then(|s| s.arg(word - 1)) {
        ctx.slot = Slot::Arg(arg.kind);
        ctx.choices = &arg.choices;
    }
    ctx
}

// ---------------------------------------------------------------------------
// complete
// ---------------------------------------------------------------------------

/// Candidates for the cursor at `pos` on `line`, whose tokens are `tokens`.
/// At most `limit` candidates are returned, best first. A column past the
/// end of the line is treated as the end of the line.
#[must_use]
pub fn complete(
    table: &InstructionTable,
    symbols: &SymbolIndex,
    line: &str,
    tokens: &[Token],
    pos: Position,
    limit: usize,
) -> Vec<CompletionCandidate> {
    let col = pos.col.min(line.chars().count());
    let ctx = context(table, line, tokens, col);
    let mut ranker = Ranker {
        partial: ctx.partial,
        folded: ctx.partial.to_lowercase(),
        replace: Range::on_line(pos.line, ctx.start, col),
        alphabetical: ctx.slot == Slot::FirstWord,
        out: Vec::new(),
    };

    let opcodes = |r: &mut Ranker<'_>, kind: CandidateKind| {
        for spec in table.opcodes() {
            r.offer(&spec.name, kind, true, Some(spec.summary.as_str()));
        }
    };
    let symbols_where = |r: &mut Ranker<'_>, keep: &dyn Fn(&Symbol) -> bool| {
        for sym in symbols.all_symbols().iter().filter(|s| keep(s)) {
            let detail = sym.defining_line.map(|l| format!("line {}", l + 1));
            r.offer(
                &sym.name,
                CandidateKind::from_symbol(sym.kind),
                sym.is_defined(),
                detail.as_deref(),
            );
        }
    };
    let is_variable = |s: &Symbol| s.kind != SymbolKind::Label;

    match ctx.slot {
        Slot::Nothing => return Vec::new(),
        Slot::FirstWord => opcodes(&mut ranker, CandidateKind::Opcode),
        Slot::Arg(ArgKind::Label) => {
            symbols_where(&mut ranker, &|s: &Symbol| s.kind == SymbolKind::Label);
        }
        Slot::Arg(ArgKind::Output) => symbols_where(&mut ranker, &is_variable),
        Slot::Arg(ArgKind::Value) => {
            symbols_where(&mut ranker, &is_variable);
            for name in table.builtin_variables() {
                ranker.offer(name, CandidateKind::Builtin, true, None);
            }
        }
        Slot::Arg(ArgKind::Constant) => {
            for choice in ctx.choices {
                ranker.offer(choice, CandidateKind::Constant, true, None);
            }
        }
        Slot::Anywhere => {
            symbols_where(&mut ranker, &|_: &Symbol| true);
            opcodes(&mut ranker, CandidateKind::OpcodeName);
        }
    }

    let candidates = ranker.finish(limit);
    tracing::trace!(
        target: "mlog::complete",
        line = pos.line,
        col,
        partial = ctx.partial,
        count = candidates.len(),
        "complete"
    );
    candidates
}

/// Collects prefix-matching candidates and orders them.
struct Ranker<'a> {
    partial: &'a str,
    folded: String,
    replace: Range,
    /// Skip the shorter-first tie-break.
    alphabetical: bool,
    out: Vec<CompletionCandidate>,
}

impl Ranker<'_> {
    fn offer(&mut self, name: &str, kind: CandidateKind, defined: bool, detail: Option<&str>) {
        if name == self.partial || !name.to_lowercase().starts_with(&self.folded) {
            return;
        }
        let mut score = 0;
        if name.starts_with(self.partial) {
            score += EXACT_CASE;
        }
        if defined {
            score += DEFINED;
        }
        self.out.push(CompletionCandidate {
            display: name.to_owned(),
            insert: name.to_owned(),
            kind,
            detail: detail.map(str::to_owned),
            score,
            replace: self.replace,
        });
    }

    fn finish(mut self, limit: usize) -> Vec<CompletionCandidate> {
        let alphabetical = self.alphabetical;
        let len = |c: &CompletionCandidate| if alphabetical { 0 } else { c.insert.chars().count() };
        self.out.sort_by(|a, b| {
            (Reverse(a.score), len(a), &a.insert).cmp(&(Reverse(b.score), len(b), &b.insert))
        });
        // A name offered twice (a symbol shadowing an opcode) keeps its best
        // rank.
        let mut seen = HashSet::new();
        self.out.retain(|c| seen.insert(c.insert.clone()));
        self.out.truncate(limit);
        self.out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
