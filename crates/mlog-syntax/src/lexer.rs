// SPDX-License-Identifier: MIT
//
// Lexer — one line of Mindustry logic in, an ordered token list out.
//
// The language is line-oriented: one instruction per line, arguments
// separated by whitespace. Tokens therefore never span lines and a line can
// be lexed in isolation, which is what makes per-line re-lexing possible.
//
// Scanning rules, left to right:
//
//   whitespace        separates words, produces no token
//   #                 comment to end of line (outside strings)
//   "                 string to the closing quote, or to end of line
//   anything else     a word, up to whitespace, `#` or `"`
//
// Words are classified by position. Word 0 is the opcode (Keyword when the
// table knows it) or a label declaration `name:`. Later words are checked
// against the opcode's argument slot: constant choices become Keywords,
// identifiers pick up a symbol role from the slot kind.
//
// Columns are char offsets, matching the editor's `Position::col`.

use crate::instruction::{ArgKind, InstructionSpec, InstructionTable};

// ─── Token types ────────────────────────────────────────────────────────────

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// An opcode, or a reserved word (constant choice, `true`/`false`/`null`).
    Keyword,
    Identifier,
    Number,
    String,
    Comment,
    Operator,
    /// A built-in `@` variable (`@counter`, `@unit`, …).
    Builtin,
    /// Text that fits no category (`1abc`, an invalid constant).
    Unknown,
}

/// Symbol meaning of an identifier token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolRole {
    /// `name:` at the start of a line.
    LabelDef,
    /// A jump target.
    LabelRef,
    /// A variable an instruction writes to.
    VariableDef,
    /// A variable an instruction reads.
    VariableRef,
}

impl SymbolRole {
    /// True for the two definition roles.
    #[inline]
    #[must_use]
    pub const fn is_definition(self) -> bool {
        matches!(self, Self::LabelDef | Self::VariableDef)
    }
}

/// A half-open char range `[start, end)` within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// True when `col` lies inside the span.
    #[inline]
    #[must_use]
    pub const fn contains(self, col: usize) -> bool {
        self.start <= col && col < self.end
    }
}

/// One token of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub span: Span,
    pub kind: TokenKind,
    pub role: Option<SymbolRole>,
    /// Index of the whitespace-delimited word the token belongs to. A label
    /// declaration and its colon share one word.
    pub word: usize,
}

impl Token {
    /// The token's text within `line`.
    #[must_use]
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        slice_chars(line, self.span)
    }
}

/// Slice a string by a char span. Out-of-range ends are clamped.
#[must_use]
pub fn slice_chars(s: &str, span: Span) -> &str {
    let start = char_to_byte(s, span.start);
    let end = char_to_byte(s, span.end.max(span.start));
    &s[start..end]
}

/// The comment marker of the language.
pub const COMMENT_MARKER: char = '#';

// ─── Tokenizer ──────────────────────────────────────────────────────────────

/// Tokenize one line. Total over all inputs: unrecognizable text comes back
/// as [`TokenKind::Unknown`], never as an error.
#[must_use]
pub fn tokenize(table: &InstructionTable, line: &str) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut ctx = WordContext::default();
    let mut i = 0;
    // Word counter, bumped at every whitespace gap once a word has started.
    let mut word = 0;
    let mut in_word = false;

    while i < chars.len() {
        let ch = chars[i];

        if ch.is_whitespace() {
            if in_word {
                word += 1;
                in_word = false;
            }
            i += 1;
            continue;
        }

        if ch == COMMENT_MARKER {
            tokens.push(Token {
                span: Span::new(i, chars.len()),
                kind: TokenKind::Comment,
                role: None,
                word,
            });
            break;
        }

        if ch == '"' {
            let close = chars[i + 1..].iter().position(|&c| c == '"');
            let end = close.map_or(chars.len(), |p| i + 1 + p + 1);
            tokens.push(Token {
                span: Span::new(i, end),
                kind: TokenKind::String,
                role: None,
                word,
            });
            ctx.advance(word);
            in_word = true;
            i = end;
            continue;
        }

        let start = i;
        while i < chars.len()
            && !chars[i].is_whitespace()
            && chars[i] != COMMENT_MARKER
            && chars[i] != '"'
        {
            i += 1;
        }
        let text: String = chars[start..i].iter().collect();
        classify_word(table, &mut ctx, &text, Span::new(start, i), word, &mut tokens);
        in_word = true;
    }

    tokens
}

/// Per-line state carried from word to word.
#[derive(Default)]
struct WordContext<'t> {
    /// Word of the last classified fragment. Used to tell the start of a
    /// word from fragments glued to a string (`x"y"z`).
    last_word: Option<usize>,
    /// Opcode of the line, once word 0 has been seen.
    opcode: Option<&'t InstructionSpec>,
}

impl WordContext<'_> {
    const fn advance(&mut self, word: usize) {
        self.last_word = Some(word);
    }

    /// Argument slot of `word`, when it belongs to a known opcode.
    fn slot(&self, word: usize) -> Option<usize> {
        self.opcode.and(word.checked_sub(1))
    }
}

fn classify_word<'t>(
    table: &'t InstructionTable,
    ctx: &mut WordContext<'t>,
    text: &str,
    span: Span,
    word: usize,
    out: &mut Vec<Token>,
) {
    let first_fragment = ctx.last_word != Some(word);
    ctx.advance(word);
    let token = |kind, role| Token {
        span,
        kind,
        role,
        word,
    };

    if word == 0 && first_fragment {
        if let Some(name) = text.strip_suffix(':') {
            if is_identifier(name) {
                out.push(Token {
                    span: Span::new(span.start, span.end - 1),
                    kind: TokenKind::Identifier,
                    role: Some(SymbolRole::LabelDef),
                    word,
                });
                out.push(Token {
                    span: Span::new(span.end - 1, span.end),
                    kind: TokenKind::Operator,
                    role: None,
                    word,
                });
                return;
            }
        }
        if let Some(spec) = table.lookup(text) {
            ctx.opcode = Some(spec);
            out.push(token(TokenKind::Keyword, None));
            return;
        }
    }

    if is_number(text) {
        out.push(token(TokenKind::Number, None));
        return;
    }
    if text.starts_with('@') && text.len() > 1 {
        out.push(token(TokenKind::Builtin, None));
        return;
    }
    if is_operator(text) {
        out.push(token(TokenKind::Operator, None));
        return;
    }
    if text.starts_with(|c: char| c.is_ascii_digit()) {
        out.push(token(TokenKind::Unknown, None));
        return;
    }

    let arg = if first_fragment {
        ctx.slot(word)
            .and_then(|slot| ctx.opcode.and_then(|spec| spec.arg(slot)))
    } else {
        None
    };

    match arg {
        Some(arg) if arg.kind == ArgKind::Constant => {
            if arg.accepts(text) {
                out.push(token(TokenKind::Keyword, None));
            } else {
                out.push(token(TokenKind::Unknown, None));
            }
        }
        _ if table.is_constant(text) => out.push(token(TokenKind::Keyword, None)),
        Some(arg) => {
            let role = match arg.kind {
                ArgKind::Label => SymbolRole::LabelRef,
                ArgKind::Output => SymbolRole::VariableDef,
                ArgKind::Value | ArgKind::Constant => SymbolRole::VariableRef,
            };
            out.push(token(TokenKind::Identifier, Some(role)));
        }
        None => out.push(token(TokenKind::Identifier, None)),
    }
}

// ─── Word predicates ────────────────────────────────────────────────────────

/// Integer or float literal with optional leading `-` and exponent, or a
/// `0x` / `0b` literal.
#[must_use]
pub fn is_number(word: &str) -> bool {
    let body = word.strip_prefix('-').unwrap_or(word);
    if let Some(hex) = body.strip_prefix("0x") {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(bin) = body.strip_prefix("0b") {
        return !bin.is_empty() && bin.chars().all(|c| c == '0' || c == '1');
    }

    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };

    let (int, frac) = mantissa
        .split_once('.')
        .map_or((mantissa, None), |(i, f)| (i, Some(f)));
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let mantissa_ok = digits(int)
        && frac.is_none_or(digits)
        && (!int.is_empty() || frac.is_some_and(|f| !f.is_empty()));

    let exponent_ok = exponent.is_none_or(|e| {
        let e = e.strip_prefix('-').unwrap_or(e);
        !e.is_empty() && digits(e)
    });

    mantissa_ok && exponent_ok
}

/// A name usable as a label or variable.
#[must_use]
pub fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|c| !c.is_ascii_digit() && !c.is_whitespace() && c != '@' && !is_punct(c))
        && chars.all(|c| !c.is_whitespace() && c != COMMENT_MARKER && c != '"' && c != ':')
}

/// Words made only of punctuation (`+`, `:`, `==`, …).
fn is_operator(word: &str) -> bool {
    !word.is_empty() && word.chars().all(is_punct)
}

fn is_punct(c: char) -> bool {
    !c.is_alphanumeric() && c != '_' && !c.is_whitespace()
}

fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices().nth(char_offset).map_or(s.len(), |(b, _)| b)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
