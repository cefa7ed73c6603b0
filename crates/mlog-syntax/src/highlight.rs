// SPDX-License-Identifier: MIT
//
// Highlighter — token categories to style tags.
//
// Styling is a pure function of one line's tokens: no state crosses lines,
// so restyling a line never forces restyling its neighbours. The
// `Highlighter` cache remembers the last styling per line key so the editor
// can hand unchanged lines back to the display layer without recomputing
// them, and can tell exactly which lines it restyled.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::lexer::{Span, Token, TokenKind};

// ─── StyleTag ───────────────────────────────────────────────────────────────

/// Display style of a span. The display layer maps tags to colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleTag {
    Keyword,
    Identifier,
    Number,
    String,
    Comment,
    Operator,
    /// Built-in `@` variables.
    Special,
    Error,
}

impl StyleTag {
    /// Short tag name (`"kw"`, `"cm"`, …) for hosts that key themes by
    /// string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "kw",
            Self::Identifier => "id",
            Self::Number => "num",
            Self::String => "str",
            Self::Comment => "cm",
            Self::Operator => "op",
            Self::Special => "sv",
            Self::Error => "err",
        }
    }

    /// Style for a token category.
    #[must_use]
    pub const fn for_kind(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Keyword => Self::Keyword,
            TokenKind::Identifier => Self::Identifier,
            TokenKind::Number => Self::Number,
            TokenKind::String => Self::String,
            TokenKind::Comment => Self::Comment,
            TokenKind::Operator => Self::Operator,
            TokenKind::Builtin => Self::Special,
            TokenKind::Unknown => Self::Error,
        }
    }
}

impl fmt::Display for StyleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A styled span of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyledSpan {
    pub span: Span,
    pub tag: StyleTag,
}

/// Style one line's tokens. Output order follows token order.
#[must_use]
pub fn style_line(tokens: &[Token]) -> Vec<StyledSpan> {
    tokens
        .iter()
        .map(|t| StyledSpan {
            span: t.span,
            tag: StyleTag::for_kind(t.kind),
        })
        .collect()
}

// ─── Highlighter ────────────────────────────────────────────────────────────

/// Per-line styling cache keyed by a stable line handle.
#[derive(Debug)]
pub struct Highlighter<K> {
    styled: HashMap<K, Vec<StyledSpan>>,
    /// Number of restyle passes since creation.
    passes: u64,
}

impl<K: Eq + Hash> Highlighter<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            styled: HashMap::new(),
            passes: 0,
        }
    }

    /// Restyle a line whose tokens changed and cache the result.
    pub fn restyle(&mut self, key: K, tokens: &[Token]) -> &[StyledSpan] {
        self.passes += 1;
        let spans = style_line(tokens);
        let slot = self.styled.entry(key).or_default();
        *slot = spans;
        slot
    }

    /// Cached styling of a line, if it has been styled.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&[StyledSpan]> {
        self.styled.get(key).map(Vec::as_slice)
    }

    /// Drop a deleted line.
    pub fn forget(&mut self, key: &K) {
        self.styled.remove(key);
    }

    /// Number of lines with cached styling.
    #[must_use]
    pub fn len(&self) -> usize {
        self.styled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.styled.is_empty()
    }

    /// Total restyle passes performed.
    #[must_use]
    pub const fn passes(&self) -> u64 {
        self.passes
    }
}

impl<K: Eq + Hash> Default for Highlighter<K> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
