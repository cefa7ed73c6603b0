// SPDX-License-Identifier: MIT
//
// mlog-syntax — the Mindustry logic language model for mlog-edit.
//
//   instruction → static opcode registry (signatures, built-ins, constants)
//   lexer       → one line of text to an ordered token list
//   highlight   → token categories to style tags, with a per-line cache
//
// Everything here is pure and line-local. Buffer management, symbol
// tracking and completion live in mlog-editor.

pub mod highlight;
pub mod instruction;
pub mod lexer;

pub use highlight::{Highlighter, StyleTag, StyledSpan, style_line};
pub use instruction::{ArgKind, ArgSpec, Arity, InstructionSpec, InstructionTable, SyntaxError};
pub use lexer::{Span, SymbolRole, Token, TokenKind, tokenize};
