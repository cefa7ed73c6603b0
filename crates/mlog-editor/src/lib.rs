//! # mlog-editor — Editing core for mlog-edit
//!
//! This crate keeps a Mindustry logic buffer and everything derived from it
//! consistent across edits:
//!
//! - **[`position`]** — `Position`, `Range` and `Selection`, 0-indexed
//! - **[`buffer`]** — `TextBuffer`, a rope with stable line handles and a
//!   line change log
//! - **[`symbols`]** — `SymbolIndex`, labels and variables across the buffer
//! - **[`complete`]** — ranked completion candidates for the cursor
//! - **[`line_ops`]** — delete, move, duplicate, comment toggle, tab
//! - **[`search`]** — find, find all, replace, replace all
//! - **[`options`]** — `:set`-style editor options
//! - **[`document`]** — `Document`, the session tying it all together
//!
//! Lexing and styling come from `mlog-syntax`.

pub mod buffer;
pub mod complete;
pub mod document;
pub mod error;
pub mod line_ops;
pub mod options;
pub mod position;
pub mod search;
pub mod symbols;

pub use document::{Document, EditOutcome, ReplaceAllOutcome, StyledLine};
pub use error::{EditError, Result};
