//! Symbol index — labels and variables across the buffer.
//!
//! The index is keyed by stable [`LineId`] handles, not by line numbers.
//! Each line's contribution (the names it defines and references) is stored
//! under its handle, and a separate position table maps handles to current
//! line indices. Consequences:
//!
//! - **Editing a line** rescans only that line: its old contribution is
//!   withdrawn and the new one merged.
//! - **Inserting, removing or moving lines** renumbers the position table.
//!   No text is rescanned.
//!
//! A name is a `Label` while at least one `name:` declaration exists, else a
//! `Variable` while at least one instruction writes it, else `Implicit`: a
//! dangling reference kept so completion can still offer it. A name with no
//! definitions and no references disappears.

use std::collections::{BTreeSet, HashMap, HashSet};

use mlog_syntax::{SymbolRole, Token};

use crate::buffer::{LineId, Shift};

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// What a name currently denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    Label,
    Variable,
    /// Referenced but defined nowhere.
    Implicit,
}

/// A snapshot of one name, in current line numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// First line defining the name with the winning kind. `None` for
    /// `Implicit` symbols.
    pub defining_line: Option<usize>,
    /// Lines that reference the name.
    pub references: BTreeSet<usize>,
}

impl Symbol {
    #[inline]
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        self.defining_line.is_some()
    }
}

// ---------------------------------------------------------------------------
// Internal bookkeeping
// ---------------------------------------------------------------------------

/// Lines mentioning one name, split by role.
#[derive(Debug, Default)]
struct Entry {
    label_defs: HashSet<LineId>,
    var_defs: HashSet<LineId>,
    refs: HashSet<LineId>,
}

impl Entry {
    fn set_for(&mut self, role: SymbolRole) -> &mut HashSet<LineId> {
        match role {
            SymbolRole::LabelDef => &mut self.label_defs,
            SymbolRole::VariableDef => &mut self.var_defs,
            SymbolRole::LabelRef | SymbolRole::VariableRef => &mut self.refs,
        }
    }

    fn is_empty(&self) -> bool {
        self.label_defs.is_empty() && self.var_defs.is_empty() && self.refs.is_empty()
    }

    fn kind(&self) -> SymbolKind {
        if !self.label_defs.is_empty() {
            SymbolKind::Label
        } else if !self.var_defs.is_empty() {
            SymbolKind::Variable
        } else {
            SymbolKind::Implicit
        }
    }
}

/// Names one line contributes, with their roles. Deduplicated.
type Contribution = Vec<(String, SymbolRole)>;

// ---------------------------------------------------------------------------
// SymbolIndex
// ---------------------------------------------------------------------------

/// Incrementally maintained name → symbol map.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    contributions: HashMap<LineId, Contribution>,
    positions: HashMap<LineId, usize>,
    names: HashMap<String, Entry>,
}

impl SymbolIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    // -- Updates ------------------------------------------------------------

    /// A line's tokens changed (or the line is new). Withdraws what the line
    /// contributed before and merges what `tokens` define and reference.
    /// `text` is the line the tokens were produced from.
    pub fn on_line_changed(&mut self, id: LineId, index: usize, text: &str, tokens: &[Token]) {
        self.withdraw(id);
        self.positions.insert(id, index);

        let mut contribution: Contribution = Vec::new();
        for token in tokens {
            let Some(role) = token.role else { continue };
            let name = token.text(text);
            if name.is_empty() || contribution.iter().any(|(n, r)| n == name && *r == role) {
                continue;
            }
            contribution.push((name.to_owned(), role));
        }

        for (name, role) in &contribution {
            self.names
                .entry(name.clone())
                .or_default()
                .set_for(*role)
                .insert(id);
        }
        tracing::trace!(
            target: "mlog::symbols",
            line = index,
            names = contribution.len(),
            "line_indexed"
        );
        if !contribution.is_empty() {
            self.contributions.insert(id, contribution);
        }
    }

    /// Record a line's position without contributing names. Used for lines
    /// whose tokens are not known yet.
    pub fn track_line(&mut self, id: LineId, index: usize) {
        self.positions.insert(id, index);
    }

    /// A line was deleted.
    pub fn on_line_removed(&mut self, id: LineId) {
        self.withdraw(id);
        self.positions.remove(&id);
    }

    /// Every line at index `from` or later moved by `delta`.
    pub fn on_lines_shifted(&mut self, from: usize, delta: isize) {
        self.shift(&[Shift::from(from, delta)]);
    }

    /// Apply several shifts at once, each numbered against the indices
    /// before the call. A line is moved by the first shift covering it.
    /// Returns the handles of the lines that moved.
    pub fn shift(&mut self, shifts: &[Shift]) -> Vec<LineId> {
        let mut moved = Vec::new();
        for (&id, index) in &mut self.positions {
            if let Some(new) = shifts.iter().find_map(|s| s.apply(*index)) {
                if new != *index {
                    *index = new;
                    moved.push(id);
                }
            }
        }
        moved
    }

    fn withdraw(&mut self, id: LineId) {
        let Some(contribution) = self.contributions.remove(&id) else {
            return;
        };
        for (name, role) in contribution {
            if let Some(entry) = self.names.get_mut(&name) {
                entry.set_for(role).remove(&id);
                if entry.is_empty() {
                    self.names.remove(&name);
                }
            }
        }
    }

    // -- Queries ------------------------------------------------------------

    /// Current index of a tracked line.
    #[must_use]
    pub fn position_of(&self, id: LineId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Snapshot of one name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.names.get(name).map(|entry| self.snapshot(name, entry))
    }

    /// Kind of a name, without building a snapshot.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<SymbolKind> {
        self.names.get(name).map(Entry::kind)
    }

    /// Snapshots of every name, sorted by name.
    #[must_use]
    pub fn all_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .names
            .iter()
            .map(|(name, entry)| self.snapshot(name, entry))
            .collect();
        symbols.sort_by(|a, b| a.name.cmp(&b.name));
        symbols
    }

    fn snapshot(&self, name: &str, entry: &Entry) -> Symbol {
        let kind = entry.kind();
        let defs = match kind {
            SymbolKind::Label => &entry.label_defs,
            SymbolKind::Variable => &entry.var_defs,
            SymbolKind::Implicit => &entry.refs,
        };
        let defining_line = match kind {
            SymbolKind::Implicit => None,
            _ => defs.iter().filter_map(|id| self.position_of(*id)).min(),
        };
        let references = entry
            .refs
            .iter()
            .filter_map(|id| self.position_of(*id))
            .collect();
        Symbol {
            name: name.to_owned(),
            kind,
            defining_line,
            references,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
