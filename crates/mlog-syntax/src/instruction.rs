// SPDX-License-Identifier: MIT
//
// Instruction table — the static registry of Mindustry logic opcodes.
//
// Every opcode the language knows is described by an `InstructionSpec`: its
// name, its arity (fixed or variadic) and the expected kind of each argument
// slot. The lexer consults the table to classify the first word of a line
// and to give argument words a symbol role; the completer consults it to
// decide what belongs in the slot under the cursor.
//
// The built-in table is parsed once from the embedded `instructions.json`
// and shared process-wide through `InstructionTable::builtin()`. Hosts with
// their own syntax file can build a separate table with `from_json`.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;
use thiserror::Error;

/// Embedded syntax description for the stock game processors.
const BUILTIN_SYNTAX: &str = include_str!("instructions.json");

static BUILTIN: LazyLock<InstructionTable> = LazyLock::new(|| {
    InstructionTable::from_json(BUILTIN_SYNTAX).unwrap_or_else(|err| {
        tracing::error!(target: "mlog::syntax", %err, "embedded instruction table rejected");
        InstructionTable::default()
    })
});

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Failure to build an [`InstructionTable`] from a syntax description.
#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("malformed syntax description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("instruction `{0}` is declared twice")]
    Duplicate(String),

    #[error("variadic instruction `{0}` declares no arguments to repeat")]
    EmptyVariadic(String),

    #[error("argument `{arg}` of `{instruction}` is a constant with no choices")]
    NoChoices { instruction: String, arg: String },
}

// ─── Argument shapes ────────────────────────────────────────────────────────

/// What an argument slot expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    /// Any value: a number, string, variable or built-in.
    Value,
    /// A jump target: a label name or a line number.
    Label,
    /// One of a fixed set of words (`always`, `add`, `enemy`, …).
    Constant,
    /// A variable the instruction assigns to.
    Output,
}

/// Number of arguments an instruction takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    Fixed(usize),
    /// At least `min` arguments; slots past the declared ones repeat the
    /// last declared argument.
    Variadic { min: usize },
}

/// One declared argument slot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    pub kind: ArgKind,
    /// Accepted words for [`ArgKind::Constant`] slots. Empty otherwise.
    #[serde(default)]
    pub choices: Vec<String>,
}

impl ArgSpec {
    /// True when `word` is one of this slot's constant choices.
    #[must_use]
    pub fn accepts(&self, word: &str) -> bool {
        self.kind == ArgKind::Constant && self.choices.iter().any(|c| c == word)
    }
}

/// Signature of one opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSpec {
    pub name: String,
    pub summary: String,
    pub arity: Arity,
    pub args: Vec<ArgSpec>,
}

impl InstructionSpec {
    /// The argument spec for the 0-based argument `slot` (the word after the
    /// opcode is slot 0). Variadic instructions repeat their last declared
    /// argument; fixed-arity instructions return `None` past the end.
    #[must_use]
    pub fn arg(&self, slot: usize) -> Option<&ArgSpec> {
        match self.arity {
            Arity::Fixed(_) => self.args.get(slot),
            Arity::Variadic { .. } => self.args.get(slot).or_else(|| self.args.last()),
        }
    }

    /// Expected kind of argument `slot`, if the slot exists.
    #[inline]
    #[must_use]
    pub fn arg_kind(&self, slot: usize) -> Option<ArgKind> {
        self.arg(slot).map(|a| a.kind)
    }

    /// True when the instruction takes a variable number of arguments.
    #[inline]
    #[must_use]
    pub const fn is_variadic(&self) -> bool {
        matches!(self.arity, Arity::Variadic { .. })
    }
}

// ─── Raw syntax file ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawSyntax {
    instructions: Vec<RawInstruction>,
    #[serde(default)]
    special_variables: Vec<String>,
    #[serde(default)]
    constants: Vec<String>,
}

#[derive(Deserialize)]
struct RawInstruction {
    name: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    variadic: bool,
    #[serde(default)]
    args: Vec<ArgSpec>,
}

impl RawInstruction {
    fn into_spec(self) -> Result<InstructionSpec, SyntaxError> {
        if self.variadic && self.args.is_empty() {
            return Err(SyntaxError::EmptyVariadic(self.name));
        }
        if let Some(arg) = self
            .args
            .iter()
            .find(|a| a.kind == ArgKind::Constant && a.choices.is_empty())
        {
            return Err(SyntaxError::NoChoices {
                instruction: self.name.clone(),
                arg: arg.name.clone(),
            });
        }
        let arity = if self.variadic {
            Arity::Variadic {
                min: self.args.len() - 1,
            }
        } else {
            Arity::Fixed(self.args.len())
        };
        Ok(InstructionSpec {
            name: self.name,
            summary: self.summary,
            arity,
            args: self.args,
        })
    }
}

// ─── InstructionTable ───────────────────────────────────────────────────────

/// Read-only registry of opcodes, built-in `@` variables and global
/// constants.
#[derive(Debug, Clone, Default)]
pub struct InstructionTable {
    /// Sorted by name.
    specs: Vec<InstructionSpec>,
    by_name: HashMap<String, usize>,
    builtins: Vec<String>,
    constants: Vec<String>,
}

impl InstructionTable {
    /// The table for the stock game, parsed once per process. A malformed
    /// embedded description is logged and yields an empty table.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Build a table from a JSON syntax description.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError`] when the JSON does not match the expected
    /// shape, an opcode is declared twice, or a declaration is incomplete.
    pub fn from_json(source: &str) -> Result<Self, SyntaxError> {
        let raw: RawSyntax = serde_json::from_str(source)?;

        let mut specs = raw
            .instructions
            .into_iter()
            .map(RawInstruction::into_spec)
            .collect::<Result<Vec<_>, _>>()?;
        specs.sort_by(|a, b| a.name.cmp(&b.name));

        let mut by_name = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if by_name.insert(spec.name.clone(), i).is_some() {
                return Err(SyntaxError::Duplicate(spec.name.clone()));
            }
        }

        let mut builtins = raw.special_variables;
        builtins.sort();
        builtins.dedup();

        tracing::debug!(
            target: "mlog::syntax",
            opcodes = specs.len(),
            builtins = builtins.len(),
            "instruction_table_loaded"
        );

        Ok(Self {
            specs,
            by_name,
            builtins,
            constants: raw.constants,
        })
    }

    /// Look up an opcode by exact (case-sensitive) name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&InstructionSpec> {
        self.by_name.get(name).map(|&i| &self.specs[i])
    }

    /// True when `name` is a known opcode.
    #[inline]
    #[must_use]
    pub fn is_opcode(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All opcodes in alphabetical order.
    pub fn opcodes(&self) -> impl Iterator<Item = &InstructionSpec> {
        self.specs.iter()
    }

    /// Number of opcodes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True when the table declares no opcodes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Built-in `@` variables, sorted.
    #[must_use]
    pub fn builtin_variables(&self) -> &[String] {
        &self.builtins
    }

    /// True when `word` is a known built-in variable.
    #[must_use]
    pub fn is_builtin_variable(&self, word: &str) -> bool {
        self.builtins
            .binary_search_by(|b| b.as_str().cmp(word))
            .is_ok()
    }

    /// Global constants valid in any value position (`true`, `false`,
    /// `null`).
    #[must_use]
    pub fn constants(&self) -> &[String] {
        &self.constants
    }

    /// True when `word` is a global constant.
    #[must_use]
    pub fn is_constant(&self, word: &str) -> bool {
        self.constants.iter().any(|c| c == word)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_table_parses() {
        let parsed = InstructionTable::from_json(BUILTIN_SYNTAX).unwrap();
        let table = InstructionTable::builtin();
        assert_eq!(table.len(), parsed.len());
        assert!(!table.is_empty());
        assert!(table.is_opcode("jump"));
        assert!(table.is_opcode("print"));
        assert!(!table.is_opcode("Jump"));
    }

    #[test]
    fn fallback_table_knows_nothing() {
        let table = InstructionTable::default();
        assert!(table.is_empty());
        assert!(!table.is_opcode("set"));
        assert_eq!(table.opcodes().count(), 0);
    }

    #[test]
    fn opcodes_are_sorted() {
        let names: Vec<&str> = InstructionTable::builtin()
            .opcodes()
            .map(|s| s.name.as_str())
            .collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn jump_signature() {
        let jump = InstructionTable::builtin().lookup("jump").unwrap();
        assert_eq!(jump.arity, Arity::Fixed(4));
        assert_eq!(jump.arg_kind(0), Some(ArgKind::Label));
        assert_eq!(jump.arg_kind(1), Some(ArgKind::Constant));
        assert!(jump.arg(1).unwrap().accepts("always"));
        assert!(!jump.arg(1).unwrap().accepts("sometimes"));
        assert_eq!(jump.arg_kind(4), None);
    }

    #[test]
    fn variadic_repeats_last_argument() {
        let draw = InstructionTable::builtin().lookup("draw").unwrap();
        assert!(draw.is_variadic());
        assert_eq!(draw.arity, Arity::Variadic { min: 1 });
        assert_eq!(draw.arg_kind(0), Some(ArgKind::Constant));
        assert_eq!(draw.arg_kind(1), Some(ArgKind::Value));
        assert_eq!(draw.arg_kind(9), Some(ArgKind::Value));
    }

    #[test]
    fn nullary_instructions() {
        let end = InstructionTable::builtin().lookup("end").unwrap();
        assert_eq!(end.arity, Arity::Fixed(0));
        assert!(end.arg(0).is_none());
    }

    #[test]
    fn builtin_variables_and_constants() {
        let table = InstructionTable::builtin();
        assert!(table.is_builtin_variable("@counter"));
        assert!(table.is_builtin_variable("@phase-fabric"));
        assert!(!table.is_builtin_variable("counter"));
        assert!(table.is_constant("true"));
        assert!(!table.is_constant("maybe"));
    }

    #[test]
    fn from_json_minimal() {
        let table = InstructionTable::from_json(
            r#"{"instructions": [{"name": "nop"}, {"name": "go", "args": [{"name": "to", "kind": "label"}]}]}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("go").unwrap().arg_kind(0), Some(ArgKind::Label));
        assert!(table.builtin_variables().is_empty());
    }

    #[test]
    fn from_json_rejects_duplicates() {
        let err = InstructionTable::from_json(
            r#"{"instructions": [{"name": "nop"}, {"name": "nop"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SyntaxError::Duplicate(name) if name == "nop"));
    }

    #[test]
    fn from_json_rejects_empty_variadic() {
        let err = InstructionTable::from_json(
            r#"{"instructions": [{"name": "many", "variadic": true}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SyntaxError::EmptyVariadic(_)));
    }

    #[test]
    fn from_json_rejects_constant_without_choices() {
        let err = InstructionTable::from_json(
            r#"{"instructions": [{"name": "pick", "args": [{"name": "mode", "kind": "constant"}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SyntaxError::NoChoices { .. }));
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            InstructionTable::from_json("not json"),
            Err(SyntaxError::Json(_))
        ));
    }
}
