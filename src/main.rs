// SPDX-License-Identifier: MIT
//
// mlog-edit — command-line host for the Mindustry logic editing core.
//
// This binary wires the two library crates to a file on disk:
//
//   mlog-syntax → instruction table, lexer, highlighter
//   mlog-editor → buffer, symbols, completion, search, options
//
// Each subcommand opens the file as a Document, runs one query or command
// and prints the result. Files are never written: `replace` prints the new
// text on stdout.
//
//   mlog-edit [OPTIONS] highlight FILE
//   mlog-edit [OPTIONS] symbols FILE
//   mlog-edit [OPTIONS] complete FILE LINE COL
//   mlog-edit [OPTIONS] find FILE PATTERN
//   mlog-edit [OPTIONS] replace FILE PATTERN REPLACEMENT
//
// Options:
//
//   -s, --set DIRECTIVES   editor options, e.g. "noic ww ts=2"
//       --syntax FILE      instruction table JSON replacing the stock one
//
// Logging goes to stderr, filtered by MLOG_LOG (default "warn").

use std::env;
use std::fs;
use std::io;
use std::process;
use std::sync::atomic::AtomicBool;

use mlog_editor::buffer::TextBuffer;
use mlog_editor::options::OptionError;
use mlog_editor::position::Position;
use mlog_editor::symbols::SymbolKind;
use mlog_editor::{Document, EditError};
use mlog_syntax::lexer::slice_chars;
use mlog_syntax::{InstructionTable, SyntaxError};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: mlog-edit [-s DIRECTIVES] [--syntax FILE] <command> FILE [ARGS]

commands:
  highlight FILE                       print style tags and code line numbers
  symbols FILE                         list labels and variables
  complete FILE LINE COL               completion candidates (1-indexed)
  find FILE PATTERN                    list every match
  replace FILE PATTERN REPLACEMENT     print the text with all matches replaced";

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}\n\n{usage}", usage = USAGE)]
    Usage(String),

    #[error("{path}: {source}")]
    Io { path: String, source: io::Error },

    #[error("{path}: {source}")]
    Syntax { path: String, source: SyntaxError },

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Option(#[from] OptionError),
}

fn usage(msg: impl Into<String>) -> CliError {
    CliError::Usage(msg.into())
}

fn read(path: &str) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_string(),
        source,
    })
}

// ─── Arguments ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Args {
    directives: Vec<String>,
    syntax: Option<String>,
    command: Vec<String>,
}

fn parse_args(raw: impl Iterator<Item = String>) -> Result<Args, CliError> {
    let mut args = Args::default();
    let mut raw = raw.peekable();
    while let Some(arg) = raw.next_if(|a| a.starts_with('-')) {
        match arg.as_str() {
            "-s" | "--set" => args
                .directives
                .push(raw.next().ok_or_else(|| usage("--set needs a value"))?),
            "--syntax" => {
                args.syntax = Some(raw.next().ok_or_else(|| usage("--syntax needs a file"))?);
            }
            "-h" | "--help" => return Err(usage("")),
            other => return Err(usage(format!("unknown option {other}"))),
        }
    }
    args.command.extend(raw);
    Ok(args)
}

/// 1-indexed line or column argument to a 0-indexed value.
fn parse_index(what: &str, value: &str) -> Result<usize, CliError> {
    value
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| usage(format!("{what} must be a positive number, got {value:?}")))
}

// ─── Commands ───────────────────────────────────────────────────────────────

fn open(args: &Args, path: &str) -> Result<Document, CliError> {
    let table = match &args.syntax {
        Some(syntax) => {
            let table = InstructionTable::from_json(&read(syntax)?).map_err(|source| {
                CliError::Syntax {
                    path: syntax.clone(),
                    source,
                }
            })?;
            // Lives for the rest of the process, like the stock table.
            &*Box::leak(Box::new(table))
        }
        None => InstructionTable::builtin(),
    };
    let mut doc = Document::with_table(TextBuffer::from_text(&read(path)?), table);
    for directive in &args.directives {
        doc.set_option(directive)?;
    }
    tracing::info!(target: "mlog::cli", path = %path, lines = doc.buffer().line_count(), "opened");
    Ok(doc)
}

fn highlight(doc: &mut Document) {
    for styled in doc.styled_lines() {
        let text = doc.buffer().line(styled.line).unwrap_or_default();
        let spans: Vec<String> = styled
            .spans
            .iter()
            .map(|s| format!("[{} {}]", s.tag, slice_chars(&text, s.span)))
            .collect();
        let code = doc
            .code_line_number(styled.line)
            .ok()
            .flatten()
            .map_or_else(String::new, |n| n.to_string());
        println!("{:>4} {code:>4}: {}", styled.line + 1, spans.join(" "));
    }
}

fn symbols(doc: &Document) {
    for sym in doc.symbols().all_symbols() {
        let kind = match sym.kind {
            SymbolKind::Label => "label",
            SymbolKind::Variable => "variable",
            SymbolKind::Implicit => "implicit",
        };
        let def = sym
            .defining_line
            .map_or_else(|| "-".to_string(), |l| (l + 1).to_string());
        let refs: Vec<String> = sym.references.iter().map(|l| (l + 1).to_string()).collect();
        println!("{}\t{kind}\tdef {def}\trefs {}", sym.name, refs.join(","));
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let [command, path, rest @ ..] = args.command.as_slice() else {
        return Err(usage("missing command or file"));
    };
    let mut doc = open(args, path)?;

    match (command.as_str(), rest) {
        ("highlight", []) => highlight(&mut doc),
        ("symbols", []) => symbols(&doc),
        ("complete", [line, col]) => {
            let pos = Position::new(parse_index("LINE", line)?, parse_index("COL", col)?);
            for c in doc.complete(pos)? {
                let detail = c.detail.unwrap_or_default();
                println!("{}\t{:?}\t{}\t{detail}", c.insert, c.kind, c.score);
            }
        }
        ("find", [pattern]) => {
            let count = doc.buffer().line_count();
            for m in doc.find_all(pattern, 0..count)? {
                let text = doc.buffer().line(m.start.line).unwrap_or_default();
                println!("{}\t{text}", m.start);
            }
        }
        ("replace", [pattern, replacement]) => {
            let cancel = AtomicBool::new(false);
            let outcome = doc.replace_all(pattern, replacement, &cancel)?;
            eprintln!("mlog-edit: {} replacement(s)", outcome.count);
            print!("{}", doc.buffer().contents());
        }
        (cmd, _) => return Err(usage(format!("bad arguments for {cmd:?}"))),
    }
    Ok(())
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn init_logging() {
    let filter = EnvFilter::try_from_env("MLOG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed by an embedding test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() {
    init_logging();

    let args = parse_args(env::args().skip(1)).unwrap_or_else(|e| {
        eprintln!("mlog-edit: {e}");
        process::exit(1);
    });

    if let Err(e) = run(&args) {
        eprintln!("mlog-edit: {e}");
        process::exit(1);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
