//! Editor options and the `:set` directives that change them.
//!
//! Options are changed with `:set`-style directives, parsed here and applied
//! to an [`Options`] value. Hosts that persist settings store the directive
//! strings and replay them at startup.
//!
//! # Supported syntax
//!
//! | Syntax          | Effect                        |
//! |-----------------|-------------------------------|
//! | `option`        | Enable boolean / show numeric |
//! | `nooption`      | Disable boolean               |
//! | `option!`       | Toggle boolean                |
//! | `option?`       | Query current value           |
//! | `option=N`      | Assign numeric value          |
//! | (empty)         | Show changed options          |
//! | `all`           | Show all options              |
//!
//! # Option names
//!
//! | Full name        | Abbrev | Type    | Default |
//! |------------------|--------|---------|---------|
//! | `tabstop`        | `ts`   | integer | 4       |
//! | `maxcompletions` | `mc`   | integer | 50      |
//! | `ignorecase`     | `ic`   | bool    | true    |
//! | `wholeword`      | `ww`   | bool    | false   |
//! | `regex`          | `re`   | bool    | false   |
//! | `wrapscan`       | `ws`   | bool    | true    |

use thiserror::Error;

use crate::search::SearchFlags;

/// A parsed `:set` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetDirective {
    /// `option` enables a boolean option.
    On(String),

    /// `nooption` disables a boolean option.
    Off(String),

    /// `option!` toggles a boolean option.
    Toggle(String),

    /// `option?` queries the current value.
    Query(String),

    /// `option=value` assigns a value.
    Assign(String, String),

    /// No arguments: list the options that differ from their defaults.
    ShowChanged,

    /// `all` lists every option.
    ShowAll,
}

/// Errors from applying a directive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option: {0}")]
    Unknown(String),

    /// A boolean directive (`no`, `!`) on a numeric option, or an
    /// assignment to a boolean one.
    #[error("invalid argument: {0}")]
    WrongType(String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Canonical name of an option, resolving abbreviations.
fn canonical(name: &str) -> Option<&'static str> {
    Some(match name {
        "tabstop" | "ts" => "tabstop",
        "maxcompletions" | "mc" => "maxcompletions",
        "ignorecase" | "ic" => "ignorecase",
        "wholeword" | "ww" => "wholeword",
        "regex" | "re" => "regex",
        "wrapscan" | "ws" => "wrapscan",
        _ => return None,
    })
}

/// Returns `true` if `name` is a known boolean option (full name or abbreviation).
#[must_use]
pub fn is_bool_option(name: &str) -> bool {
    matches!(
        canonical(name),
        Some("ignorecase" | "wholeword" | "regex" | "wrapscan")
    )
}

/// Returns `true` if `name` is a known numeric option (full name or abbreviation).
#[must_use]
pub fn is_numeric_option(name: &str) -> bool {
    matches!(canonical(name), Some("tabstop" | "maxcompletions"))
}

/// Returns `true` if `name` is any known option.
#[must_use]
pub fn is_known_option(name: &str) -> bool {
    canonical(name).is_some()
}

/// Split a `:set` argument string into directives, one per
/// whitespace-separated word. A blank string lists changed options.
#[must_use]
pub fn parse_set(args: &str) -> Vec<SetDirective> {
    let directives: Vec<SetDirective> = args.split_whitespace().map(parse_set_arg).collect();
    if directives.is_empty() {
        vec![SetDirective::ShowChanged]
    } else {
        directives
    }
}

/// Parse one `:set` word. Assignment is recognised before the `?` and `!`
/// suffixes, and those before the `no` prefix.
#[must_use]
pub fn parse_set_arg(arg: &str) -> SetDirective {
    if arg == "all" {
        SetDirective::ShowAll
    } else if let Some((name, value)) = arg.split_once('=') {
        SetDirective::Assign(name.to_string(), value.to_string())
    } else if let Some(name) = arg.strip_suffix('?') {
        SetDirective::Query(name.to_string())
    } else if let Some(name) = arg.strip_suffix('!') {
        SetDirective::Toggle(name.to_string())
    } else if let Some(name) = arg.strip_prefix("no").filter(|n| is_bool_option(n)) {
        SetDirective::Off(name.to_string())
    } else if is_numeric_option(arg) {
        // `:set ts` shows the value rather than failing.
        SetDirective::Query(arg.to_string())
    } else {
        SetDirective::On(arg.to_string())
    }
}

/// Format a boolean option for display: `"name"` when true, `"noname"`
/// when false.
#[must_use]
pub fn format_bool(name: &str, value: bool) -> String {
    if value {
        name.to_string()
    } else {
        format!("no{name}")
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Current option values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Columns between tab stops for [`insert_tab`](crate::line_ops::insert_tab).
    pub tabstop: usize,
    /// Most completion candidates returned.
    pub maxcompletions: usize,
    pub ignorecase: bool,
    pub wholeword: bool,
    pub regex: bool,
    pub wrapscan: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tabstop: 4,
            maxcompletions: 50,
            ignorecase: true,
            wholeword: false,
            regex: false,
            wrapscan: true,
        }
    }
}

const ALL: [&str; 6] = [
    "tabstop",
    "maxcompletions",
    "ignorecase",
    "wholeword",
    "regex",
    "wrapscan",
];

impl Options {
    /// Parse and apply an argument string. Returns the display lines
    /// produced by queries and listings.
    ///
    /// Directives are applied in order; the first failing one stops the
    /// rest and earlier ones stay applied.
    ///
    /// # Errors
    ///
    /// The first [`OptionError`] encountered.
    pub fn set(&mut self, args: &str) -> Result<Vec<String>, OptionError> {
        let mut shown = Vec::new();
        for directive in parse_set(args) {
            shown.extend(self.apply(&directive)?);
        }
        Ok(shown)
    }

    /// Apply one directive. Returns display lines for queries and listings.
    ///
    /// # Errors
    ///
    /// `Unknown` for an unknown name, `WrongType` for a boolean directive
    /// on a numeric option (or the reverse), `InvalidValue` for a value that
    /// is not a positive integer.
    pub fn apply(&mut self, directive: &SetDirective) -> Result<Vec<String>, OptionError> {
        match directive {
            SetDirective::ShowAll => Ok(ALL.iter().map(|n| self.show(n)).collect()),
            SetDirective::ShowChanged => {
                let defaults = Self::default();
                Ok(ALL
                    .iter()
                    .filter(|n| self.show(n) != defaults.show(n))
                    .map(|n| self.show(n))
                    .collect())
            }
            SetDirective::Query(name) => Ok(vec![self.show(resolve(name)?)]),
            SetDirective::On(name) => self.set_bool(name, |_| true),
            SetDirective::Off(name) => self.set_bool(name, |_| false),
            SetDirective::Toggle(name) => self.set_bool(name, |v| !v),
            SetDirective::Assign(name, value) => {
                let canon = resolve(name)?;
                if !is_numeric_option(canon) {
                    return Err(OptionError::WrongType(format!("{name}={value}")));
                }
                let n = value
                    .parse::<usize>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| OptionError::InvalidValue {
                        name: canon.to_string(),
                        value: value.clone(),
                    })?;
                match canon {
                    "tabstop" => self.tabstop = n,
                    _ => self.maxcompletions = n,
                }
                tracing::debug!(target: "mlog::options", option = canon, value = n, "set");
                Ok(Vec::new())
            }
        }
    }

    fn set_bool(&mut self, name: &str, f: impl Fn(bool) -> bool) -> Result<Vec<String>, OptionError> {
        let canon = resolve(name)?;
        let slot = match canon {
            "ignorecase" => &mut self.ignorecase,
            "wholeword" => &mut self.wholeword,
            "regex" => &mut self.regex,
            "wrapscan" => &mut self.wrapscan,
            // A bare numeric name parses as a query; `no`/`!` forms land here.
            _ => return Err(OptionError::WrongType(name.to_string())),
        };
        *slot = f(*slot);
        tracing::debug!(target: "mlog::options", option = canon, value = *slot, "set");
        Ok(Vec::new())
    }

    fn show(&self, canon: &str) -> String {
        match canon {
            "tabstop" => format!("tabstop={}", self.tabstop),
            "maxcompletions" => format!("maxcompletions={}", self.maxcompletions),
            "ignorecase" => format_bool(canon, self.ignorecase),
            "wholeword" => format_bool(canon, self.wholeword),
            "regex" => format_bool(canon, self.regex),
            _ => format_bool(canon, self.wrapscan),
        }
    }

    /// Search flags implied by the search options.
    #[must_use]
    pub fn search_flags(&self) -> SearchFlags {
        let mut flags = SearchFlags::empty();
        flags.set(SearchFlags::CASE_SENSITIVE, !self.ignorecase);
        flags.set(SearchFlags::WHOLE_WORD, self.wholeword);
        flags.set(SearchFlags::REGEX, self.regex);
        flags.set(SearchFlags::WRAP, self.wrapscan);
        flags
    }
}

fn resolve(name: &str) -> Result<&'static str, OptionError> {
    canonical(name).ok_or_else(|| OptionError::Unknown(name.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
