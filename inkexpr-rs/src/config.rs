//! `.inkexprrc` seed-file parser.
//!
//! A seed file prepares the state an interpreter starts from:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | seed a variable |
//! | `/env <key>=<value>` or `/env <key> <value>` | add an env substitution |
//! | `/define <key> <replacement…>` | add a macro |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! `/set` values are typed the way the expression lexer types literals:
//! integers, floats, quoted strings and `true`/`false`.  Anything else is
//! kept as a raw string.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::env::EnvMap;
use crate::script::define::Macros;
use crate::script::interp::Interpreter;
use crate::script::value::Value;
use crate::var::{VarStore, VariableStore};

/// File name looked up in the home directory and then the working directory.
pub const RC_FILE: &str = ".inkexprrc";

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a seed file.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Parsed seed file: variables, env substitutions and macros.
#[derive(Debug, Default)]
pub struct Config {
    pub vars: VarStore,
    pub env: EnvMap,
    pub macros: Macros,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a seed file.
    ///
    /// Unknown directives are silently skipped.  Returns the config and a
    /// list of any parse errors on recognised lines.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            // blank lines and comments (`;` or `;;` prefix)
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));
            let args_str = args_str.trim();

            let result = match cmd {
                "set" => split_assignment("/set", args_str).map(|(name, value)| {
                    config.vars.set(name, parse_value(value));
                }),
                "env" => split_assignment("/env", args_str).map(|(key, value)| {
                    config.env.set(key, value);
                }),
                "define" => parse_define(args_str).map(|(key, value)| {
                    config.macros.push(key, value);
                }),
                _ => Ok(()), // silently skip unknown commands
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a seed file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Move everything into `interp`, keeping anything it already holds
    /// unless the seed file overrides it.
    pub fn apply(self, interp: &mut Interpreter) {
        for (name, value) in self.vars.iter() {
            interp.vars_mut().set(name, value.clone());
        }
        for (key, value) in self.env.iter() {
            interp.env_mut().set(key, value);
        }
        interp.macros_mut().extend(&self.macros);
    }
}

/// Locate the user seed file: `~/.inkexprrc`, then `./.inkexprrc`.
pub fn find_user_config() -> Option<PathBuf> {
    let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(RC_FILE));
    home.into_iter()
        .chain(std::iter::once(PathBuf::from(".").join(RC_FILE)))
        .find(|p| p.exists())
}

// ── Values ────────────────────────────────────────────────────────────────────

/// Type a literal written in a seed file or on the command line.
pub fn parse_value(raw: &str) -> Value {
    let s = raw.trim();
    if let Some(inner) = unquote(s) {
        return Value::Str(inner.to_owned());
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Int(n);
    }
    if s.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
        // `1.5f` is accepted for compatibility with expression sources.
        if let Ok(x) = s.strip_suffix('f').unwrap_or(s).parse::<f64>() {
            return Value::Float(x);
        }
    }
    if s.eq_ignore_ascii_case("true") {
        return Value::Int(1);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Int(0);
    }
    Value::Str(s.to_owned())
}

fn unquote(s: &str) -> Option<&str> {
    let quote = s.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    s.strip_prefix(quote)?.strip_suffix(quote)
}

// ── Directive arguments ───────────────────────────────────────────────────────

/// Split `<name>=<value>` or `<name> <value>`.
pub fn split_assignment<'a>(cmd: &str, args: &'a str) -> Result<(&'a str, &'a str), String> {
    if args.is_empty() {
        return Err(format!("{cmd}: requires an argument"));
    }
    let eq = args.find('=');
    let ws = args.find(|c: char| c.is_ascii_whitespace());
    let (name, value) = match (eq, ws) {
        (Some(e), Some(w)) if w < e => (&args[..w], &args[w..]),
        (Some(e), _) => (&args[..e], &args[e + 1..]),
        (None, Some(w)) => (&args[..w], &args[w..]),
        (None, None) => return Err(format!("{cmd}: missing value for '{args}'")),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("{cmd}: name cannot be empty"));
    }
    Ok((name, value.trim()))
}

/// Parse `/define <key> <replacement…>`.  The replacement may be empty.
fn parse_define(args: &str) -> Result<(&str, &str), String> {
    let (key, value) = args
        .split_once(|c: char| c.is_ascii_whitespace())
        .unwrap_or((args, ""));
    let valid = key.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(format!("/define: invalid macro name '{key}'"));
    }
    Ok((key, value.trim()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
