//! Command-line argument parsing.
//!
//! Usage:
//!   inkexpr [-d] [-f[<file>]] [-Dname=value]… [-Ekey=value]… [-c<expr>] [<expr>…]

use std::path::PathBuf;

use crate::config::{parse_value, split_assignment};
use crate::script::value::Value;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Which seed file to load.
    pub config: ConfigFile,
    /// Variables seeded with `-Dname=value`, in order.
    pub vars: Vec<(String, Value)>,
    /// Env substitutions added with `-Ekey=value`, in order.
    pub env: Vec<(String, String)>,
    /// Expressions to evaluate: `-c<expr>` first, then positionals.
    pub exprs: Vec<String>,
    /// Debug logging (`-d`).
    pub debug: bool,
}

/// How to choose the seed file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// Search `~/.inkexprrc`, then `./.inkexprrc` (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip the seed file.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Value of a flag that takes an argument: the rest of this token, or the
/// next token.
fn flag_value(
    flag: char,
    chars: &[char],
    j: &mut usize,
    argv: &[String],
    i: &mut usize,
) -> Result<String, String> {
    if *j + 1 < chars.len() {
        let s: String = chars[*j + 1..].iter().collect();
        *j = chars.len();
        Ok(s)
    } else if *i + 1 < argv.len() {
        *i += 1;
        Ok(argv[*i].clone())
    } else {
        Err(format!("-{flag} requires an argument"))
    }
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut command: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing, so `-- -3` evaluates `-3`.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -c<expr>
                'c' => command = Some(flag_value('c', &chars, &mut j, argv, &mut i)?),

                // -D<name>=<value>
                'D' => {
                    let pair = flag_value('D', &chars, &mut j, argv, &mut i)?;
                    let (name, value) = split_assignment("-D", &pair)?;
                    args.vars.push((name.to_owned(), parse_value(value)));
                }

                // -E<key>=<value>
                'E' => {
                    let pair = flag_value('E', &chars, &mut j, argv, &mut i)?;
                    let (key, value) = split_assignment("-E", &pair)?;
                    args.env.push((key.to_owned(), value.to_owned()));
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    args.exprs.extend(command);
    args.exprs.extend(positional);
    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
