//! Default function library.
//!
//! Every function receives its already-evaluated arguments as [`Args`].
//! A call with the wrong number of arguments logs a warning and yields
//! `Int(0)` rather than failing the whole evaluation.

use std::cell::Cell;

use chrono::NaiveDateTime;
use rand::Rng;
use tracing::{info, warn};

use super::compile::compile;
use super::datetime;
use super::exec::Executor;
use super::functions::{Args, FunctionTable};
use super::value::Value;
use crate::var::VariableStore;

/// Target used for `Print` / `PrintRegistry` output.
pub const PRINT_TARGET: &str = "inkexpr::print";

/// Register the default functions into `table`.
pub fn register_defaults(table: &mut FunctionTable) {
    // ── Numeric ──────────────────────────────────────────────────────────────
    table.register_fn("Min", |args, _, _| {
        pick2("Min", args, |a, b| if b.as_float() < a.as_float() { b } else { a })
    });
    table.register_fn("Max", |args, _, _| {
        pick2("Max", args, |a, b| if b.as_float() > a.as_float() { b } else { a })
    });
    table.register_fn("Lerp", |args, _, _| {
        if !arity("Lerp", args, 3) {
            return Value::default();
        }
        let (a, b, t) = (args.float(0), args.float(1), args.float(2));
        Value::Float(a + (b - a) * t)
    });
    table.register_fn("Rand", |args, _, _| {
        if !arity("Rand", args, 2) {
            return Value::default();
        }
        random_between(&args[0], &args[1])
    });
    table.register_fn("Choose", |args, _, _| {
        if args.len() < 3 {
            warn!("Choose expects an index and at least two choices, got {} arguments", args.len());
            return Value::default();
        }
        let idx = args.int(0);
        usize::try_from(idx)
            .ok()
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_default()
    });

    // ── Diagnostics ──────────────────────────────────────────────────────────
    table.register_fn("Print", |args, _, _| {
        if !arity("Print", args, 1) {
            return Value::default();
        }
        info!(target: PRINT_TARGET, "{}", args[0]);
        args[0].clone()
    });
    table.register_fn("PrintRegistry", |_, vars, _| {
        let mut names = vars.names();
        names.sort();
        for name in &names {
            let value = vars.get(name).unwrap_or_default();
            info!(target: PRINT_TARGET, "{name} ({}) = {value}", value.type_name());
        }
        Value::Int(names.len() as i64)
    });

    // ── Store access by computed name ────────────────────────────────────────
    table.register_fn("GetInt", |args, vars, _| {
        if !arity("GetInt", args, 1) {
            return Value::default();
        }
        Value::Int(vars.get_int(&args.text(0)))
    });
    table.register_fn("GetFloat", |args, vars, _| {
        if !arity("GetFloat", args, 1) {
            return Value::default();
        }
        Value::Float(vars.get_float(&args.text(0)))
    });
    table.register_fn("GetString", |args, vars, _| {
        if !arity("GetString", args, 1) {
            return Value::default();
        }
        Value::Str(vars.get_string(&args.text(0)))
    });

    // ── Dates ────────────────────────────────────────────────────────────────
    // Ranges are [begin, end).  A trailing date argument overrides "now".
    table.register_fn("LocalBeforeDate", |args, _, _| {
        if !arity_between("LocalBeforeDate", args, 1, 2) {
            return Value::default();
        }
        dates_and_now("LocalBeforeDate", args, 1)
            .map(|(d, now)| Value::from(now < d[0]))
            .unwrap_or_default()
    });
    table.register_fn("LocalAfterDate", |args, _, _| {
        if !arity_between("LocalAfterDate", args, 1, 2) {
            return Value::default();
        }
        dates_and_now("LocalAfterDate", args, 1)
            .map(|(d, now)| Value::from(now >= d[0]))
            .unwrap_or_default()
    });
    table.register_fn("LocalBetweenDates", |args, _, _| {
        if !arity_between("LocalBetweenDates", args, 2, 3) {
            return Value::default();
        }
        dates_and_now("LocalBetweenDates", args, 2)
            .map(|(d, now)| Value::from(d[0] <= now && now < d[1]))
            .unwrap_or_default()
    });
    table.register_fn("AddToDate", |args, _, _| {
        if !arity("AddToDate", args, 2) {
            return Value::default();
        }
        let Some(date) = date_text("AddToDate", &args.text(0)) else {
            return Value::default();
        };
        match datetime::add_seconds(&date, datetime::parse_delta(&args.text(1))) {
            Some(moved) => Value::Str(datetime::format_date(&moved)),
            None => {
                warn!("AddToDate: result is out of range");
                Value::default()
            }
        }
    });
    table.register_fn("LocalTimeRemaining", |args, _, _| {
        if !arity_between("LocalTimeRemaining", args, 1, 2) {
            return Value::default();
        }
        dates_and_now("LocalTimeRemaining", args, 1)
            .map(|(d, now)| Value::Int(datetime::seconds_until(&d[0], &now)))
            .unwrap_or_default()
    });
    table.register_fn("SecondsToString", |args, _, _| {
        if !arity_between("SecondsToString", args, 1, 2) {
            return Value::default();
        }
        Value::Str(datetime::format_letters(args.int(0), args.int(1) != 0))
    });
    table.register_fn("LocalCountdown", |args, _, _| {
        if !arity_between("LocalCountdown", args, 1, 3) {
            return Value::default();
        }
        dates_and_now("LocalCountdown", args, 1)
            .map(|(d, now)| {
                let left = datetime::seconds_until(&d[0], &now);
                Value::Str(datetime::format_letters(left, args.int(2) != 0))
            })
            .unwrap_or_default()
    });

    // ── Nested evaluation ────────────────────────────────────────────────────
    table.register_fn("Eval", |args, vars, fns| {
        if !arity("Eval", args, 1) {
            return Value::default();
        }
        eval_nested(&args.text(0), vars, fns)
    });
}

fn arity(name: &str, args: &Args, want: usize) -> bool {
    if args.len() == want {
        return true;
    }
    warn!("{name} expects {want} argument(s), got {}", args.len());
    false
}

fn arity_between(name: &str, args: &Args, lo: usize, hi: usize) -> bool {
    if (lo..=hi).contains(&args.len()) {
        return true;
    }
    warn!("{name} expects {lo} to {hi} arguments, got {}", args.len());
    false
}

fn date_text(name: &str, text: &str) -> Option<NaiveDateTime> {
    let date = datetime::parse_date(text);
    if date.is_none() {
        warn!("{name}: {text:?} is not a date");
    }
    date
}

/// The first `count` arguments as dates, plus the argument after them as
/// "now".  A missing or empty "now" means the current time.
fn dates_and_now(name: &str, args: &Args, count: usize) -> Option<(Vec<NaiveDateTime>, NaiveDateTime)> {
    let dates = (0..count)
        .map(|i| date_text(name, &args.text(i)))
        .collect::<Option<Vec<_>>>()?;
    let now = match args.get(count).map(Value::as_text) {
        Some(text) if !text.trim().is_empty() => date_text(name, &text)?,
        _ => datetime::now(),
    };
    Some((dates, now))
}

/// Choose between two arguments, keeping the integer type only when both
/// are integers.
fn pick2(name: &str, args: &Args, choose: fn(Value, Value) -> Value) -> Value {
    if !arity(name, args, 2) {
        return Value::default();
    }
    let (a, b) = (args[0].clone(), args[1].clone());
    if a.is_int() && b.is_int() {
        choose(a, b)
    } else {
        Value::Float(choose(a, b).as_float())
    }
}

fn random_between(lo: &Value, hi: &Value) -> Value {
    let mut rng = rand::thread_rng();
    if lo.is_int() && hi.is_int() {
        let (a, b) = (lo.as_int(), hi.as_int());
        let (a, b) = (a.min(b), a.max(b));
        if a == b {
            return Value::Int(a);
        }
        Value::Int(rng.gen_range(a..b))
    } else {
        let (a, b) = (lo.as_float(), hi.as_float());
        let (a, b) = (a.min(b), a.max(b));
        if a == b || !(a.is_finite() && b.is_finite()) {
            return Value::Float(a);
        }
        Value::Float(rng.gen_range(a..=b))
    }
}

/// Maximum nesting of `Eval` calls on one thread.
pub const EVAL_MAX_DEPTH: usize = 32;

thread_local! {
    static EVAL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds one level of `Eval` nesting until dropped.
struct EvalLevel;

impl EvalLevel {
    fn enter() -> Option<EvalLevel> {
        EVAL_DEPTH.with(|d| {
            if d.get() >= EVAL_MAX_DEPTH {
                return None;
            }
            d.set(d.get() + 1);
            Some(EvalLevel)
        })
    }
}

impl Drop for EvalLevel {
    fn drop(&mut self) {
        EVAL_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

fn eval_nested(src: &str, vars: &mut dyn VariableStore, fns: &FunctionTable) -> Value {
    let Some(_level) = EvalLevel::enter() else {
        warn!("Eval nested deeper than {EVAL_MAX_DEPTH} levels, result is 0");
        return Value::default();
    };
    match compile(src) {
        Ok(program) => Executor::new(vars, fns).run(&program).value,
        Err(e) => {
            warn!("Eval: {e}");
            Value::default()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
