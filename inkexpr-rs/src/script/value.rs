//! Runtime value type for the expression language.
//!
//! Every operand resolves to exactly one of three shapes before an operator
//! touches it.  The operator then picks string, float or integer semantics
//! from the pair of shapes (see [`Semantics::of`]).

use std::fmt;

/// Tolerance used by float equality (`==`, `!=`, `<=`, `>=`, `&&`, `||`).
pub const FLOAT_EPSILON: f64 = 1e-4;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

/// The empty result: what an unknown function or an empty program produces.
impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl Value {
    /// Numeric view as `f64`.  Strings are parsed leniently (0.0 on failure).
    pub fn as_float(&self) -> f64 {
        match self {
            Value::Int(n) => *n as f64,
            Value::Float(x) => *x,
            Value::Str(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    /// Numeric view as `i64`.  Floats round half-up.
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Float(x) => round_half_up(*x),
            Value::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(round_half_up))
                    .unwrap_or(0)
            }
        }
    }

    /// Text view.  Numbers are formatted with [`Display`](fmt::Display).
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }

    /// Negate a numeric value.  Strings have no negation and yield `None`.
    pub fn negated(&self) -> Option<Value> {
        match self {
            Value::Int(n) => Some(Value::Int(n.wrapping_neg())),
            Value::Float(x) => Some(Value::Float(-x)),
            Value::Str(_) => None,
        }
    }
}

/// `floor(x + 0.5)` saturated into `i64`.
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Approximate float equality with [`FLOAT_EPSILON`].
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < FLOAT_EPSILON
}

// ── Semantics selection ──────────────────────────────────────────────────────

/// Which arithmetic an operation runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantics {
    Str,
    Float,
    Int,
}

impl Semantics {
    /// A string on either side wins, then a float on either side, else int.
    pub fn of(left: &Value, right: Option<&Value>) -> Semantics {
        let any = |pred: fn(&Value) -> bool| pred(left) || right.is_some_and(pred);
        if any(Value::is_str) {
            Semantics::Str
        } else if any(Value::is_float) {
            Semantics::Float
        } else {
            Semantics::Int
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(if b { 1 } else { 0 })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
