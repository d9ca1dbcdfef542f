//! Variable store.
//!
//! [`VariableStore`] is the seam the executor reads and writes identifiers
//! through; [`VarStore`] is the in-memory implementation used by the
//! interpreter, the CLI and the tests.  Missing keys read as `0`, `0.0` or
//! the empty string depending on the typed getter.

use std::collections::HashMap;

use crate::script::value::Value;

/// Typed named-value storage consulted at evaluation time.
pub trait VariableStore {
    /// Current value of `name`, if set.
    fn get(&self, name: &str) -> Option<Value>;

    /// Set (or overwrite) `name`.
    fn set(&mut self, name: &str, value: Value);

    /// Every variable name currently set.
    fn names(&self) -> Vec<String>;

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn is_int(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Value::Int(_)))
    }

    fn is_float(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Value::Float(_)))
    }

    fn is_string(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Value::Str(_)))
    }

    fn get_int(&self, name: &str) -> i64 {
        self.get(name).map(|v| v.as_int()).unwrap_or(0)
    }

    fn get_float(&self, name: &str) -> f64 {
        self.get(name).map(|v| v.as_float()).unwrap_or(0.0)
    }

    fn get_string(&self, name: &str) -> String {
        self.get(name).map(|v| v.as_text()).unwrap_or_default()
    }

    fn set_int(&mut self, name: &str, value: i64) {
        self.set(name, Value::Int(value));
    }

    fn set_float(&mut self, name: &str, value: f64) {
        self.set(name, Value::Float(value));
    }

    fn set_string(&mut self, name: &str, value: &str) {
        self.set(name, Value::Str(value.to_owned()));
    }
}

/// In-memory variable store.
#[derive(Debug, Default, Clone)]
pub struct VarStore {
    vars: HashMap<String, Value>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a variable.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    /// Iterate over all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl VariableStore for VarStore {
    fn get(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_owned(), value);
    }

    fn names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }

    fn has(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
