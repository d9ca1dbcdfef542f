//! Function table.
//!
//! Call sites look a name up in an optional local [`FunctionTable`] first and
//! fall back to the interpreter's global one.  Each entry carries a hash of
//! its name computed at registration so a lookup only compares strings whose
//! hashes already agree.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

use super::value::Value;
use crate::var::VariableStore;

/// Failure to dispatch a call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
}

// ── Arguments ─────────────────────────────────────────────────────────────────

/// The evaluated argument list handed to a callable, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
}

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Args { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Argument `idx` as `i64` (0 when absent).
    pub fn int(&self, idx: usize) -> i64 {
        self.get(idx).map(Value::as_int).unwrap_or(0)
    }

    /// Argument `idx` as `f64` (0.0 when absent).
    pub fn float(&self, idx: usize) -> f64 {
        self.get(idx).map(Value::as_float).unwrap_or(0.0)
    }

    /// Argument `idx` as text (empty when absent).
    pub fn text(&self, idx: usize) -> String {
        self.get(idx).map(Value::as_text).unwrap_or_default()
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Args::new(values)
    }
}

impl std::ops::Index<usize> for Args {
    type Output = Value;

    fn index(&self, idx: usize) -> &Value {
        &self.values[idx]
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

// ── Callables ─────────────────────────────────────────────────────────────────

/// Something callable from an expression.
///
/// `fns` is the global table, so a callable can evaluate nested source
/// (see `Eval`) with the same functions in scope.
pub trait Callable {
    fn name(&self) -> &str;

    fn call(&self, args: &Args, vars: &mut dyn VariableStore, fns: &FunctionTable) -> Value;
}

/// Adapter turning a closure or `fn` into a [`Callable`].
pub struct NativeFn<F> {
    name: String,
    func: F,
}

impl<F> NativeFn<F>
where
    F: Fn(&Args, &mut dyn VariableStore, &FunctionTable) -> Value,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        NativeFn {
            name: name.into(),
            func,
        }
    }
}

impl<F> Callable for NativeFn<F>
where
    F: Fn(&Args, &mut dyn VariableStore, &FunctionTable) -> Value,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, args: &Args, vars: &mut dyn VariableStore, fns: &FunctionTable) -> Value {
        (self.func)(args, vars, fns)
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

fn name_hash(name: &str) -> u64 {
    let mut h = DefaultHasher::new();
    name.hash(&mut h);
    h.finish()
}

struct Entry {
    hash: u64,
    func: Box<dyn Callable>,
}

/// Name → callable registry.  Later registrations shadow earlier ones with
/// the same name.
#[derive(Default)]
pub struct FunctionTable {
    entries: Vec<Entry>,
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, func: impl Callable + 'static) {
        let hash = name_hash(func.name());
        self.entries.push(Entry {
            hash,
            func: Box::new(func),
        });
    }

    /// Register a closure under `name`.
    pub fn register_fn<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&Args, &mut dyn VariableStore, &FunctionTable) -> Value + 'static,
    {
        self.register(NativeFn::new(name, func));
    }

    /// Remove the most recent registration of `name`.  Returns `true` if one
    /// was found; an older registration, if any, becomes visible again.
    pub fn unregister(&mut self, name: &str) -> bool {
        let hash = name_hash(name);
        match self
            .entries
            .iter()
            .rposition(|e| e.hash == hash && e.func.name() == name)
        {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, name: &str) -> Option<&dyn Callable> {
        let hash = name_hash(name);
        self.entries
            .iter()
            .rev()
            .find(|e| e.hash == hash && e.func.name() == name)
            .map(|e| e.func.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, newest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(|e| e.func.name())
    }

    /// Call `name` from this table.
    pub fn call(
        &self,
        name: &str,
        args: &Args,
        vars: &mut dyn VariableStore,
    ) -> Result<Value, CallError> {
        let func = self
            .get(name)
            .ok_or_else(|| CallError::UnknownFunction(name.to_owned()))?;
        Ok(func.call(args, vars, self))
    }
}

/// Resolve `name` against `local` first, then `global`, and call it.
///
/// The callable always receives `global` as its function table.
pub fn dispatch(
    name: &str,
    args: &Args,
    vars: &mut dyn VariableStore,
    local: Option<&FunctionTable>,
    global: &FunctionTable,
) -> Result<Value, CallError> {
    let func = local
        .and_then(|t| t.get(name))
        .or_else(|| global.get(name))
        .ok_or_else(|| CallError::UnknownFunction(name.to_owned()))?;
    Ok(func.call(args, vars, global))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarStore;

    fn constant(name: &str, n: i64) -> impl Callable {
        NativeFn::new(
            name,
            move |_: &Args, _: &mut dyn VariableStore, _: &FunctionTable| Value::Int(n),
        )
    }

    #[test]
    fn register_and_call() {
        let mut t = FunctionTable::new();
        t.register_fn("Sum", |args, _, _| {
            Value::Int(args.iter().map(Value::as_int).sum())
        });
        let mut vars = VarStore::new();
        let args = Args::from(vec![Value::Int(2), Value::Int(3)]);
        assert_eq!(t.call("Sum", &args, &mut vars), Ok(Value::Int(5)));
    }

    #[test]
    fn unknown_name_is_an_error() {
        let t = FunctionTable::new();
        let mut vars = VarStore::new();
        assert_eq!(
            t.call("Nope", &Args::default(), &mut vars),
            Err(CallError::UnknownFunction("Nope".into()))
        );
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut t = FunctionTable::new();
        t.register(constant("Min", 1));
        assert!(t.contains("Min"));
        assert!(!t.contains("min"));
    }

    #[test]
    fn newest_registration_shadows() {
        let mut t = FunctionTable::new();
        t.register(constant("F", 1));
        t.register(constant("F", 2));
        let mut vars = VarStore::new();
        assert_eq!(t.call("F", &Args::default(), &mut vars), Ok(Value::Int(2)));
        assert!(t.unregister("F"));
        assert_eq!(t.call("F", &Args::default(), &mut vars), Ok(Value::Int(1)));
        assert!(t.unregister("F"));
        assert!(!t.unregister("F"));
        assert!(t.is_empty());
    }

    #[test]
    fn local_table_overrides_global() {
        let mut global = FunctionTable::new();
        global.register(constant("F", 1));
        global.register(constant("G", 7));
        let mut local = FunctionTable::new();
        local.register(constant("F", 2));
        let mut vars = VarStore::new();
        let none = Args::default();
        assert_eq!(dispatch("F", &none, &mut vars, Some(&local), &global), Ok(Value::Int(2)));
        assert_eq!(dispatch("G", &none, &mut vars, Some(&local), &global), Ok(Value::Int(7)));
        assert_eq!(dispatch("F", &none, &mut vars, None, &global), Ok(Value::Int(1)));
        assert!(dispatch("H", &none, &mut vars, Some(&local), &global).is_err());
    }

    #[test]
    fn callables_can_touch_the_store() {
        let mut t = FunctionTable::new();
        t.register_fn("Bump", |_, vars, _| {
            let n = vars.get_int("count") + 1;
            vars.set_int("count", n);
            Value::Int(n)
        });
        let mut vars = VarStore::new();
        t.call("Bump", &Args::default(), &mut vars).unwrap();
        t.call("Bump", &Args::default(), &mut vars).unwrap();
        assert_eq!(vars.get_int("count"), 2);
    }

    #[test]
    fn names_and_clear() {
        let mut t = FunctionTable::new();
        t.register(constant("A", 0));
        t.register(constant("B", 0));
        assert_eq!(t.names().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(t.len(), 2);
        t.clear();
        assert!(t.is_empty());
    }

    #[test]
    fn arg_accessors_default_when_missing() {
        let args = Args::from(vec![Value::Float(2.6), Value::from("x")]);
        assert_eq!(args.int(0), 3);
        assert_eq!(args.float(0), 2.6);
        assert_eq!(args.text(1), "x");
        assert_eq!(args.int(5), 0);
        assert_eq!(args.text(5), "");
    }
}
