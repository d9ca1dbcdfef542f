//! Interpreter context.
//!
//! The [`Interpreter`] owns the global function table, a default variable
//! store, the environment substitution map and any predefined macros, and
//! threads them through compile and execute.  Callers with their own store
//! use [`Interpreter::execute_in`].

use super::builtins::register_defaults;
use super::compile::{compile_with, CompileError, Program};
use super::define::Macros;
use super::exec::{Executor, Outcome};
use super::functions::FunctionTable;
use super::value::Value;
use crate::env::EnvMap;
use crate::var::{VarStore, VariableStore};

// ── Interpreter ───────────────────────────────────────────────────────────────

pub struct Interpreter {
    functions: FunctionTable,
    vars: VarStore,
    env: EnvMap,
    /// Macros applied to every compile, before the source's own `#define`s.
    macros: Macros,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter with an empty function table.
    pub fn new() -> Self {
        Interpreter {
            functions: FunctionTable::new(),
            vars: VarStore::new(),
            env: EnvMap::new(),
            macros: Macros::new(),
        }
    }

    /// An interpreter with the default function library registered.
    pub fn with_builtins() -> Self {
        let mut interp = Self::new();
        register_defaults(&mut interp.functions);
        interp
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionTable {
        &mut self.functions
    }

    pub fn vars(&self) -> &VarStore {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VarStore {
        &mut self.vars
    }

    pub fn env(&self) -> &EnvMap {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut EnvMap {
        &mut self.env
    }

    pub fn macros_mut(&mut self) -> &mut Macros {
        &mut self.macros
    }

    /// Set a variable in the default store.
    pub fn set_var(&mut self, name: &str, value: impl Into<Value>) {
        self.vars.set(name, value.into());
    }

    pub fn get_var(&self, name: &str) -> Option<Value> {
        self.vars.get(name)
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    pub fn compile(&self, src: &str) -> Result<Program, CompileError> {
        compile_with(src, &self.macros)
    }

    /// Run `program` against the default store.
    pub fn execute(&mut self, program: &Program) -> Outcome {
        Executor::new(&mut self.vars, &self.functions)
            .with_env(&self.env)
            .run(program)
    }

    /// Run `program` against a caller-supplied store, optionally consulting
    /// `local` before the global function table.
    pub fn execute_in(
        &self,
        program: &Program,
        vars: &mut dyn VariableStore,
        local: Option<&FunctionTable>,
    ) -> Outcome {
        let mut exec = Executor::new(vars, &self.functions).with_env(&self.env);
        if let Some(local) = local {
            exec = exec.with_local(local);
        }
        exec.run(program)
    }

    /// Compile and run `src` against the default store.
    pub fn eval(&mut self, src: &str) -> Result<Outcome, CompileError> {
        let program = self.compile(src)?;
        Ok(self.execute(&program))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
