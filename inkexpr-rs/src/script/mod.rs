//! The expression language.
//!
//! Pipeline, leaf first:
//!
//! - [`define`]: `#define KEY VALUE` extraction and substitution
//! - [`lexer`]: source text → [`Token`]s
//! - [`compile`]: tokens → postfix [`Program`] (shunting-yard)
//! - [`exec`]: stack machine evaluating a [`Program`] to an [`Outcome`]
//! - [`functions`] / [`builtins`]: callables reachable from call sites
//! - [`datetime`]: date and duration text used by the date builtins
//! - [`interp`]: the [`Interpreter`] context tying them together
//!
//! # Quick start
//!
//! ```rust
//! use inkexpr::script::{Interpreter, Value};
//!
//! let mut interp = Interpreter::new();
//! interp.set_var("four", 4.0);
//! assert_eq!(interp.eval("1 + (2 - 3) * four").unwrap().value, Value::Float(-3.0));
//! ```

pub mod builtins;
pub mod compile;
pub mod datetime;
pub mod define;
pub mod exec;
pub mod functions;
pub mod interp;
pub mod lexer;
pub mod token;
pub mod value;

// Re-exports for convenience.
pub use compile::{compile, CompileError, Instr, Program};
pub use exec::{execute, Executor, Outcome};
pub use functions::{Args, CallError, Callable, FunctionTable, NativeFn};
pub use interp::Interpreter;
pub use token::{Op, Token, TokenKind};
pub use value::Value;
