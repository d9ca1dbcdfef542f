//! inkexpr: an embeddable expression language.
//!
//! Source text goes through a `#define` pass, a tokenizer and a
//! shunting-yard compiler into a flat postfix [`Program`]; a stack machine
//! then evaluates it against a [`VariableStore`].
//!
//! ```rust
//! use inkexpr::script::{Interpreter, Value};
//!
//! let mut interp = Interpreter::with_builtins();
//! let out = interp.eval("x = Min(3, 4) * 2; x + 1").unwrap();
//! assert_eq!(out.value, Value::Float(7.0));
//! ```
//!
//! [`Program`]: script::Program
//! [`VariableStore`]: var::VariableStore

pub mod cli;
pub mod config;
pub mod env;
pub mod script;
pub mod var;
