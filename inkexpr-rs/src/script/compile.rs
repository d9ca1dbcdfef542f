//! Infix → postfix compiler (shunting-yard).
//!
//! The compiled [`Program`] is a flat list of [`Instr`]s in evaluation
//! order.  There are no jumps: statements are separated by [`Instr::End`]
//! and a [`Instr::Return`] stops evaluation early.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use super::define::{self, Macros};
use super::lexer::tokenize;
use super::token::{Op, Token, TokenKind};
use super::value::Value;

/// Why a source string could not be compiled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("unmatched ')' at offset {offset}")]
    UnmatchedParen { offset: usize },
    #[error("unknown token {text:?} at offset {offset}")]
    UnknownToken { text: String, offset: usize },
}

/// One postfix instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Push a literal.
    Push(Value),
    /// Push a reference to a named variable.
    Var(String),
    /// Apply an operator to the top one (unary) or two operands.
    Op(Op),
    /// Call a function.  `has_args` is `false` for `name()`, in which case no
    /// operand is consumed.
    Call { name: String, has_args: bool },
    /// Capture the stack top as the result and stop.
    Return,
    /// Statement boundary: capture and discard the stack top.
    End,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Push(Value::Str(s)) => write!(f, "{s:?}"),
            Instr::Push(v) => write!(f, "{v}"),
            Instr::Var(name) => write!(f, "{name}"),
            Instr::Op(op) => write!(f, "{op}"),
            Instr::Call { name, has_args: true } => write!(f, "{name}/call"),
            Instr::Call { name, has_args: false } => write!(f, "{name}()"),
            Instr::Return => f.write_str("return"),
            Instr::End => f.write_str(";"),
        }
    }
}

/// A compiled postfix program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    instrs: Vec<Instr>,
}

impl Program {
    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instr> {
        self.instrs.iter()
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instr) in self.instrs.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{instr}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instr;
    type IntoIter = std::slice::Iter<'a, Instr>;

    fn into_iter(self) -> Self::IntoIter {
        self.instrs.iter()
    }
}

// ── Shunting-yard ─────────────────────────────────────────────────────────────

/// Entries parked on the operator stack.
#[derive(Debug)]
enum Pending {
    Op(Op),
    /// `(` with the operand count at the moment it was opened.
    Paren { mark: usize },
    Call { name: String, has_args: bool },
    Return,
}

impl Pending {
    fn into_instr(self) -> Option<Instr> {
        match self {
            Pending::Op(op) => Some(Instr::Op(op)),
            Pending::Call { name, has_args } => Some(Instr::Call { name, has_args }),
            Pending::Return => Some(Instr::Return),
            Pending::Paren { .. } => {
                debug!("dropping unclosed '('");
                None
            }
        }
    }
}

struct Compiler {
    output: Vec<Instr>,
    pending: Vec<Pending>,
    /// Value-producing instructions emitted so far.
    operands: usize,
}

impl Compiler {
    fn new() -> Self {
        Compiler {
            output: Vec::new(),
            pending: Vec::new(),
            operands: 0,
        }
    }

    fn emit(&mut self, instr: Instr) {
        if matches!(instr, Instr::Push(_) | Instr::Var(_) | Instr::Call { .. }) {
            self.operands += 1;
        }
        self.output.push(instr);
    }

    fn drain(&mut self) {
        while let Some(p) = self.pending.pop() {
            if let Some(instr) = p.into_instr() {
                self.emit(instr);
            }
        }
    }

    fn push_operator(&mut self, op: Op) {
        while let Some(&Pending::Op(top)) = self.pending.last() {
            if !op.yields_to(top) {
                break;
            }
            self.pending.pop();
            self.emit(Instr::Op(top));
        }
        self.pending.push(Pending::Op(op));
    }

    fn close_paren(&mut self, offset: usize) -> Result<(), CompileError> {
        let mark = loop {
            match self.pending.pop() {
                None => return Err(CompileError::UnmatchedParen { offset }),
                Some(Pending::Paren { mark }) => break mark,
                Some(p) => {
                    if let Some(instr) = p.into_instr() {
                        self.emit(instr);
                    }
                }
            }
        };
        let empty = self.operands == mark;
        match self.pending.last_mut() {
            Some(Pending::Call { has_args, .. }) => {
                *has_args = !empty;
                if let Some(instr) = self.pending.pop().and_then(Pending::into_instr) {
                    self.emit(instr);
                }
            }
            Some(Pending::Return) => {
                self.pending.pop();
                self.emit(Instr::Return);
            }
            _ => {}
        }
        Ok(())
    }

    fn run(mut self, tokens: &[Token]) -> Result<Program, CompileError> {
        for (i, tok) in tokens.iter().enumerate() {
            match &tok.kind {
                TokenKind::Float(_) | TokenKind::Int(_) | TokenKind::Str(_) => {
                    if let Some(v) = tok.literal() {
                        self.emit(Instr::Push(v));
                    }
                }
                TokenKind::Op(op) => self.push_operator(*op),
                TokenKind::ParenOpen => self.pending.push(Pending::Paren {
                    mark: self.operands,
                }),
                TokenKind::ParenClose => self.close_paren(tok.offset)?,
                TokenKind::Ident(name) => {
                    let is_call = tokens
                        .get(i + 1)
                        .is_some_and(|next| next.kind == TokenKind::ParenOpen);
                    if is_call {
                        self.pending.push(Pending::Call {
                            name: name.clone(),
                            has_args: true,
                        });
                    } else {
                        self.emit(Instr::Var(name.clone()));
                    }
                }
                TokenKind::Return => self.pending.push(Pending::Return),
                TokenKind::End => {
                    self.drain();
                    self.emit(Instr::End);
                }
                TokenKind::Unknown(text) => {
                    return Err(CompileError::UnknownToken {
                        text: text.clone(),
                        offset: tok.offset,
                    });
                }
            }
        }
        self.drain();
        Ok(Program {
            instrs: self.output,
        })
    }
}

/// Compile an already-tokenized sequence.
pub fn compile_tokens(tokens: &[Token]) -> Result<Program, CompileError> {
    Compiler::new().run(tokens)
}

/// Compile source text: `#define` pass, tokenize, shunting-yard.
pub fn compile(src: &str) -> Result<Program, CompileError> {
    compile_with(src, &Macros::new())
}

/// Like [`compile`], with extra macros that behave as if `#define`d before
/// the first line of `src`.
pub fn compile_with(src: &str, predefined: &Macros) -> Result<Program, CompileError> {
    let (_, expanded) = define::preprocess(src, predefined);
    let tokens = tokenize(&expanded);
    compile_tokens(&tokens).inspect_err(|e| debug!("compile failed: {e}"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rpn(src: &str) -> String {
        compile(src).expect("compile failed").to_string()
    }

    #[test]
    fn left_associative_chain() {
        assert_eq!(rpn("1+2-3+4"), "1 2 + 3 - 4 +");
    }

    #[test]
    fn precedence_and_parens() {
        assert_eq!(rpn("1+2*3"), "1 2 3 * +");
        assert_eq!(rpn("1+(2-3)*4"), "1 2 3 - 4 * +");
    }

    #[test]
    fn comparison_and_logic() {
        assert_eq!(rpn("a > 4 && b < 3"), "a 4 > b 3 < &&");
        assert_eq!(rpn("a == b != c"), "a b == c !=");
    }

    #[test]
    fn assignment_binds_loosest() {
        assert_eq!(rpn("x = 3 + 3"), "x 3 3 + =");
        assert_eq!(rpn("x += y * 2"), "x y 2 * +=");
    }

    #[test]
    fn unary_increment_is_right_associative() {
        assert_eq!(rpn("++x"), "x ++");
        assert_eq!(rpn("x++ * 2"), "x ++ 2 *");
    }

    #[test]
    fn function_call_follows_its_arguments() {
        assert_eq!(rpn("Min(3, 4)"), "3 4 , Min/call");
        assert_eq!(rpn("1 + Min(a, b*2)"), "1 a b 2 * , Min/call +");
        assert_eq!(rpn("Lerp(0, 10, 0.5)"), "0 10 , 0.5 , Lerp/call");
    }

    #[test]
    fn empty_call_takes_no_arguments() {
        let p = compile("1 + Now()").unwrap();
        assert_eq!(
            p.instrs()[1],
            Instr::Call {
                name: "Now".into(),
                has_args: false
            }
        );
    }

    #[test]
    fn call_with_only_empty_parens_takes_no_arguments() {
        assert_eq!(rpn("10 + Count(())"), "10 Count() +");
        assert_eq!(rpn("Count((), 1)"), "1 , Count/call");
        assert_eq!(rpn("Max((1), 2)"), "1 2 , Max/call");
    }

    #[test]
    fn nested_calls() {
        assert_eq!(rpn("Max(Min(1,2), 3)"), "1 2 , Min/call 3 , Max/call");
    }

    #[test]
    fn identifier_without_paren_is_variable() {
        let p = compile("myIdentifier = true;").unwrap();
        assert_eq!(p.instrs()[0], Instr::Var("myIdentifier".into()));
        let p = compile("${myIdentifier}.Visible = true;").unwrap();
        assert_eq!(p.instrs()[0], Instr::Var("${myIdentifier}.Visible".into()));
    }

    #[test]
    fn statements_are_separated() {
        assert_eq!(rpn("5; four"), "5 ; four");
        assert_eq!(rpn("x = 1; x;"), "x 1 = ; x ;");
    }

    #[test]
    fn return_marker() {
        assert_eq!(rpn("return 5;"), "5 return ;");
        assert_eq!(rpn("return (1 + 2); 9"), "1 2 + return ; 9");
    }

    #[test]
    fn strings_are_quoted_in_listing() {
        assert_eq!(rpn("s = \"a b\""), "s \"a b\" =");
    }

    #[test]
    fn unmatched_close_paren_fails() {
        assert_eq!(
            compile("1 + 2)"),
            Err(CompileError::UnmatchedParen { offset: 5 })
        );
    }

    #[test]
    fn unclosed_open_paren_is_tolerated() {
        assert_eq!(rpn("(1 + 2"), "1 2 +");
    }

    #[test]
    fn unknown_token_fails() {
        assert!(matches!(
            compile("1 + .5"),
            Err(CompileError::UnknownToken { ref text, offset: 4 }) if text == ".5"
        ));
    }

    #[test]
    fn empty_source_is_empty_program() {
        let p = compile("").unwrap();
        assert!(p.is_empty());
    }

    #[test]
    fn compiling_twice_is_identical() {
        let src = "a = Min(b, 3) * (c - 1); return a;";
        assert_eq!(compile(src).unwrap(), compile(src).unwrap());
    }

    #[test]
    fn defines_are_substituted() {
        assert_eq!(rpn("#define LIMIT 10\nx < LIMIT"), "x 10 <");
    }

    #[test]
    fn predefined_macros_apply() {
        let mut m = Macros::new();
        m.push("TWO", "2");
        assert_eq!(compile_with("TWO * TWO", &m).unwrap().to_string(), "2 2 *");
    }
}
