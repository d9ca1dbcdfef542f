//! Token kinds and the static operator table.
//!
//! Precedence (higher binds tighter):
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 7 | `++ --` (unary, right-assoc) |
//! | 6 | `* / %` |
//! | 5 | `+ -` |
//! | 4 | `<= >= < >` |
//! | 3 | `== !=` |
//! | 2 | `&& \|\|` |
//! | 1 | `, = += -= *= /= %=` |
//! | 0 | `( ) ;` (structural) |

use std::fmt;

use super::value::Value;

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    None,
    Left,
    Right,
}

/// Every operator the language knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Inc,
    Dec,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    CmpEq,
    CmpNe,
    CmpLe,
    CmpGe,
    CmpLt,
    CmpGt,
    Assign,
    PlusAssign,
    MinusAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    LogicalAnd,
    LogicalOr,
    /// `,` builds call-argument chains instead of computing a value.
    List,
}

/// Static metadata for one operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub precedence: u8,
    pub assoc: Assoc,
    pub unary: bool,
}

impl Op {
    /// Look up an operator by its source spelling.
    pub fn from_symbol(s: &str) -> Option<Op> {
        Some(match s {
            "++" => Op::Inc,
            "--" => Op::Dec,
            "+" => Op::Plus,
            "-" => Op::Minus,
            "*" => Op::Multiply,
            "/" => Op::Divide,
            "%" => Op::Modulo,
            "==" => Op::CmpEq,
            "!=" => Op::CmpNe,
            "<=" => Op::CmpLe,
            ">=" => Op::CmpGe,
            "<" => Op::CmpLt,
            ">" => Op::CmpGt,
            "=" => Op::Assign,
            "+=" => Op::PlusAssign,
            "-=" => Op::MinusAssign,
            "*=" => Op::MultiplyAssign,
            "/=" => Op::DivideAssign,
            "%=" => Op::ModuloAssign,
            "&&" => Op::LogicalAnd,
            "||" => Op::LogicalOr,
            "," => Op::List,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Inc => "++",
            Op::Dec => "--",
            Op::Plus => "+",
            Op::Minus => "-",
            Op::Multiply => "*",
            Op::Divide => "/",
            Op::Modulo => "%",
            Op::CmpEq => "==",
            Op::CmpNe => "!=",
            Op::CmpLe => "<=",
            Op::CmpGe => ">=",
            Op::CmpLt => "<",
            Op::CmpGt => ">",
            Op::Assign => "=",
            Op::PlusAssign => "+=",
            Op::MinusAssign => "-=",
            Op::MultiplyAssign => "*=",
            Op::DivideAssign => "/=",
            Op::ModuloAssign => "%=",
            Op::LogicalAnd => "&&",
            Op::LogicalOr => "||",
            Op::List => ",",
        }
    }

    pub fn info(self) -> OpInfo {
        let (precedence, assoc, unary) = match self {
            Op::Inc | Op::Dec => (7, Assoc::Right, true),
            Op::Multiply | Op::Divide | Op::Modulo => (6, Assoc::Left, false),
            Op::Plus | Op::Minus => (5, Assoc::Left, false),
            Op::CmpLe | Op::CmpGe | Op::CmpLt | Op::CmpGt => (4, Assoc::Left, false),
            Op::CmpEq | Op::CmpNe => (3, Assoc::Left, false),
            Op::LogicalAnd | Op::LogicalOr => (2, Assoc::Left, false),
            Op::List
            | Op::Assign
            | Op::PlusAssign
            | Op::MinusAssign
            | Op::MultiplyAssign
            | Op::DivideAssign
            | Op::ModuloAssign => (1, Assoc::Left, false),
        };
        OpInfo { precedence, assoc, unary }
    }

    pub fn is_unary(self) -> bool {
        self.info().unary
    }

    /// `true` for `=` and the compound assignments.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Op::Assign
                | Op::PlusAssign
                | Op::MinusAssign
                | Op::MultiplyAssign
                | Op::DivideAssign
                | Op::ModuloAssign
        )
    }

    /// Whether `self`, arriving at the compiler, must first pop `top` off the
    /// operator stack.
    pub fn yields_to(self, top: Op) -> bool {
        let cur = self.info();
        let top = top.info();
        match cur.assoc {
            Assoc::Left => cur.precedence <= top.precedence,
            Assoc::Right => cur.precedence < top.precedence,
            Assoc::None => false,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Kind tag of a lexed token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Float(f64),
    Int(i64),
    Str(String),
    /// A bare name; the compiler decides between variable and function.
    Ident(String),
    Return,
    /// `;`
    End,
    ParenOpen,
    ParenClose,
    Op(Op),
    /// Text that matched no lexeme class.  Rejected by the compiler.
    Unknown(String),
}

/// One lexeme plus its source offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the lexeme in the (macro-expanded) source.
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, offset: usize) -> Self {
        Token { kind, offset }
    }

    /// Literal payload, if this token is a literal.
    pub fn literal(&self) -> Option<Value> {
        match &self.kind {
            TokenKind::Float(x) => Some(Value::Float(*x)),
            TokenKind::Int(n) => Some(Value::Int(*n)),
            TokenKind::Str(s) => Some(Value::Str(s.clone())),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_round_trip() {
        for sym in [
            "++", "--", "+", "-", "*", "/", "%", "==", "!=", "<=", ">=", "<", ">", "=", "+=",
            "-=", "*=", "/=", "%=", "&&", "||", ",",
        ] {
            let op = Op::from_symbol(sym).expect(sym);
            assert_eq!(op.symbol(), sym);
        }
        assert_eq!(Op::from_symbol("!"), None);
    }

    #[test]
    fn precedence_levels() {
        assert_eq!(Op::Inc.info().precedence, 7);
        assert_eq!(Op::Modulo.info().precedence, 6);
        assert_eq!(Op::Minus.info().precedence, 5);
        assert_eq!(Op::CmpGt.info().precedence, 4);
        assert_eq!(Op::CmpNe.info().precedence, 3);
        assert_eq!(Op::LogicalOr.info().precedence, 2);
        assert_eq!(Op::List.info().precedence, 1);
        assert_eq!(Op::ModuloAssign.info().precedence, 1);
    }

    #[test]
    fn left_assoc_yields_to_equal_precedence() {
        assert!(Op::Minus.yields_to(Op::Plus));
        assert!(Op::Plus.yields_to(Op::Multiply));
        assert!(!Op::Multiply.yields_to(Op::Plus));
    }

    #[test]
    fn right_assoc_does_not_yield_to_equal_precedence() {
        assert!(!Op::Inc.yields_to(Op::Dec));
        assert!(Op::Inc.is_unary());
        assert!(!Op::Minus.is_unary());
    }

    #[test]
    fn assignment_family() {
        assert!(Op::Assign.is_assignment());
        assert!(Op::ModuloAssign.is_assignment());
        assert!(!Op::CmpEq.is_assignment());
        assert!(!Op::List.is_assignment());
    }
}
