//! Postfix stack machine.
//!
//! Walks a compiled [`Program`] once, left to right, keeping a stack of
//! [`Chain`]s.  A chain is usually a single operand; the `,` operator grows
//! it into an argument list which a following call instruction consumes
//! whole.
//!
//! Evaluation never fails.  Malformed programs (operand underflow, unknown
//! functions, integer division by zero) are logged and replaced by a
//! neutral value so the stack stays balanced.

use tracing::{debug, error, warn};

use super::compile::{Instr, Program};
use super::functions::{self, Args, FunctionTable};
use super::token::Op;
use super::value::{approx_eq, Semantics, Value};
use crate::env::EnvMap;
use crate::var::VariableStore;

/// What a program evaluated to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub value: Value,
    /// `true` when evaluation stopped at a `return`.
    pub returned: bool,
}

impl Outcome {
    pub fn as_float(&self) -> f64 {
        self.value.as_float()
    }
}

// ── Operands ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Lit(Value),
    /// Variable name as written in the source, before env substitution.
    Var(String),
}

/// One stack entry: a head operand plus any arguments appended by `,`.
#[derive(Debug, Clone, PartialEq)]
struct Chain {
    head: Operand,
    tail: Vec<Operand>,
}

impl Chain {
    fn lit(v: Value) -> Self {
        Chain {
            head: Operand::Lit(v),
            tail: Vec::new(),
        }
    }

    fn var(name: &str) -> Self {
        Chain {
            head: Operand::Var(name.to_owned()),
            tail: Vec::new(),
        }
    }

    /// Append `other` (and its own tail) after our last element.
    fn append(&mut self, other: Chain) {
        self.tail.push(other.head);
        self.tail.extend(other.tail);
    }

    /// Replace the head, keeping any argument tail.
    fn with_head(self, head: Operand) -> Self {
        Chain {
            head,
            tail: self.tail,
        }
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }
}

// ── Operator kernels ──────────────────────────────────────────────────────────

fn flag_float(b: bool) -> Value {
    Value::Float(if b { 1.0 } else { 0.0 })
}

fn flag_int(b: bool) -> Value {
    Value::Int(if b { 1 } else { 0 })
}

/// The arithmetic operator a compound assignment applies.
fn compound_base(op: Op) -> Option<Op> {
    match op {
        Op::PlusAssign => Some(Op::Plus),
        Op::MinusAssign => Some(Op::Minus),
        Op::MultiplyAssign => Some(Op::Multiply),
        Op::DivideAssign => Some(Op::Divide),
        Op::ModuloAssign => Some(Op::Modulo),
        _ => None,
    }
}

/// Apply a non-assigning binary operator to two resolved values.
pub fn apply_binary(op: Op, l: &Value, r: &Value) -> Value {
    match Semantics::of(l, Some(r)) {
        Semantics::Str => match op {
            Op::Plus => Value::Str(l.as_text() + &r.as_text()),
            Op::CmpEq => flag_float(l.as_text() == r.as_text()),
            Op::CmpNe => flag_float(l.as_text() != r.as_text()),
            _ => Value::Str(String::new()),
        },
        Semantics::Float => {
            let (a, b) = (l.as_float(), r.as_float());
            match op {
                Op::Plus => Value::Float(a + b),
                Op::Minus => Value::Float(a - b),
                Op::Multiply => Value::Float(a * b),
                Op::Divide => Value::Float(a / b),
                Op::Modulo => Value::Float(a % b),
                Op::CmpEq => flag_float(approx_eq(a, b)),
                Op::CmpNe => flag_float(!approx_eq(a, b)),
                Op::CmpLe => flag_float(approx_eq(a, b) || a < b),
                Op::CmpGe => flag_float(approx_eq(a, b) || a > b),
                Op::CmpLt => flag_float(a < b),
                Op::CmpGt => flag_float(a > b),
                Op::LogicalAnd => flag_float(!approx_eq(a, 0.0) && !approx_eq(b, 0.0)),
                Op::LogicalOr => flag_float(!approx_eq(a, 0.0) || !approx_eq(b, 0.0)),
                _ => Value::Float(0.0),
            }
        }
        Semantics::Int => {
            let (a, b) = (l.as_int(), r.as_int());
            match op {
                Op::Plus => Value::Int(a.wrapping_add(b)),
                Op::Minus => Value::Int(a.wrapping_sub(b)),
                Op::Multiply => Value::Int(a.wrapping_mul(b)),
                Op::Divide | Op::Modulo if b == 0 => {
                    warn!("integer {op} by zero, result is 0");
                    Value::Int(0)
                }
                Op::Divide => Value::Int(a.wrapping_div(b)),
                Op::Modulo => Value::Int(a.wrapping_rem(b)),
                Op::CmpEq => flag_int(a == b),
                Op::CmpNe => flag_int(a != b),
                Op::CmpLe => flag_int(a <= b),
                Op::CmpGe => flag_int(a >= b),
                Op::CmpLt => flag_int(a < b),
                Op::CmpGt => flag_int(a > b),
                Op::LogicalAnd => flag_int(a != 0 && b != 0),
                Op::LogicalOr => flag_int(a != 0 || b != 0),
                _ => Value::Int(0),
            }
        }
    }
}

/// The value an assignment operator produces from the target's current
/// value `l` and the right-hand side `r`.
pub fn apply_assignment(op: Op, l: &Value, r: &Value) -> Value {
    match compound_base(op) {
        Some(base) => apply_binary(base, l, r),
        None => match Semantics::of(l, Some(r)) {
            Semantics::Str => Value::Str(r.as_text()),
            Semantics::Float => Value::Float(r.as_float()),
            Semantics::Int => Value::Int(r.as_int()),
        },
    }
}

/// `++` / `--` on a resolved value.  `None` for strings.
pub fn apply_step(op: Op, v: &Value) -> Option<Value> {
    let delta = if op == Op::Dec { -1 } else { 1 };
    match v {
        Value::Int(n) => Some(Value::Int(n.wrapping_add(delta))),
        Value::Float(x) => Some(Value::Float(x + delta as f64)),
        Value::Str(_) => None,
    }
}

// ── Machine ───────────────────────────────────────────────────────────────────

/// Evaluation context for one or more programs.
///
/// The variable store is borrowed mutably for the executor's lifetime;
/// the environment map and local function table are optional.
pub struct Executor<'a> {
    vars: &'a mut dyn VariableStore,
    global: &'a FunctionTable,
    local: Option<&'a FunctionTable>,
    env: Option<&'a EnvMap>,
}

impl<'a> Executor<'a> {
    pub fn new(vars: &'a mut dyn VariableStore, global: &'a FunctionTable) -> Self {
        Executor {
            vars,
            global,
            local: None,
            env: None,
        }
    }

    /// Consult `local` before the global table at call sites.
    pub fn with_local(mut self, local: &'a FunctionTable) -> Self {
        self.local = Some(local);
        self
    }

    /// Expand `$name` tags in variable names through `env`.
    pub fn with_env(mut self, env: &'a EnvMap) -> Self {
        self.env = Some(env);
        self
    }

    /// Store key for a variable as written in the source.
    fn key(&self, name: &str) -> String {
        match self.env {
            Some(env) => env.expand(name),
            None => name.to_owned(),
        }
    }

    /// Current value of an operand.  Unset variables read as `0.0`.
    fn resolve(&self, operand: &Operand) -> Value {
        match operand {
            Operand::Lit(v) => v.clone(),
            Operand::Var(name) => self
                .vars
                .get(&self.key(name))
                .unwrap_or(Value::Float(0.0)),
        }
    }

    /// Write `value` to a variable, converting to the variable's existing
    /// type.  New variables become strings for text and floats otherwise.
    fn store(&mut self, name: &str, value: Value) {
        let key = self.key(name);
        let typed = match (self.vars.get(&key), value) {
            (Some(Value::Int(_)), v) => Value::Int(v.as_int()),
            (Some(Value::Float(_)), v) => Value::Float(v.as_float()),
            (Some(Value::Str(_)), v) => Value::Str(v.as_text()),
            (None, Value::Str(s)) => Value::Str(s),
            (None, v) => Value::Float(v.as_float()),
        };
        self.vars.set(&key, typed);
    }

    fn unary(&mut self, op: Op, operand: Chain) -> Chain {
        let current = self.resolve(&operand.head);
        let Some(next) = apply_step(op, &current) else {
            warn!("cannot apply {op} to a string, operand left unchanged");
            return operand;
        };
        if let Operand::Var(name) = &operand.head {
            self.store(name, next);
            return operand;
        }
        operand.with_head(Operand::Lit(next))
    }

    fn negate(&self, operand: Chain) -> Chain {
        match self.resolve(&operand.head).negated() {
            Some(v) => operand.with_head(Operand::Lit(v)),
            None => {
                warn!("cannot negate a string, operand left unchanged");
                operand
            }
        }
    }

    fn binary(&mut self, op: Op, left: Chain, right: Chain) -> Chain {
        if op == Op::List {
            let mut left = left;
            left.append(right);
            return left;
        }
        let l = self.resolve(&left.head);
        let r = self.resolve(&right.head);
        if !op.is_assignment() {
            let v = apply_binary(op, &l, &r);
            return left.with_head(Operand::Lit(v));
        }
        let v = apply_assignment(op, &l, &r);
        if let Operand::Var(name) = &left.head {
            self.store(name, v);
            return left;
        }
        debug!("assignment {op} to a literal");
        left.with_head(Operand::Lit(v))
    }

    fn call(&mut self, name: &str, chain: Option<Chain>) -> Value {
        let args: Args = match &chain {
            Some(chain) => chain
                .operands()
                .map(|o| self.resolve(o))
                .collect::<Vec<_>>()
                .into(),
            None => Args::default(),
        };
        match functions::dispatch(name, &args, &mut *self.vars, self.local, self.global) {
            Ok(v) => v,
            Err(e) => {
                error!("{e}");
                Value::default()
            }
        }
    }

    /// Evaluate `program` to completion.
    pub fn run(&mut self, program: &Program) -> Outcome {
        let mut stack: Vec<Chain> = Vec::new();
        let mut result = Value::default();
        let mut ended_on_separator = false;

        for instr in program {
            ended_on_separator = false;
            match instr {
                Instr::Push(v) => stack.push(Chain::lit(v.clone())),
                Instr::Var(name) => stack.push(Chain::var(name)),
                Instr::Op(op) if op.is_unary() => match stack.pop() {
                    Some(operand) => {
                        let out = self.unary(*op, operand);
                        stack.push(out);
                    }
                    None => warn!("operator {op} has no operand"),
                },
                Instr::Op(op) => {
                    let right = stack.pop();
                    let left = stack.pop();
                    match (left, right) {
                        (Some(l), Some(r)) => {
                            let out = self.binary(*op, l, r);
                            stack.push(out);
                        }
                        (None, Some(r)) if *op == Op::Minus => {
                            let out = self.negate(r);
                            stack.push(out);
                        }
                        (None, Some(r)) => {
                            warn!("operator {op} is missing its left operand");
                            stack.push(r);
                        }
                        (_, None) => warn!("operator {op} has no operands"),
                    }
                }
                Instr::Call { name, has_args } => {
                    let chain = if *has_args {
                        let popped = stack.pop();
                        if popped.is_none() {
                            warn!("call to {name} has no argument on the stack");
                        }
                        popped
                    } else {
                        None
                    };
                    let v = self.call(name, chain);
                    stack.push(Chain::lit(v));
                }
                Instr::Return => {
                    let value = match stack.pop() {
                        Some(top) => self.resolve(&top.head),
                        None => Value::default(),
                    };
                    return Outcome {
                        value,
                        returned: true,
                    };
                }
                Instr::End => {
                    ended_on_separator = true;
                    match stack.pop() {
                        Some(top) => result = self.resolve(&top.head),
                        None => debug!("empty statement"),
                    }
                }
            }
        }

        if !ended_on_separator {
            if let Some(top) = stack.last() {
                result = self.resolve(&top.head);
            }
        }
        Outcome {
            value: result,
            returned: false,
        }
    }
}

/// Evaluate `program` against `vars` with `global` in scope.
pub fn execute(program: &Program, vars: &mut dyn VariableStore, global: &FunctionTable) -> Outcome {
    Executor::new(vars, global).run(program)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::compile::compile;
    use crate::var::VarStore;

    fn run_with(src: &str, vars: &mut VarStore) -> Outcome {
        let program = compile(src).expect("compile failed");
        execute(&program, vars, &FunctionTable::new())
    }

    fn run(src: &str) -> Value {
        run_with(src, &mut VarStore::new()).value
    }

    #[test]
    fn int_arithmetic() {
        assert_eq!(run("1+2-3+4"), Value::Int(4));
        assert_eq!(run("1+(2-3)*4"), Value::Int(-3));
        assert_eq!(run("7/2"), Value::Int(3));
        assert_eq!(run("-7/2"), Value::Int(-3));
        assert_eq!(run("7%3"), Value::Int(1));
    }

    #[test]
    fn float_widens_the_whole_operation() {
        assert_eq!(run("1 + 0.5"), Value::Float(1.5));
        assert_eq!(run("7.0 / 2"), Value::Float(3.5));
        assert_eq!(run("7.5 % 2"), Value::Float(1.5));
    }

    #[test]
    fn integer_division_by_zero_is_zero() {
        assert_eq!(run("5 / 0"), Value::Int(0));
        assert_eq!(run("5 % 0"), Value::Int(0));
        assert_eq!(run("1.0 / 0"), Value::Float(f64::INFINITY));
    }

    #[test]
    fn integer_overflow_wraps() {
        assert_eq!(run("9223372036854775807 + 1"), Value::Int(i64::MIN));
    }

    #[test]
    fn unary_minus_without_left_operand() {
        assert_eq!(run("-3"), Value::Int(-3));
        assert_eq!(run("-2.5"), Value::Float(-2.5));
        assert_eq!(run("-\"s\""), Value::Str("s".into()));
    }

    #[test]
    fn comparisons_follow_operand_types() {
        assert_eq!(run("3 < 4"), Value::Int(1));
        assert_eq!(run("3 >= 4"), Value::Int(0));
        assert_eq!(run("1.0 == 1.00001"), Value::Float(1.0));
        assert_eq!(run("2 <= 1.99999"), Value::Float(1.0));
        assert_eq!(run("2 < 1.99999"), Value::Float(0.0));
        assert_eq!(run("\"a\" == \"a\""), Value::Float(1.0));
        assert_eq!(run("\"a\" != \"a\""), Value::Float(0.0));
    }

    #[test]
    fn logic_has_no_short_circuit_but_is_boolean() {
        assert_eq!(run("1 && 0"), Value::Int(0));
        assert_eq!(run("1 || 0"), Value::Int(1));
        assert_eq!(run("0.00001 || 0"), Value::Float(0.0));
        assert_eq!(run("0.5 && 2"), Value::Float(1.0));
    }

    #[test]
    fn strings_only_concatenate() {
        assert_eq!(run("\"n=\" + 5"), Value::Str("n=5".into()));
        assert_eq!(run("\"a\" * 2"), Value::Str(String::new()));
    }

    #[test]
    fn new_variable_from_number_is_float() {
        let mut vars = VarStore::new();
        let out = run_with("myvar = 5; myvar;", &mut vars);
        assert_eq!(out.value, Value::Float(5.0));
        assert!(vars.is_float("myvar"));
    }

    #[test]
    fn new_variable_from_string_is_string() {
        let mut vars = VarStore::new();
        run_with("s = \"x\" + 1", &mut vars);
        assert_eq!(vars.get("s"), Some(Value::Str("x1".into())));
    }

    #[test]
    fn assignment_keeps_existing_type() {
        let mut vars = VarStore::new();
        vars.set_int("i", 1);
        vars.set_string("s", "a");
        run_with("i = 2.6; s = 3", &mut vars);
        assert_eq!(vars.get("i"), Some(Value::Int(3)));
        assert_eq!(vars.get("s"), Some(Value::Str("3".into())));
    }

    #[test]
    fn compound_assignment() {
        let mut vars = VarStore::new();
        vars.set_float("v", 10.0);
        run_with("v += 2; v -= 4; v *= 3; v /= 8", &mut vars);
        assert_eq!(vars.get_float("v"), 3.0);
        vars.set_int("n", 7);
        run_with("n %= 4", &mut vars);
        assert_eq!(vars.get("n"), Some(Value::Int(3)));
    }

    #[test]
    fn non_assigning_operator_leaves_variable_alone() {
        let mut vars = VarStore::new();
        vars.set_int("x", 2);
        assert_eq!(run_with("x + 1", &mut vars).value, Value::Int(3));
        assert_eq!(vars.get_int("x"), 2);
    }

    #[test]
    fn increment_writes_back() {
        let mut vars = VarStore::new();
        vars.set_int("x", 2);
        assert_eq!(run_with("x++; x++", &mut vars).value, Value::Int(4));
        assert_eq!(vars.get_int("x"), 4);
        assert_eq!(run("5--"), Value::Int(4));
    }

    #[test]
    fn unset_variable_reads_as_float_zero() {
        assert_eq!(run("nothing"), Value::Float(0.0));
        assert_eq!(run("nothing + 1"), Value::Float(1.0));
    }

    #[test]
    fn last_statement_wins() {
        let mut vars = VarStore::new();
        vars.set_float("four", 4.0);
        assert_eq!(run_with("5; four", &mut vars).value, Value::Float(4.0));
        assert_eq!(run_with("four; 5", &mut vars).value, Value::Int(5));
        assert_eq!(run_with("four; 5;", &mut vars).value, Value::Int(5));
    }

    #[test]
    fn return_stops_evaluation() {
        let mut vars = VarStore::new();
        let out = run_with("return 1 + 1; x = 9;", &mut vars);
        assert_eq!(out, Outcome { value: Value::Int(2), returned: true });
        assert!(!vars.has("x"));
    }

    #[test]
    fn return_on_empty_stack_is_zero() {
        let out = run_with("1; return;", &mut VarStore::new());
        assert_eq!(out, Outcome { value: Value::Int(0), returned: true });
    }

    #[test]
    fn empty_program() {
        let out = run_with("", &mut VarStore::new());
        assert_eq!(out, Outcome::default());
        assert_eq!(out.as_float(), 0.0);
    }

    #[test]
    fn underflow_is_tolerated() {
        assert_eq!(run("* 3"), Value::Int(3));
        assert_eq!(run(";;"), Value::Int(0));
        assert_eq!(run("++"), Value::Int(0));
    }

    #[test]
    fn calls_receive_arguments_in_order() {
        let mut fns = FunctionTable::new();
        fns.register_fn("Join", |args, _, _| {
            Value::Str(args.iter().map(Value::as_text).collect::<Vec<_>>().join("|"))
        });
        let program = compile("Join(1, 2.5, \"c\", x)").unwrap();
        let mut vars = VarStore::new();
        vars.set_int("x", 9);
        let out = execute(&program, &mut vars, &fns);
        assert_eq!(out.value, Value::Str("1|2.5|c|9".into()));
    }

    #[test]
    fn empty_call_does_not_consume_operands() {
        let mut fns = FunctionTable::new();
        fns.register_fn("Count", |args, _, _| Value::Int(args.len() as i64));
        for src in ["10 + Count()", "10 + Count(())", "10 + Count( ( ) )"] {
            let program = compile(src).unwrap();
            let out = execute(&program, &mut VarStore::new(), &fns);
            assert_eq!(out.value, Value::Int(10), "{src}");
        }
    }

    #[test]
    fn unknown_function_yields_zero_and_keeps_stack_balanced() {
        let program = compile("1 + Missing(2, 3)").unwrap();
        let out = execute(&program, &mut VarStore::new(), &FunctionTable::new());
        assert_eq!(out.value, Value::Int(1));
    }

    #[test]
    fn local_functions_override_global() {
        let mut global = FunctionTable::new();
        global.register_fn("F", |_, _, _| Value::Int(1));
        let mut local = FunctionTable::new();
        local.register_fn("F", |_, _, _| Value::Int(2));
        let program = compile("F(0)").unwrap();
        let mut vars = VarStore::new();
        let out = Executor::new(&mut vars, &global).with_local(&local).run(&program);
        assert_eq!(out.value, Value::Int(2));
    }

    #[test]
    fn env_indirection_resolves_names() {
        let env: EnvMap = [("myIdentifier", "replaced")].into_iter().collect();
        let program = compile("$myIdentifier = 2.0f;").unwrap();
        let mut vars = VarStore::new();
        let global = FunctionTable::new();
        Executor::new(&mut vars, &global).with_env(&env).run(&program);
        assert_eq!(vars.get("replaced"), Some(Value::Float(2.0)));
        assert!(!vars.has("$myIdentifier"));
    }

    #[test]
    fn chain_append_keeps_order() {
        let mut a = Chain::lit(Value::Int(1));
        let mut b = Chain::lit(Value::Int(2));
        b.append(Chain::lit(Value::Int(3)));
        a.append(b);
        let items: Vec<_> = a.operands().cloned().collect();
        assert_eq!(
            items,
            vec![
                Operand::Lit(Value::Int(1)),
                Operand::Lit(Value::Int(2)),
                Operand::Lit(Value::Int(3)),
            ]
        );
    }
}
