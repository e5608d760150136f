//! Expressions used inside grammar steps.
//!
//! An expression is a literal (number, bool, string, list), a variable read
//! (`"$name"`), or a single-key operator table such as
//! `{ mul = ["$size", 0.9] }`. A list operand is spread into the operator's
//! arguments; any other operand is a single argument.

use std::collections::{BTreeMap, HashMap};

use rand::distr::Uniform;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ShapeError, ShapeResult};

/// A grammar expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Expr>),
    Op(BTreeMap<String, Box<Expr>>),
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::Number(n)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Text(s.to_string())
    }
}

/// Variables visible to a running grammar rule.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: HashMap<String, Value>,
}

impl Scope {
    /// Empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Read a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

fn fail<T>(message: impl Into<String>) -> ShapeResult<T> {
    // Attributed to the running rule by `Rule::invoke`.
    Err(ShapeError::rule("", message))
}

fn number_value(n: f64) -> ShapeResult<Value> {
    if n.is_finite() {
        Ok(Value::from(n))
    } else {
        fail(format!("arithmetic produced a non-finite value ({n})"))
    }
}

fn as_number(op: &str, value: &Value) -> ShapeResult<f64> {
    match value.as_f64() {
        Some(n) => Ok(n),
        None => fail(format!("`{op}` expects numbers, got {value}")),
    }
}

/// Truthiness: false, zero, null and empty values are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

impl Expr {
    /// Evaluate against `scope`, drawing randomness from `rng`.
    pub fn eval<R: Rng + ?Sized>(&self, scope: &Scope, rng: &mut R) -> ShapeResult<Value> {
        match self {
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => number_value(*n),
            Expr::Text(text) => match text.strip_prefix('$') {
                Some(name) => match scope.get(name) {
                    Some(value) => Ok(value.clone()),
                    None => fail(format!("unbound variable `{name}`")),
                },
                None => Ok(Value::String(text.clone())),
            },
            Expr::List(items) => items
                .iter()
                .map(|item| item.eval(scope, rng))
                .collect::<ShapeResult<Vec<_>>>()
                .map(Value::Array),
            Expr::Op(table) => {
                let mut entries = table.iter();
                match (entries.next(), entries.next()) {
                    (Some((op, operand)), None) => eval_op(op, operand, scope, rng),
                    _ => fail(format!(
                        "operator table must have exactly one key, found {:?}",
                        table.keys().collect::<Vec<_>>()
                    )),
                }
            }
        }
    }
}

fn operands<R: Rng + ?Sized>(
    operand: &Expr,
    scope: &Scope,
    rng: &mut R,
) -> ShapeResult<Vec<Value>> {
    match operand {
        Expr::List(items) => items.iter().map(|item| item.eval(scope, rng)).collect(),
        other => Ok(vec![other.eval(scope, rng)?]),
    }
}

fn expect_arity(op: &str, args: &[Value], arity: usize) -> ShapeResult<()> {
    if args.len() == arity {
        Ok(())
    } else {
        fail(format!(
            "`{op}` takes {arity} operand(s), got {}",
            args.len()
        ))
    }
}

fn eval_op<R: Rng + ?Sized>(
    op: &str,
    operand: &Expr,
    scope: &Scope,
    rng: &mut R,
) -> ShapeResult<Value> {
    let args = operands(operand, scope, rng)?;
    match op {
        "add" | "sub" | "mul" | "div" | "mod" => {
            if args.len() < 2 {
                return fail(format!("`{op}` takes at least 2 operands"));
            }
            let mut iter = args.into_iter();
            let first = iter.next().unwrap_or(Value::Null);
            iter.try_fold(first, |acc, next| arith(op, &acc, &next))
        }
        "neg" => {
            expect_arity(op, &args, 1)?;
            arith("mul", &args[0], &Value::from(-1.0))
        }
        "gt" | "ge" | "lt" | "le" => {
            expect_arity(op, &args, 2)?;
            let (a, b) = (as_number(op, &args[0])?, as_number(op, &args[1])?);
            Ok(Value::Bool(match op {
                "gt" => a > b,
                "ge" => a >= b,
                "lt" => a < b,
                _ => a <= b,
            }))
        }
        "eq" => {
            expect_arity(op, &args, 2)?;
            let equal = match (args[0].as_f64(), args[1].as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => args[0] == args[1],
            };
            Ok(Value::Bool(equal))
        }
        "and" => Ok(Value::Bool(args.iter().all(truthy))),
        "or" => Ok(Value::Bool(args.iter().any(truthy))),
        "not" => {
            expect_arity(op, &args, 1)?;
            Ok(Value::Bool(!truthy(&args[0])))
        }
        "uniform" => {
            expect_arity(op, &args, 2)?;
            let (a, b) = (as_number(op, &args[0])?, as_number(op, &args[1])?);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let dist = Uniform::new_inclusive(lo, hi)
                .or_else(|e| fail(format!("`uniform` cannot sample [{lo}, {hi}]: {e}")))?;
            number_value(rng.sample(dist))
        }
        "randint" => {
            expect_arity(op, &args, 2)?;
            let (lo, hi) = (as_number(op, &args[0])?, as_number(op, &args[1])?);
            let (lo, hi) = (lo.round() as i64, hi.round() as i64);
            if lo > hi {
                return fail(format!("`randint` needs lo <= hi, got {lo} > {hi}"));
            }
            Ok(Value::from(rng.random_range(lo..=hi)))
        }
        "choice" => {
            let pool = match args.as_slice() {
                [Value::Array(items)] => items.clone(),
                _ => args,
            };
            if pool.is_empty() {
                return fail("`choice` from an empty sequence");
            }
            let index = rng.random_range(0..pool.len());
            Ok(pool[index].clone())
        }
        other => fail(format!("unknown operator `{other}`")),
    }
}

/// Binary arithmetic with scalar broadcast over lists.
fn arith(op: &str, a: &Value, b: &Value) -> ShapeResult<Value> {
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            if xs.len() != ys.len() {
                return fail(format!(
                    "`{op}` on lists of different lengths ({} and {})",
                    xs.len(),
                    ys.len()
                ));
            }
            xs.iter()
                .zip(ys)
                .map(|(x, y)| arith(op, x, y))
                .collect::<ShapeResult<Vec<_>>>()
                .map(Value::Array)
        }
        (Value::Array(xs), scalar) => xs
            .iter()
            .map(|x| arith(op, x, scalar))
            .collect::<ShapeResult<Vec<_>>>()
            .map(Value::Array),
        (scalar, Value::Array(ys)) => ys
            .iter()
            .map(|y| arith(op, scalar, y))
            .collect::<ShapeResult<Vec<_>>>()
            .map(Value::Array),
        _ => {
            let (x, y) = (as_number(op, a)?, as_number(op, b)?);
            let result = match op {
                "add" => x + y,
                "sub" => x - y,
                "mul" => x * y,
                "div" => {
                    if y == 0.0 {
                        return fail("division by zero");
                    }
                    x / y
                }
                "mod" => {
                    if y == 0.0 {
                        return fail("modulo by zero");
                    }
                    x - y * (x / y).floor()
                }
                other => return fail(format!("unknown operator `{other}`")),
            };
            number_value(result)
        }
    }
}
