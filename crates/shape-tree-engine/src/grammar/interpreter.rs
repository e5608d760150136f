//! Executes grammar rule bodies against a [`RuleContext`].

use rand::Rng;
use serde_json::Value;
use shape_tree_core::Vec3;

use super::expr::{truthy, Expr, Scope};
use super::schema::{RuleDef, Step};
use super::Grammar;
use crate::context::RuleContext;
use crate::error::{ShapeError, ShapeResult};
use crate::rule::{value_to_vec3, RuleArgs};

/// Upper bound on the count form of `each`.
pub const MAX_EACH_COUNT: u64 = 1_000_000;

/// Whether execution continues after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Return,
}

/// Runs one rule body with one random source.
pub(crate) struct Interpreter<'g, R: Rng + ?Sized> {
    grammar: &'g Grammar,
    rule: &'g str,
    rng: &'g mut R,
}

impl<'g, R: Rng + ?Sized> Interpreter<'g, R> {
    pub(crate) fn new(grammar: &'g Grammar, rule: &'g str, rng: &'g mut R) -> Self {
        Self { grammar, rule, rng }
    }

    /// Bind `args` to the rule's parameters and run its steps.
    pub(crate) fn run(
        &mut self,
        def: &RuleDef,
        ctx: &mut RuleContext<'_>,
        args: &RuleArgs,
    ) -> ShapeResult<()> {
        let mut scope = self.bind(def, args)?;
        self.steps(&def.steps, &mut scope, ctx)?;
        Ok(())
    }

    fn bind(&mut self, def: &RuleDef, args: &RuleArgs) -> ShapeResult<Scope> {
        let positional = args.positional_values();
        if positional.len() > def.params.len() {
            return Err(ShapeError::rule(
                self.rule,
                format!(
                    "takes {} positional argument(s) but {} were given",
                    def.params.len(),
                    positional.len()
                ),
            ));
        }
        if let Some(unknown) = args
            .named_values()
            .keys()
            .find(|name| !def.params.contains(*name))
        {
            return Err(ShapeError::rule(
                self.rule,
                format!("unexpected keyword argument `{unknown}`"),
            ));
        }

        if let Some(twice) = def
            .params
            .iter()
            .take(positional.len())
            .find(|param| args.named_values().contains_key(*param))
        {
            return Err(ShapeError::rule(
                self.rule,
                format!("got multiple values for argument `{twice}`"),
            ));
        }

        let mut scope = Scope::new();
        for (index, param) in def.params.iter().enumerate() {
            let from_call = positional.get(index).or(args.named_values().get(param));
            let value = match (from_call, def.defaults.get(param)) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => default.eval(&scope, &mut *self.rng)?,
                (None, None) => {
                    return Err(ShapeError::rule(
                        self.rule,
                        format!("missing argument `{param}`"),
                    ))
                }
            };
            scope.set(param.clone(), value);
        }
        Ok(scope)
    }

    fn steps(
        &mut self,
        steps: &[Step],
        scope: &mut Scope,
        ctx: &mut RuleContext<'_>,
    ) -> ShapeResult<Flow> {
        for step in steps {
            if self.step(step, scope, ctx)? == Flow::Return {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Continue)
    }

    fn vector(&mut self, label: &str, expr: &Expr, scope: &Scope) -> ShapeResult<Vec3> {
        let value = expr.eval(scope, &mut *self.rng)?;
        Ok(value_to_vec3(label, &value)?)
    }

    fn step(
        &mut self,
        step: &Step,
        scope: &mut Scope,
        ctx: &mut RuleContext<'_>,
    ) -> ShapeResult<Flow> {
        match step {
            Step::Cube { size, pivot } => {
                let size = match size {
                    Some(expr) => self.vector("size", expr, scope)?,
                    None => Vec3::ONE,
                };
                let pivot = match pivot {
                    Some(expr) => self.vector("pivot", expr, scope)?,
                    None => Vec3::ZERO,
                };
                ctx.cube(size, pivot);
            }
            Step::Translate(expr) => {
                let v = self.vector("translate", expr, scope)?;
                ctx.translate(v);
            }
            Step::Rotate(expr) => {
                let v = self.vector("rotate", expr, scope)?;
                ctx.rotate(v);
            }
            Step::Scale(expr) => {
                let v = self.vector("scale", expr, scope)?;
                ctx.scale(v);
            }
            Step::Add { rule, args, kwargs } => {
                let target = self.grammar.rule_referenced_by(rule, self.rule)?;
                let mut call = RuleArgs::positional(
                    args.iter()
                        .map(|arg| arg.eval(scope, &mut *self.rng))
                        .collect::<ShapeResult<Vec<_>>>()?,
                );
                for (name, expr) in kwargs {
                    call = call.kwarg(name.clone(), expr.eval(scope, &mut *self.rng)?);
                }
                ctx.add_node(target, call);
            }
            Step::Let { name, value } => {
                let value = value.eval(scope, &mut *self.rng)?;
                scope.set(name.clone(), value);
            }
            Step::Each { name, over, steps } => match over.eval(scope, &mut *self.rng)? {
                Value::Array(items) => {
                    for item in items {
                        scope.set(name.clone(), item);
                        if self.steps(steps, scope, ctx)? == Flow::Return {
                            return Ok(Flow::Return);
                        }
                    }
                }
                Value::Number(n) => {
                    let count = n.as_f64().unwrap_or(0.0).max(0.0);
                    if count > MAX_EACH_COUNT as f64 {
                        return Err(ShapeError::rule(
                            self.rule,
                            format!("`each` count {count} exceeds the limit of {MAX_EACH_COUNT}"),
                        ));
                    }
                    for i in 0..count as u64 {
                        scope.set(name.clone(), Value::from(i));
                        if self.steps(steps, scope, ctx)? == Flow::Return {
                            return Ok(Flow::Return);
                        }
                    }
                }
                other => {
                    return Err(ShapeError::rule(
                        self.rule,
                        format!("`each` expects a list or a count, got {other}"),
                    ))
                }
            },
            Step::If { cond, steps } => {
                if truthy(&cond.eval(scope, &mut *self.rng)?) {
                    return self.steps(steps, scope, ctx);
                }
            }
            Step::ReturnIf(condition) => {
                if truthy(&condition.eval(scope, &mut *self.rng)?) {
                    return Ok(Flow::Return);
                }
            }
        }
        Ok(Flow::Continue)
    }
}
