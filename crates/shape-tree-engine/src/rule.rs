//! Rules and their arguments.
//!
//! A rule is a named callable run once per node. It receives the node's
//! captured [`RuleArgs`] and a [`RuleContext`] through which it creates
//! geometry and requests children. Rules return nothing useful: all of
//! their effects go through the context.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shape_tree_core::Vec3;
use thiserror::Error;

use crate::context::RuleContext;
use crate::error::{ShapeError, ShapeResult};

/// Signature shared by every rule body.
pub type RuleFn = dyn Fn(&mut RuleContext<'_>, &RuleArgs) -> ShapeResult<()> + Send + Sync;

/// A named rule. Cloning is cheap.
#[derive(Clone)]
pub struct Rule {
    name: Arc<str>,
    func: Arc<RuleFn>,
}

impl Rule {
    /// Wrap a closure or function as a rule.
    pub fn new<F>(name: impl AsRef<str>, func: F) -> Self
    where
        F: Fn(&mut RuleContext<'_>, &RuleArgs) -> ShapeResult<()> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.as_ref()),
            func: Arc::new(func),
        }
    }

    /// The rule's name, used for diagnostics and tree rendering.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the rule body. Argument errors are attributed to this rule.
    pub fn invoke(&self, ctx: &mut RuleContext<'_>, args: &RuleArgs) -> ShapeResult<()> {
        (self.func)(ctx, args).map_err(|e| match e {
            ShapeError::RuleExecution { rule, message } if rule.is_empty() => {
                ShapeError::rule(self.name(), message)
            }
            other => other,
        })
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// An argument that could not be read as the requested type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgError {
    /// Neither the keyword nor the positional slot was supplied.
    #[error("missing argument {name:?} (position {index})")]
    Missing { index: usize, name: String },

    /// The argument exists but has the wrong shape.
    #[error("argument {name:?} expected {expected}, got {found}")]
    Type {
        name: String,
        expected: &'static str,
        found: String,
    },
}

impl From<ArgError> for ShapeError {
    fn from(e: ArgError) -> Self {
        // The rule name is filled in by `Rule::invoke`.
        ShapeError::rule("", e.to_string())
    }
}

/// Positional and named arguments captured when a node is requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleArgs {
    #[serde(default)]
    positional: Vec<Value>,
    #[serde(default)]
    named: BTreeMap<String, Value>,
}

impl RuleArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments from a positional list.
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            named: BTreeMap::new(),
        }
    }

    /// Append a positional argument (builder pattern).
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a named argument (builder pattern).
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Positional arguments in call order.
    pub fn positional_values(&self) -> &[Value] {
        &self.positional
    }

    /// Named arguments, sorted by name.
    pub fn named_values(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    /// Total number of supplied arguments.
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    /// Whether no argument was supplied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a parameter the way a call binds it: by keyword first,
    /// then by position.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.named.get(name).or_else(|| self.positional.get(index))
    }

    fn require(&self, index: usize, name: &str) -> Result<&Value, ArgError> {
        self.get(index, name).ok_or_else(|| ArgError::Missing {
            index,
            name: name.to_string(),
        })
    }

    /// Read a number.
    pub fn number(&self, index: usize, name: &str) -> Result<f64, ArgError> {
        value_to_number(name, self.require(index, name)?)
    }

    /// Read a number, falling back to `default` when absent.
    pub fn number_or(&self, index: usize, name: &str, default: f64) -> Result<f64, ArgError> {
        match self.get(index, name) {
            Some(v) => value_to_number(name, v),
            None => Ok(default),
        }
    }

    /// Read an integer. Floats with no fractional part are accepted.
    pub fn int(&self, index: usize, name: &str) -> Result<i64, ArgError> {
        let value = self.require(index, name)?;
        match value.as_i64() {
            Some(i) => Ok(i),
            None => {
                let n = value_to_number(name, value)?;
                if n.fract() == 0.0 {
                    Ok(n as i64)
                } else {
                    Err(type_error(name, "integer", value))
                }
            }
        }
    }

    /// Read a three-component vector.
    pub fn vec3(&self, index: usize, name: &str) -> Result<Vec3, ArgError> {
        value_to_vec3(name, self.require(index, name)?)
    }

    /// Read a vector, falling back to `default` when absent.
    pub fn vec3_or(&self, index: usize, name: &str, default: Vec3) -> Result<Vec3, ArgError> {
        match self.get(index, name) {
            Some(v) => value_to_vec3(name, v),
            None => Ok(default),
        }
    }
}

fn type_error(name: &str, expected: &'static str, found: &Value) -> ArgError {
    ArgError::Type {
        name: name.to_string(),
        expected,
        found: found.to_string(),
    }
}

/// Interpret a JSON value as a number.
pub fn value_to_number(name: &str, value: &Value) -> Result<f64, ArgError> {
    value
        .as_f64()
        .ok_or_else(|| type_error(name, "number", value))
}

/// Interpret a JSON value as a vector: `[x, y, z]` or `{"x", "y", "z"}`.
pub fn value_to_vec3(name: &str, value: &Value) -> Result<Vec3, ArgError> {
    let components = match value {
        Value::Array(items) if items.len() == 3 => [&items[0], &items[1], &items[2]],
        Value::Object(map) => match (map.get("x"), map.get("y"), map.get("z")) {
            (Some(x), Some(y), Some(z)) => [x, y, z],
            _ => return Err(type_error(name, "3-vector", value)),
        },
        _ => return Err(type_error(name, "3-vector", value)),
    };
    let mut out = [0.0f32; 3];
    for (slot, component) in out.iter_mut().zip(components) {
        *slot = component
            .as_f64()
            .ok_or_else(|| type_error(name, "3-vector", value))? as f32;
    }
    Ok(Vec3::from(out))
}

/// Encode a vector as a `[x, y, z]` JSON array.
pub fn vec3_value(v: Vec3) -> Value {
    Value::from(v.to_array().map(f64::from).to_vec())
}
