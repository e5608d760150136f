//! On-disk schema of declarative grammar files.
//!
//! ```toml
//! max_layers = 20
//! max_nodes = 1000
//! seed = 7
//!
//! [rules.Root]
//! steps = [
//!     { cube = { size = [1, 1, 1] } },
//!     { add = { rule = "Arm", args = [4] } },
//! ]
//!
//! [rules.Arm]
//! params = ["iter", "r"]
//! defaults = { r = [0, 0, 30] }
//! steps = [
//!     { cube = { size = [0.2, 3, 0.2], pivot = [0, -1, 0] } },
//!     { rotate = "$r" },
//!     { return_if = { le = ["$iter", 1] } },
//!     { add = { rule = "Arm", args = [{ sub = ["$iter", 1] }] } },
//! ]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::expr::Expr;

/// Entry rule name used when a grammar does not declare one.
pub const DEFAULT_ENTRY_RULE: &str = "Root";

fn default_entry() -> String {
    DEFAULT_ENTRY_RULE.to_string()
}

/// A whole grammar file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarFile {
    /// Layer cap declared by the grammar.
    #[serde(default)]
    pub max_layers: Option<usize>,

    /// Node cap declared by the grammar.
    #[serde(default)]
    pub max_nodes: Option<usize>,

    /// Seed for the grammar's random operators. Absent means entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Name of the rule the tree grows from.
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Free-form description shown by tooling.
    #[serde(default)]
    pub description: Option<String>,

    /// Rule definitions by name.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleDef>,
}

/// One rule of a grammar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDef {
    /// Parameter names, in positional order.
    #[serde(default)]
    pub params: Vec<String>,

    /// Defaults for trailing or optional parameters.
    #[serde(default)]
    pub defaults: BTreeMap<String, Expr>,

    /// Body, executed top to bottom.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A single statement of a rule body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Create the node's solid. Size defaults to `[1, 1, 1]`, pivot to the
    /// center.
    Cube {
        #[serde(default)]
        size: Option<Expr>,
        #[serde(default)]
        pivot: Option<Expr>,
    },

    /// Local translation of the node's solid.
    Translate(Expr),

    /// Local euler rotation, in degrees.
    Rotate(Expr),

    /// Local scale.
    Scale(Expr),

    /// Request a child node.
    Add {
        rule: String,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        kwargs: BTreeMap<String, Expr>,
    },

    /// Bind a variable for the rest of the rule.
    Let { name: String, value: Expr },

    /// Run `steps` once per element of `over` (or `0..n` for a number).
    Each {
        name: String,
        over: Expr,
        steps: Vec<Step>,
    },

    /// Run `steps` only when `cond` holds.
    If { cond: Expr, steps: Vec<Step> },

    /// Leave the rule when the condition holds.
    ReturnIf(Expr),
}
