//! Rule-driven, breadth-first procedural generation of shape trees.
//!
//! A shape tree is grown from a single root node. Every node carries a
//! named rule and the arguments it was requested with. When a node is
//! expanded its rule runs once: it creates the node's solid in a scene
//! backend, transforms it, and requests child nodes for the next layer.
//!
//! ## Core Concepts
//!
//! - **Rule**: a named callable `(context, args)`; see [`Rule`]
//! - **RuleContext**: the node being expanded, plus geometry primitives
//! - **ShapeTree**: node arena and layer-by-layer growth with two limits
//! - **Ruleset**: an entry rule plus declared limits, built in or read from
//!   a grammar file
//! - **RulesetLoader**: resolves rulesets by name and tracks file changes
//!   for hot reload
//!
//! ## Growth
//!
//! ```text
//! layer 1:  Root                     runs, requests MainMod
//! layer 2:  MainMod                  runs, requests WingBase x2, ...
//! layer 3:  WingBase, WingBase, ...  each runs before any grandchild
//! ```
//!
//! Growth stops when no layer is queued or once `max_layers` layers have
//! run. Child requests past `max_nodes` are dropped. Hitting a limit is not
//! an error.

pub mod builtin;
mod context;
mod error;
mod generator;
pub mod grammar;
mod loader;
mod node;
mod render;
mod rule;
mod ruleset;
mod tree;

pub use context::RuleContext;
pub use error::{ShapeError, ShapeResult};
pub use generator::ShapeGenerator;
pub use loader::{LoadReport, RulesetLoader, GENERATED_DIR, GRAMMAR_EXTENSIONS, TREE_TEXT_FILE};
pub use node::{Node, NodeId, UNBOUND_NODE_NAME};
pub use render::{tree_to_text, TreeRenderer, MIN_INDENT};
pub use rule::{value_to_number, value_to_vec3, vec3_value, ArgError, Rule, RuleArgs, RuleFn};
pub use ruleset::{FnRuleset, Ruleset, RulesetRegistry};
pub use tree::{BuildStats, GrowthLimits, ShapeTree, DEFAULT_MAX_LAYERS, DEFAULT_MAX_NODES};

// Grammar files
pub use grammar::Grammar;

// Re-export the scene vocabulary so callers need only this crate.
pub use shape_tree_core::{SceneBackend, SceneRecorder, Vec3, VisualHandle};
