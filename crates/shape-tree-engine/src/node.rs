//! Nodes of the shape tree.
//!
//! Nodes live in an arena owned by [`ShapeTree`](crate::ShapeTree) and refer
//! to each other by [`NodeId`]. Links are only ever created through
//! `ShapeTree::attach_children`, which keeps both sides of the relation in
//! sync.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shape_tree_core::VisualHandle;

use crate::rule::{Rule, RuleArgs};

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Name given to nodes created without a rule.
pub const UNBOUND_NODE_NAME: &str = "<unbound>";

/// A single element of the shape tree.
///
/// The rule and its arguments are captured at creation and never change.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    rule: Option<Rule>,
    args: Arc<RuleArgs>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    visual: Option<VisualHandle>,
}

impl Node {
    pub(crate) fn new(id: NodeId, rule: Option<Rule>, args: RuleArgs) -> Self {
        let name = rule
            .as_ref()
            .map(|r| r.name().to_string())
            .unwrap_or_else(|| UNBOUND_NODE_NAME.to_string());
        Self {
            id,
            name,
            rule,
            args: Arc::new(args),
            parent: None,
            children: Vec::new(),
            visual: None,
        }
    }

    /// Arena index of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The producing rule's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound rule, if any.
    pub fn rule(&self) -> Option<&Rule> {
        self.rule.as_ref()
    }

    /// Whether a rule is bound. Invoking an unbound node does nothing.
    pub fn has_rule(&self) -> bool {
        self.rule.is_some()
    }

    /// Arguments captured when the node was requested.
    pub fn args(&self) -> &RuleArgs {
        &self.args
    }

    pub(crate) fn shared_args(&self) -> Arc<RuleArgs> {
        Arc::clone(&self.args)
    }

    /// Parent node, absent only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in creation order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Handle of the visual object created by this node's rule, if any.
    pub fn visual(&self) -> Option<VisualHandle> {
        self.visual
    }

    /// Bind a visual object. Repeated calls overwrite (last write wins).
    pub fn set_visual(&mut self, handle: VisualHandle) {
        self.visual = Some(handle);
    }

    pub(crate) fn set_parent(&mut self, parent: NodeId) {
        self.parent = Some(parent);
    }

    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    pub(crate) fn reset_growth(&mut self) {
        self.children.clear();
        self.visual = None;
    }
}
