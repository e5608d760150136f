//! The shape tree and its breadth-first growth algorithm.
//!
//! Growth proceeds layer by layer. Every node of a layer runs its rule
//! before any of the children those rules request, so the order in which
//! rules execute is strictly breadth-first:
//!
//! ```text
//! next = [root]
//! loop while next is not empty:
//!     current, next = next, []
//!     if layers_executed >= max_layers: stop      (queued nodes stay leaves)
//!     layers_executed += 1
//!     for node in current: run node's rule        (may push into next)
//! ```
//!
//! Both limits truncate silently. A rule error aborts the build and leaves
//! whatever was grown so far in place.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use shape_tree_core::SceneBackend;

use crate::context::RuleContext;
use crate::error::ShapeResult;
use crate::node::{Node, NodeId};
use crate::rule::{Rule, RuleArgs};

/// Default cap on executed layers.
pub const DEFAULT_MAX_LAYERS: usize = 100;

/// Default cap on child requests.
pub const DEFAULT_MAX_NODES: usize = 2000;

/// Resource bounds for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthLimits {
    /// Maximum number of layers whose rules are executed.
    #[serde(default = "GrowthLimits::default_max_layers")]
    pub max_layers: usize,

    /// Child requests are rejected once the request counter reaches this.
    /// The root does not count.
    #[serde(default = "GrowthLimits::default_max_nodes")]
    pub max_nodes: usize,
}

impl GrowthLimits {
    fn default_max_layers() -> usize {
        DEFAULT_MAX_LAYERS
    }

    fn default_max_nodes() -> usize {
        DEFAULT_MAX_NODES
    }

    /// Create limits from explicit values.
    pub fn new(max_layers: usize, max_nodes: usize) -> Self {
        Self {
            max_layers,
            max_nodes,
        }
    }
}

impl Default for GrowthLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LAYERS, DEFAULT_MAX_NODES)
    }
}

/// Summary of a finished build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildStats {
    /// Layers whose rules were executed.
    pub layers: usize,

    /// Nodes in the tree, root included.
    pub nodes: usize,

    /// Raw value of the child-request counter. May exceed `max_nodes`.
    pub requested: usize,

    /// Child requests dropped by the node limit.
    pub dropped: usize,

    /// Nodes left queued because the layer limit was reached.
    pub unexpanded: usize,

    /// Wall-clock duration of the build.
    pub duration: Duration,
}

impl BuildStats {
    /// Whether either limit cut growth short.
    pub fn was_truncated(&self) -> bool {
        self.dropped > 0 || self.unexpanded > 0
    }
}

/// Owner of the node graph and driver of layer-by-layer growth.
#[derive(Debug, Clone)]
pub struct ShapeTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    current: Option<NodeId>,
    current_layer: Vec<NodeId>,
    next_layer: Vec<NodeId>,
    layers_executed: usize,
    requested: usize,
    limits: GrowthLimits,
}

impl Default for ShapeTree {
    fn default() -> Self {
        Self::new(GrowthLimits::default())
    }
}

impl ShapeTree {
    /// Create an empty tree with the given limits.
    pub fn new(limits: GrowthLimits) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            current: None,
            current_layer: Vec::new(),
            next_layer: Vec::new(),
            layers_executed: 0,
            requested: 0,
            limits,
        }
    }

    /// Replace the whole tree with a single root bound to `rule`.
    pub fn set_root(&mut self, rule: Rule) -> NodeId {
        self.set_root_node(Some(rule), RuleArgs::new())
    }

    /// Replace the whole tree with a single root node.
    pub fn set_root_node(&mut self, rule: Option<Rule>, args: RuleArgs) -> NodeId {
        self.nodes.clear();
        self.current_layer.clear();
        self.next_layer.clear();
        self.current = None;
        self.layers_executed = 0;
        self.requested = 0;

        let id = self.create_node(rule, args);
        self.root = Some(id);
        id
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Root node id, if a root has been set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// The root node.
    pub fn root_node(&self) -> Option<&Node> {
        self.root.map(|id| self.node_ref(id))
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Mutable access to a node, e.g. to bind a visual created elsewhere.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub(crate) fn node_ref(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn slot_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// All nodes in creation order (which is also breadth-first order for a
    /// grown tree).
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes without children.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Node whose rule is running. `None` outside [`ShapeTree::build`].
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Layers whose rules have been executed.
    pub fn layers_executed(&self) -> usize {
        self.layers_executed
    }

    /// Raw child-request counter, rejected requests included.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Nodes queued whose rules have not run yet. After a build this is
    /// non-empty only when the layer limit stopped growth.
    pub fn frontier(&self) -> &[NodeId] {
        &self.next_layer
    }

    /// Active limits.
    pub fn limits(&self) -> GrowthLimits {
        self.limits
    }

    /// Change the layer cap.
    pub fn set_max_layers(&mut self, max_layers: usize) {
        self.limits.max_layers = max_layers;
    }

    /// Change the node cap.
    pub fn set_max_nodes(&mut self, max_nodes: usize) {
        self.limits.max_nodes = max_nodes;
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cursor = self.node(id).and_then(Node::parent);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.node_ref(parent).parent();
        }
        depth
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Create a detached node. It becomes part of the tree once attached.
    pub fn create_node(&mut self, rule: Option<Rule>, args: RuleArgs) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, rule, args));
        id
    }

    /// Append children to `parent`, in order, and point them back at it.
    ///
    /// Nodes that already have a parent are skipped so a node never appears
    /// under two parents.
    pub fn attach_children(&mut self, parent: NodeId, children: impl IntoIterator<Item = NodeId>) {
        for child in children {
            if child == parent || self.node_ref(child).parent().is_some() {
                continue;
            }
            self.slot_mut(child).set_parent(parent);
            self.slot_mut(parent).push_child(child);
        }
    }

    /// Count a child request against the node limit and, if it fits, create
    /// the child under `parent` and queue it for the next layer.
    pub(crate) fn request_child(
        &mut self,
        parent: NodeId,
        rule: Option<Rule>,
        args: RuleArgs,
    ) -> Option<NodeId> {
        self.requested += 1;
        if self.requested >= self.limits.max_nodes {
            return None;
        }
        let child = self.create_node(rule, args);
        self.attach_children(parent, [child]);
        self.next_layer.push(child);
        Some(child)
    }

    // =========================================================================
    // Growth
    // =========================================================================

    /// Grow the tree from its root. Does nothing if no root is set.
    ///
    /// Any previous growth is discarded first; the caller is responsible for
    /// tearing down visuals created by an earlier build.
    pub fn build(&mut self, backend: &mut dyn SceneBackend) -> ShapeResult<BuildStats> {
        let started = Instant::now();
        let Some(root) = self.root else {
            return Ok(BuildStats::default());
        };

        self.reset_growth(root);
        self.next_layer.push(root);

        let result = self.grow(backend);
        self.current = None;
        result?;

        Ok(self.stats(started.elapsed()))
    }

    fn grow(&mut self, backend: &mut dyn SceneBackend) -> ShapeResult<()> {
        while !self.next_layer.is_empty() {
            self.current_layer = std::mem::take(&mut self.next_layer);
            if self.layers_executed >= self.limits.max_layers {
                self.next_layer = std::mem::take(&mut self.current_layer);
                break;
            }
            self.layers_executed += 1;
            self.build_layer(backend)?;
        }
        Ok(())
    }

    fn build_layer(&mut self, backend: &mut dyn SceneBackend) -> ShapeResult<()> {
        for index in 0..self.current_layer.len() {
            let id = self.current_layer[index];
            self.current = Some(id);
            self.invoke_rule(id, backend)?;
        }
        Ok(())
    }

    /// Run the rule bound to `id` with its captured arguments.
    pub fn invoke_rule(&mut self, id: NodeId, backend: &mut dyn SceneBackend) -> ShapeResult<()> {
        let node = self.node_ref(id);
        let Some(rule) = node.rule().cloned() else {
            return Ok(());
        };
        let args = node.shared_args();
        let mut ctx = RuleContext::new(self, backend, id);
        rule.invoke(&mut ctx, &args)
    }

    fn reset_growth(&mut self, root: NodeId) {
        self.nodes.truncate(root.0 + 1);
        self.slot_mut(root).reset_growth();
        self.current_layer.clear();
        self.next_layer.clear();
        self.current = None;
        self.layers_executed = 0;
        self.requested = 0;
    }

    fn stats(&self, duration: Duration) -> BuildStats {
        let created_children = self.nodes.len().saturating_sub(1);
        BuildStats {
            layers: self.layers_executed,
            nodes: self.nodes.len(),
            requested: self.requested,
            dropped: self.requested.saturating_sub(created_children),
            unexpanded: self.next_layer.len(),
            duration,
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Flag the visuals of `id` and all its descendants for destruction,
    /// parent before child, siblings in order.
    pub fn destroy_recursively(&self, id: NodeId, backend: &mut dyn SceneBackend) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.node(next) else {
                continue;
            };
            if let Some(handle) = node.visual() {
                backend.mark_for_destruction(handle);
            }
            stack.extend(node.children().iter().rev().copied());
        }
    }

    /// Flag every visual in the tree for destruction.
    pub fn destroy_visuals(&self, backend: &mut dyn SceneBackend) {
        if let Some(root) = self.root {
            self.destroy_recursively(root, backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShapeError;
    use shape_tree_core::{SceneRecorder, Vec3};

    fn leaf() -> Rule {
        Rule::new("Leaf", |ctx, _| {
            ctx.cube(Vec3::ONE, Vec3::ZERO);
            Ok(())
        })
    }

    fn fan_out(k: usize) -> Rule {
        Rule::new("Root", move |ctx, _| {
            ctx.cube(Vec3::ONE, Vec3::ZERO);
            for _ in 0..k {
                ctx.add_node(leaf(), RuleArgs::new());
            }
            Ok(())
        })
    }

    fn chain(ctx: &mut RuleContext<'_>, args: &RuleArgs) -> ShapeResult<()> {
        let iter = args.int(0, "iter")?;
        ctx.cube(Vec3::ONE, Vec3::ZERO);
        if iter > 0 {
            ctx.add_node(Rule::new("Chain", chain), RuleArgs::new().arg(iter - 1));
        }
        Ok(())
    }

    fn build(rule: Rule, limits: GrowthLimits) -> (ShapeTree, SceneRecorder, BuildStats) {
        let mut tree = ShapeTree::new(limits);
        tree.set_root(rule);
        let mut scene = SceneRecorder::new();
        let stats = tree.build(&mut scene).unwrap();
        (tree, scene, stats)
    }

    #[test]
    fn test_build_without_root_is_noop() {
        let mut tree = ShapeTree::default();
        let mut scene = SceneRecorder::new();
        let stats = tree.build(&mut scene).unwrap();
        assert_eq!(stats.layers, 0);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_two_children_two_layers() {
        let (tree, scene, stats) = build(fan_out(2), GrowthLimits::new(5, 100));
        assert_eq!(tree.len(), 3);
        assert_eq!(stats.layers, 2);
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(scene.stats().live, 3);
        assert!(tree.current().is_none());
    }

    #[test]
    fn test_node_limit_counts_past_cap() {
        let mut tree = ShapeTree::new(GrowthLimits::new(100, 2));
        tree.set_root(Rule::new("Root", |ctx, _| {
            ctx.add_node(Rule::new("Chain", chain), RuleArgs::new().arg(3));
            Ok(())
        }));
        let mut scene = SceneRecorder::new();
        let stats = tree.build(&mut scene).unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(stats.requested, 2);
        assert_eq!(stats.dropped, 1);
        assert!(stats.was_truncated());
    }

    #[test]
    fn test_rejected_request_does_not_touch_children() {
        let (tree, _, stats) = build(fan_out(5), GrowthLimits::new(10, 3));
        // Requests 1 and 2 fit, 3..=5 are dropped.
        assert_eq!(tree.root_node().unwrap().children().len(), 2);
        assert_eq!(stats.requested, 5);
        assert_eq!(stats.dropped, 3);
    }

    #[test]
    fn test_layer_limit_leaves_queued_nodes_unrun() {
        let (tree, scene, stats) = build(fan_out(3), GrowthLimits::new(1, 100));
        assert_eq!(stats.layers, 1);
        assert_eq!(tree.len(), 4);
        for &child in tree.root_node().unwrap().children() {
            let node = tree.node(child).unwrap();
            assert!(node.visual().is_none());
            assert!(node.is_leaf());
        }
        assert_eq!(tree.frontier().len(), 3);
        assert_eq!(scene.stats().live, 1);
    }

    #[test]
    fn test_zero_layers_runs_nothing() {
        let (tree, scene, stats) = build(fan_out(3), GrowthLimits::new(0, 100));
        assert_eq!(stats.layers, 0);
        assert_eq!(tree.len(), 1);
        assert_eq!(scene.stats().created, 0);
    }

    #[test]
    fn test_breadth_first_execution_order() {
        use std::sync::{Arc, Mutex};

        let order = Arc::new(Mutex::new(Vec::new()));
        let log = |name: &'static str, order: &Arc<Mutex<Vec<&'static str>>>| {
            let order = Arc::clone(order);
            Rule::new(name, move |_, _| {
                order.lock().unwrap().push(name);
                Ok(())
            })
        };

        let a1 = log("A1", &order);
        let b1 = log("B1", &order);
        let a = {
            let order = Arc::clone(&order);
            Rule::new("A", move |ctx, _| {
                order.lock().unwrap().push("A");
                ctx.add_node(a1.clone(), RuleArgs::new());
                Ok(())
            })
        };
        let b = {
            let order = Arc::clone(&order);
            Rule::new("B", move |ctx, _| {
                order.lock().unwrap().push("B");
                ctx.add_node(b1.clone(), RuleArgs::new());
                Ok(())
            })
        };
        let root = Rule::new("Root", move |ctx, _| {
            ctx.add_node(a.clone(), RuleArgs::new());
            ctx.add_node(b.clone(), RuleArgs::new());
            Ok(())
        });

        build(root, GrowthLimits::default());
        assert_eq!(*order.lock().unwrap(), vec!["A", "B", "A1", "B1"]);
    }

    #[test]
    fn test_rule_error_keeps_partial_tree() {
        let failing = Rule::new("Broken", |_, args| {
            args.number(0, "missing")?;
            Ok(())
        });
        let mut tree = ShapeTree::default();
        tree.set_root(Rule::new("Root", move |ctx, _| {
            ctx.cube(Vec3::ONE, Vec3::ZERO);
            ctx.add_node(failing.clone(), RuleArgs::new());
            ctx.add_node(leaf(), RuleArgs::new());
            Ok(())
        }));
        let mut scene = SceneRecorder::new();
        let err = tree.build(&mut scene).unwrap_err();

        assert!(matches!(err, ShapeError::RuleExecution { ref rule, .. } if rule == "Broken"));
        assert_eq!(tree.len(), 3);
        assert!(tree.current().is_none());
        // The sibling after the failing node never ran.
        let sibling = tree.root_node().unwrap().children()[1];
        assert!(tree.node(sibling).unwrap().visual().is_none());
    }

    #[test]
    fn test_attach_children_batch_keeps_order() {
        let mut tree = ShapeTree::default();
        let root = tree.set_root(leaf());
        let a = tree.create_node(None, RuleArgs::new());
        let b = tree.create_node(None, RuleArgs::new());
        let c = tree.create_node(None, RuleArgs::new());
        tree.attach_children(root, [a]);
        tree.attach_children(root, vec![b, c, a]);

        assert_eq!(tree.root_node().unwrap().children(), &[a, b, c]);
        assert_eq!(tree.node(c).unwrap().parent(), Some(root));
        assert_eq!(tree.depth(c), 1);
    }

    #[test]
    fn test_unbound_node_invocation_is_noop() {
        let mut tree = ShapeTree::default();
        let root = tree.set_root_node(None, RuleArgs::new());
        let mut scene = SceneRecorder::new();
        tree.invoke_rule(root, &mut scene).unwrap();
        let stats = tree.build(&mut scene).unwrap();
        assert_eq!(stats.layers, 1);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_destroy_visits_parent_before_children() {
        let (tree, mut scene, _) = build(fan_out(2), GrowthLimits::default());
        tree.destroy_visuals(&mut scene);
        assert_eq!(scene.stats().live, 0);
        assert_eq!(scene.stats().pending_destruction, 3);
        assert_eq!(scene.collect_garbage(), 3);
    }

    #[test]
    fn test_rebuild_discards_previous_growth() {
        let mut tree = ShapeTree::new(GrowthLimits::default());
        tree.set_root(fan_out(2));
        let mut scene = SceneRecorder::new();
        tree.build(&mut scene).unwrap();
        let stats = tree.build(&mut scene).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(stats.requested, 2);
    }
}
