//! Execution context handed to a running rule.
//!
//! Exactly one rule runs at a time. Instead of a global "current node", each
//! invocation gets a [`RuleContext`] that borrows the tree and the scene
//! backend for the duration of that single call and remembers which node is
//! being expanded. Primitive operations (`cube`, `translate`, ...) and child
//! requests (`add_node`) all target that node.

use shape_tree_core::{SceneBackend, Vec3, VisualHandle};

use crate::node::{Node, NodeId};
use crate::rule::{Rule, RuleArgs};
use crate::tree::ShapeTree;

/// The node currently being expanded, plus access to its tree and scene.
pub struct RuleContext<'a> {
    tree: &'a mut ShapeTree,
    backend: &'a mut dyn SceneBackend,
    node: NodeId,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(
        tree: &'a mut ShapeTree,
        backend: &'a mut dyn SceneBackend,
        node: NodeId,
    ) -> Self {
        Self {
            tree,
            backend,
            node,
        }
    }

    /// Id of the node being expanded.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// The node being expanded.
    pub fn node(&self) -> &Node {
        self.tree.node_ref(self.node)
    }

    /// Parent of the node being expanded.
    pub fn parent(&self) -> Option<&Node> {
        self.node().parent().map(|p| self.tree.node_ref(p))
    }

    /// One-based index of the layer currently executing.
    pub fn layer(&self) -> usize {
        self.tree.layers_executed()
    }

    /// Read-only view of the whole tree.
    pub fn tree(&self) -> &ShapeTree {
        &*self.tree
    }

    /// Create a primitive solid for the current node.
    ///
    /// If the parent node already has a visual, the new solid becomes its
    /// visual child. Calling this twice replaces the node's handle; the
    /// first solid stays in the scene.
    pub fn cube(&mut self, size: Vec3, pivot: Vec3) -> VisualHandle {
        let handle = self.backend.create_visual(size, pivot);
        let parent_visual = self.parent().and_then(Node::visual);
        self.tree.slot_mut(self.node).set_visual(handle);
        if let Some(parent_visual) = parent_visual {
            self.backend.set_visual_parent(handle, parent_visual);
        }
        handle
    }

    /// Translate the current node's visual in local space. No-op without one.
    pub fn translate(&mut self, displacement: Vec3) {
        if let Some(handle) = self.node().visual() {
            self.backend.translate_local(handle, displacement);
        }
    }

    /// Rotate the current node's visual by euler angles in degrees. No-op
    /// without one.
    pub fn rotate(&mut self, euler_degrees: Vec3) {
        if let Some(handle) = self.node().visual() {
            self.backend.rotate_local(handle, euler_degrees);
        }
    }

    /// Set the current node's visual scale. No-op without one.
    pub fn scale(&mut self, scale: Vec3) {
        if let Some(handle) = self.node().visual() {
            self.backend.set_local_scale(handle, scale);
        }
    }

    /// Request a child of the current node.
    ///
    /// The child's rule runs in the next layer, not now. Requests past the
    /// node limit are dropped without error.
    pub fn add_node(&mut self, rule: Rule, args: RuleArgs) {
        self.tree.request_child(self.node, Some(rule), args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::GrowthLimits;
    use shape_tree_core::SceneRecorder;

    #[test]
    fn test_transforms_without_visual_are_noops() {
        let mut tree = ShapeTree::new(GrowthLimits::default());
        tree.set_root(Rule::new("Root", |ctx, _| {
            ctx.translate(Vec3::ONE);
            ctx.rotate(Vec3::ONE);
            ctx.scale(Vec3::ONE);
            Ok(())
        }));
        let mut scene = SceneRecorder::new();
        tree.build(&mut scene).unwrap();

        assert_eq!(scene.stats().created, 0);
        assert!(tree.root_node().unwrap().visual().is_none());
    }

    #[test]
    fn test_cube_links_to_parent_visual() {
        let mut tree = ShapeTree::new(GrowthLimits::default());
        tree.set_root(Rule::new("Root", |ctx, _| {
            ctx.cube(Vec3::ONE, Vec3::ZERO);
            ctx.add_node(
                Rule::new("Child", |ctx, _| {
                    assert_eq!(ctx.parent().map(Node::name), Some("Root"));
                    assert_eq!(ctx.layer(), 2);
                    ctx.cube(Vec3::splat(0.5), Vec3::new(0.0, -1.0, 0.0));
                    ctx.translate(Vec3::new(0.0, 2.0, 0.0));
                    Ok(())
                }),
                RuleArgs::new(),
            );
            Ok(())
        }));
        let mut scene = SceneRecorder::new();
        tree.build(&mut scene).unwrap();

        let root_visual = tree.root_node().unwrap().visual().unwrap();
        let child = tree.node(tree.root_node().unwrap().children()[0]).unwrap();
        let child_visual = scene.get(child.visual().unwrap()).unwrap();
        assert_eq!(child_visual.parent, Some(root_visual));
        assert_eq!(child_visual.translation, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_repeated_cube_overwrites_handle() {
        let mut tree = ShapeTree::new(GrowthLimits::default());
        tree.set_root(Rule::new("Root", |ctx, _| {
            ctx.cube(Vec3::ONE, Vec3::ZERO);
            let second = ctx.cube(Vec3::splat(2.0), Vec3::ZERO);
            assert_eq!(ctx.node().visual(), Some(second));
            Ok(())
        }));
        let mut scene = SceneRecorder::new();
        tree.build(&mut scene).unwrap();

        assert_eq!(scene.stats().live, 2);
        assert_eq!(
            tree.root_node().unwrap().visual(),
            Some(VisualHandle(1))
        );
    }
}
