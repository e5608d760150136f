//! Box-drawing text rendering of a shape tree.
//!
//! ```text
//! Root
//! ├── MainMod
//! │   ├── WingBase
//! │   └── WingBase
//! └── Leaf
//! ```
//!
//! Display order is depth-first over each node's children in creation
//! order. The walk uses an explicit stack, so arbitrarily deep trees render
//! without recursion.

use crate::node::NodeId;
use crate::tree::ShapeTree;

const BRANCH: char = '├';
const VERTICAL: char = '│';
const CORNER: char = '└';
const HORIZONTAL: char = '─';

/// Smallest usable indent: one connector column plus one space.
pub const MIN_INDENT: usize = 2;

/// Renders a [`ShapeTree`] as indented text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRenderer {
    indent: usize,
}

impl Default for TreeRenderer {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

impl TreeRenderer {
    /// Renderer with the default indent of 4 columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-level indent. Values below [`MIN_INDENT`] are raised.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent.max(MIN_INDENT);
        self
    }

    /// Render the whole tree. An empty tree renders as an empty string; the
    /// output has no trailing newline.
    pub fn render(&self, tree: &ShapeTree) -> String {
        match tree.root() {
            Some(root) => self.render_from(tree, root),
            None => String::new(),
        }
    }

    /// Render the subtree under `start`, which is drawn without a connector.
    pub fn render_from(&self, tree: &ShapeTree, start: NodeId) -> String {
        let Some(node) = tree.node(start) else {
            return String::new();
        };

        let rule = HORIZONTAL.to_string().repeat(self.indent - 2);
        let mut lines = vec![node.name().to_string()];

        // (node, prefix inherited from ancestors, is last sibling)
        let mut stack: Vec<(NodeId, String, bool)> = Vec::new();
        push_children(&mut stack, tree, start, "");

        while let Some((id, prefix, is_last)) = stack.pop() {
            let Some(node) = tree.node(id) else {
                continue;
            };
            let (connector, continuation) = if is_last {
                (CORNER, " ".repeat(self.indent))
            } else {
                (BRANCH, format!("{VERTICAL}{}", " ".repeat(self.indent - 1)))
            };
            lines.push(format!("{prefix}{connector}{rule} {}", node.name()));

            let child_prefix = format!("{prefix}{continuation}");
            push_children(&mut stack, tree, id, &child_prefix);
        }

        lines.join("\n")
    }
}

fn push_children(
    stack: &mut Vec<(NodeId, String, bool)>,
    tree: &ShapeTree,
    parent: NodeId,
    prefix: &str,
) {
    let Some(node) = tree.node(parent) else {
        return;
    };
    let count = node.children().len();
    for (index, &child) in node.children().iter().enumerate().rev() {
        stack.push((child, prefix.to_string(), index + 1 == count));
    }
}

/// Render with the default renderer.
pub fn tree_to_text(tree: &ShapeTree) -> String {
    TreeRenderer::default().render(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Rule, RuleArgs};
    use crate::tree::GrowthLimits;

    fn named(name: &str) -> Option<Rule> {
        Some(Rule::new(name, |_, _| Ok(())))
    }

    /// Root -> [A -> [A1, A2], B -> [B1]]
    fn sample_tree() -> ShapeTree {
        let mut tree = ShapeTree::new(GrowthLimits::default());
        let root = tree.set_root_node(named("Root"), RuleArgs::new());
        let a = tree.create_node(named("A"), RuleArgs::new());
        let b = tree.create_node(named("B"), RuleArgs::new());
        let a1 = tree.create_node(named("A1"), RuleArgs::new());
        let a2 = tree.create_node(named("A2"), RuleArgs::new());
        let b1 = tree.create_node(named("B1"), RuleArgs::new());
        tree.attach_children(root, [a, b]);
        tree.attach_children(a, [a1, a2]);
        tree.attach_children(b, [b1]);
        tree
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(tree_to_text(&ShapeTree::default()), "");
    }

    #[test]
    fn test_single_node() {
        let mut tree = ShapeTree::default();
        tree.set_root_node(named("Root"), RuleArgs::new());
        assert_eq!(tree_to_text(&tree), "Root");
    }

    #[test]
    fn test_nested_layout() {
        let expected = "\
Root
├── A
│   ├── A1
│   └── A2
└── B
    └── B1";
        assert_eq!(tree_to_text(&sample_tree()), expected);
    }

    #[test]
    fn test_narrow_indent() {
        let text = TreeRenderer::new().with_indent(0).render(&sample_tree());
        let expected = "\
Root
├ A
│ ├ A1
│ └ A2
└ B
  └ B1";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_is_deterministic() {
        let tree = sample_tree();
        assert_eq!(tree_to_text(&tree), tree_to_text(&tree));
    }

    #[test]
    fn test_deep_chain_renders_iteratively() {
        let mut tree = ShapeTree::default();
        let mut parent = tree.set_root_node(named("N"), RuleArgs::new());
        for _ in 0..2_000 {
            let child = tree.create_node(named("N"), RuleArgs::new());
            tree.attach_children(parent, [child]);
            parent = child;
        }
        let text = tree_to_text(&tree);
        assert_eq!(text.lines().count(), 2_001);
    }
}
