//! Build-and-inspect entry point for callers.
//!
//! A [`ShapeGenerator`] owns the scene backend and the most recent tree.
//! Every call to [`ShapeGenerator::build_tree`] tears the previous tree's
//! visuals down before growing a new one, so a host can rebuild in a loop.

use std::path::Path;

use shape_tree_core::SceneBackend;
use tracing::debug;

use crate::error::ShapeResult;
use crate::node::Node;
use crate::render::TreeRenderer;
use crate::rule::Rule;
use crate::tree::{BuildStats, GrowthLimits, ShapeTree};

/// Owns a scene backend and the tree most recently built into it.
#[derive(Debug)]
pub struct ShapeGenerator<B: SceneBackend> {
    backend: B,
    tree: ShapeTree,
    renderer: TreeRenderer,
}

impl<B: SceneBackend + Default> Default for ShapeGenerator<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B: SceneBackend> ShapeGenerator<B> {
    /// Create a generator drawing into `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            tree: ShapeTree::default(),
            renderer: TreeRenderer::default(),
        }
    }

    /// Use a custom renderer for [`ShapeGenerator::tree_text`].
    pub fn with_renderer(mut self, renderer: TreeRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Build a fresh tree rooted at `root`, replacing the previous one.
    ///
    /// The previous tree's visuals are flagged for destruction and the
    /// scene root is cleared first. Rule errors propagate unchanged and the
    /// partially grown tree is kept for inspection; the scene root is only
    /// registered after a successful build.
    pub fn build_tree(&mut self, root: Rule, limits: GrowthLimits) -> ShapeResult<BuildStats> {
        self.tree.destroy_visuals(&mut self.backend);
        self.backend.set_root_visual(None);

        self.tree = ShapeTree::new(limits);
        self.tree.set_root(root);
        let stats = self.tree.build(&mut self.backend)?;

        let root_visual = self.tree.root_node().and_then(Node::visual);
        self.backend.set_root_visual(root_visual);

        debug!(
            nodes = stats.nodes,
            layers = stats.layers,
            requested = stats.requested,
            duration_ms = stats.duration.as_millis() as u64,
            "shape_tree_built"
        );
        Ok(stats)
    }

    /// The most recent tree (possibly partial if its build failed).
    pub fn tree(&self) -> &ShapeTree {
        &self.tree
    }

    /// The scene backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the scene backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Consume the generator, returning the backend and the last tree.
    pub fn into_parts(self) -> (B, ShapeTree) {
        (self.backend, self.tree)
    }

    /// Rendered diagnostic text of the current tree.
    pub fn tree_text(&self) -> String {
        self.renderer.render(&self.tree)
    }

    /// Write [`ShapeGenerator::tree_text`] to `path` as UTF-8, creating
    /// parent directories and overwriting any existing file.
    pub fn export_tree_text(&self, path: impl AsRef<Path>) -> ShapeResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.tree_text())?;
        debug!(path = %path.display(), "tree_text_exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShapeError;
    use crate::rule::RuleArgs;
    use shape_tree_core::{SceneRecorder, Vec3};

    fn tower(height: i64) -> Rule {
        Rule::new("Root", move |ctx, _| {
            ctx.cube(Vec3::ONE, Vec3::ZERO);
            ctx.add_node(
                Rule::new("Segment", segment),
                RuleArgs::new().arg(height),
            );
            Ok(())
        })
    }

    fn segment(ctx: &mut crate::RuleContext<'_>, args: &RuleArgs) -> ShapeResult<()> {
        let remaining = args.int(0, "remaining")?;
        ctx.cube(Vec3::new(1.0, 2.0, 1.0), Vec3::new(0.0, -1.0, 0.0));
        ctx.translate(Vec3::new(0.0, 2.0, 0.0));
        if remaining > 1 {
            ctx.add_node(
                Rule::new("Segment", segment),
                RuleArgs::new().arg(remaining - 1),
            );
        }
        Ok(())
    }

    #[test]
    fn test_build_registers_root_visual() {
        let mut generator = ShapeGenerator::new(SceneRecorder::new());
        let stats = generator
            .build_tree(tower(3), GrowthLimits::default())
            .unwrap();

        assert_eq!(stats.nodes, 4);
        let root_visual = generator.tree().root_node().unwrap().visual();
        assert_eq!(generator.backend().root(), root_visual);
        assert_eq!(generator.backend().stats().live, 4);
    }

    #[test]
    fn test_rebuild_destroys_previous_visuals() {
        let mut generator = ShapeGenerator::<SceneRecorder>::default();
        generator
            .build_tree(tower(3), GrowthLimits::default())
            .unwrap();
        generator
            .build_tree(tower(1), GrowthLimits::default())
            .unwrap();

        let stats = generator.backend().stats();
        assert_eq!(stats.pending_destruction, 4);
        assert_eq!(stats.live, 2);
        assert_eq!(generator.backend_mut().collect_garbage(), 4);
    }

    #[test]
    fn test_root_without_geometry() {
        let root = Rule::new("Root", |ctx, _| {
            ctx.add_node(Rule::new("Segment", segment), RuleArgs::new().arg(1));
            Ok(())
        });
        let mut generator = ShapeGenerator::new(SceneRecorder::new());
        generator.build_tree(root, GrowthLimits::default()).unwrap();

        assert_eq!(generator.backend().root(), None);
        let child = generator.tree().root_node().unwrap().children()[0];
        let child_visual = generator.tree().node(child).unwrap().visual().unwrap();
        assert_eq!(generator.backend().get(child_visual).unwrap().parent, None);
    }

    #[test]
    fn test_failed_build_keeps_partial_tree() {
        let root = Rule::new("Root", |ctx, _| {
            ctx.cube(Vec3::ONE, Vec3::ZERO);
            ctx.add_node(Rule::new("Segment", segment), RuleArgs::new());
            Ok(())
        });
        let mut generator = ShapeGenerator::new(SceneRecorder::new());
        let err = generator
            .build_tree(root, GrowthLimits::default())
            .unwrap_err();

        assert!(matches!(err, ShapeError::RuleExecution { ref rule, .. } if rule == "Segment"));
        assert_eq!(generator.tree().len(), 2);
        assert_eq!(generator.backend().root(), None);
        assert_eq!(generator.tree_text(), "Root\n└── Segment");
    }

    #[test]
    fn test_export_tree_text_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Generated").join("tree.txt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale content that is longer than the tree").unwrap();

        let mut generator = ShapeGenerator::new(SceneRecorder::new());
        generator
            .build_tree(tower(1), GrowthLimits::default())
            .unwrap();
        generator.export_tree_text(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Root\n└── Segment");
    }
}
