//! Integration tests for shape-tree-engine through its public API.

use std::path::Path;
use std::time::{Duration, SystemTime};

use serde_json::json;
use shape_tree_engine::{
    tree_to_text, GrowthLimits, Rule, RuleArgs, RuleContext, RulesetLoader, SceneRecorder,
    ShapeError, ShapeGenerator, ShapeResult, ShapeTree, Vec3,
};

// ============================================================================
// Rule fixtures
// ============================================================================

fn leaf(ctx: &mut RuleContext<'_>, _args: &RuleArgs) -> ShapeResult<()> {
    ctx.cube(Vec3::splat(0.5), Vec3::ZERO);
    Ok(())
}

/// Root that creates a cube and requests `k` leaves.
fn fan_out(k: usize) -> Rule {
    Rule::new("Root", move |ctx, _| {
        ctx.cube(Vec3::ONE, Vec3::ZERO);
        for _ in 0..k {
            ctx.add_node(Rule::new("Leaf", leaf), RuleArgs::new());
        }
        Ok(())
    })
}

/// One child per call, `iter` levels deep.
fn countdown(ctx: &mut RuleContext<'_>, args: &RuleArgs) -> ShapeResult<()> {
    let iter = args.int(0, "iter")?;
    ctx.cube(Vec3::ONE, Vec3::new(0.0, -1.0, 0.0));
    if iter > 0 {
        ctx.add_node(Rule::new("Countdown", countdown), RuleArgs::new().arg(iter - 1));
    }
    Ok(())
}

fn build(root: Rule, limits: GrowthLimits) -> ShapeGenerator<SceneRecorder> {
    let mut generator = ShapeGenerator::new(SceneRecorder::new());
    generator.build_tree(root, limits).unwrap();
    generator
}

// ============================================================================
// Growth properties
// ============================================================================

#[test]
fn test_fan_out_has_one_plus_k_nodes() {
    for k in [0, 1, 7, 40] {
        let generator = build(fan_out(k), GrowthLimits::new(2, 1000));
        let tree = generator.tree();
        assert_eq!(tree.len(), 1 + k);
        assert_eq!(tree.leaf_count(), k.max(1));
        assert_eq!(tree.root_node().unwrap().children().len(), k);
    }
}

#[test]
fn test_two_children_scenario() {
    let mut generator = ShapeGenerator::new(SceneRecorder::new());
    let stats = generator
        .build_tree(fan_out(2), GrowthLimits::new(5, 100))
        .unwrap();
    assert_eq!(stats.nodes, 3);
    assert_eq!(stats.layers, 2);
    assert!(!stats.was_truncated());
}

#[test]
fn test_node_limit_truncates_recursion() {
    let root = Rule::new("Countdown", countdown);
    let mut tree = ShapeTree::new(GrowthLimits::new(100, 2));
    tree.set_root_node(Some(root), RuleArgs::new().arg(3));
    let mut scene = SceneRecorder::new();
    let stats = tree.build(&mut scene).unwrap();

    assert_eq!(tree.len(), 2);
    assert_eq!(stats.dropped, 1);
    assert!(stats.requested > 1);
    let child = tree.node(tree.root_node().unwrap().children()[0]).unwrap();
    assert!(child.is_leaf());
}

#[test]
fn test_layer_limit_leaves_queued_nodes_unexpanded() {
    let mut generator = ShapeGenerator::new(SceneRecorder::new());
    let stats = generator
        .build_tree(fan_out(3), GrowthLimits::new(1, 100))
        .unwrap();

    assert_eq!(stats.layers, 1);
    assert_eq!(stats.unexpanded, 3);
    let tree = generator.tree();
    for &child in tree.root_node().unwrap().children() {
        let node = tree.node(child).unwrap();
        assert!(node.visual().is_none());
        assert!(node.is_leaf());
    }
    assert_eq!(generator.backend().stats().created, 1);
}

#[test]
fn test_execution_order_is_breadth_first() {
    use std::sync::{Arc, Mutex};

    let order = Arc::new(Mutex::new(Vec::new()));
    let record = {
        let order = Arc::clone(&order);
        move |label: &'static str| {
            let order = Arc::clone(&order);
            Rule::new(label, move |ctx, args| {
                order.lock().unwrap().push(label);
                let depth = args.int(0, "depth")?;
                if depth < 2 {
                    let me = ctx.node().rule().cloned().unwrap();
                    for _ in 0..2 {
                        ctx.add_node(me.clone(), RuleArgs::new().arg(depth + 1));
                    }
                }
                Ok(())
            })
        }
    };

    let root = Rule::new("Root", move |ctx, _| {
        ctx.add_node(record("A"), RuleArgs::new().arg(1));
        ctx.add_node(record("B"), RuleArgs::new().arg(1));
        Ok(())
    });
    build(root, GrowthLimits::default());

    assert_eq!(
        *order.lock().unwrap(),
        vec!["A", "B", "A", "A", "B", "B"]
    );
}

#[test]
fn test_rule_error_propagates_and_keeps_partial_tree() {
    let root = Rule::new("Root", |ctx, _| {
        ctx.cube(Vec3::ONE, Vec3::ZERO);
        ctx.add_node(Rule::new("Countdown", countdown), RuleArgs::new().arg("three"));
        ctx.add_node(Rule::new("Leaf", leaf), RuleArgs::new());
        Ok(())
    });
    let mut generator = ShapeGenerator::new(SceneRecorder::new());
    let err = generator
        .build_tree(root, GrowthLimits::default())
        .unwrap_err();

    assert!(matches!(err, ShapeError::RuleExecution { ref rule, .. } if rule == "Countdown"));
    assert!(!err.is_configuration());
    // The second child never ran.
    let tree = generator.tree();
    let second = tree.node(tree.root_node().unwrap().children()[1]).unwrap();
    assert!(second.visual().is_none());
    assert_eq!(tree.current(), None);
}

#[test]
fn test_root_may_defer_geometry() {
    let root = Rule::new("Root", |ctx, _| {
        ctx.add_node(Rule::new("Leaf", leaf), RuleArgs::new());
        ctx.cube(Vec3::ONE, Vec3::ZERO);
        Ok(())
    });
    let generator = build(root, GrowthLimits::default());
    let root_visual = generator.tree().root_node().unwrap().visual();
    assert!(root_visual.is_some());
    assert_eq!(generator.backend().root(), root_visual);
}

#[test]
fn test_rendering_follows_child_order() {
    let names = ["C", "A", "B"];
    let root = Rule::new("Root", move |ctx, _| {
        for name in names {
            ctx.add_node(Rule::new(name, leaf), RuleArgs::new());
        }
        Ok(())
    });
    let generator = build(root, GrowthLimits::default());
    let text = tree_to_text(generator.tree());
    assert_eq!(text, "Root\n├── C\n├── A\n└── B");
    assert_eq!(text, generator.tree_text());
}

#[test]
fn test_named_arguments_reach_rules() {
    let root = Rule::new("Root", |ctx, _| {
        ctx.add_node(
            Rule::new("Wing", |ctx, args| {
                let dir = args.number(0, "dir")? as f32;
                ctx.cube(Vec3::new(7.0, 0.7, 0.7), Vec3::new(-dir, 0.0, 0.0));
                ctx.translate(Vec3::new(7.5 * dir, 0.0, 0.0));
                Ok(())
            }),
            RuleArgs::new().kwarg("dir", json!(-1)),
        );
        Ok(())
    });
    let generator = build(root, GrowthLimits::default());
    let tree = generator.tree();
    let wing = tree.node(tree.root_node().unwrap().children()[0]).unwrap();
    let visual = generator.backend().get(wing.visual().unwrap()).unwrap();
    assert_eq!(visual.translation, Vec3::new(-7.5, 0.0, 0.0));
}

// ============================================================================
// Loader and hot reload
// ============================================================================

const GRAMMAR_V1: &str = r#"
[rules.Root]
steps = [{ cube = {} }, { add = { rule = "Leaf" } }]

[rules.Leaf]
steps = [{ cube = {} }]
"#;

const GRAMMAR_V2: &str = r#"
[rules.Root]
steps = [{ cube = {} }, { each = { name = "i", over = 3, steps = [{ add = { rule = "Leaf" } }] } }]

[rules.Leaf]
steps = [{ cube = {} }]
"#;

fn touch(path: &Path, contents: &str, offset: Duration) {
    std::fs::write(path, contents).unwrap();
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + offset).unwrap();
}

#[test]
fn test_hot_reload_picks_up_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grove.toml");
    touch(&path, GRAMMAR_V1, Duration::ZERO);

    let mut loader = RulesetLoader::default()
        .with_search_dir(dir.path())
        .with_output_dir(dir.path());
    let mut generator = ShapeGenerator::new(SceneRecorder::new());

    let report = loader.load("grove", &mut generator);
    assert!(report.success, "{}", report.message);
    assert_eq!(report.tree_text, "Root\n└── Leaf");
    assert!(!loader.did_file_change());

    touch(&path, GRAMMAR_V2, Duration::from_secs(10));
    assert!(loader.did_file_change());

    let report = loader.reload(&mut generator).unwrap();
    assert!(report.success, "{}", report.message);
    assert_eq!(report.tree_text, "Root\n├── Leaf\n├── Leaf\n└── Leaf");
    assert!(!loader.did_file_change());

    // The first tree's two solids are waiting for collection.
    assert_eq!(generator.backend().stats().pending_destruction, 2);
}

#[test]
fn test_broken_file_is_watched_until_fixed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grove.toml");
    touch(&path, "rules = 5", Duration::ZERO);

    let mut loader = RulesetLoader::default().with_search_dir(dir.path()).with_output_dir(dir.path());
    let mut generator = ShapeGenerator::new(SceneRecorder::new());

    let report = loader.load("grove", &mut generator);
    assert!(!report.success);
    assert!(!loader.did_file_change());

    touch(&path, GRAMMAR_V1, Duration::from_secs(10));
    assert!(loader.did_file_change());
    assert!(loader.reload(&mut generator).unwrap().success);
}

#[test]
fn test_load_by_direct_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elsewhere.json");
    std::fs::write(
        &path,
        json!({
            "rules": {
                "Root": { "steps": [{ "add": { "rule": "Leaf" } }] },
                "Leaf": { "steps": [] }
            }
        })
        .to_string(),
    )
    .unwrap();

    let mut loader = RulesetLoader::default().with_output_dir(dir.path());
    let mut generator = ShapeGenerator::new(SceneRecorder::new());
    let report = loader.load(path.to_str().unwrap(), &mut generator);
    assert!(report.success, "{}", report.message);
    assert_eq!(report.tree_text, "Root\n└── Leaf");
}

#[test]
fn test_demo_grammars_build() {
    let rulesets = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../rulesets");
    let dir = tempfile::tempdir().unwrap();
    let mut loader = RulesetLoader::default()
        .with_search_dir(&rulesets)
        .with_output_dir(dir.path());

    for name in ["solar_array", "random_branches"] {
        let mut generator = ShapeGenerator::new(SceneRecorder::new());
        let report = loader.load(name, &mut generator);
        assert!(report.success, "{name}: {}", report.message);
        assert!(generator.tree().len() > 1, "{name} grew nothing");
    }
}
