//! Grow the built-in orbital station and print its shape tree.
//!
//! Also shows a hand-written ruleset built from plain functions.
//!
//! Run with:
//! ```bash
//! cargo run --example grow_station -p shape-tree-engine
//! ```

use serde_json::json;
use shape_tree_engine::builtin::Station;
use shape_tree_engine::{
    GrowthLimits, Rule, RuleArgs, RuleContext, Ruleset, SceneRecorder, ShapeGenerator,
    ShapeResult, Vec3,
};

// =============================================================================
// Custom rules
// =============================================================================

/// A column of stacked blocks, each one rotated a little further.
fn tower(ctx: &mut RuleContext<'_>, _args: &RuleArgs) -> ShapeResult<()> {
    ctx.cube(Vec3::new(3.0, 0.5, 3.0), Vec3::ZERO);
    ctx.add_node(
        Rule::new("Block", block),
        RuleArgs::new().arg(12).kwarg("twist", json!([0, 15, 0])),
    );
    Ok(())
}

fn block(ctx: &mut RuleContext<'_>, args: &RuleArgs) -> ShapeResult<()> {
    let remaining = args.int(0, "remaining")?;
    let twist = args.vec3_or(1, "twist", Vec3::ZERO)?;
    ctx.cube(Vec3::new(2.0, 1.0, 2.0), Vec3::new(0.0, -1.0, 0.0));
    ctx.translate(Vec3::new(0.0, 1.0, 0.0));
    ctx.rotate(twist);
    if remaining > 1 {
        ctx.add_node(
            Rule::new("Block", block),
            RuleArgs::new().arg(remaining - 1).kwarg("twist", json!([0, 15, 0])),
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    println!("=== Station ===\n");

    let station = Station::default().with_sun_angle(30.0);
    let mut generator = ShapeGenerator::new(SceneRecorder::new());
    let stats = generator.build_tree(
        station.entry_rule()?,
        station.limits(GrowthLimits::default()),
    )?;

    println!("{}", generator.tree_text());
    println!(
        "\n{} nodes, {} layers, {} live solids",
        stats.nodes,
        stats.layers,
        generator.backend().stats().live
    );

    println!("\n=== Tower (max 6 layers) ===\n");

    let stats = generator.build_tree(Rule::new("Tower", tower), GrowthLimits::new(6, 100))?;
    println!("{}", generator.tree_text());

    let scene = generator.backend_mut();
    let collected = scene.collect_garbage();
    println!(
        "\n{} nodes ({} left unexpanded), {} station solids collected",
        stats.nodes, stats.unexpanded, collected
    );

    Ok(())
}
