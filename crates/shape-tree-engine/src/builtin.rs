//! Rulesets compiled into the engine.
//!
//! - `station`: a hub module with two solar wings, contractible solar
//!   chains and a two-segment mechanical arm.
//! - `branches`: a binary branching tree that shrinks at every level.

use std::sync::Arc;

use serde_json::json;
use shape_tree_core::Vec3;

use crate::context::RuleContext;
use crate::error::ShapeResult;
use crate::rule::{vec3_value, Rule, RuleArgs};
use crate::ruleset::Ruleset;

/// Every built-in ruleset with its default parameters.
pub fn all() -> Vec<Arc<dyn Ruleset>> {
    vec![Arc::new(Station::default()), Arc::new(Branches::default())]
}

// =============================================================================
// Station
// =============================================================================

/// Orbital station built from a central module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    /// Yaw of every solar rod, in degrees.
    pub sun_angle: f64,
    /// Fold angle between links of a contractible solar chain, in degrees.
    pub contractible_angle: f64,
}

impl Default for Station {
    fn default() -> Self {
        Self {
            sun_angle: 45.0,
            contractible_angle: 60.0,
        }
    }
}

impl Station {
    /// Set the solar rod yaw (builder pattern).
    pub fn with_sun_angle(mut self, degrees: f64) -> Self {
        self.sun_angle = degrees;
        self
    }

    /// Set the chain fold angle (builder pattern).
    pub fn with_contractible_angle(mut self, degrees: f64) -> Self {
        self.contractible_angle = degrees;
        self
    }

    fn main_mod(self) -> Rule {
        Rule::new("MainMod", move |ctx, _| {
            ctx.cube(Vec3::new(15.0, 1.0, 1.0), Vec3::ZERO);
            ctx.add_node(self.wing_base(), RuleArgs::new().kwarg("dir", 1));
            ctx.add_node(self.wing_base(), RuleArgs::new().kwarg("dir", -1));

            for xpos in [-7, -5, -3, 3, 5, 7] {
                ctx.add_node(
                    self.solar_contractible(),
                    RuleArgs::new()
                        .arg(8)
                        .arg(json!([260, 0, 0]))
                        .arg(json!([xpos, 0, 0])),
                );
            }

            ctx.add_node(
                mech_arm(),
                RuleArgs::new()
                    .arg(json!([0, 20, -40]))
                    .arg(json!([0, 0, 0]))
                    .arg(4)
                    .arg(0.15),
            );
            ctx.add_node(
                mech_arm(),
                RuleArgs::new()
                    .arg(json!([0, 180, -20]))
                    .arg(json!([-3, 0, 0]))
                    .arg(3)
                    .arg(0.15),
            );
            Ok(())
        })
    }

    fn wing_base(self) -> Rule {
        Rule::new("WingBase", move |ctx, args| {
            let dir = args.number(0, "dir")?;
            let d = dir as f32;
            ctx.cube(Vec3::new(7.0, 0.7, 0.7), Vec3::new(-d, 0.0, 0.0));
            ctx.translate(Vec3::new(7.5 * d, 0.0, 0.0));

            let sun = self.sun_angle;
            for (roll, x, y) in [(0, 1.0, 0.5), (0, 5.0, 0.5), (180, 1.0, -0.5), (180, 5.0, -0.5)] {
                ctx.add_node(
                    Rule::new("SolarRod", solar_rod),
                    RuleArgs::new()
                        .arg(json!([0, sun, roll]))
                        .arg(json!([dir * x, y, 0])),
                );
            }
            for x in [0.0, 6.0] {
                ctx.add_node(
                    self.solar_contractible(),
                    RuleArgs::new()
                        .arg(8)
                        .arg(json!([90, 0, 0]))
                        .arg(json!([dir * x, 0, 0])),
                );
            }
            Ok(())
        })
    }

    fn solar_contractible(self) -> Rule {
        Rule::new("SolarContractibleR", move |ctx, args| {
            let iter = args.int(0, "iter")?;
            ctx.cube(Vec3::new(1.3, 1.0, 0.1), Vec3::new(0.0, -1.0, 0.0));
            place(ctx, args, 1)?;

            let iter = iter - 1;
            if iter <= 0 {
                return Ok(());
            }
            let dir = if iter % 2 == 0 { 1.0 } else { -1.0 };
            ctx.add_node(
                self.solar_contractible(),
                RuleArgs::new()
                    .arg(iter)
                    .arg(json!([self.contractible_angle * dir, 0, 0]))
                    .arg(json!([0, 1, 0])),
            );
            Ok(())
        })
    }
}

/// Apply the optional `r`, `t`, `s` parameters starting at `first`:
/// scale, then translate, then rotate.
fn place(ctx: &mut RuleContext<'_>, args: &RuleArgs, first: usize) -> ShapeResult<()> {
    let r = args.vec3_or(first, "r", Vec3::ZERO)?;
    let t = args.vec3_or(first + 1, "t", Vec3::ZERO)?;
    let s = args.vec3_or(first + 2, "s", Vec3::ONE)?;
    ctx.scale(s);
    ctx.translate(t);
    ctx.rotate(r);
    Ok(())
}

fn solar_rod(ctx: &mut RuleContext<'_>, args: &RuleArgs) -> ShapeResult<()> {
    ctx.cube(Vec3::new(0.2, 11.0, 0.2), Vec3::new(0.0, -1.0, 0.0));
    place(ctx, args, 0)?;
    ctx.add_node(Rule::new("SolarPane", solar_pane), RuleArgs::new().arg(1.5));
    ctx.add_node(Rule::new("SolarPane", solar_pane), RuleArgs::new().arg(-1.5));
    Ok(())
}

fn solar_pane(ctx: &mut RuleContext<'_>, args: &RuleArgs) -> ShapeResult<()> {
    let dir = args.number(0, "dir")? as f32;
    ctx.cube(Vec3::new(2.4, 10.0, 0.1), Vec3::new(dir, 0.0, 0.0));
    ctx.translate(Vec3::new(0.0, 6.0, 0.0));
    Ok(())
}

fn mech_arm() -> Rule {
    Rule::new("MechArm", |ctx, args| {
        arm_segment(ctx, args)?;
        ctx.add_node(
            Rule::new("MechArmSeg", arm_segment),
            RuleArgs::new()
                .arg(json!([0, 20, -80]))
                .arg(vec3_value(Vec3::new(0.0, args.number(2, "length")? as f32, 0.0)))
                .arg(3)
                .arg(0.1),
        );
        Ok(())
    })
}

fn arm_segment(ctx: &mut RuleContext<'_>, args: &RuleArgs) -> ShapeResult<()> {
    let r = args.vec3(0, "r")?;
    let t = args.vec3(1, "t")?;
    let length = args.number(2, "length")? as f32;
    let width = args.number(3, "width")? as f32;
    ctx.cube(Vec3::new(width, length, width), Vec3::new(0.0, -1.0, 0.0));
    ctx.translate(t);
    ctx.rotate(r);
    Ok(())
}

impl Ruleset for Station {
    fn name(&self) -> &str {
        "station"
    }

    fn description(&self) -> Option<&str> {
        Some("hub module with solar wings, contractible solar chains and a mechanical arm")
    }

    fn entry_rule(&self) -> ShapeResult<Rule> {
        let station = *self;
        Ok(Rule::new("Root", move |ctx, _| {
            ctx.cube(Vec3::ONE, Vec3::ZERO);
            ctx.add_node(station.main_mod(), RuleArgs::new());
            Ok(())
        }))
    }

    fn max_layers(&self) -> Option<usize> {
        Some(20)
    }

    fn max_nodes(&self) -> Option<usize> {
        Some(1000)
    }
}

// =============================================================================
// Branches
// =============================================================================

/// Recursive binary branching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branches {
    /// Branching depth below the root.
    pub depth: i64,
    /// Roll factors of the two children; each branch rolls `30 * factor`.
    pub spread: (f64, f64),
}

impl Default for Branches {
    fn default() -> Self {
        Self {
            depth: 8,
            spread: (1.2, -0.8),
        }
    }
}

impl Branches {
    /// Set the branching depth (builder pattern).
    pub fn with_depth(mut self, depth: i64) -> Self {
        self.depth = depth;
        self
    }

    fn branch(self) -> Rule {
        Rule::new("BranchR", move |ctx, args| {
            let size = args.number(0, "size")?;
            let iter = args.int(1, "iter")?;
            let dir = args.number(2, "dir")?;
            let offset = args.vec3_or(3, "offset", Vec3::ZERO)?;

            let s = size as f32;
            ctx.cube(
                Vec3::new(0.2 * s, 3.0 * s, s),
                Vec3::new(0.0, -1.0, 0.0),
            );
            ctx.translate(Vec3::new(0.0, 3.0 * s, 0.0));
            ctx.translate(offset);
            ctx.rotate(Vec3::new(4.0, 0.0, 30.0 * dir as f32));

            let iter = iter - 1;
            if iter <= 0 {
                return Ok(());
            }
            for factor in [self.spread.0, self.spread.1] {
                ctx.add_node(
                    self.branch(),
                    RuleArgs::new().arg(size * 0.9).arg(iter).arg(factor),
                );
            }
            Ok(())
        })
    }
}

impl Ruleset for Branches {
    fn name(&self) -> &str {
        "branches"
    }

    fn description(&self) -> Option<&str> {
        Some("recursive binary branching")
    }

    fn entry_rule(&self) -> ShapeResult<Rule> {
        let branches = *self;
        Ok(Rule::new("Root", move |ctx, _| {
            ctx.cube(Vec3::ONE, Vec3::ZERO);
            ctx.add_node(
                branches.branch(),
                RuleArgs::new()
                    .arg(1.0)
                    .arg(branches.depth)
                    .arg(1.0)
                    .arg(json!([0, -10, 0])),
            );
            Ok(())
        }))
    }
}
