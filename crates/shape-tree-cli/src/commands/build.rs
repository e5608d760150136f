//! Build command implementation.
//!
//! Grows a ruleset once, prints the tree and exports `Generated/tree.txt`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use shape_tree_engine::{SceneRecorder, ShapeGenerator};
use tracing::info;

use super::{loader, print_report, LimitArgs};
use crate::config::Config;

/// Execute the build command.
pub fn execute(
    config: &Config,
    ruleset: &str,
    dir: Option<PathBuf>,
    limits: LimitArgs,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut loader = loader(config, dir, limits);
    let mut generator = ShapeGenerator::new(SceneRecorder::new());
    let report = loader.load(ruleset, &mut generator);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.success {
        anyhow::bail!("failed to build {}: {}", ruleset, report.message);
    }

    info!(path = %loader.tree_text_path().display(), "tree_text_exported");

    if let Some(path) = output {
        generator
            .export_tree_text(path)
            .with_context(|| format!("Failed to write tree text to {}", path.display()))?;
        if !json {
            eprintln!("💾 Tree written to: {}", path.display());
        }
    }

    Ok(())
}
