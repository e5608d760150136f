//! CLI command implementations.

pub mod build;
pub mod config;
pub mod list;
pub mod watch;

use std::path::PathBuf;

use shape_tree_engine::{LoadReport, RulesetLoader};

use crate::config::Config;

/// Growth limit flags shared by `build` and `watch`.
#[derive(Debug, Clone, Copy, Default, clap::Args)]
pub struct LimitArgs {
    /// Cap on executed layers, overriding the ruleset's declaration.
    #[arg(long)]
    pub max_layers: Option<usize>,

    /// Cap on child requests, overriding the ruleset's declaration.
    #[arg(long)]
    pub max_nodes: Option<usize>,
}

/// A loader configured from `config`, with an optional search directory
/// override and limit overrides.
pub fn loader(config: &Config, dir: Option<PathBuf>, limits: LimitArgs) -> RulesetLoader {
    RulesetLoader::default()
        .with_search_dir(dir.unwrap_or_else(|| config.rulesets_dir.clone()))
        .with_output_dir(&config.output_dir)
        .with_default_limits(config.default_limits())
        .with_overrides(limits.max_layers, limits.max_nodes)
}

/// Print the tree of a report to stdout and its status line to stderr.
pub fn print_report(report: &LoadReport) {
    if !report.tree_text.is_empty() {
        println!("{}", report.tree_text);
    }
    if report.success {
        eprintln!("✅ {}: {}", report.ruleset, report.message);
    } else {
        eprintln!("❌ {}: {}", report.ruleset, report.message);
    }
}
