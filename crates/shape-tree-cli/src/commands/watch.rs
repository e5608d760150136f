//! Watch command implementation.
//!
//! Builds a grammar file, then polls it and rebuilds whenever it changes
//! until Ctrl-C.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use shape_tree_engine::{SceneRecorder, ShapeGenerator};
use tracing::{debug, info};

use super::{loader, print_report, LimitArgs};
use crate::config::Config;

/// Execute the watch command.
pub async fn execute(
    config: &Config,
    ruleset: &str,
    dir: Option<PathBuf>,
    limits: LimitArgs,
    interval_ms: Option<u64>,
    max_polls: Option<usize>,
) -> Result<()> {
    let mut loader = loader(config, dir, limits);
    let mut generator = ShapeGenerator::new(SceneRecorder::new());

    let report = loader.load(ruleset, &mut generator);
    print_report(&report);

    let Some(source) = loader.source().map(|p| p.to_path_buf()) else {
        if report.success {
            eprintln!("ℹ️  {} is built in; nothing to watch.", ruleset);
            return Ok(());
        }
        anyhow::bail!("failed to load {}: {}", ruleset, report.message);
    };

    let interval = Duration::from_millis(interval_ms.unwrap_or(config.poll_interval_ms).max(1));
    eprintln!(
        "👀 Watching {} every {} ms (Ctrl-C to stop)",
        source.display(),
        interval.as_millis()
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(interval);
    let mut polls = 0usize;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                eprintln!("\n👋 Shutting down.");
                break;
            }
            _ = ticker.tick() => {
                polls += 1;
                if loader.did_file_change() {
                    info!(path = %source.display(), "ruleset_changed");
                    if let Some(report) = loader.reload(&mut generator) {
                        print_report(&report);
                    }
                    let collected = generator.backend_mut().collect_garbage();
                    debug!(collected, "scene_garbage_collected");
                }
                if max_polls.is_some_and(|max| polls >= max) {
                    break;
                }
            }
        }
    }

    Ok(())
}
