//! Shape-Tree CLI - grow procedural shape trees from rulesets.
//!
//! Rulesets are either built in (`station`, `branches`) or declarative
//! grammar files (`.toml` / `.json`) in the rulesets directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use shape_tree_engine::RulesetRegistry;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;
mod config;

use commands::{build, config as config_cmd, list, watch, LimitArgs};
use config::Config;

/// Shape-Tree CLI - Grow, inspect and hot-reload procedural shape trees.
///
/// Run `st list` to see the available rulesets, then `st build <ruleset>`.
#[derive(Parser, Debug)]
#[command(
    name = "st",
    author,
    version,
    about = "Shape-Tree: grow procedural shape trees from rulesets",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a ruleset once and print its tree.
    ///
    /// The tree text is also exported to `<output_dir>/Generated/tree.txt`.
    Build {
        /// Built-in ruleset name, grammar name, or path to a grammar file.
        ruleset: String,

        #[command(flatten)]
        limits: LimitArgs,

        /// Also write the tree text to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory to look up grammar files in.
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Print the load report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Build a grammar file and rebuild it whenever it changes.
    Watch {
        /// Grammar name or path to a grammar file.
        ruleset: String,

        #[command(flatten)]
        limits: LimitArgs,

        /// Poll interval in milliseconds.
        #[arg(short, long)]
        interval: Option<u64>,

        /// Directory to look up grammar files in.
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Stop after this many polls.
        #[arg(long, hide = true)]
        max_polls: Option<usize>,
    },

    /// List built-in rulesets and grammar files.
    List {
        /// Directory to look up grammar files in.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Inspect CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Show path to config file.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN // Default to less noise
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = Config::load()?;

    match cli.command {
        Commands::Build {
            ruleset,
            limits,
            output,
            dir,
            json,
        } => {
            build::execute(&config, &ruleset, dir, limits, output.as_deref(), json)?;
        }

        Commands::Watch {
            ruleset,
            limits,
            interval,
            dir,
            max_polls,
        } => {
            watch::execute(&config, &ruleset, dir, limits, interval, max_polls).await?;
        }

        Commands::List { dir } => {
            let dir = dir.unwrap_or_else(|| config.rulesets_dir.clone());
            list::execute(&RulesetRegistry::with_builtins(), &dir)?;
        }

        Commands::Config(config_cmd_inner) => match config_cmd_inner {
            ConfigCommands::Show => config_cmd::show(&config)?,
            ConfigCommands::Path => config_cmd::path()?,
        },
    }

    Ok(())
}
