//! Resolve, build and hot-reload rulesets by name.
//!
//! The loader keeps the registry of built-in rulesets, the directory grammar
//! files are searched in, and the last loaded source with its modification
//! time. It also knows the default limits and where generated artifacts go.
//!
//! Failures never escape [`RulesetLoader::load`]; they are turned into a
//! [`LoadReport`] so a host can keep running with the previous tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;
use shape_tree_core::SceneBackend;
use tracing::{debug, info, warn};

use crate::error::{ShapeError, ShapeResult};
use crate::generator::ShapeGenerator;
use crate::grammar::Grammar;
use crate::ruleset::{Ruleset, RulesetRegistry};
use crate::tree::{BuildStats, GrowthLimits};

/// Directory (under the output directory) generated files are written to.
pub const GENERATED_DIR: &str = "Generated";

/// File name of the exported tree text.
pub const TREE_TEXT_FILE: &str = "tree.txt";

/// Extensions tried, in order, when resolving a grammar by name.
pub const GRAMMAR_EXTENSIONS: [&str; 2] = ["toml", "json"];

/// Outcome of one load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// Name the load was requested with.
    pub ruleset: String,
    /// Whether the tree was built and exported.
    pub success: bool,
    /// Human-readable summary or error text.
    pub message: String,
    /// Rendered tree (the partial or previous tree on failure).
    pub tree_text: String,
    /// Grammar file the ruleset came from; `None` for built-ins.
    pub source: Option<PathBuf>,
    /// Build statistics, when the build completed.
    pub stats: Option<BuildStats>,
}

struct Resolved {
    ruleset: Arc<dyn Ruleset>,
    source: Option<PathBuf>,
}

/// Loads rulesets into a [`ShapeGenerator`] and tracks their source files.
#[derive(Debug)]
pub struct RulesetLoader {
    registry: RulesetRegistry,
    search_dir: PathBuf,
    output_dir: PathBuf,
    defaults: GrowthLimits,
    max_layers: Option<usize>,
    max_nodes: Option<usize>,
    current: Option<String>,
    source: Option<PathBuf>,
    last_modified: Option<SystemTime>,
}

impl Default for RulesetLoader {
    fn default() -> Self {
        Self::new(RulesetRegistry::with_builtins())
    }
}

impl RulesetLoader {
    /// Loader over `registry`, searching and writing in the working directory.
    pub fn new(registry: RulesetRegistry) -> Self {
        Self {
            registry,
            search_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            defaults: GrowthLimits::default(),
            max_layers: None,
            max_nodes: None,
            current: None,
            source: None,
            last_modified: None,
        }
    }

    /// Directory grammar files are looked up in (builder pattern).
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = dir.into();
        self
    }

    /// Directory `Generated/tree.txt` is written under (builder pattern).
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Limits used when a ruleset declares none (builder pattern).
    pub fn with_default_limits(mut self, limits: GrowthLimits) -> Self {
        self.defaults = limits;
        self
    }

    /// Limits that win over whatever a ruleset declares (builder pattern).
    pub fn with_overrides(mut self, max_layers: Option<usize>, max_nodes: Option<usize>) -> Self {
        self.max_layers = max_layers;
        self.max_nodes = max_nodes;
        self
    }

    /// The registry of built-in rulesets.
    pub fn registry(&self) -> &RulesetRegistry {
        &self.registry
    }

    /// Directory grammar files are looked up in.
    pub fn search_dir(&self) -> &Path {
        &self.search_dir
    }

    /// Where the tree text is exported.
    pub fn tree_text_path(&self) -> PathBuf {
        self.output_dir.join(GENERATED_DIR).join(TREE_TEXT_FILE)
    }

    /// Name of the last requested ruleset.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Source file of the last requested ruleset, if it came from a file.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Candidate grammar paths for `name`, in lookup order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = GRAMMAR_EXTENSIONS
            .iter()
            .map(|ext| self.search_dir.join(format!("{name}.{ext}")))
            .collect();
        paths.push(PathBuf::from(name));
        paths
    }

    /// Load `name` and build it into `generator`.
    ///
    /// Built-in rulesets win over grammar files. The source path and its
    /// modification time are recorded before parsing, so a broken file that
    /// gets fixed is still picked up by [`RulesetLoader::did_file_change`].
    pub fn load<B: SceneBackend>(
        &mut self,
        name: &str,
        generator: &mut ShapeGenerator<B>,
    ) -> LoadReport {
        // A reload of the same name keeps watching the last resolved file,
        // even while it is missing.
        if self.current.as_deref() != Some(name) {
            self.source = None;
        }
        self.current = Some(name.to_string());
        self.last_modified = None;

        let mut report = LoadReport {
            ruleset: name.to_string(),
            success: false,
            message: String::new(),
            tree_text: String::new(),
            source: None,
            stats: None,
        };

        match self.try_load(name, generator, &mut report) {
            Ok(stats) => {
                report.success = true;
                report.message = summary(&stats);
                info!(
                    ruleset = name,
                    nodes = stats.nodes,
                    layers = stats.layers,
                    truncated = stats.was_truncated(),
                    "ruleset_loaded"
                );
                report.stats = Some(stats);
            }
            Err(e) => {
                warn!(ruleset = name, error = %e, "ruleset_load_failed");
                report.message = e.to_string();
            }
        }
        report.tree_text = generator.tree_text();
        report
    }

    fn try_load<B: SceneBackend>(
        &mut self,
        name: &str,
        generator: &mut ShapeGenerator<B>,
        report: &mut LoadReport,
    ) -> ShapeResult<BuildStats> {
        let resolved = self.resolve(name)?;
        report.source = resolved.source.clone();

        let limits = self.limits_for(resolved.ruleset.as_ref());
        let entry = resolved.ruleset.entry_rule()?;
        let stats = generator.build_tree(entry, limits)?;

        let path = self.tree_text_path();
        generator.export_tree_text(&path)?;
        Ok(stats)
    }

    fn resolve(&mut self, name: &str) -> ShapeResult<Resolved> {
        if let Some(ruleset) = self.registry.get(name) {
            debug!(ruleset = name, "resolved_builtin_ruleset");
            self.source = None;
            return Ok(Resolved {
                ruleset: Arc::clone(ruleset),
                source: None,
            });
        }

        let candidates = self.candidates(name);
        let Some(path) = candidates.iter().find(|p| p.is_file()).cloned() else {
            return Err(ShapeError::RulesetNotFound {
                name: name.to_string(),
                searched: candidates,
            });
        };

        self.last_modified = modified(&path);
        self.source = Some(path.clone());
        debug!(ruleset = name, path = %path.display(), "resolved_grammar_file");

        let grammar = Grammar::load(&path)?;
        Ok(Resolved {
            ruleset: Arc::new(grammar),
            source: Some(path),
        })
    }

    /// Effective limits for `ruleset`: overrides, then declared, then defaults.
    pub fn limits_for(&self, ruleset: &dyn Ruleset) -> GrowthLimits {
        let declared = ruleset.limits(self.defaults);
        GrowthLimits::new(
            self.max_layers.unwrap_or(declared.max_layers),
            self.max_nodes.unwrap_or(declared.max_nodes),
        )
    }

    /// Whether the last loaded grammar file changed on disk since it was
    /// loaded. Always false for built-ins and before the first load.
    pub fn did_file_change(&self) -> bool {
        match &self.source {
            Some(path) => modified(path) != self.last_modified,
            None => false,
        }
    }

    /// Load the last requested ruleset again. `None` before the first load.
    pub fn reload<B: SceneBackend>(
        &mut self,
        generator: &mut ShapeGenerator<B>,
    ) -> Option<LoadReport> {
        let name = self.current.clone()?;
        Some(self.load(&name, generator))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn summary(stats: &BuildStats) -> String {
    let mut message = format!("built {} nodes in {} layers", stats.nodes, stats.layers);
    if stats.dropped > 0 {
        message.push_str(&format!(", {} requests over the node limit", stats.dropped));
    }
    if stats.unexpanded > 0 {
        message.push_str(&format!(", {} nodes past the layer limit", stats.unexpanded));
    }
    message
}
