//! CLI configuration management.
//!
//! Values come from, in increasing precedence: built-in defaults, the
//! config file, then environment variables (a `.env` file is honored).
//! Command-line flags are applied on top by the individual commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use shape_tree_engine::{GrowthLimits, DEFAULT_MAX_LAYERS, DEFAULT_MAX_NODES};
use tracing::warn;

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "SHAPE_TREE_CONFIG";

/// Application-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory grammar files are looked up in.
    pub rulesets_dir: PathBuf,

    /// Directory `Generated/tree.txt` is written under.
    pub output_dir: PathBuf,

    /// Layer cap for rulesets that declare none.
    pub max_layers: usize,

    /// Node cap for rulesets that declare none.
    pub max_nodes: usize,

    /// How often `st watch` checks the grammar file, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rulesets_dir: PathBuf::from("rulesets"),
            output_dir: PathBuf::from("."),
            max_layers: DEFAULT_MAX_LAYERS,
            max_nodes: DEFAULT_MAX_NODES,
            poll_interval_ms: 500,
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        // Environment wins over the file
        if let Ok(dir) = std::env::var("SHAPE_TREE_RULESETS_DIR") {
            config.rulesets_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("SHAPE_TREE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        env_number("SHAPE_TREE_MAX_LAYERS", &mut config.max_layers);
        env_number("SHAPE_TREE_MAX_NODES", &mut config.max_nodes);
        env_number("SHAPE_TREE_POLL_MS", &mut config.poll_interval_ms);

        Ok(config)
    }

    /// Read a config file. Missing keys take their default.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get the path to the config file.
    pub fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("dev", "shape-tree", "st")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Limits applied to rulesets that declare none.
    pub fn default_limits(&self) -> GrowthLimits {
        GrowthLimits::new(self.max_layers, self.max_nodes)
    }
}

/// Overwrite `slot` with the parsed value of `var`, if it is set and valid.
fn env_number<T: std::str::FromStr>(var: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(var) {
        match raw.trim().parse() {
            Ok(value) => *slot = value,
            Err(_) => warn!(var, value = %raw, "ignoring_invalid_env_number"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "max_layers": 7, "rulesets_dir": "grammars" }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.max_layers, 7);
        assert_eq!(config.rulesets_dir, PathBuf::from("grammars"));
        assert_eq!(config.max_nodes, DEFAULT_MAX_NODES);
        assert_eq!(config.default_limits(), GrowthLimits::new(7, DEFAULT_MAX_NODES));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::from_file(&path).is_err());
    }
}
