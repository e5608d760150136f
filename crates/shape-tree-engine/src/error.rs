//! Error types for shape-tree generation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for shape-tree operations.
pub type ShapeResult<T> = Result<T, ShapeError>;

/// Errors that can occur while loading rulesets or running rules.
///
/// Hitting the layer or node limit is deliberately absent: growth limits
/// truncate the tree silently.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// A ruleset does not define the rule it declares as its entry point.
    #[error("ruleset {ruleset:?} has no entry rule named {entry:?}")]
    MissingEntryRule { ruleset: String, entry: String },

    /// No registered ruleset or grammar file matches the requested name.
    #[error("ruleset not found: {name:?} (searched {searched:?})")]
    RulesetNotFound { name: String, searched: Vec<PathBuf> },

    /// A rule failed while running, including argument mismatches.
    #[error("rule {rule:?} failed: {message}")]
    RuleExecution { rule: String, message: String },

    /// A grammar step referenced a rule the grammar does not define.
    #[error("unknown rule {name:?} referenced by {referenced_by:?}")]
    UnknownRule { name: String, referenced_by: String },

    /// Grammar file is not valid TOML or does not match the schema.
    #[error("grammar parse error: {0}")]
    GrammarParse(#[from] toml::de::Error),

    /// Grammar file is not valid JSON or does not match the schema.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file operations).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShapeError {
    /// Shorthand for a [`ShapeError::RuleExecution`].
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleExecution {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the ruleset could not be set up at all,
    /// as opposed to failing while it ran.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingEntryRule { .. }
                | Self::RulesetNotFound { .. }
                | Self::GrammarParse(_)
                | Self::Json(_)
        )
    }
}
