//! Rulesets: named bundles of rules with an entry point and growth limits.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::RuleContext;
use crate::error::ShapeResult;
use crate::rule::{Rule, RuleArgs};
use crate::tree::GrowthLimits;

/// A source of rules the generator can grow a tree from.
pub trait Ruleset: Send + Sync {
    /// Name the ruleset is registered and looked up under.
    fn name(&self) -> &str;

    /// Optional human-readable description.
    fn description(&self) -> Option<&str> {
        None
    }

    /// The rule bound to the root node.
    fn entry_rule(&self) -> ShapeResult<Rule>;

    /// Layer cap declared by the ruleset, if any.
    fn max_layers(&self) -> Option<usize> {
        None
    }

    /// Node cap declared by the ruleset, if any.
    fn max_nodes(&self) -> Option<usize> {
        None
    }

    /// Declared limits, falling back to `defaults` for undeclared ones.
    fn limits(&self, defaults: GrowthLimits) -> GrowthLimits {
        GrowthLimits::new(
            self.max_layers().unwrap_or(defaults.max_layers),
            self.max_nodes().unwrap_or(defaults.max_nodes),
        )
    }
}

/// A ruleset whose entry point is a plain function.
#[derive(Clone)]
pub struct FnRuleset {
    name: String,
    description: Option<String>,
    entry: Rule,
    max_layers: Option<usize>,
    max_nodes: Option<usize>,
}

impl FnRuleset {
    /// Ruleset named `name` whose root runs `entry`.
    pub fn new<F>(name: impl Into<String>, entry: F) -> Self
    where
        F: Fn(&mut RuleContext<'_>, &RuleArgs) -> ShapeResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            entry: Rule::new("Root", entry),
            max_layers: None,
            max_nodes: None,
        }
    }

    /// Set the description (builder pattern).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a layer cap (builder pattern).
    pub fn with_max_layers(mut self, max_layers: usize) -> Self {
        self.max_layers = Some(max_layers);
        self
    }

    /// Declare a node cap (builder pattern).
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }
}

impl fmt::Debug for FnRuleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRuleset")
            .field("name", &self.name)
            .field("max_layers", &self.max_layers)
            .field("max_nodes", &self.max_nodes)
            .finish()
    }
}

impl Ruleset for FnRuleset {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn entry_rule(&self) -> ShapeResult<Rule> {
        Ok(self.entry.clone())
    }

    fn max_layers(&self) -> Option<usize> {
        self.max_layers
    }

    fn max_nodes(&self) -> Option<usize> {
        self.max_nodes
    }
}

/// Registry of rulesets by name.
#[derive(Clone, Default)]
pub struct RulesetRegistry {
    rulesets: HashMap<String, Arc<dyn Ruleset>>,
}

impl RulesetRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in rulesets.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for ruleset in crate::builtin::all() {
            registry.register(ruleset);
        }
        registry
    }

    /// Register a ruleset, replacing any previous one with the same name.
    pub fn register(&mut self, ruleset: Arc<dyn Ruleset>) {
        self.rulesets.insert(ruleset.name().to_string(), ruleset);
    }

    /// Register a ruleset (builder pattern).
    pub fn with_ruleset(mut self, ruleset: Arc<dyn Ruleset>) -> Self {
        self.register(ruleset);
        self
    }

    /// Get a ruleset by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Ruleset>> {
        self.rulesets.get(name)
    }

    /// Check if a ruleset exists.
    pub fn contains(&self, name: &str) -> bool {
        self.rulesets.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.rulesets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered rulesets.
    pub fn len(&self) -> usize {
        self.rulesets.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.rulesets.is_empty()
    }
}

impl fmt::Debug for RulesetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RulesetRegistry")
            .field("ruleset_count", &self.rulesets.len())
            .field("rulesets", &self.names())
            .finish()
    }
}
