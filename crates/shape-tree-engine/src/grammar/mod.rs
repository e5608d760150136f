//! Declarative rulesets read from TOML or JSON grammar files.
//!
//! A compiled [`Grammar`] turns each named rule definition into a [`Rule`]
//! that interprets its steps when the node is expanded. One seeded random
//! source is shared by every rule of a grammar, so a fixed `seed` gives a
//! reproducible tree.

mod expr;
mod interpreter;
mod schema;

pub use expr::{truthy, Expr, Scope};
pub use interpreter::MAX_EACH_COUNT;
pub use schema::{GrammarFile, RuleDef, Step, DEFAULT_ENTRY_RULE};

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::context::RuleContext;
use crate::error::{ShapeError, ShapeResult};
use crate::rule::{Rule, RuleArgs};
use crate::ruleset::Ruleset;
use interpreter::Interpreter;

struct GrammarInner {
    name: String,
    file: GrammarFile,
    rng: Mutex<StdRng>,
}

/// A validated grammar. Cloning shares the rules and the random source.
#[derive(Clone)]
pub struct Grammar {
    inner: Arc<GrammarInner>,
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("name", &self.inner.name)
            .field("entry", &self.inner.file.entry)
            .field("rules", &self.inner.file.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Grammar {
    /// Compile a parsed grammar file.
    ///
    /// Fails with [`ShapeError::MissingEntryRule`] when the entry rule is not
    /// defined and [`ShapeError::UnknownRule`] when a step adds a rule that
    /// does not exist.
    pub fn from_file(name: impl Into<String>, file: GrammarFile) -> ShapeResult<Self> {
        let name = name.into();
        if !file.rules.contains_key(&file.entry) {
            return Err(ShapeError::MissingEntryRule {
                ruleset: name,
                entry: file.entry.clone(),
            });
        }
        for (rule_name, def) in &file.rules {
            check_references(&file, rule_name, &def.steps)?;
        }

        let rng = match file.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            inner: Arc::new(GrammarInner {
                name,
                file,
                rng: Mutex::new(rng),
            }),
        })
    }

    /// Parse and compile TOML source.
    pub fn from_toml_str(name: impl Into<String>, source: &str) -> ShapeResult<Self> {
        let file: GrammarFile = toml::from_str(source)?;
        Self::from_file(name, file)
    }

    /// Parse and compile JSON source.
    pub fn from_json_str(name: impl Into<String>, source: &str) -> ShapeResult<Self> {
        let file: GrammarFile = serde_json::from_str(source)?;
        Self::from_file(name, file)
    }

    /// Read a grammar file. `.json` files are parsed as JSON, everything
    /// else as TOML. The grammar is named after the file stem.
    pub fn load(path: impl AsRef<Path>) -> ShapeResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(name, &source)
        } else {
            Self::from_toml_str(name, &source)
        }
    }

    /// Parsed grammar file.
    pub fn file(&self) -> &GrammarFile {
        &self.inner.file
    }

    /// Names of all defined rules, sorted.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.inner.file.rules.keys().map(String::as_str)
    }

    /// A callable rule for the definition called `name`.
    pub fn rule(&self, name: &str) -> ShapeResult<Rule> {
        self.rule_referenced_by(name, &self.inner.name)
    }

    pub(crate) fn rule_referenced_by(&self, name: &str, referenced_by: &str) -> ShapeResult<Rule> {
        if !self.inner.file.rules.contains_key(name) {
            return Err(ShapeError::UnknownRule {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            });
        }
        let grammar = self.clone();
        let rule_name: Arc<str> = Arc::from(name);
        Ok(Rule::new(name, move |ctx, args| {
            grammar.execute(&rule_name, ctx, args)
        }))
    }

    fn execute(&self, name: &str, ctx: &mut RuleContext<'_>, args: &RuleArgs) -> ShapeResult<()> {
        let def = self
            .inner
            .file
            .rules
            .get(name)
            .ok_or_else(|| ShapeError::UnknownRule {
                name: name.to_string(),
                referenced_by: self.inner.name.clone(),
            })?;
        let mut rng = self.inner.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Interpreter::new(self, name, &mut *rng).run(def, ctx, args)
    }
}

fn check_references(file: &GrammarFile, rule_name: &str, steps: &[Step]) -> ShapeResult<()> {
    for step in steps {
        match step {
            Step::Add { rule, .. } if !file.rules.contains_key(rule) => {
                return Err(ShapeError::UnknownRule {
                    name: rule.clone(),
                    referenced_by: rule_name.to_string(),
                });
            }
            Step::Each { steps, .. } | Step::If { steps, .. } => {
                check_references(file, rule_name, steps)?
            }
            _ => {}
        }
    }
    Ok(())
}

impl Ruleset for Grammar {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn description(&self) -> Option<&str> {
        self.inner.file.description.as_deref()
    }

    fn entry_rule(&self) -> ShapeResult<Rule> {
        self.rule(&self.inner.file.entry)
    }

    fn max_layers(&self) -> Option<usize> {
        self.inner.file.max_layers
    }

    fn max_nodes(&self) -> Option<usize> {
        self.inner.file.max_nodes
    }
}
