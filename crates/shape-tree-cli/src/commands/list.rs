//! List command implementation.
//!
//! Shows the built-in rulesets and every grammar file under the rulesets
//! directory.

use std::path::{Path, PathBuf};

use anyhow::Result;
use shape_tree_engine::{Grammar, Ruleset, RulesetRegistry, GRAMMAR_EXTENSIONS};
use walkdir::WalkDir;

/// A grammar file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarEntry {
    /// Name to pass to `st build`: the path relative to the search
    /// directory, without extension.
    pub name: String,
    /// Location of the file.
    pub path: PathBuf,
}

/// Find grammar files under `dir`, sorted by name.
pub fn find_grammars(dir: &Path) -> Vec<GrammarEntry> {
    let mut entries: Vec<GrammarEntry> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| GRAMMAR_EXTENSIONS.contains(&ext))
        })
        .filter_map(|e| {
            let relative = e.path().strip_prefix(dir).ok()?.with_extension("");
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some(GrammarEntry {
                name,
                path: e.path().to_path_buf(),
            })
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Execute the list command.
pub fn execute(registry: &RulesetRegistry, dir: &Path) -> Result<()> {
    println!("Built-in rulesets");
    println!("{:-<40}", "");
    for name in registry.names() {
        let description = registry
            .get(name)
            .and_then(|r| r.description().map(str::to_string))
            .unwrap_or_default();
        println!("  {:<20} {}", name, description);
    }

    println!();
    println!("Grammar files in {}", dir.display());
    println!("{:-<40}", "");

    let grammars = find_grammars(dir);
    if grammars.is_empty() {
        println!("  (none)");
    }
    for entry in grammars {
        let summary = match Grammar::load(&entry.path) {
            Ok(grammar) => grammar.description().unwrap_or_default().to_string(),
            Err(e) => format!("(invalid: {e})"),
        };
        println!("  {:<20} {}", entry.name, summary);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_grammars() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.toml"), "").unwrap();
        std::fs::write(dir.path().join("a.json"), "").unwrap();
        std::fs::write(dir.path().join("nested").join("c.toml"), "").unwrap();
        std::fs::write(dir.path().join("notes.md"), "").unwrap();

        let names: Vec<String> = find_grammars(dir.path())
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "nested/c"]);
    }

    #[test]
    fn test_missing_dir_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_grammars(&dir.path().join("absent")).is_empty());
    }
}
