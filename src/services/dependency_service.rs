//! Best-effort static dependency scan.
//!
//! The graph is a safety signal for the move veto, not a resolver: dynamic or
//! aliased imports are missed and that is accepted.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{OrganizerConfig, BACKUP_DIR_NAME};

pub type DependencyGraph = HashMap<PathBuf, BTreeSet<String>>;

pub trait DependencyExtractor {
    fn extract(&self, content: &str) -> BTreeSet<String>;
}

/// Captures the first identifier after `import` / `from` at the start of a line.
pub struct ImportStatementExtractor {
    pattern: Regex,
}

impl ImportStatementExtractor {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?m)^(?:from|import)\s+(\w+)").expect("static regex"),
        }
    }
}

impl Default for ImportStatementExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyExtractor for ImportStatementExtractor {
    fn extract(&self, content: &str) -> BTreeSet<String> {
        self.pattern
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

pub fn analyze_dependencies(
    root: &Path,
    config: &OrganizerConfig,
    extractor: &dyn DependencyExtractor,
) -> DependencyGraph {
    let mut graph = DependencyGraph::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != BACKUP_DIR_NAME);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry during dependency scan: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !config.is_source_file(entry.path()) {
            continue;
        }

        let dependencies = match std::fs::read_to_string(entry.path()) {
            Ok(content) => extractor.extract(&content),
            Err(err) => {
                warn!(
                    "Error parsing dependencies in {}: {err}",
                    entry.path().display()
                );
                BTreeSet::new()
            }
        };
        debug!(
            "{} imports {} module(s)",
            entry.path().display(),
            dependencies.len()
        );
        graph.insert(entry.path().to_path_buf(), dependencies);
    }

    graph
}
