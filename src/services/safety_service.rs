use std::path::{Component, Path};

use tracing::info;

use crate::error::AppError;
use crate::services::dependency_service::DependencyGraph;

/// Rejects a move that would separate `source` from a sibling that imports it.
///
/// Only applies when `source` was scanned as a source file and the move leaves
/// its directory. Its own import set may be empty; being imported is what
/// counts. A sibling counts as a dependent when its import set names the
/// source's file name or its stem (`util.py` is imported as `util`).
/// Aliased or indirect imports are not seen, and some safe moves are blocked.
pub fn is_safe_to_move(graph: &DependencyGraph, source: &Path, destination: &Path) -> bool {
    if !graph.contains_key(source) {
        return true;
    }
    let source_dir = source.parent();
    if source_dir == destination.parent() {
        return true;
    }

    let file_name = source.file_name().map(|n| n.to_string_lossy().to_string());
    let stem = source.file_stem().map(|s| s.to_string_lossy().to_string());

    let dependent = graph.iter().find(|(other, deps)| {
        other.as_path() != source
            && other.parent() == source_dir
            && (file_name.as_ref().is_some_and(|n| deps.contains(n))
                || stem.as_ref().is_some_and(|s| deps.contains(s)))
    });

    match dependent {
        Some((other, _)) => {
            info!(
                "Move of {} vetoed: {} imports it from the same directory",
                source.display(),
                other.display()
            );
            false
        }
        None => true,
    }
}

/// Validates a root-relative path handed over by the oracle.
pub fn validate_path(path: &str) -> Result<(), AppError> {
    if path.trim().is_empty() {
        return Err(AppError::MalformedSuggestion("path is empty".to_string()));
    }

    if Path::new(path)
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(AppError::MalformedSuggestion(format!(
            "path traversal (.. component) not allowed: {path}"
        )));
    }

    Ok(())
}

/// A rename target must be a bare file name, never a path.
pub fn validate_new_name(new_name: &str) -> Result<(), AppError> {
    let trimmed = new_name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return Err(AppError::MalformedSuggestion(format!(
            "invalid file name: '{new_name}'"
        )));
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(AppError::MalformedSuggestion(format!(
            "new name must not be a path: {new_name}"
        )));
    }
    Ok(())
}
