use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;
use walkdir::WalkDir;

use crate::config::BACKUP_DIR_NAME;
use crate::scope_path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub files: Vec<String>,
    pub dirs: Vec<String>,
}

/// Relative directory path (`"."` for the root) → immediate children.
pub type StructureSnapshot = BTreeMap<PathBuf, DirectoryListing>;

/// Walks `root` once. Symlinks are not followed, so no physical directory is
/// listed twice.
pub fn build_structure(root: &Path) -> StructureSnapshot {
    let mut snapshot = StructureSnapshot::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != BACKUP_DIR_NAME);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry while indexing structure: {err}");
                continue;
            }
        };
        if entry.depth() == 0 {
            snapshot.entry(PathBuf::from(".")).or_default();
            continue;
        }
        let Some(parent_rel) = entry
            .path()
            .parent()
            .and_then(|parent| scope_path::relative_to(parent, root))
        else {
            continue;
        };

        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type().is_dir() {
            snapshot.entry(parent_rel).or_default().dirs.push(name);
            if let Some(rel) = scope_path::relative_to(entry.path(), root) {
                snapshot.entry(rel).or_default();
            }
        } else {
            snapshot.entry(parent_rel).or_default().files.push(name);
        }
    }

    snapshot
}

pub fn listing_for<'a>(
    snapshot: &'a StructureSnapshot,
    root: &Path,
    file: &Path,
) -> Option<(PathBuf, &'a DirectoryListing)> {
    let parent = file.parent()?;
    let rel = scope_path::relative_to(parent, root)?;
    snapshot.get(&rel).map(|listing| (rel, listing))
}
