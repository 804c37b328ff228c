use std::path::{Component, Path, PathBuf};

/// Lexically normalizes `path`: drops `.` components and folds `..` into the
/// preceding component. Does not touch the filesystem, so it works for
/// destinations that do not exist yet.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Joins an oracle-supplied path onto `root`. Absolute inputs are kept as-is
/// so the scope check below can reject them when they point elsewhere.
pub fn resolve(root: &Path, candidate: &str) -> PathBuf {
    let trimmed = candidate.trim();
    normalize(&root.join(trimmed))
}

pub fn is_within_scope(path: &Path, root: &Path) -> bool {
    let path = normalize(path);
    let root = normalize(root);
    path.starts_with(&root)
}

pub fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
    let rel = normalize(path).strip_prefix(normalize(root)).ok()?.to_path_buf();
    if rel.as_os_str().is_empty() {
        Some(PathBuf::from("."))
    } else {
        Some(rel)
    }
}
