use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::BACKUP_DIR_NAME;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub created_at: String,
}

pub fn backup_dir_for(path: &Path) -> Option<PathBuf> {
    path.parent().map(|parent| parent.join(BACKUP_DIR_NAME))
}

/// Copies `path` to `<parent>/.file_organizer_backups/<name>_<YYYYMMDD_HHMMSS>`.
///
/// Never fails outward: directories are skipped and IO errors are logged,
/// both returning `None`.
pub fn backup(path: &Path) -> Option<BackupEntry> {
    if path.is_dir() {
        info!("Skipping backup for directory: {}", path.display());
        return None;
    }

    let (Some(backup_dir), Some(file_name)) = (backup_dir_for(path), path.file_name()) else {
        warn!("Cannot derive backup location for: {}", path.display());
        return None;
    };

    let now = chrono::Local::now();
    let backup_path = backup_dir.join(format!(
        "{}_{}",
        file_name.to_string_lossy(),
        now.format("%Y%m%d_%H%M%S")
    ));

    let result = fs::create_dir_all(&backup_dir).and_then(|_| fs::copy(path, &backup_path));
    match result {
        Ok(_) => {
            info!("Created backup: {}", backup_path.display());
            Some(BackupEntry {
                original_path: path.to_path_buf(),
                backup_path,
                created_at: now.to_rfc3339(),
            })
        }
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            warn!("Permission denied when creating backup for: {}", path.display());
            None
        }
        Err(err) => {
            warn!("Error creating backup for {}: {err}", path.display());
            None
        }
    }
}
