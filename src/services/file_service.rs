//! Filesystem primitives behind the five suggestion actions.
//!
//! Each primitive logs one outcome line and reports failure through
//! `AppError`; callers decide whether to continue.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::AppError;
use crate::services::safety_service::validate_new_name;

pub const NOTE_PREFIX: &str = "\n\n# AI Note: ";

/// Relocates `source` to `destination`, creating missing parents.
///
/// When `destination` is an existing directory the file lands inside it.
/// Refuses to overwrite an existing file. Returns the absolute destination.
pub fn move_file(source: &Path, destination: &Path) -> Result<PathBuf, AppError> {
    let result = move_file_inner(source, destination);
    match &result {
        Ok(dest) => info!(
            "Successfully moved file from {} to {}",
            source.display(),
            dest.display()
        ),
        Err(err) => warn!(
            "Failed to move file from {} to {}: {err}",
            source.display(),
            destination.display()
        ),
    }
    result
}

fn move_file_inner(source: &Path, destination: &Path) -> Result<PathBuf, AppError> {
    if !source.exists() {
        return Err(AppError::MissingFile(source.display().to_string()));
    }

    let mut target = absolute(destination)?;
    if target.is_dir() {
        let file_name = source
            .file_name()
            .ok_or_else(|| AppError::General(format!("invalid source path: {}", source.display())))?;
        target = target.join(file_name);
    }
    if target.exists() {
        return Err(AppError::General(format!(
            "destination already exists: {}",
            target.display()
        )));
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| AppError::from_io(e, parent))?;
    }
    relocate(source, &target)?;
    Ok(target)
}

/// Idempotent: succeeds whenever the directory exists afterwards.
pub fn create_folder(path: &Path) -> Result<(), AppError> {
    match fs::create_dir_all(path) {
        Ok(()) => {
            info!("Successfully created folder: {}", path.display());
            Ok(())
        }
        Err(err) => {
            warn!("Error creating folder {}: {err}", path.display());
            Err(AppError::from_io(err, path))
        }
    }
}

pub fn add_note(file: &Path, note: &str) -> Result<(), AppError> {
    if !file.exists() {
        warn!("File does not exist: {}", file.display());
        return Err(AppError::MissingFile(file.display().to_string()));
    }
    if file.is_dir() {
        warn!("Cannot add note to a directory: {}", file.display());
        return Err(AppError::General(format!(
            "cannot add note to a directory: {}",
            file.display()
        )));
    }

    let result = OpenOptions::new()
        .append(true)
        .open(file)
        .and_then(|mut handle| handle.write_all(format!("{NOTE_PREFIX}{note}").as_bytes()));
    match result {
        Ok(()) => {
            info!("Successfully added note to file: {}", file.display());
            Ok(())
        }
        Err(err) => {
            warn!("Error adding note to file {}: {err}", file.display());
            Err(AppError::from_io(err, file))
        }
    }
}

/// Renames within the same parent directory. `new_name` must be a bare name.
pub fn rename_file(source: &Path, new_name: &str) -> Result<PathBuf, AppError> {
    let result = rename_file_inner(source, new_name);
    match &result {
        Ok(dest) => info!(
            "Successfully renamed file from {} to {}",
            source.display(),
            dest.display()
        ),
        Err(err) => warn!("Error renaming file {}: {err}", source.display()),
    }
    result
}

fn rename_file_inner(source: &Path, new_name: &str) -> Result<PathBuf, AppError> {
    validate_new_name(new_name)?;
    if !source.exists() {
        return Err(AppError::MissingFile(source.display().to_string()));
    }

    let source = absolute(source)?;
    let parent = source
        .parent()
        .ok_or_else(|| AppError::General(format!("invalid source path: {}", source.display())))?;
    let target = parent.join(new_name.trim());
    if target == source {
        return Ok(target);
    }
    if target.exists() {
        return Err(AppError::General(format!(
            "destination already exists: {}",
            target.display()
        )));
    }

    fs::rename(&source, &target).map_err(|e| AppError::from_io(e, &source))?;
    Ok(target)
}

pub fn delete_file(path: &Path) -> Result<(), AppError> {
    if path.is_dir() {
        warn!("Refusing to delete directory: {}", path.display());
        return Err(AppError::General(format!(
            "cannot delete a directory: {}",
            path.display()
        )));
    }
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Successfully deleted file: {}", path.display());
            Ok(())
        }
        Err(err) => {
            warn!("Error deleting file {}: {err}", path.display());
            Err(AppError::from_io(err, path))
        }
    }
}

/// `fs::rename`, falling back to copy + remove when the target sits on
/// another filesystem.
pub fn relocate(source: &Path, target: &Path) -> Result<(), AppError> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(AppError::from_io(err, source))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::from_io(err, source))
        }
        Err(_) if source.is_file() => {
            fs::copy(source, target).map_err(|e| AppError::from_io(e, target))?;
            fs::remove_file(source).map_err(|e| AppError::from_io(e, source))?;
            Ok(())
        }
        Err(err) => Err(AppError::from_io(err, source)),
    }
}

fn absolute(path: &Path) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}
