use serde::Serialize;

use crate::services::oracle_service::OracleError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("File not found: {0}")]
    MissingFile(String),

    #[error("Malformed suggestion: {0}")]
    MalformedSuggestion(String),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Cannot undo: {0}")]
    UndoPrecondition(String),

    #[error("organization cancelled")]
    Cancelled,

    #[error("{0}")]
    General(String),
}

impl AppError {
    /// Maps an IO failure on `path` into the taxonomy the engine reports.
    pub fn from_io(err: std::io::Error, path: &std::path::Path) -> Self {
        let display = path.display().to_string();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(display),
            std::io::ErrorKind::NotFound => Self::MissingFile(display),
            _ => Self::Io(err),
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn io_permission_errors_map_to_permission_denied() {
        let err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let mapped = AppError::from_io(err, Path::new("/tmp/locked.txt"));
        assert!(matches!(mapped, AppError::PermissionDenied(ref p) if p == "/tmp/locked.txt"));
    }

    #[test]
    fn io_not_found_maps_to_missing_file() {
        let err = std::io::Error::from(std::io::ErrorKind::NotFound);
        let mapped = AppError::from_io(err, Path::new("/tmp/gone.txt"));
        assert!(matches!(mapped, AppError::MissingFile(_)));
    }

    #[test]
    fn serializes_as_message() {
        let json = serde_json::to_string(&AppError::Cancelled).unwrap();
        assert_eq!(json, "\"organization cancelled\"");
    }
}
