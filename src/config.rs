use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const MODEL_ENV: &str = "FILE_ORGANIZER_MODEL";
pub const DEFAULT_TEXT_MODEL: &str = "llama-3.1-70b-versatile";
pub const BACKUP_DIR_NAME: &str = ".file_organizer_backups";
const LEDGER_DB_FILE: &str = "ledger.db";

const DEFAULT_PROCESSABLE_EXTENSIONS: &[&str] = &[
    "txt", "py", "js", "html", "css", "json", "xml", "md", "csv", "docx", "xlsx", "pdf", "zip",
];
const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["py"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 4,
            max_delay_secs: 10,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based):
    /// base, 2×base, 4×base, … capped at `max_delay_secs`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        let secs = self
            .base_delay_secs
            .saturating_mul(2u64.saturating_pow(exponent))
            .min(self.max_delay_secs);
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    pub processable_extensions: Vec<String>,
    pub source_extensions: Vec<String>,
    pub snippet_chars: usize,
    pub text_model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub retry: RetryPolicy,
    pub ledger_path: Option<PathBuf>,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            processable_extensions: DEFAULT_PROCESSABLE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            source_extensions: DEFAULT_SOURCE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            snippet_chars: 1000,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            api_key: None,
            retry: RetryPolicy::default(),
            ledger_path: None,
        }
    }
}

impl OrganizerConfig {
    /// Reads a JSON config file; missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config.with_env())
    }

    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    fn with_env(mut self) -> Self {
        if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = std::env::var(MODEL_ENV).ok().filter(|m| !m.trim().is_empty()) {
            self.text_model = model;
        }
        self
    }

    pub fn is_processable(&self, path: &Path) -> bool {
        extension_in(path, &self.processable_extensions)
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        extension_in(path, &self.source_extensions)
    }

    /// Ledger database location: the configured path, else the platform data dir.
    pub fn resolved_ledger_path(&self) -> Result<PathBuf, AppError> {
        if let Some(path) = &self.ledger_path {
            return Ok(path.clone());
        }
        let dirs = directories::ProjectDirs::from("", "", "file-organizer")
            .ok_or_else(|| AppError::General("could not resolve data directory".to_string()))?;
        Ok(dirs.data_dir().join(LEDGER_DB_FILE))
    }
}

pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

fn extension_in(path: &Path, allowed: &[String]) -> bool {
    lowercase_extension(path)
        .map(|ext| allowed.iter().any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
        assert_eq!(policy.delay_for(3), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40), Duration::from_secs(10));
    }

    #[test]
    fn processable_extensions_are_case_insensitive() {
        let config = OrganizerConfig::default();
        assert!(config.is_processable(Path::new("/a/REPORT.PDF")));
        assert!(config.is_processable(Path::new("/a/notes.md")));
        assert!(!config.is_processable(Path::new("/a/photo.png")));
        assert!(!config.is_processable(Path::new("/a/Makefile")));
    }

    #[test]
    fn source_files_default_to_python() {
        let config = OrganizerConfig::default();
        assert!(config.is_source_file(Path::new("pkg/mod.py")));
        assert!(!config.is_source_file(Path::new("pkg/app.js")));
    }

    #[test]
    fn load_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("organizer.json");
        std::fs::write(&path, r#"{"snippet_chars": 200, "retry": {"max_attempts": 5}}"#).unwrap();

        let config = OrganizerConfig::load(&path).unwrap();
        assert_eq!(config.snippet_chars, 200);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_secs, 4);
        assert!(config.processable_extensions.contains(&"py".to_string()));
    }

    #[test]
    fn configured_ledger_path_wins() {
        let config = OrganizerConfig {
            ledger_path: Some(PathBuf::from("/tmp/custom.db")),
            ..OrganizerConfig::default()
        };
        assert_eq!(config.resolved_ledger_path().unwrap(), PathBuf::from("/tmp/custom.db"));
    }
}
