use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeReport {
    pub total_files_processed: usize,
    pub changes_made: usize,
    pub file_categories: BTreeMap<String, usize>,
    pub actions_taken: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicatePair {
    pub path: PathBuf,
    pub duplicate_of: PathBuf,
    pub digest: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    Discovered,
    ContentRead,
    Categorized,
    AwaitingSuggestion,
    Executing,
    Done,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub original_path: PathBuf,
    pub stage: FileStage,
    pub actions_applied: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizeSummary {
    pub report: OrganizeReport,
    pub duplicates: Vec<DuplicatePair>,
    pub files: Vec<FileOutcome>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UndoSummary {
    pub reverted: usize,
    pub skipped: usize,
    pub irreversible: usize,
}
