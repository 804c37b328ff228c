use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::BACKUP_DIR_NAME;
use crate::error::AppError;
use crate::models::action::{SuggestionAction, ToolCall};
use crate::models::change::{ChangeKind, ChangeRecord};
use crate::models::report::{FileOutcome, FileStage, OrganizeSummary, UndoSummary};
use crate::scope_path;
use crate::services::backup_service;
use crate::services::classify_service;
use crate::services::dependency_service::{
    self, DependencyExtractor, ImportStatementExtractor,
};
use crate::services::duplicate_service;
use crate::services::file_service;
use crate::services::oracle_service::{self, ContentAnalyzer, Oracle, SuggestionContext};
use crate::services::report_service;
use crate::services::safety_service;
use crate::services::structure_service;
use crate::services::undo_service;
use crate::state::OrganizeSession;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct OrganizeProgress {
    pub processed: usize,
    pub total: usize,
    pub message: String,
}

impl OrganizeProgress {
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        ((self.processed as f64 / self.total as f64) * 100.0)
            .round()
            .clamp(0.0, 100.0) as usize
    }
}

// ---------------------------------------------------------------------------
// Pass entry points
// ---------------------------------------------------------------------------

/// Runs one organize pass over `session.root` with the default import scanner.
pub async fn organize_folder<O, F>(
    session: &mut OrganizeSession,
    oracle: &O,
    on_progress: F,
) -> OrganizeSummary
where
    O: Oracle,
    F: FnMut(&OrganizeProgress),
{
    organize_folder_with(session, oracle, &ImportStatementExtractor::new(), on_progress).await
}

pub async fn organize_folder_with<O, F>(
    session: &mut OrganizeSession,
    oracle: &O,
    extractor: &dyn DependencyExtractor,
    mut on_progress: F,
) -> OrganizeSummary
where
    O: Oracle,
    F: FnMut(&OrganizeProgress),
{
    prepare_session(session, extractor);

    let files = discover_files(&session.root);
    for file in &files {
        session.tracked.track(file.clone());
    }
    info!(
        "Organizing {} file(s) under {}",
        files.len(),
        session.root.display()
    );

    let analyzer = ContentAnalyzer::new();
    let total = files.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut cancelled = false;

    for (index, original) in files.iter().enumerate() {
        if session.is_cancelled() {
            info!("Organization cancelled after {index} of {total} file(s)");
            cancelled = true;
            break;
        }

        let outcome = process_file(session, oracle, &analyzer, original).await;
        let message = match (&outcome.stage, &outcome.error) {
            (FileStage::Skipped, _) => format!("Skipped: {}", original.display()),
            (_, Some(err)) => format!("Failed: {} ({err})", original.display()),
            _ => format!("Processed: {}", original.display()),
        };
        on_progress(&OrganizeProgress {
            processed: index + 1,
            total,
            message,
        });
        outcomes.push(outcome);
    }

    let duplicates = duplicate_service::find_duplicates(session.tracked.current_paths());
    if !duplicates.is_empty() {
        info!("Found {} duplicate file(s)", duplicates.len());
    }

    OrganizeSummary {
        report: report_service::build_report(session),
        duplicates,
        files: outcomes,
        cancelled,
    }
}

/// Reverts every recorded move/rename of the session, newest first.
pub fn undo_changes(session: &mut OrganizeSession) -> UndoSummary {
    undo_service::undo_all(&mut session.ledger, &mut session.tracked)
}

/// Captures the dependency graph and structure snapshot for the pass and
/// marks where its ledger records begin.
pub fn prepare_session(session: &mut OrganizeSession, extractor: &dyn DependencyExtractor) {
    session.pass_start = session.ledger.len();
    session.dependencies =
        dependency_service::analyze_dependencies(&session.root, &session.config, extractor);
    session.structure = structure_service::build_structure(&session.root);
}

/// Regular files under `root`, backup stores excluded. Within a directory,
/// files come before subdirectories, each group sorted by name.
pub fn discover_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .into_iter()
        .filter_entry(|entry| entry.file_name() != BACKUP_DIR_NAME)
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable entry during discovery: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

// ---------------------------------------------------------------------------
// Per-file state machine
// ---------------------------------------------------------------------------

fn finish(original: &Path, stage: FileStage, applied: usize, error: Option<String>) -> FileOutcome {
    debug!("{} -> {:?}", original.display(), stage);
    FileOutcome {
        original_path: original.to_path_buf(),
        stage,
        actions_applied: applied,
        error,
    }
}

async fn process_file<O: Oracle>(
    session: &mut OrganizeSession,
    oracle: &O,
    analyzer: &ContentAnalyzer,
    original: &Path,
) -> FileOutcome {
    debug!("{} -> {:?}", original.display(), FileStage::Discovered);

    let Some(current) = session
        .tracked
        .current(original)
        .filter(|p| p.exists())
        .map(Path::to_path_buf)
    else {
        warn!("File no longer exists or has been moved: {}", original.display());
        return finish(
            original,
            FileStage::Skipped,
            0,
            Some("file no longer exists".to_string()),
        );
    };

    if !session.config.is_processable(&current) {
        info!("Skipping non-processable file: {}", current.display());
        return finish(original, FileStage::Skipped, 0, None);
    }

    let content = match classify_service::read_content(&current) {
        Ok(content) if !content.is_empty() => content,
        Ok(_) => {
            info!("Empty file: {}", current.display());
            return finish(original, FileStage::Skipped, 0, None);
        }
        Err(err) => {
            warn!("Error reading file {}: {err}", current.display());
            return finish(original, FileStage::Skipped, 0, Some(err.to_string()));
        }
    };
    debug!("{} -> {:?}", original.display(), FileStage::ContentRead);

    let category = classify_service::categorize(&current);
    debug!(
        "{} -> {:?} ({category})",
        original.display(),
        FileStage::Categorized
    );

    let context = build_context(session, analyzer, &current, &content);
    let request = oracle_service::request_for(
        &current,
        category,
        &content,
        session.config.snippet_chars,
        context,
    );

    debug!("{} -> {:?}", original.display(), FileStage::AwaitingSuggestion);
    let cancel_flag = session.cancel_handle();
    let calls = match oracle_service::suggest_with_retry(
        oracle,
        &request,
        &session.config.retry,
        &cancel_flag,
    )
    .await
    {
        Ok(calls) => calls,
        Err(err) => {
            let err = AppError::from(err);
            return finish(original, FileStage::Done, 0, Some(err.to_string()));
        }
    };

    debug!("{} -> {:?}", original.display(), FileStage::Executing);
    let applied = execute_suggestions(session, original, &calls);
    finish(original, FileStage::Done, applied, None)
}

fn build_context(
    session: &OrganizeSession,
    analyzer: &ContentAnalyzer,
    current: &Path,
    content: &str,
) -> SuggestionContext {
    let dependencies = session
        .dependencies
        .get(current)
        .map(|deps| deps.iter().cloned().collect())
        .unwrap_or_default();
    let (directory, structure) =
        match structure_service::listing_for(&session.structure, &session.root, current) {
            Some((rel, listing)) => (Some(rel), Some(listing.clone())),
            None => (None, None),
        };

    SuggestionContext {
        dependencies,
        directory,
        structure,
        analysis: analyzer.analyze(content),
    }
}

// ---------------------------------------------------------------------------
// Action execution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Vetoed,
    /// Nothing to do, e.g. a rename to the name the file already has.
    Unchanged,
}

/// Applies a batch of tool calls to the file tracked as `original`.
/// Returns how many actions took effect.
pub fn execute_suggestions(
    session: &mut OrganizeSession,
    original: &Path,
    calls: &[ToolCall],
) -> usize {
    if calls.is_empty() {
        info!("No tool calls in response for {}", original.display());
        return 0;
    }

    let mut applied = 0;
    for call in calls {
        let action = match SuggestionAction::from_tool_call(call) {
            Ok(Some(action)) => action,
            Ok(None) => {
                debug!("Ignoring unknown action '{}'", call.name);
                continue;
            }
            Err(err) => {
                warn!("{err} (file {})", original.display());
                continue;
            }
        };

        let Some(current) = session
            .tracked
            .current(original)
            .filter(|p| p.exists())
            .map(Path::to_path_buf)
        else {
            warn!(
                "File no longer exists or has been moved: {}; dropping remaining actions",
                original.display()
            );
            break;
        };

        match execute_action(session, original, &current, &action) {
            Ok(ActionOutcome::Applied) => applied += 1,
            Ok(ActionOutcome::Vetoed | ActionOutcome::Unchanged) => {}
            Err(err) => warn!(
                "{} failed for {}: {err}",
                action.tool_name(),
                current.display()
            ),
        }
    }
    applied
}

/// Runs one validated action. The subject is always the tracked file's
/// current path; `source`/`file_path` arguments are not trusted as targets.
pub fn execute_action(
    session: &mut OrganizeSession,
    original: &Path,
    current: &Path,
    action: &SuggestionAction,
) -> Result<ActionOutcome, AppError> {
    match action {
        SuggestionAction::MoveFile { destination, .. } => {
            let target = resolve_move_target(session, current, destination)?;
            if !safety_service::is_safe_to_move(&session.dependencies, current, &target) {
                warn!("Unsafe to move file: {}", current.display());
                return Ok(ActionOutcome::Vetoed);
            }
            backup_service::backup(current);
            let new_path = file_service::move_file(current, &target)?;
            session.ledger.record(ChangeRecord::relocation(
                ChangeKind::Move,
                current.to_path_buf(),
                new_path.clone(),
            ));
            info!(
                "Updated file location: {} -> {}",
                original.display(),
                new_path.display()
            );
            session.tracked.relocate(original, new_path);
        }
        SuggestionAction::CreateFolder { path } => {
            let folder = resolve_in_root(session, path)?;
            file_service::create_folder(&folder)?;
            session.folders_created += 1;
        }
        SuggestionAction::AddNote { note, .. } => {
            file_service::add_note(current, note)?;
            session.notes_added += 1;
        }
        SuggestionAction::RenameFile { new_name, .. } => {
            safety_service::validate_new_name(new_name)?;
            if current.file_name() == Some(OsStr::new(new_name.trim())) {
                debug!("{} already named {new_name}", current.display());
                return Ok(ActionOutcome::Unchanged);
            }
            backup_service::backup(current);
            let new_path = file_service::rename_file(current, new_name)?;
            session.ledger.record(ChangeRecord::relocation(
                ChangeKind::Rename,
                current.to_path_buf(),
                new_path.clone(),
            ));
            session.tracked.relocate(original, new_path);
        }
        SuggestionAction::DeleteFile { .. } => {
            backup_service::backup(current);
            file_service::delete_file(current)?;
            session
                .ledger
                .record(ChangeRecord::deletion(current.to_path_buf()));
            session.tracked.remove(original);
        }
    }
    Ok(ActionOutcome::Applied)
}

fn resolve_in_root(session: &OrganizeSession, relative: &str) -> Result<PathBuf, AppError> {
    safety_service::validate_path(relative)?;
    let resolved = scope_path::resolve(&session.root, relative);
    if !scope_path::is_within_scope(&resolved, &session.root) {
        return Err(AppError::MalformedSuggestion(format!(
            "path escapes the organized root: {relative}"
        )));
    }
    Ok(resolved)
}

/// Final file path of a move: a directory destination (existing, or written
/// with a trailing separator) receives the file under its current name.
fn resolve_move_target(
    session: &OrganizeSession,
    current: &Path,
    destination: &str,
) -> Result<PathBuf, AppError> {
    let resolved = resolve_in_root(session, destination)?;
    let names_directory = destination.ends_with('/') || destination.ends_with('\\');
    if resolved.is_dir() || names_directory {
        let file_name = current.file_name().ok_or_else(|| {
            AppError::General(format!("invalid source path: {}", current.display()))
        })?;
        return Ok(resolved.join(file_name));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrganizerConfig;
    use crate::services::oracle_service::{OracleError, SuggestionRequest};
    use crate::services::rules_oracle::RulesOracle;
    use crate::services::undo_service::{Ledger, LedgerStore};
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers per file name; names listed in `failing` always error.
    #[derive(Default)]
    struct ScriptedOracle {
        responses: HashMap<String, Vec<ToolCall>>,
        failing: Vec<String>,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl ScriptedOracle {
        fn respond(mut self, file_name: &str, calls: Vec<ToolCall>) -> Self {
            self.responses.insert(file_name.to_string(), calls);
            self
        }

        fn fail(mut self, file_name: &str) -> Self {
            self.failing.push(file_name.to_string());
            self
        }

        fn calls_for(&self, file_name: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .get(file_name)
                .copied()
                .unwrap_or(0)
        }
    }

    impl Oracle for ScriptedOracle {
        async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<ToolCall>, OracleError> {
            let name = request
                .file_path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string();
            *self.calls.lock().unwrap().entry(name.clone()).or_insert(0) += 1;
            if self.failing.contains(&name) {
                return Err(OracleError::Transient("service unavailable".into()));
            }
            Ok(self.responses.get(&name).cloned().unwrap_or_default())
        }
    }

    fn session_for(root: &Path) -> OrganizeSession {
        OrganizeSession::new(root, OrganizerConfig::default())
    }

    fn outcome_for<'a>(summary: &'a OrganizeSummary, path: &Path) -> &'a FileOutcome {
        summary
            .files
            .iter()
            .find(|o| o.original_path == path)
            .unwrap()
    }

    #[test]
    fn progress_percent_is_bounded() {
        let progress = OrganizeProgress {
            processed: 1,
            total: 3,
            message: String::new(),
        };
        assert_eq!(progress.percent(), 33);
        let empty = OrganizeProgress {
            processed: 0,
            total: 0,
            message: String::new(),
        };
        assert_eq!(empty.percent(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhaustion_marks_file_failed_and_pass_continues() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "first file").unwrap();
        fs::write(root.join("b.txt"), "second file").unwrap();

        let oracle = ScriptedOracle::default().fail("a.txt").respond(
            "b.txt",
            vec![ToolCall::new("add_note", json!({"file_path": "b.txt", "note": "ok"}))],
        );
        let mut session = session_for(root);
        let mut messages = Vec::new();
        let started = tokio::time::Instant::now();

        let summary = organize_folder(&mut session, &oracle, |p| messages.push(p.message.clone()))
            .await;

        assert_eq!(oracle.calls_for("a.txt"), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4 + 8));
        assert!(elapsed < Duration::from_secs(13));

        let failed = outcome_for(&summary, &root.join("a.txt"));
        assert_eq!(failed.stage, FileStage::Done);
        assert_eq!(failed.actions_applied, 0);
        assert!(failed.error.is_some());

        let next = outcome_for(&summary, &root.join("b.txt"));
        assert_eq!(next.actions_applied, 1);
        assert!(fs::read_to_string(root.join("b.txt")).unwrap().contains("# AI Note: ok"));
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("Failed:"));
    }

    #[tokio::test]
    async fn note_after_rename_lands_on_renamed_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let x = root.join("x.txt");
        fs::write(&x, "content").unwrap();

        let oracle = ScriptedOracle::default().respond(
            "x.txt",
            vec![
                ToolCall::new("rename_file", json!({"source": "x.txt", "new_name": "y.txt"})),
                ToolCall::new("add_note", json!({"file_path": "x.txt", "note": "renamed"})),
            ],
        );
        let mut session = session_for(root);
        let summary = organize_folder(&mut session, &oracle, |_| {}).await;

        let y = root.join("y.txt");
        assert!(!x.exists());
        assert_eq!(fs::read_to_string(&y).unwrap(), "content\n\n# AI Note: renamed");
        assert_eq!(session.tracked.current(&x), Some(y.as_path()));
        assert_eq!(outcome_for(&summary, &x).actions_applied, 2);
        assert_eq!(summary.report.actions_taken["rename"], 1);
        assert_eq!(summary.report.actions_taken["add_note"], 1);
    }

    #[tokio::test]
    async fn move_of_imported_module_is_vetoed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(root.join("app/a.py"), "import b\n").unwrap();
        fs::write(root.join("app/b.py"), "VALUE = 1\n").unwrap();

        let oracle = ScriptedOracle::default().respond(
            "b.py",
            vec![ToolCall::new(
                "move_file",
                json!({"source": "app/b.py", "destination": "lib/b.py"}),
            )],
        );
        let mut session = session_for(root);
        let summary = organize_folder(&mut session, &oracle, |_| {}).await;

        assert!(root.join("app/b.py").exists());
        assert!(!root.join("lib/b.py").exists());
        assert!(session.ledger.is_empty());
        assert_eq!(outcome_for(&summary, &root.join("app/b.py")).actions_applied, 0);
    }

    #[tokio::test]
    async fn malformed_and_unknown_actions_are_skipped_individually() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("notes.md"), "# notes").unwrap();

        let oracle = ScriptedOracle::default().respond(
            "notes.md",
            vec![
                ToolCall::new("move_file", json!({"source": "notes.md"})),
                ToolCall {
                    name: "rename_file".into(),
                    arguments: "{broken".into(),
                },
                ToolCall::new("add_tag", json!({"file_path": "notes.md", "tag": "x"})),
                ToolCall::new("add_note", json!({"file_path": "notes.md", "note": "kept"})),
            ],
        );
        let mut session = session_for(root);
        let summary = organize_folder(&mut session, &oracle, |_| {}).await;

        assert_eq!(outcome_for(&summary, &root.join("notes.md")).actions_applied, 1);
        assert!(fs::read_to_string(root.join("notes.md")).unwrap().ends_with("kept"));
    }

    #[tokio::test]
    async fn delete_drops_remaining_actions_and_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let file = root.join("old.txt");
        fs::write(&file, "obsolete").unwrap();

        let oracle = ScriptedOracle::default().respond(
            "old.txt",
            vec![
                ToolCall::new("delete_file", json!({"file_path": "old.txt"})),
                ToolCall::new("add_note", json!({"file_path": "old.txt", "note": "late"})),
            ],
        );
        let mut session = session_for(root);
        let summary = organize_folder(&mut session, &oracle, |_| {}).await;

        assert!(!file.exists());
        assert_eq!(outcome_for(&summary, &file).actions_applied, 1);
        assert!(session.tracked.current(&file).is_none());
        assert_eq!(session.ledger.records()[0].kind, ChangeKind::Delete);

        let backups: Vec<_> = fs::read_dir(root.join(BACKUP_DIR_NAME)).unwrap().collect();
        assert_eq!(backups.len(), 1);
    }

    #[tokio::test]
    async fn non_processable_and_empty_files_are_skipped_without_oracle_call() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("photo.png"), [1u8, 2, 3]).unwrap();
        fs::write(root.join("empty.txt"), "").unwrap();

        let oracle = ScriptedOracle::default();
        let mut session = session_for(root);
        let mut progress = Vec::new();
        let summary = organize_folder(&mut session, &oracle, |p| progress.push(p.clone())).await;

        assert!(summary.files.iter().all(|o| o.stage == FileStage::Skipped));
        assert_eq!(oracle.calls_for("photo.png"), 0);
        assert_eq!(oracle.calls_for("empty.txt"), 0);
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[1].percent(), 100);
        assert!(progress.iter().all(|p| p.message.starts_with("Skipped:")));
    }

    #[tokio::test]
    async fn destinations_outside_the_root_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.txt"), "stay").unwrap();

        let oracle = ScriptedOracle::default().respond(
            "a.txt",
            vec![
                ToolCall::new("move_file", json!({"source": "a.txt", "destination": "../a.txt"})),
                ToolCall::new(
                    "move_file",
                    json!({"source": "a.txt", "destination": dir.path().join("b.txt").to_string_lossy()}),
                ),
                ToolCall::new("create_folder", json!({"path": "../escape"})),
            ],
        );
        let mut session = session_for(&root);
        organize_folder(&mut session, &oracle, |_| {}).await;

        assert!(root.join("a.txt").exists());
        assert!(!dir.path().join("a.txt").exists());
        assert!(!dir.path().join("b.txt").exists());
        assert!(!dir.path().join("escape").exists());
    }

    #[tokio::test]
    async fn full_pass_then_undo_restores_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("inbox")).unwrap();
        fs::write(root.join("inbox/report.md"), "quarterly").unwrap();
        fs::write(root.join("inbox/copy.md"), "quarterly").unwrap();

        let oracle = ScriptedOracle::default()
            .respond(
                "report.md",
                vec![
                    ToolCall::new("create_folder", json!({"path": "docs"})),
                    ToolCall::new(
                        "move_file",
                        json!({"source": "inbox/report.md", "destination": "docs/"}),
                    ),
                    ToolCall::new(
                        "rename_file",
                        json!({"source": "docs/report.md", "new_name": "q1.md"}),
                    ),
                ],
            );
        let mut session = session_for(root);
        let summary = organize_folder(&mut session, &oracle, |_| {}).await;

        assert!(root.join("docs/q1.md").exists());
        assert_eq!(summary.report.changes_made, 2);
        assert_eq!(summary.report.actions_taken["create_folder"], 1);
        assert_eq!(summary.duplicates.len(), 1);

        let undo = undo_changes(&mut session);
        assert_eq!(undo.reverted, 2);
        assert!(root.join("inbox/report.md").exists());
        assert!(!root.join("docs/q1.md").exists());
        assert!(session.ledger.is_empty());
        assert_eq!(
            session.tracked.current(&root.join("inbox/report.md")),
            Some(root.join("inbox/report.md").as_path())
        );
    }

    #[tokio::test]
    async fn cancelled_session_dispatches_no_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();

        let oracle = ScriptedOracle::default();
        let mut session = session_for(dir.path());
        session.cancel_handle().store(true, Ordering::Relaxed);
        let summary = organize_folder(&mut session, &oracle, |_| {}).await;

        assert!(summary.cancelled);
        assert!(summary.files.is_empty());
        assert_eq!(oracle.calls_for("a.txt"), 0);
    }

    #[tokio::test]
    async fn report_counts_only_the_current_pass() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        crate::data::migrations::run_migrations(&conn).unwrap();
        let mut ledger = Ledger::with_store(LedgerStore::new(conn, root));
        ledger.record(ChangeRecord::relocation(
            ChangeKind::Move,
            root.join("old.txt"),
            root.join("docs/old.txt"),
        ));

        let mut session = session_for(root).with_ledger(ledger);
        let summary = organize_folder(&mut session, &RulesOracle::new(root), |_| {}).await;

        assert_eq!(summary.report.changes_made, 0);
        assert_eq!(summary.report.actions_taken["move"], 0);
        assert_eq!(session.ledger.len(), 1);
        assert_eq!(session.pass_start, 1);
    }

    #[test]
    fn failed_backup_does_not_block_the_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        // A plain file where the backup store should be makes create_dir_all fail.
        fs::write(root.join(BACKUP_DIR_NAME), "not a directory").unwrap();
        let a = root.join("a.txt");
        let b = root.join("b.txt");
        fs::write(&a, "alpha").unwrap();
        fs::write(&b, "beta").unwrap();
        assert!(backup_service::backup(&a).is_none());

        let mut session = session_for(root);
        session.tracked.track(a.clone());
        session.tracked.track(b.clone());

        let moved = execute_suggestions(
            &mut session,
            &a,
            &[ToolCall::new(
                "move_file",
                json!({"source": "a.txt", "destination": "docs/a.txt"}),
            )],
        );
        let deleted = execute_suggestions(
            &mut session,
            &b,
            &[ToolCall::new("delete_file", json!({"file_path": "b.txt"}))],
        );

        assert_eq!(moved, 1);
        assert_eq!(deleted, 1);
        assert!(root.join("docs/a.txt").exists());
        assert!(!b.exists());
        assert_eq!(session.ledger.len(), 2);
        assert!(root.join(BACKUP_DIR_NAME).is_file());
    }

    #[test]
    fn failed_action_does_not_stop_the_next_one() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let a = root.join("a.txt");
        fs::write(&a, "alpha").unwrap();
        fs::write(root.join("taken.txt"), "occupied").unwrap();

        let mut session = session_for(root);
        session.tracked.track(a.clone());
        let applied = execute_suggestions(
            &mut session,
            &a,
            &[
                ToolCall::new("rename_file", json!({"source": "a.txt", "new_name": "taken.txt"})),
                ToolCall::new("add_note", json!({"file_path": "a.txt", "note": "still here"})),
            ],
        );

        assert_eq!(applied, 1);
        assert!(session.ledger.is_empty());
        assert_eq!(fs::read_to_string(root.join("taken.txt")).unwrap(), "occupied");
        assert!(fs::read_to_string(&a).unwrap().ends_with("# AI Note: still here"));
    }

    #[test]
    fn rename_to_current_name_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let x = root.join("x.txt");
        fs::write(&x, "same").unwrap();

        let mut session = session_for(root);
        session.tracked.track(x.clone());
        let applied = execute_suggestions(
            &mut session,
            &x,
            &[ToolCall::new("rename_file", json!({"source": "x.txt", "new_name": "x.txt"}))],
        );

        assert_eq!(applied, 0);
        assert!(session.ledger.is_empty());
        assert!(x.exists());
        assert!(!root.join(BACKUP_DIR_NAME).exists());
    }

    #[test]
    fn discovery_lists_files_before_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("a/inner.txt"), "x").unwrap();
        fs::write(root.join("b.txt"), "x").unwrap();
        fs::write(root.join("c.txt"), "x").unwrap();

        assert_eq!(
            discover_files(root),
            vec![root.join("b.txt"), root.join("c.txt"), root.join("a/inner.txt")]
        );
    }

    #[tokio::test]
    async fn whitespace_only_file_is_still_offered_to_the_oracle() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("blank.txt"), "  \n").unwrap();

        let oracle = ScriptedOracle::default();
        let mut session = session_for(root);
        let summary = organize_folder(&mut session, &oracle, |_| {}).await;

        assert_eq!(oracle.calls_for("blank.txt"), 1);
        assert_eq!(summary.files[0].stage, FileStage::Done);
    }

    #[test]
    fn discovery_skips_backup_store() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(BACKUP_DIR_NAME)).unwrap();
        fs::write(dir.path().join(BACKUP_DIR_NAME).join("a.txt_20240101_000000"), "x").unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();

        assert_eq!(discover_files(dir.path()), vec![dir.path().join("a.txt")]);
    }
}
