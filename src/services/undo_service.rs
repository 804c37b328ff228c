use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{info, warn};

use crate::data::repository;
use crate::error::AppError;
use crate::models::change::{ChangeKind, ChangeRecord};
use crate::models::report::UndoSummary;
use crate::services::file_service;
use crate::state::TrackedFiles;

/// Mirrors ledger rows into SQLite so a later process can undo the pass.
pub struct LedgerStore {
    conn: Connection,
    root: PathBuf,
}

impl LedgerStore {
    pub fn new(conn: Connection, root: impl Into<PathBuf>) -> Self {
        Self {
            conn,
            root: root.into(),
        }
    }

    pub fn open(db_path: &Path, root: impl Into<PathBuf>) -> Result<Self, AppError> {
        Ok(Self::new(repository::open(db_path)?, root))
    }
}

/// Append-only record of applied move/rename/delete mutations.
#[derive(Default)]
pub struct Ledger {
    records: Vec<ChangeRecord>,
    store: Option<LedgerStore>,
}

impl Ledger {
    pub fn with_store(store: LedgerStore) -> Self {
        Self {
            records: Vec::new(),
            store: Some(store),
        }
    }

    /// Restores the persisted ledger for the store's root.
    pub fn load(store: LedgerStore) -> Result<Self, AppError> {
        let records = repository::list_changes(&store.conn, &store.root)?;
        Ok(Self {
            records,
            store: Some(store),
        })
    }

    pub fn record(&mut self, record: ChangeRecord) {
        if let Some(store) = &self.store {
            if let Err(err) = repository::insert_change(&store.conn, &store.root, &record) {
                warn!("Failed to persist change {}: {err}", record.change_id);
            }
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn clear(&mut self) {
        self.records.clear();
        if let Some(store) = &self.store {
            if let Err(err) = repository::clear_changes(&store.conn, &store.root) {
                warn!("Failed to clear persisted ledger: {err}");
            }
        }
    }
}

/// Replays the ledger newest-first, best effort per record, then clears it.
pub fn undo_all(ledger: &mut Ledger, tracked: &mut TrackedFiles) -> UndoSummary {
    let mut summary = UndoSummary::default();

    for record in ledger.records().iter().rev() {
        match record.kind {
            ChangeKind::Move | ChangeKind::Rename => match revert_relocation(record, tracked) {
                Ok(()) => summary.reverted += 1,
                Err(err) => {
                    warn!("{err}");
                    summary.skipped += 1;
                }
            },
            ChangeKind::Delete => {
                warn!("Cannot undo delete action for: {}", record.source.display());
                summary.irreversible += 1;
            }
        }
    }

    ledger.clear();
    info!(
        "Undo finished: {} reverted, {} skipped, {} irreversible",
        summary.reverted, summary.skipped, summary.irreversible
    );
    summary
}

fn revert_relocation(record: &ChangeRecord, tracked: &mut TrackedFiles) -> Result<(), AppError> {
    let Some(destination) = record.destination.as_deref() else {
        return Err(AppError::UndoPrecondition(format!(
            "{} of {} has no recorded destination",
            record.kind,
            record.source.display()
        )));
    };
    if !destination.exists() || record.source.exists() {
        return Err(AppError::UndoPrecondition(format!(
            "{} {} -> {}",
            record.kind,
            destination.display(),
            record.source.display()
        )));
    }

    if let Some(parent) = record.source.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AppError::from_io(e, parent))?;
    }
    file_service::relocate(destination, &record.source).map_err(|e| {
        AppError::UndoPrecondition(format!(
            "error undoing {} {} -> {}: {e}",
            record.kind,
            destination.display(),
            record.source.display()
        ))
    })?;
    tracked.repair(destination, &record.source);
    info!(
        "Undid {}: {} -> {}",
        record.kind,
        destination.display(),
        record.source.display()
    );
    Ok(())
}
