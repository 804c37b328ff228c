use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::OrganizerConfig;
use crate::models::change::ChangeRecord;
use crate::services::dependency_service::DependencyGraph;
use crate::services::structure_service::StructureSnapshot;
use crate::services::undo_service::Ledger;

/// Original path → current path for every file discovered in a pass.
#[derive(Debug, Clone, Default)]
pub struct TrackedFiles {
    locations: BTreeMap<PathBuf, PathBuf>,
}

impl TrackedFiles {
    pub fn track(&mut self, original: PathBuf) {
        self.locations.insert(original.clone(), original);
    }

    pub fn current(&self, original: &Path) -> Option<&Path> {
        self.locations.get(original).map(PathBuf::as_path)
    }

    pub fn relocate(&mut self, original: &Path, current: PathBuf) {
        if let Some(slot) = self.locations.get_mut(original) {
            *slot = current;
        }
    }

    pub fn remove(&mut self, original: &Path) -> Option<PathBuf> {
        self.locations.remove(original)
    }

    /// Points the first entry currently at `from` back to `to`.
    pub fn repair(&mut self, from: &Path, to: &Path) -> bool {
        match self.locations.values_mut().find(|current| current.as_path() == from) {
            Some(current) => {
                *current = to.to_path_buf();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn current_paths(&self) -> impl Iterator<Item = &Path> {
        self.locations.values().map(PathBuf::as_path)
    }
}

/// Everything one organize pass owns. Created at pass start and handed to
/// each component by reference; nothing here is process-wide.
pub struct OrganizeSession {
    pub root: PathBuf,
    pub config: OrganizerConfig,
    pub tracked: TrackedFiles,
    pub ledger: Ledger,
    pub dependencies: DependencyGraph,
    pub structure: StructureSnapshot,
    pub notes_added: usize,
    pub folders_created: usize,
    /// Ledger length when the current pass began; earlier records belong to
    /// previous passes restored from the store.
    pub pass_start: usize,
    cancel_flag: Arc<AtomicBool>,
}

impl OrganizeSession {
    pub fn new(root: impl Into<PathBuf>, config: OrganizerConfig) -> Self {
        Self {
            root: root.into(),
            config,
            tracked: TrackedFiles::default(),
            ledger: Ledger::default(),
            dependencies: DependencyGraph::new(),
            structure: StructureSnapshot::new(),
            notes_added: 0,
            folders_created: 0,
            pass_start: 0,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Records applied since the pass began.
    pub fn pass_records(&self) -> &[ChangeRecord] {
        self.ledger.records().get(self.pass_start..).unwrap_or(&[])
    }

    /// Handle a driving process can flip to stop dispatching further files.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }
}
