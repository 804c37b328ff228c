use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Move,
    Rename,
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Rename => write!(f, "rename"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl std::str::FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move" => Ok(Self::Move),
            "rename" => Ok(Self::Rename),
            "delete" => Ok(Self::Delete),
            _ => Err(format!("unknown change kind: {s}")),
        }
    }
}

/// One applied mutation. `destination` is `None` only for deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub change_id: String,
    pub kind: ChangeKind,
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub executed_at: String,
}

impl ChangeRecord {
    pub fn new(kind: ChangeKind, source: PathBuf, destination: Option<PathBuf>) -> Self {
        Self {
            change_id: uuid::Uuid::new_v4().to_string(),
            kind,
            source,
            destination,
            executed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn relocation(kind: ChangeKind, source: PathBuf, destination: PathBuf) -> Self {
        Self::new(kind, source, Some(destination))
    }

    pub fn deletion(source: PathBuf) -> Self {
        Self::new(ChangeKind::Delete, source, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_text() {
        for kind in [ChangeKind::Move, ChangeKind::Rename, ChangeKind::Delete] {
            assert_eq!(kind.to_string().parse::<ChangeKind>().unwrap(), kind);
        }
        assert!("copy".parse::<ChangeKind>().is_err());
    }

    #[test]
    fn deletion_has_no_destination() {
        let record = ChangeRecord::deletion(PathBuf::from("/tmp/a.txt"));
        assert_eq!(record.kind, ChangeKind::Delete);
        assert!(record.destination.is_none());
        assert!(!record.change_id.is_empty());
    }
}
