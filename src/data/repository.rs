use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::models::change::{ChangeKind, ChangeRecord};

pub fn open(db_path: &Path) -> Result<Connection, AppError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    crate::data::migrations::run_migrations(&conn)?;
    Ok(conn)
}

pub fn insert_change(conn: &Connection, root: &Path, record: &ChangeRecord) -> Result<i64, AppError> {
    conn.execute(
        "INSERT INTO change_log (change_id, root_path, change_kind, source_path, destination_path, executed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.change_id,
            root.to_string_lossy(),
            record.kind.to_string(),
            record.source.to_string_lossy(),
            record
                .destination
                .as_ref()
                .map(|d| d.to_string_lossy().to_string()),
            record.executed_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Changes for `root` in the order they were applied.
pub fn list_changes(conn: &Connection, root: &Path) -> Result<Vec<ChangeRecord>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT change_id, change_kind, source_path, destination_path, executed_at
         FROM change_log WHERE root_path = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![root.to_string_lossy()], |row| {
        let kind: String = row.get(1)?;
        let source: String = row.get(2)?;
        let destination: Option<String> = row.get(3)?;
        Ok((row.get::<_, String>(0)?, kind, source, destination, row.get::<_, String>(4)?))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (change_id, kind, source, destination, executed_at) = row?;
        let Ok(kind) = kind.parse::<ChangeKind>() else {
            tracing::warn!("Ignoring change {change_id} with unknown kind '{kind}'");
            continue;
        };
        records.push(ChangeRecord {
            change_id,
            kind,
            source: PathBuf::from(source),
            destination: destination.map(PathBuf::from),
            executed_at,
        });
    }
    Ok(records)
}

pub fn clear_changes(conn: &Connection, root: &Path) -> Result<usize, AppError> {
    let count = conn.execute(
        "DELETE FROM change_log WHERE root_path = ?1",
        params![root.to_string_lossy()],
    )?;
    Ok(count)
}
