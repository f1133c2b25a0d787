//! Versioned on-disk task snapshots.
//!
//! Tasks are persisted as JSON with an explicit schema version so future
//! field changes can be migrated instead of silently misread.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;
use crate::task::{TaskRecord, TaskSnapshot};

/// Current schema version for persisted tasks.
pub const SCHEMA_VERSION: u8 = 1;

fn default_version() -> u8 {
    SCHEMA_VERSION
}

/// A task record as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedTask {
    #[serde(default = "default_version")]
    pub version: u8,
    #[serde(flatten)]
    task: TaskRecord,
}

impl PersistedTask {
    pub fn from_snapshot(snapshot: &TaskSnapshot) -> Self {
        PersistedTask {
            version: SCHEMA_VERSION,
            task: snapshot.clone(),
        }
    }

    /// Rehydrates the task record. The restored record is marked as
    /// database-backed and clean, since it was just read from storage.
    pub fn into_record(self) -> TaskRecord {
        let mut record = self.task;
        record.mark_persisted();
        record
    }
}

/// Writes all snapshots to `path` as a JSON array, replacing the file.
///
/// The write goes through a sibling temp file and a rename so a crash
/// mid-write never leaves a truncated store behind.
pub fn save_all(path: &Path, snapshots: &[TaskSnapshot]) -> Result<(), EngineError> {
    let persisted: Vec<PersistedTask> = snapshots.iter().map(PersistedTask::from_snapshot).collect();
    let json = serde_json::to_string_pretty(&persisted)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    debug!(count = snapshots.len(), path = %path.display(), "tasks saved");
    Ok(())
}

/// Loads all task records from `path`. A missing file is an empty store.
pub fn load_all(path: &Path) -> Result<Vec<TaskRecord>, EngineError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let persisted: Vec<PersistedTask> = serde_json::from_str(&json)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    debug!(count = persisted.len(), path = %path.display(), "tasks loaded");
    Ok(persisted.into_iter().map(PersistedTask::into_record).collect())
}
