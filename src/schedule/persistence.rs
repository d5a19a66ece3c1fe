use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::schedule::{
    error::StoreError,
    types::{Assignment, Conflict, TimeSlot},
};

const SNAPSHOT_VERSION: u64 = 1;

/// Whole-state image of the in-memory stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSnapshot {
    version: u64,
    #[serde(flatten)]
    snapshot: ScheduleSnapshot,
}

#[derive(Debug, Clone)]
pub struct SnapshotPersistence {
    path: PathBuf,
}

impl SnapshotPersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no snapshot has been written yet.
    pub fn load(&self) -> Result<Option<ScheduleSnapshot>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(snapshot_error(format!(
                    "failed to read schedule snapshot '{}': {err}",
                    self.path.display()
                )));
            }
        };

        let parsed: PersistedSnapshot = serde_json::from_str(&content).map_err(|err| {
            snapshot_error(format!(
                "failed to parse schedule snapshot '{}': {err}",
                self.path.display()
            ))
        })?;
        if parsed.version != SNAPSHOT_VERSION {
            return Err(snapshot_error(format!(
                "unsupported schedule snapshot version {} at '{}'",
                parsed.version,
                self.path.display()
            )));
        }

        Ok(Some(parsed.snapshot))
    }

    /// Writes to a sibling temp file, syncs it, then renames over the target.
    pub fn save(&self, snapshot: &ScheduleSnapshot) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|err| {
            snapshot_error(format!(
                "failed to create snapshot directory '{}': {err}",
                parent.display()
            ))
        })?;

        let persisted = PersistedSnapshot {
            version: SNAPSHOT_VERSION,
            snapshot: snapshot.clone(),
        };

        let tmp_path = self.path.with_extension("tmp");
        let file = fs::File::create(&tmp_path).map_err(|err| {
            snapshot_error(format!(
                "failed to create snapshot temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;
        {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &persisted).map_err(|err| {
                snapshot_error(format!(
                    "failed to serialize schedule snapshot '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.write_all(b"\n").and_then(|()| writer.flush()).map_err(|err| {
                snapshot_error(format!(
                    "failed to flush schedule snapshot '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        }

        fs::OpenOptions::new()
            .read(true)
            .open(&tmp_path)
            .and_then(|tmp_file| tmp_file.sync_all())
            .map_err(|err| {
                snapshot_error(format!(
                    "failed to sync snapshot temp file '{}': {err}",
                    tmp_path.display()
                ))
            })?;

        fs::rename(&tmp_path, &self.path).map_err(|err| {
            snapshot_error(format!(
                "failed to replace schedule snapshot '{}' from '{}': {err}",
                self.path.display(),
                tmp_path.display()
            ))
        })?;

        if let Ok(parent_file) = fs::File::open(parent) {
            let _ = parent_file.sync_all();
        }

        tracing::debug!(
            target: "persistence",
            path = %self.path.display(),
            assignments = snapshot.assignments.len(),
            conflicts = snapshot.conflicts.len(),
            "snapshot_saved"
        );
        Ok(())
    }
}

fn snapshot_error(message: String) -> StoreError {
    StoreError::Snapshot(message)
}
