//! Disk-backed key-value persistence for run records.
//!
//! Per spec §6 the only required contract is that opening re-reads all
//! records; the implementer may use any crash-safe embedded store. This
//! implementation keeps one JSON file per run id under a root directory,
//! written via a temp-file-then-rename so a crash mid-write never corrupts
//! an existing record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{RunGraphError, RunGraphResult};
use crate::record::RunRecord;

/// A directory of one-JSON-file-per-run-id records.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    /// Open (creating if absent) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`RunGraphError::Store`] if `root` cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> RunGraphResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| RunGraphError::Store(e.to_string()))?;
        Ok(Self { root })
    }

    /// Load every record currently on disk.
    ///
    /// # Errors
    ///
    /// Returns [`RunGraphError::Store`] if the directory cannot be read.
    pub fn load_all(&self) -> RunGraphResult<HashMap<String, RunRecord>> {
        let mut out = HashMap::new();
        let entries = std::fs::read_dir(&self.root).map_err(|e| RunGraphError::Store(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| RunGraphError::Store(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = match std::fs::read_to_string(&path) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable run record");
                    continue;
                },
            };
            match serde_json::from_str::<RunRecord>(&text) {
                Ok(record) => {
                    out.insert(record.id.clone(), record);
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping corrupt run record");
                },
            }
        }
        Ok(out)
    }

    /// Write (create or overwrite) a single record.
    ///
    /// # Errors
    ///
    /// Returns [`RunGraphError::Store`] on any I/O or serialization failure.
    pub fn put(&self, record: &RunRecord) -> RunGraphResult<()> {
        let path = self.path_for(&record.id);
        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_string(record).map_err(|e| RunGraphError::Store(e.to_string()))?;
        std::fs::write(&tmp, text).map_err(|e| RunGraphError::Store(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| RunGraphError::Store(e.to_string()))?;
        Ok(())
    }

    /// Delete a record, if present.
    ///
    /// # Errors
    ///
    /// Returns [`RunGraphError::Store`] if deletion fails for a reason other
    /// than the file already being absent.
    pub fn delete(&self, id: &str) -> RunGraphResult<()> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RunGraphError::Store(e.to_string())),
        }
    }

    /// Flush pending writes. Every `put`/`delete` above is already
    /// synchronous and durable via rename, so this is a no-op hook kept for
    /// API symmetry with stores that buffer writes.
    pub fn sync(&self) -> RunGraphResult<()> {
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        sanitized_join(&self.root, id)
    }
}

fn sanitized_join(root: &Path, id: &str) -> PathBuf {
    let safe: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    root.join(format!("{safe}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RunStatus;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::open(dir.path()).unwrap();
        let record = RunRecord::new("abc123".to_string(), None, 0, serde_json::json!({}));
        store.put(&record).unwrap();

        let reopened = RunStore::open(dir.path()).unwrap();
        let all = reopened.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["abc123"].status, RunStatus::Queued);
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::open(dir.path()).unwrap();
        store.delete("nonexistent").unwrap();
        store.delete("nonexistent").unwrap();
    }
}
