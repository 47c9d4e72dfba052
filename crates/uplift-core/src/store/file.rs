//! JSON-lines audit store

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::AuditStore;
use crate::error::StoreError;
use crate::model::{AuditEntry, AuditRecord};

/// Audit trail persisted as one JSON record per line
///
/// The file is only ever appended to. Existing records are loaded on open so ids keep
/// increasing across restarts.
#[derive(Debug)]
pub struct FileAuditStore {
    path: PathBuf,
    state: Mutex<FileState>,
}

#[derive(Debug)]
struct FileState {
    file: File,
    records: Vec<AuditRecord>,
}

fn unavailable(path: &Path, e: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(format!("{}: {e}", path.display()))
}

impl FileAuditStore {
    /// Open or create the audit file at `path`
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the file cannot be created or read, or if
    /// an existing line is not a valid record.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable(&path, e))?;
        }

        let records = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(n, line)| {
                    serde_json::from_str::<AuditRecord>(line)
                        .map_err(|e| unavailable(&path, format!("line {}: {e}", n + 1)))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(unavailable(&path, e)),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| unavailable(&path, e))?;

        info!(path = %path.display(), records = records.len(), "opened audit log");

        Ok(Self {
            path,
            state: Mutex::new(FileState { file, records }),
        })
    }

    /// Location of the audit file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStore for FileAuditStore {
    async fn append(&self, entry: AuditEntry) -> Result<AuditRecord, StoreError> {
        let mut state = self.state.lock().await;
        let id = state.records.last().map_or(1, |r| r.id + 1);
        let record = entry.into_record(id);

        let mut line = serde_json::to_string(&record).map_err(|e| unavailable(&self.path, e))?;
        line.push('\n');

        state
            .file
            .write_all(line.as_bytes())
            .await
            .map_err(|e| unavailable(&self.path, e))?;
        state
            .file
            .flush()
            .await
            .map_err(|e| unavailable(&self.path, e))?;
        state
            .file
            .sync_data()
            .await
            .map_err(|e| unavailable(&self.path, e))?;

        debug!(id, host = %record.host_id, "audit record written");

        state.records.push(record.clone());
        Ok(record)
    }

    async fn list_for_host(&self, host_id: &str) -> Result<Vec<AuditRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| r.host_id == host_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self.state.lock().await.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::model::AuditOutcome;

    fn entry(host_id: &str, outcome: AuditOutcome) -> AuditEntry {
        AuditEntry {
            host_id: host_id.to_string(),
            hostname: format!("app-{host_id}"),
            component_name: "Java".to_string(),
            from_version: "1.8.0.211".to_string(),
            to_version: "11.0.12".to_string(),
            outcome,
            actor: "tester".to_string(),
            timestamp: Utc::now(),
            output: "line one\nline two".to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit").join("audit.jsonl");

        {
            let store = FileAuditStore::open(&path).await.unwrap();
            store.append(entry("1", AuditOutcome::Success)).await.unwrap();
            store.append(entry("2", AuditOutcome::Failed)).await.unwrap();
        }

        let store = FileAuditStore::open(&path).await.unwrap();
        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].outcome, AuditOutcome::Failed);
        assert_eq!(all[0].output, "line one\nline two");

        let next = store.append(entry("1", AuditOutcome::Success)).await.unwrap();
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn test_one_line_per_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");

        let store = FileAuditStore::open(&path).await.unwrap();
        store.append(entry("1", AuditOutcome::Success)).await.unwrap();
        store.append(entry("1", AuditOutcome::Failed)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"status\":\"FAILED\""));
    }

    #[tokio::test]
    async fn test_corrupt_line_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();

        let err = FileAuditStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(msg) if msg.contains("line 1")));
    }
}
