//! Result store: one JSON file per job under a results directory.
//!
//! Records are written to a temporary sibling and renamed into place, so a
//! reader sees either no record or the complete one. Each id is written at
//! most once per store; files left by an earlier process are replaced.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{JobId, JobRecord};

const RECORD_EXT: &str = "json";

/// Storage backend. Owns the results directory.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
    // Ids claimed by this store and its clones.
    written: Arc<Mutex<HashSet<JobId>>>,
}

impl ResultStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            written: Arc::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: JobId) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_EXT}"))
    }

    fn staging_path(&self, id: JobId) -> PathBuf {
        self.dir.join(format!(".{id}.{RECORD_EXT}.tmp"))
    }

    /// Persist the record for `id`.
    ///
    /// The data is flushed to disk before the rename publishes it. A second
    /// write for the same id through this store fails even if the first one
    /// did not complete; records and staging files from a previous run are
    /// overwritten.
    pub async fn write(&self, id: JobId, record: &JobRecord) -> Result<()> {
        let claimed = self
            .written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id);
        if !claimed {
            return Err(Error::DuplicateRecord(id));
        }

        let path = self.record_path(id);
        let bytes = serde_json::to_vec(record)?;
        let staging = self.staging_path(id);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)
            .await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&staging, &path).await?;
        debug!(job_id = %id, path = %path.display(), "result persisted");
        Ok(())
    }

    /// Read the record for `id`.
    pub async fn read(&self, id: JobId) -> Result<JobRecord> {
        let path = self.record_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Whether a record exists for `id`.
    pub async fn contains(&self, id: JobId) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.record_path(id)).await?)
    }

    /// Ids of every persisted record, in id order.
    ///
    /// Files that are not records (staging files, foreign names) are skipped.
    pub async fn list(&self) -> Result<Vec<JobId>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != RECORD_EXT) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<JobId>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
