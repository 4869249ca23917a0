//! Durable state: the pending mention queue and the mention watermark.
//!
//! Both values live as JSON documents in the state directory and are always
//! rewritten whole. Every write goes to a temporary file that is flushed to
//! disk and then renamed over the target, so a crash leaves either the old
//! or the new document, never a torn one.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::twitter::Mention;

const QUEUE_FILE: &str = "queue.json";
const WATERMARK_FILE: &str = "watermark.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The id of the last mention whose processing was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub last_mention_id: String,
    pub updated_at: DateTime<Utc>,
}

/// Reads and writes the bot's state files.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        info!("Using state directory {}", dir.display());
        Ok(StateStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The persisted queue snapshot, newest first. Missing file means empty queue.
    pub fn load_queue(&self) -> Result<Vec<Mention>, StoreError> {
        Ok(self.read_json(QUEUE_FILE)?.unwrap_or_default())
    }

    pub fn save_queue(&self, mentions: &[Mention]) -> Result<(), StoreError> {
        self.write_json(QUEUE_FILE, mentions)?;
        debug!("Persisted queue snapshot with {} mentions", mentions.len());
        Ok(())
    }

    pub fn load_watermark(&self) -> Result<Option<Watermark>, StoreError> {
        self.read_json(WATERMARK_FILE)
    }

    pub fn save_watermark(&self, last_mention_id: &str) -> Result<(), StoreError> {
        let watermark = Watermark {
            last_mention_id: last_mention_id.to_string(),
            updated_at: Utc::now(),
        };
        self.write_json(WATERMARK_FILE, &watermark)?;
        debug!("Persisted watermark {}", last_mention_id);
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, StoreError> {
        let path = self.dir.join(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Json { path, source })
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &bytes).map_err(|source| StoreError::Io { path, source })
    }
}

/// Replaces `path` with `bytes` via a flushed temporary file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}
