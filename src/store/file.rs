//! File-backed artifact store.
//!
//! Each document lives at `<root>/<game>/<session>/<kind>.json`. Writes go
//! to a temporary sibling first and are renamed into place so readers never
//! observe a half-written document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::debug;

use super::{ArtifactStore, Result, StoreKey};
use crate::error::StoreError;

/// Store persisting one JSON file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key onto its file path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if the game or session segment
    /// could escape the root directory.
    pub fn path_for(&self, key: &StoreKey) -> Result<PathBuf> {
        let game = checked_segment(&key.game)?;
        let session = checked_segment(&key.session)?;
        Ok(self
            .root
            .join(game)
            .join(session)
            .join(format!("{}.json", key.kind)))
    }
}

/// Per-process sequence for temporary file names.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique sibling of `path` for one write, e.g. `model.json.4211.7.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_extension(format!("json.{}.{seq}.tmp", std::process::id()))
}

fn checked_segment(segment: &str) -> Result<&str> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StoreError::InvalidKey(format!("{segment:?}")));
    }
    Ok(segment)
}

#[async_trait::async_trait]
impl ArtifactStore for FileStore {
    async fn get(&self, key: &StoreKey) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &StoreKey, document: Value) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(&document)?;
        let tmp = temp_path(&path);
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(key = %key, path = %path.display(), bytes = bytes.len(), "document written");
        Ok(())
    }
}
