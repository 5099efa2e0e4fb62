//! Local filesystem storage.
//!
//! Every artifact of a job lives under one output directory:
//!
//! ```text
//! {root}/
//! ├── results.json            # Running ledger: array of run summaries
//! ├── results.csv             # Running ledger: flat, versioned CSV view
//! ├── available-domains.txt   # Derived list (domain job only)
//! └── runs/
//!     └── YYYYMMDD-HHMMSS/
//!         ├── results.json    # This run's summary
//!         ├── results.csv     # This run's rows
//!         └── NNN-slug/       # Per-item artifacts (paper job only)
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Local filesystem storage backend rooted at an output directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Create a directory (and parents) under the root.
    pub async fn create_dir(&self, key: &str) -> Result<PathBuf> {
        let path = self.path(key);
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// Write bytes atomically (write to temp, then rename).
    pub async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write UTF-8 text atomically.
    pub async fn write_text(&self, key: &str, text: &str) -> Result<()> {
        self.write_bytes(key, text.as_bytes()).await
    }

    /// Write JSON data (pretty-printed, two-space indent).
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    pub async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read text, returning None if file doesn't exist.
    pub async fn read_text(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .read_bytes(key)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Key of a run's artifact directory.
pub fn run_key(run_id: &str, name: &str) -> String {
    format!("runs/{run_id}/{name}")
}
