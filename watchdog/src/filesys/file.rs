//! File operations

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::errors::WatchdogError;

/// Modification time and size of a file, compared to notice other writers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Current stamp, `None` when the file does not exist
    pub async fn stamp(&self) -> Option<FileStamp> {
        let metadata = fs::metadata(&self.path).await.ok()?;
        Some(FileStamp {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }

    /// Read the first line, without its line terminator
    pub async fn read_first_line(&self) -> Result<String, WatchdogError> {
        let file = fs::File::open(&self.path).await?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, WatchdogError> {
        let contents = fs::read_to_string(&self.path).await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }

    /// Write JSON to file atomically
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), WatchdogError> {
        let contents = serde_json::to_vec_pretty(value)?;
        self.write_atomic(&contents).await
    }

    /// Create the file empty, truncating it if it already exists
    pub async fn touch(&self) -> Result<(), WatchdogError> {
        let file = fs::File::create(&self.path).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Create a symlink at this path pointing to `target`.
    ///
    /// Returns `false` when something already occupies the path.
    pub async fn symlink_to(&self, target: &Path) -> Result<bool, WatchdogError> {
        match symlink(target, &self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic write using a temporary file
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), WatchdogError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    fs::symlink(target, link).await
}

#[cfg(not(unix))]
async fn symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        ErrorKind::Unsupported,
        "symlinks are only supported on unix",
    ))
}
