//! Directory operations

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::WatchdogError;
use crate::filesys::file::File;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents). An existing directory is success.
    pub async fn create(&self) -> Result<(), WatchdogError> {
        match fs::create_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            // lost a race with another creator
            Err(e) if e.kind() == ErrorKind::AlreadyExists && self.exists().await => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of the subdirectories, sorted. Symlinked directories count.
    pub async fn list_dir_names(&self) -> Result<Vec<String>, WatchdogError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            // follow symlinks, entries may vanish between listing and stat
            let is_dir = fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }
}
