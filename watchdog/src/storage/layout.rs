//! Store directory layout

use std::path::PathBuf;

use crate::errors::WatchdogError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Name of the store directory created under the data root by default
pub const DEFAULT_STORE_DIR_NAME: &str = ".watchdog";

/// On-disk layout of the JSON record store
#[derive(Debug, Clone)]
pub struct StoreLayout {
    /// Base directory for all store files
    pub base_dir: PathBuf,
}

impl StoreLayout {
    /// Create a new store layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Default layout: a hidden directory directly under the data root.
    ///
    /// Hidden, so the watcher ignores its own writes.
    pub fn under_data_root(data_root: impl Into<PathBuf>) -> Self {
        Self::new(data_root.into().join(DEFAULT_STORE_DIR_NAME))
    }

    /// Get the store directory
    pub fn store_dir(&self) -> Dir {
        Dir::new(self.base_dir.clone())
    }

    /// Get the deployments file
    pub fn deployments_file(&self) -> File {
        File::new(self.base_dir.join("deployments.json"))
    }

    /// Get the users file
    pub fn users_file(&self) -> File {
        File::new(self.base_dir.join("users.json"))
    }

    /// Setup the store layout (create directories)
    pub async fn setup(&self) -> Result<(), WatchdogError> {
        self.store_dir().create().await
    }
}
