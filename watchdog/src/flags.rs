//! ERDDAP flag files
//!
//! ERDDAP's flag directory holds one file per dataset ID; creating or
//! touching it asks the server to reload that dataset. Content is ignored.

use std::path::PathBuf;

use tracing::info;

use crate::errors::WatchdogError;
use crate::filesys::dir::Dir;

/// Writes reload flags into the ERDDAP flag directory
#[derive(Debug, Clone)]
pub struct FlagSink {
    dir: Dir,
}

impl FlagSink {
    pub fn new(flags_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Dir::new(flags_dir),
        }
    }

    /// Create or truncate the flag file for `dataset_id`
    pub async fn touch(&self, dataset_id: &str) -> Result<PathBuf, WatchdogError> {
        if dataset_id.is_empty() || dataset_id.contains('/') || dataset_id.starts_with('.') {
            return Err(WatchdogError::ParseError(format!(
                "invalid dataset id '{}'",
                dataset_id
            )));
        }

        let flag = self.dir.file(dataset_id);
        info!(flag = %flag.path().display(), "Touching ERDDAP flag file");
        flag.touch().await?;
        Ok(flag.path().to_path_buf())
    }
}
