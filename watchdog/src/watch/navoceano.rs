//! NAVOCEANO hurricane glider intake
//!
//! NAVOCEANO drops `<callsign>_<timestamp>[Z].nc` files into a single intake
//! directory instead of per-deployment directories. Each file is linked into
//! a conventional deployment directory next to the intake:
//!
//! ```text
//! <root>/navoceano/hurricanes-unsorted-intake/ng645_20230615T1200Z.nc
//!   -> <root>/navoceano/ng645-20230615T1200/ng645-20230615T1200.nc
//! ```
//!
//! Creating the directory and the symlink raises new filesystem events that
//! come back through the event loop as an ordinary directory signal and
//! deployment file. That round trip is what saves the deployment and flags
//! ERDDAP; nothing here calls the file handler directly, so the watcher's
//! sequential ordering holds.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::errors::WatchdogError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::storage::repository::Repository;
use crate::watch::classify::IntakeDir;
use crate::watch::lifecycle::{ensure_deployment, Ensured};

/// Extension accepted in the intake directory
pub const INTAKE_EXTENSION: &str = ".nc";

/// A parsed intake file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeName {
    pub callsign: String,
    /// Timestamp with any trailing `Z` removed
    pub timestamp: String,
    pub extension: String,
}

impl IntakeName {
    /// Parse `<callsign>_<timestamp>[Z].nc`, splitting on the first underscore.
    ///
    /// Returns `Ok(None)` for files without the `.nc` extension.
    pub fn parse(filename: &str) -> Result<Option<Self>, WatchdogError> {
        let Some(stem) = filename.strip_suffix(INTAKE_EXTENSION) else {
            return Ok(None);
        };

        let (callsign, timestamp_tz) = stem.split_once('_').ok_or_else(|| {
            WatchdogError::ParseError(format!(
                "cannot split NAVOCEANO filename '{}' into callsign and timestamp",
                filename
            ))
        })?;
        let timestamp = timestamp_tz.strip_suffix('Z').unwrap_or(timestamp_tz);

        if callsign.is_empty() || timestamp.is_empty() {
            return Err(WatchdogError::ParseError(format!(
                "NAVOCEANO filename '{}' has an empty callsign or timestamp",
                filename
            )));
        }

        Ok(Some(Self {
            callsign: callsign.to_string(),
            timestamp: timestamp.to_string(),
            extension: INTAKE_EXTENSION.to_string(),
        }))
    }

    /// Deployment name used when no directory exists yet for the callsign
    pub fn deployment_name(&self) -> String {
        format!("{}-{}", self.callsign, self.timestamp)
    }

    /// File name of the symlink placed in the deployment directory
    pub fn link_name(&self) -> String {
        format!("{}-{}{}", self.callsign, self.timestamp, self.extension)
    }

    /// Requires the `-` separator after the callsign, so `ng64` never matches `ng645-...`
    fn matches_dir(&self, dir_name: &str) -> bool {
        dir_name
            .strip_prefix(self.callsign.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

/// What normalizing one intake file did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Not an intake data file
    Skipped,
    /// A new symlink was created
    Linked { deployment_dir: String, link: PathBuf },
    /// The symlink was already in place
    AlreadyLinked { deployment_dir: String, link: PathBuf },
}

/// Links intake files into per-deployment directories
#[derive(Debug, Clone)]
pub struct NavoceanoNormalizer {
    root: PathBuf,
    intake: IntakeDir,
}

impl NavoceanoNormalizer {
    pub fn new(root: impl Into<PathBuf>, intake: IntakeDir) -> Self {
        Self {
            root: root.into(),
            intake,
        }
    }

    /// Directory holding both the intake and the normalized deployments
    fn user_dir(&self) -> Dir {
        Dir::new(self.root.join(&self.intake.user))
    }

    /// Pick the deployment directory for a callsign: the first existing one
    /// (by name) or a new `<callsign>-<timestamp>`.
    pub async fn resolve_deployment_name(&self, name: &IntakeName) -> Result<String, WatchdogError> {
        let existing = self
            .user_dir()
            .list_dir_names()
            .await?
            .into_iter()
            .filter(|dir| *dir != self.intake.name)
            .find(|dir| name.matches_dir(dir));

        Ok(existing.unwrap_or_else(|| name.deployment_name()))
    }

    /// Normalize one intake file found at `path`
    pub async fn normalize(
        &self,
        repo: &dyn Repository,
        raw_filename: &str,
        path: &Path,
    ) -> Result<Normalized, WatchdogError> {
        let Some(name) = IntakeName::parse(raw_filename)? else {
            return Ok(Normalized::Skipped);
        };

        let deployment_name = self.resolve_deployment_name(&name).await?;
        let deployment_dir = format!("{}/{}", self.intake.user, deployment_name);

        // the directory may exist without a record
        if let Ensured::MissingUser { username } =
            ensure_deployment(repo, &self.intake.user, &deployment_name).await?
        {
            warn!(
                username = %username,
                deployment_dir = %deployment_dir,
                "Linking NAVOCEANO file without a deployment record"
            );
        }

        let target_dir = self.user_dir().subdir(&deployment_name);
        target_dir.create().await?;

        let link = File::new(target_dir.path().join(name.link_name()));
        let created = link.symlink_to(path).await?;
        let link = link.path().to_path_buf();

        if created {
            info!(
                source = %path.display(),
                link = %link.display(),
                "Linked NAVOCEANO file into deployment"
            );
            Ok(Normalized::Linked {
                deployment_dir,
                link,
            })
        } else {
            Ok(Normalized::AlreadyLinked {
                deployment_dir,
                link,
            })
        }
    }
}
