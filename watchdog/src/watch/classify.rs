//! Path classification
//!
//! Maps a raw filesystem event onto the logical unit it concerns under the
//! data root:
//!
//! ```text
//! <root>/<username>/<deployment>/            directory signal
//! <root>/<username>/<deployment>/<file>      deployment file
//! <root>/<intake user>/<intake dir>/<file>   NAVOCEANO intake file
//! ```

use std::path::{Component, Path, PathBuf};

use crate::errors::WatchdogError;
use crate::watch::events::{EntryKind, FsEvent};

/// What happened to a deployment directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirAction {
    Created,
    Deleted,
}

/// Result of classifying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// A `<user>/<deployment>` directory was created or deleted
    DirSignal {
        action: DirAction,
        user: String,
        deployment: String,
    },
    /// A file landed in the NAVOCEANO intake directory
    NavoceanoFile { raw_filename: String, path: PathBuf },
    /// A file inside a deployment directory was created, modified or moved in
    DeploymentFile {
        deployment_dir: String,
        filename: String,
        path: PathBuf,
    },
    Ignored(&'static str),
}

/// The NAVOCEANO intake directory, two levels below the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeDir {
    /// Top-level directory, doubling as the pseudo-username of normalized deployments
    pub user: String,
    /// Intake directory name inside `user`
    pub name: String,
}

impl IntakeDir {
    /// Parse `user/name`
    pub fn parse(relative: &str) -> Result<Self, WatchdogError> {
        match relative.trim_matches('/').split('/').collect::<Vec<_>>().as_slice() {
            [user, name] if !user.is_empty() && !name.is_empty() => Ok(Self {
                user: user.to_string(),
                name: name.to_string(),
            }),
            _ => Err(WatchdogError::ConfigError(format!(
                "intake directory must be '<user>/<dir>', got '{}'",
                relative
            ))),
        }
    }

    fn is(&self, user: &str, name: &str) -> bool {
        self.user == user && self.name == name
    }
}

/// Classifies events relative to a fixed data root
#[derive(Debug, Clone)]
pub struct PathClassifier {
    root: PathBuf,
    intake: IntakeDir,
}

impl PathClassifier {
    pub fn new(root: impl Into<PathBuf>, intake: IntakeDir) -> Self {
        Self {
            root: root.into(),
            intake,
        }
    }

    pub fn classify(&self, event: &FsEvent) -> Classified {
        // moves are judged by their destination
        let path = event.path();

        let parts = match self.relative_parts(path) {
            Ok(parts) => parts,
            Err(reason) => return Classified::Ignored(reason),
        };

        match (event, event.entry()) {
            (FsEvent::Created { .. }, EntryKind::Dir) => self.classify_dir(DirAction::Created, parts),
            (FsEvent::Deleted { .. }, EntryKind::Dir) => self.classify_dir(DirAction::Deleted, parts),
            (FsEvent::Created { .. }, EntryKind::File)
            | (FsEvent::Modified { .. }, EntryKind::File)
            | (FsEvent::Moved { .. }, EntryKind::File) => self.classify_file(path, parts),
            (FsEvent::Deleted { .. }, EntryKind::File) => Classified::Ignored("file deletion"),
            _ => Classified::Ignored("directory change"),
        }
    }

    fn relative_parts(&self, path: &Path) -> Result<Vec<String>, &'static str> {
        let relative = path.strip_prefix(&self.root).map_err(|_| "outside root")?;

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or("non UTF-8 path")?;
                    if part.starts_with('.') {
                        return Err("hidden path");
                    }
                    parts.push(part.to_string());
                }
                Component::CurDir => {}
                _ => return Err("unexpected path component"),
            }
        }

        if parts.is_empty() {
            return Err("root itself");
        }
        Ok(parts)
    }

    fn classify_dir(&self, action: DirAction, mut parts: Vec<String>) -> Classified {
        if parts.len() != 2 {
            return Classified::Ignored("not a deployment directory");
        }
        let deployment = parts.pop().unwrap_or_default();
        let user = parts.pop().unwrap_or_default();
        if self.intake.is(&user, &deployment) {
            return Classified::Ignored("intake directory");
        }
        Classified::DirSignal {
            action,
            user,
            deployment,
        }
    }

    fn classify_file(&self, path: &Path, parts: Vec<String>) -> Classified {
        if parts.len() < 3 {
            return Classified::Ignored("file outside a deployment directory");
        }
        let filename = parts[parts.len() - 1].clone();

        if self.intake.is(&parts[0], &parts[1]) {
            return Classified::NavoceanoFile {
                raw_filename: filename,
                path: path.to_path_buf(),
            };
        }

        Classified::DeploymentFile {
            deployment_dir: format!("{}/{}", parts[0], parts[1]),
            filename,
            path: path.to_path_buf(),
        }
    }
}
