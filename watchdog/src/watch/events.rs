//! Filesystem events and the OS watch that produces them

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::WatchdogError;

/// Whether an event concerns a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

impl EntryKind {
    fn of(path: &Path) -> Self {
        if path.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        }
    }
}

/// A filesystem mutation, decoupled from the `notify` event types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    Created { path: PathBuf, entry: EntryKind },
    Modified { path: PathBuf, entry: EntryKind },
    /// `from` is unknown when the entry was moved in from outside the watch
    Moved {
        from: Option<PathBuf>,
        to: PathBuf,
        entry: EntryKind,
    },
    Deleted { path: PathBuf, entry: EntryKind },
}

impl FsEvent {
    pub fn file_created(path: impl Into<PathBuf>) -> Self {
        FsEvent::Created {
            path: path.into(),
            entry: EntryKind::File,
        }
    }

    pub fn file_modified(path: impl Into<PathBuf>) -> Self {
        FsEvent::Modified {
            path: path.into(),
            entry: EntryKind::File,
        }
    }

    pub fn file_moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        FsEvent::Moved {
            from: Some(from.into()),
            to: to.into(),
            entry: EntryKind::File,
        }
    }

    pub fn dir_created(path: impl Into<PathBuf>) -> Self {
        FsEvent::Created {
            path: path.into(),
            entry: EntryKind::Dir,
        }
    }

    pub fn dir_deleted(path: impl Into<PathBuf>) -> Self {
        FsEvent::Deleted {
            path: path.into(),
            entry: EntryKind::Dir,
        }
    }

    /// The path the event is about; the destination for moves
    pub fn path(&self) -> &Path {
        match self {
            FsEvent::Created { path, .. } => path,
            FsEvent::Modified { path, .. } => path,
            FsEvent::Moved { to, .. } => to,
            FsEvent::Deleted { path, .. } => path,
        }
    }

    pub fn entry(&self) -> EntryKind {
        match self {
            FsEvent::Created { entry, .. }
            | FsEvent::Modified { entry, .. }
            | FsEvent::Moved { entry, .. }
            | FsEvent::Deleted { entry, .. } => *entry,
        }
    }
}

/// Convert a raw `notify` event into zero or more [`FsEvent`]s.
///
/// Renames are taken from the `To` half only: inotify reports `From`, `To`
/// and `Both` for a move inside the watch, but only `To` for a move in from
/// outside, so `To` alone sees every destination exactly once.
pub fn map_notify_event(event: &notify::Event) -> Vec<FsEvent> {
    let paths = &event.paths;

    match &event.kind {
        EventKind::Create(CreateKind::Folder) => {
            paths.iter().cloned().map(FsEvent::dir_created).collect()
        }
        EventKind::Create(CreateKind::File) => {
            paths.iter().cloned().map(FsEvent::file_created).collect()
        }
        EventKind::Create(_) => paths
            .iter()
            .map(|p| FsEvent::Created {
                path: p.clone(),
                entry: EntryKind::of(p),
            })
            .collect(),

        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => paths
            .iter()
            .filter(|p| !p.is_dir())
            .cloned()
            .map(FsEvent::file_modified)
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => paths
            .iter()
            .map(|p| FsEvent::Moved {
                from: None,
                to: p.clone(),
                entry: EntryKind::of(p),
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => match paths.as_slice() {
            [] => Vec::new(),
            [to] => vec![FsEvent::Moved {
                from: None,
                to: to.clone(),
                entry: EntryKind::of(to),
            }],
            [.., from, to] => vec![FsEvent::Moved {
                from: Some(from.clone()),
                to: to.clone(),
                entry: EntryKind::of(to),
            }],
        },

        EventKind::Remove(RemoveKind::Folder) | EventKind::Remove(RemoveKind::Any) => {
            paths.iter().cloned().map(FsEvent::dir_deleted).collect()
        }

        _ => Vec::new(),
    }
}

/// Recursive OS watch over the data root.
///
/// Events are forwarded on an unbounded channel in the order the OS
/// reports them. Dropping the source tears the watch down and closes the
/// channel.
pub struct EventSource {
    watcher: RecommendedWatcher,
    root: PathBuf,
}

impl EventSource {
    /// Start watching `root` recursively
    pub fn watch(root: &Path) -> Result<(Self, mpsc::UnboundedReceiver<FsEvent>), WatchdogError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for fs_event in map_notify_event(&event) {
                        debug!(event = ?fs_event, "Filesystem event");
                        if event_tx.send(fs_event).is_err() {
                            warn!("Event loop is gone, dropping filesystem event");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "Filesystem watch error");
                }
            },
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "Watching deployment directories");

        Ok((
            Self {
                watcher,
                root: root.to_path_buf(),
            },
            event_rx,
        ))
    }

    /// Stop watching. Pending events already queued are still delivered.
    pub fn close(mut self) {
        if let Err(e) = self.watcher.unwatch(&self.root) {
            warn!(error = %e, "Failed to remove watch");
        }
        info!(root = %self.root.display(), "Stopped watching");
    }
}
