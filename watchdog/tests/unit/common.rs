//! Shared fixtures

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glider_watchdog::flags::FlagSink;
use glider_watchdog::models::user::User;
use glider_watchdog::storage::memory::MemoryRepository;
use glider_watchdog::storage::repository::Repository;
use glider_watchdog::storage::settings::DEFAULT_NAVOCEANO_INTAKE;
use glider_watchdog::watch::classify::IntakeDir;
use glider_watchdog::watch::handler::DeploymentHandler;
use tempfile::TempDir;

/// A data root, a flag directory and a handler wired to an in-memory repository
pub struct Fixture {
    _data: TempDir,
    _flags: TempDir,
    pub root: PathBuf,
    pub flags_dir: PathBuf,
    pub repo: Arc<MemoryRepository>,
    pub handler: DeploymentHandler,
}

impl Fixture {
    pub fn new() -> Self {
        let data = tempfile::tempdir().unwrap();
        let flags = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(data.path()).unwrap();
        let flags_dir = std::fs::canonicalize(flags.path()).unwrap();

        let repo = Arc::new(MemoryRepository::with_data_root(&root));
        let dyn_repo: Arc<dyn Repository> = repo.clone();
        let handler = DeploymentHandler::new(
            root.clone(),
            IntakeDir::parse(DEFAULT_NAVOCEANO_INTAKE).unwrap(),
            dyn_repo,
            FlagSink::new(&flags_dir),
        );

        Self {
            _data: data,
            _flags: flags,
            root,
            flags_dir,
            repo,
            handler,
        }
    }

    pub async fn add_user(&self, username: &str) -> User {
        let mut user = User::new(username);
        self.repo.save_user(&mut user).await.unwrap();
        user
    }

    /// Create `<root>/<relative>` as a directory
    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.root.join(relative);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    /// Write `<root>/<relative>` with `contents`
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root.join(relative);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn flag(&self, dataset_id: &str) -> PathBuf {
        self.flags_dir.join(dataset_id)
    }

    pub fn flag_count(&self) -> usize {
        std::fs::read_dir(&self.flags_dir).unwrap().count()
    }
}

pub fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}
