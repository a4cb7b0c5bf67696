//! JSON-file backed repository

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::WatchdogError;
use crate::filesys::file::FileStamp;
use crate::models::deployment::{Deployment, DeploymentQuery};
use crate::models::user::User;
use crate::storage::layout::StoreLayout;
use crate::storage::memory::{keep_external_fields, refresh_stored_fields, Records};
use crate::storage::repository::Repository;

/// Records as last read from or written to disk
#[derive(Debug, Default)]
struct Cache {
    records: Records,
    deployments_stamp: Option<FileStamp>,
    users_stamp: Option<FileStamp>,
}

/// Repository persisting deployments and users as JSON files.
///
/// Other processes (the `--add-user` command, the catalog side setting
/// `completed`) write the same files. Every operation first reloads a file
/// whose stamp changed, and every mutation is applied to a copy that only
/// replaces the cache once the file was rewritten.
#[derive(Debug)]
pub struct JsonRepository {
    layout: StoreLayout,
    data_root: PathBuf,
    cache: RwLock<Cache>,
}

impl JsonRepository {
    /// Open the store, creating it when absent.
    ///
    /// `data_root` is where deployment directories live; saves fingerprint
    /// the data files found there.
    pub async fn open(
        layout: StoreLayout,
        data_root: impl Into<PathBuf>,
    ) -> Result<Self, WatchdogError> {
        layout.setup().await?;

        let repo = Self {
            layout,
            data_root: data_root.into(),
            cache: RwLock::new(Cache::default()),
        };

        {
            let mut cache = repo.cache.write().await;
            repo.sync(&mut cache).await?;
            info!(
                store = %repo.layout.base_dir.display(),
                deployments = cache.records.deployments.len(),
                users = cache.records.users.len(),
                "Opened deployment store"
            );
        }

        Ok(repo)
    }

    /// Reload whichever store file changed on disk since it was last seen
    async fn sync(&self, cache: &mut Cache) -> Result<(), WatchdogError> {
        let deployments_file = self.layout.deployments_file();
        let stamp = deployments_file.stamp().await;
        if stamp != cache.deployments_stamp {
            let deployments: Vec<Deployment> = match stamp {
                Some(_) => deployments_file.read_json().await?,
                None => Vec::new(),
            };
            cache.records.load_deployments(deployments)?;
            cache.deployments_stamp = stamp;
            debug!(count = cache.records.deployments.len(), "Reloaded deployments");
        }

        let users_file = self.layout.users_file();
        let stamp = users_file.stamp().await;
        if stamp != cache.users_stamp {
            let users: Vec<User> = match stamp {
                Some(_) => users_file.read_json().await?,
                None => Vec::new(),
            };
            cache.records.load_users(users)?;
            cache.users_stamp = stamp;
            debug!(count = cache.records.users.len(), "Reloaded users");
        }

        Ok(())
    }

    async fn commit_deployments(
        &self,
        cache: &mut Cache,
        next: Records,
    ) -> Result<(), WatchdogError> {
        let deployments = next.sorted_deployments();
        let file = self.layout.deployments_file();
        file.write_json(&deployments).await?;
        debug!(count = deployments.len(), "Persisted deployments");

        cache.records = next;
        cache.deployments_stamp = file.stamp().await;
        Ok(())
    }

    async fn commit_users(&self, cache: &mut Cache, next: Records) -> Result<(), WatchdogError> {
        let mut users: Vec<&User> = next.users.values().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        let file = self.layout.users_file();
        file.write_json(&users).await?;

        cache.records = next;
        cache.users_stamp = file.stamp().await;
        Ok(())
    }
}

#[async_trait]
impl Repository for JsonRepository {
    async fn find_deployment(
        &self,
        query: &DeploymentQuery,
    ) -> Result<Option<Deployment>, WatchdogError> {
        let mut cache = self.cache.write().await;
        self.sync(&mut cache).await?;
        Ok(cache.records.find_deployment(query))
    }

    async fn save_deployment(&self, deployment: &mut Deployment) -> Result<(), WatchdogError> {
        let mut cache = self.cache.write().await;
        self.sync(&mut cache).await?;

        let stored = deployment
            .id
            .as_ref()
            .and_then(|id| cache.records.deployments.get(id));
        keep_external_fields(stored, deployment);
        refresh_stored_fields(Some(&self.data_root), deployment).await?;

        let mut next = cache.records.clone();
        next.put_deployment(deployment)?;
        self.commit_deployments(&mut cache, next).await
    }

    async fn delete_deployment(&self, deployment: &Deployment) -> Result<(), WatchdogError> {
        let mut cache = self.cache.write().await;
        self.sync(&mut cache).await?;

        let mut next = cache.records.clone();
        if next.remove_deployment(deployment) {
            self.commit_deployments(&mut cache, next).await?;
        }
        Ok(())
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, WatchdogError> {
        let mut cache = self.cache.write().await;
        self.sync(&mut cache).await?;
        Ok(cache.records.sorted_deployments())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, WatchdogError> {
        let mut cache = self.cache.write().await;
        self.sync(&mut cache).await?;
        Ok(cache.records.find_user(username))
    }

    async fn save_user(&self, user: &mut User) -> Result<(), WatchdogError> {
        let mut cache = self.cache.write().await;
        self.sync(&mut cache).await?;

        let mut next = cache.records.clone();
        next.put_user(user)?;
        self.commit_users(&mut cache, next).await
    }
}
