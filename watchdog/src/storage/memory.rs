//! In-memory repository

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::errors::WatchdogError;
use crate::models::deployment::{Deployment, DeploymentQuery};
use crate::models::user::User;
use crate::storage::checksum::fingerprint;
use crate::storage::repository::{check_unique, Repository};
use crate::utils::generate_uuid;

/// Deployment and user records keyed by ID
#[derive(Debug, Clone, Default)]
pub(crate) struct Records {
    pub deployments: BTreeMap<String, Deployment>,
    pub users: BTreeMap<String, User>,
}

impl Records {
    /// Replace every deployment, rejecting the set if it breaks uniqueness
    pub fn load_deployments(&mut self, deployments: Vec<Deployment>) -> Result<(), WatchdogError> {
        let mut loaded = Records::default();
        for mut deployment in deployments {
            loaded.put_deployment(&mut deployment)?;
        }
        self.deployments = loaded.deployments;
        Ok(())
    }

    /// Replace every user, rejecting the set if it breaks uniqueness
    pub fn load_users(&mut self, users: Vec<User>) -> Result<(), WatchdogError> {
        let mut loaded = Records::default();
        for mut user in users {
            loaded.put_user(&mut user)?;
        }
        self.users = loaded.users;
        Ok(())
    }

    pub fn find_deployment(&self, query: &DeploymentQuery) -> Option<Deployment> {
        self.deployments
            .values()
            .find(|d| query.matches(d))
            .cloned()
    }

    pub fn find_user(&self, username: &str) -> Option<User> {
        self.users
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    /// Upsert a deployment that already has its stored fields filled in
    pub fn put_deployment(&mut self, deployment: &mut Deployment) -> Result<(), WatchdogError> {
        check_unique(self.deployments.values(), deployment)?;
        let id = deployment.id.get_or_insert_with(generate_uuid).clone();
        self.deployments.insert(id, deployment.clone());
        Ok(())
    }

    pub fn remove_deployment(&mut self, deployment: &Deployment) -> bool {
        match &deployment.id {
            Some(id) => self.deployments.remove(id).is_some(),
            None => false,
        }
    }

    pub fn put_user(&mut self, user: &mut User) -> Result<(), WatchdogError> {
        if self
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(WatchdogError::StorageError(format!(
                "username '{}' already in use",
                user.username
            )));
        }
        let id = user.id.get_or_insert_with(generate_uuid).clone();
        self.users.insert(id, user.clone());
        Ok(())
    }

    pub fn sorted_deployments(&self) -> Vec<Deployment> {
        let mut deployments: Vec<_> = self.deployments.values().cloned().collect();
        deployments.sort_by(|a, b| a.name.cmp(&b.name));
        deployments
    }
}

/// Take the fields this crate never writes from the stored record.
///
/// Applies only when the stored record changed after `candidate` was read,
/// i.e. another writer saved in between.
pub(crate) fn keep_external_fields(stored: Option<&Deployment>, candidate: &mut Deployment) {
    if let Some(stored) = stored {
        if stored.updated != candidate.updated {
            candidate.completed = stored.completed;
        }
    }
}

/// Stamp the fields a save recomputes: `updated`, and the data file
/// fingerprint when the data root is known.
pub(crate) async fn refresh_stored_fields(
    data_root: Option<&PathBuf>,
    deployment: &mut Deployment,
) -> Result<(), WatchdogError> {
    deployment.updated = Utc::now();
    if let Some(root) = data_root {
        let fp = fingerprint(&root.join(&deployment.deployment_dir)).await?;
        deployment.checksum = fp.checksum;
        deployment.latest_file = fp.latest_file;
    }
    Ok(())
}

/// Ephemeral repository, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: RwLock<Records>,
    data_root: Option<PathBuf>,
    saves: AtomicUsize,
}

impl MemoryRepository {
    /// Create an empty repository that does not fingerprint data files
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty repository that fingerprints deployment directories under `data_root`
    pub fn with_data_root(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: Some(data_root.into()),
            ..Self::default()
        }
    }

    /// Number of deployment saves performed so far
    pub fn deployment_saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_deployment(
        &self,
        query: &DeploymentQuery,
    ) -> Result<Option<Deployment>, WatchdogError> {
        Ok(self.records.read().await.find_deployment(query))
    }

    async fn save_deployment(&self, deployment: &mut Deployment) -> Result<(), WatchdogError> {
        let mut records = self.records.write().await;
        let stored = deployment.id.as_ref().and_then(|id| records.deployments.get(id));
        keep_external_fields(stored, deployment);
        refresh_stored_fields(self.data_root.as_ref(), deployment).await?;
        records.put_deployment(deployment)?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_deployment(&self, deployment: &Deployment) -> Result<(), WatchdogError> {
        self.records.write().await.remove_deployment(deployment);
        Ok(())
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, WatchdogError> {
        Ok(self.records.read().await.sorted_deployments())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, WatchdogError> {
        Ok(self.records.read().await.find_user(username))
    }

    async fn save_user(&self, user: &mut User) -> Result<(), WatchdogError> {
        self.records.write().await.put_user(user)
    }
}
