//! Deployment and user repository interface

use async_trait::async_trait;

use crate::errors::WatchdogError;
use crate::models::deployment::{Deployment, DeploymentQuery};
use crate::models::user::User;

/// Record store for deployments and users.
///
/// Implementations must make `save_deployment` an upsert that assigns an ID
/// when missing and stamps `updated`, and must keep `name` and
/// `deployment_dir` unique across deployments.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Find the deployment matching the query
    async fn find_deployment(
        &self,
        query: &DeploymentQuery,
    ) -> Result<Option<Deployment>, WatchdogError>;

    /// Insert or replace a deployment. Updates the caller's copy with the
    /// stored values (id, timestamp, checksum, latest file).
    async fn save_deployment(&self, deployment: &mut Deployment) -> Result<(), WatchdogError>;

    /// Delete a deployment. Deleting an absent deployment is not an error.
    async fn delete_deployment(&self, deployment: &Deployment) -> Result<(), WatchdogError>;

    /// All deployments, ordered by name
    async fn list_deployments(&self) -> Result<Vec<Deployment>, WatchdogError>;

    /// Find a user by username
    async fn find_user(&self, username: &str) -> Result<Option<User>, WatchdogError>;

    /// Insert or replace a user, assigning an ID when missing
    async fn save_user(&self, user: &mut User) -> Result<(), WatchdogError>;
}

/// Reject a save that would give a second deployment the same name or directory
pub(crate) fn check_unique<'a>(
    existing: impl IntoIterator<Item = &'a Deployment>,
    candidate: &Deployment,
) -> Result<(), WatchdogError> {
    for other in existing {
        if other.id == candidate.id {
            continue;
        }
        if other.name == candidate.name {
            return Err(WatchdogError::StorageError(format!(
                "deployment name '{}' already in use",
                candidate.name
            )));
        }
        if other.deployment_dir == candidate.deployment_dir {
            return Err(WatchdogError::StorageError(format!(
                "deployment directory '{}' already in use",
                candidate.deployment_dir
            )));
        }
    }
    Ok(())
}
