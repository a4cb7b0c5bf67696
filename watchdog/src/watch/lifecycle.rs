//! Deployment record creation and removal driven by directory events

use tracing::info;

use crate::errors::WatchdogError;
use crate::models::deployment::{Deployment, DeploymentQuery};
use crate::storage::repository::Repository;

/// Result of [`ensure_deployment`]
#[derive(Debug, Clone, PartialEq)]
pub enum Ensured {
    /// A deployment with this name was already recorded
    Existing(Deployment),
    /// A new deployment was created and saved
    Created(Deployment),
    /// No user owns the directory; nothing was created
    MissingUser { username: String },
}

/// Make sure a deployment record exists for `<username>/<deployment_name>`.
///
/// Idempotent: repeated calls for the same name return the stored record.
/// User records are never created here.
pub async fn ensure_deployment(
    repo: &dyn Repository,
    username: &str,
    deployment_name: &str,
) -> Result<Ensured, WatchdogError> {
    if let Some(existing) = repo
        .find_deployment(&DeploymentQuery::by_name(deployment_name))
        .await?
    {
        return Ok(Ensured::Existing(existing));
    }

    let Some(user) = repo.find_user(username).await? else {
        info!(
            username,
            deployment = deployment_name,
            "No user for new deployment directory, create the user and touch the directory again"
        );
        return Ok(Ensured::MissingUser {
            username: username.to_string(),
        });
    };

    let user_id = user.id.as_deref().ok_or_else(|| {
        WatchdogError::StorageError(format!("user '{}' has no id", user.username))
    })?;

    let mut deployment = Deployment::new(user_id, username, deployment_name);
    repo.save_deployment(&mut deployment).await?;

    info!(
        username,
        deployment = deployment_name,
        delayed_mode = deployment.delayed_mode,
        "Created previously nonexistent deployment"
    );
    Ok(Ensured::Created(deployment))
}

/// Delete the deployment recorded for `deployment_dir`, if any
pub async fn remove_deployment(
    repo: &dyn Repository,
    deployment_dir: &str,
) -> Result<Option<Deployment>, WatchdogError> {
    let Some(deployment) = repo
        .find_deployment(&DeploymentQuery::by_dir(deployment_dir))
        .await?
    else {
        return Ok(None);
    };

    repo.delete_deployment(&deployment).await?;
    info!(deployment_dir, "Removed deployment");
    Ok(Some(deployment))
}
