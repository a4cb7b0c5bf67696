//! Operator commands run instead of the watcher

use tracing::info;

use crate::app::options::AppOptions;
use crate::errors::WatchdogError;
use crate::models::user::User;
use crate::storage::json::JsonRepository;
use crate::storage::repository::Repository;

/// Register `username` in the deployment store.
///
/// Returns the stored user; an existing user is returned unchanged.
pub async fn add_user(options: &AppOptions, username: &str) -> Result<User, WatchdogError> {
    let repo = JsonRepository::open(options.store.clone(), &options.data_root).await?;
    ensure_user(&repo, username).await
}

/// Find or create the user named `username`
pub async fn ensure_user(repo: &dyn Repository, username: &str) -> Result<User, WatchdogError> {
    let username = username.trim();
    if username.is_empty() || username.contains('/') || username.starts_with('.') {
        return Err(WatchdogError::ConfigError(format!(
            "invalid username '{}'",
            username
        )));
    }

    if let Some(user) = repo.find_user(username).await? {
        info!(username, "User already registered");
        return Ok(user);
    }

    let mut user = User::new(username);
    repo.save_user(&mut user).await?;
    info!(username, id = ?user.id, "Registered user");
    Ok(user)
}
