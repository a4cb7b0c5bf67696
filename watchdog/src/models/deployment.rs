//! Deployment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Suffix marking a deployment whose data arrives after the fact
pub const DELAYED_SUFFIX: &str = "-delayed";

/// One monitored glider deployment, backed by `<username>/<name>` under the data root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    /// Repository-assigned ID, `None` until first saved
    #[serde(default)]
    pub id: Option<String>,

    /// Unique deployment name, `<glider_name>[-suffix]`
    pub name: String,

    /// Owning user ID
    pub user_id: String,

    /// Path relative to the data root, `username/deployment_name`
    pub deployment_dir: String,

    /// Prefix of `name` before the first `-`
    pub glider_name: String,

    /// WMO identifier supplied through `wmoid.txt`
    #[serde(default)]
    pub wmo_id: Option<String>,

    /// True iff `name` ends with `-delayed`
    #[serde(default)]
    pub delayed_mode: bool,

    /// Set by external collaborators, never by the watcher
    #[serde(default)]
    pub completed: bool,

    /// Recomputed by the repository on save
    #[serde(default)]
    pub checksum: Option<String>,

    /// Set by the repository on save
    pub updated: DateTime<Utc>,

    /// Most recent data file, recomputed by the repository on save
    #[serde(default)]
    pub latest_file: Option<String>,
}

impl Deployment {
    /// Build a new, unsaved deployment for `username/deployment_name`
    pub fn new(user_id: &str, username: &str, deployment_name: &str) -> Self {
        Self {
            id: None,
            name: deployment_name.to_string(),
            user_id: user_id.to_string(),
            deployment_dir: format!("{}/{}", username, deployment_name),
            glider_name: glider_name(deployment_name).to_string(),
            wmo_id: None,
            delayed_mode: is_delayed(deployment_name),
            completed: false,
            checksum: None,
            updated: Utc::now(),
            latest_file: None,
        }
    }

    /// Trailing segment of the deployment directory, used as the dataset ID
    pub fn dataset_id(&self) -> &str {
        self.deployment_dir
            .rsplit('/')
            .next()
            .unwrap_or(&self.deployment_dir)
    }
}

/// Glider name for a deployment name: everything before the first `-`
pub fn glider_name(deployment_name: &str) -> &str {
    deployment_name
        .split_once('-')
        .map(|(glider, _)| glider)
        .unwrap_or(deployment_name)
}

/// Whether a deployment name denotes delayed-mode data
pub fn is_delayed(deployment_name: &str) -> bool {
    deployment_name.ends_with(DELAYED_SUFFIX)
}

/// Lookup key for deployments, the typed form of a `find_one` predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentQuery {
    ByName(String),
    ByDir(String),
}

impl DeploymentQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        DeploymentQuery::ByName(name.into())
    }

    pub fn by_dir(deployment_dir: impl Into<String>) -> Self {
        DeploymentQuery::ByDir(deployment_dir.into())
    }

    /// Check whether a deployment satisfies this query
    pub fn matches(&self, deployment: &Deployment) -> bool {
        match self {
            DeploymentQuery::ByName(name) => &deployment.name == name,
            DeploymentQuery::ByDir(dir) => &deployment.deployment_dir == dir,
        }
    }
}
