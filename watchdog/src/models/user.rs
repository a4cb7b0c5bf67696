//! User models

use serde::{Deserialize, Serialize};

/// Owner of deployments; `username` matches a top-level directory under the data root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Repository-assigned ID, `None` until first saved
    #[serde(default)]
    pub id: Option<String>,

    /// Unique username
    pub username: String,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
        }
    }
}
