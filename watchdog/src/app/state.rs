//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::errors::WatchdogError;
use crate::flags::FlagSink;
use crate::storage::json::JsonRepository;
use crate::storage::repository::Repository;
use crate::watch::handler::DeploymentHandler;

/// Main application state
pub struct AppState {
    /// Deployment and user records
    pub repository: Arc<dyn Repository>,

    /// Event dispatcher
    pub handler: Arc<DeploymentHandler>,
}

impl AppState {
    /// Initialize application state with the JSON store
    pub async fn init(options: &AppOptions) -> Result<Self, WatchdogError> {
        info!("Initializing application state...");

        let repository: Arc<dyn Repository> =
            Arc::new(JsonRepository::open(options.store.clone(), &options.data_root).await?);

        Ok(Self::with_repository(options, repository))
    }

    /// Build the state around an already opened repository
    pub fn with_repository(options: &AppOptions, repository: Arc<dyn Repository>) -> Self {
        let handler = Arc::new(DeploymentHandler::new(
            options.data_root.clone(),
            options.intake.clone(),
            repository.clone(),
            FlagSink::new(&options.flags_dir),
        ));

        Self {
            repository,
            handler,
        }
    }
}
