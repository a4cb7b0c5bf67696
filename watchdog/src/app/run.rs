//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::WatchdogError;
use crate::watch::events::{EventSource, FsEvent};
use crate::watch::handler::DeploymentHandler;
use crate::workers::watcher::{self, LoopStats};

/// Run the glider watchdog until `shutdown_signal` resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), WatchdogError> {
    info!("Initializing glider watchdog...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(&options, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start watchdog: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), WatchdogError> {
    let app_state = AppState::init(options).await?;
    let deployments = app_state.repository.list_deployments().await?;
    info!(deployments = deployments.len(), "Loaded deployment records");

    info!(
        data_root = %options.data_root.display(),
        flags_dir = %options.flags_dir.display(),
        "Watching user directories"
    );
    let (event_source, events) = EventSource::watch(&options.data_root)?;
    shutdown_manager.with_event_source(event_source)?;

    init_watcher_worker(
        app_state.handler.clone(),
        events,
        shutdown_manager,
        shutdown_tx.subscribe(),
    )
}

fn init_watcher_worker(
    handler: Arc<DeploymentHandler>,
    mut events: mpsc::UnboundedReceiver<FsEvent>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), WatchdogError> {
    info!("Initializing watcher worker...");

    let watcher_handle = tokio::spawn(async move {
        watcher::run(
            handler.as_ref(),
            &mut events,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await
    });

    shutdown_manager.with_watcher_worker_handle(watcher_handle)
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    event_source: Option<EventSource>,
    watcher_worker_handle: Option<JoinHandle<LoopStats>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            event_source: None,
            watcher_worker_handle: None,
        }
    }

    pub fn with_event_source(&mut self, source: EventSource) -> Result<(), WatchdogError> {
        if self.event_source.is_some() {
            return Err(WatchdogError::ShutdownError("event_source already set".to_string()));
        }
        self.event_source = Some(source);
        Ok(())
    }

    pub fn with_watcher_worker_handle(
        &mut self,
        handle: JoinHandle<LoopStats>,
    ) -> Result<(), WatchdogError> {
        if self.watcher_worker_handle.is_some() {
            return Err(WatchdogError::ShutdownError("watcher_handle already set".to_string()));
        }
        self.watcher_worker_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), WatchdogError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), WatchdogError> {
        info!("Shutting down glider watchdog...");

        // 1. Watcher worker, lets the in-flight event finish
        if let Some(handle) = self.watcher_worker_handle.take() {
            handle
                .await
                .map_err(|e| WatchdogError::ShutdownError(e.to_string()))?;
        }

        // 2. OS watch
        if let Some(source) = self.event_source.take() {
            source.close();
        }

        info!("Shutdown complete");
        Ok(())
    }
}
