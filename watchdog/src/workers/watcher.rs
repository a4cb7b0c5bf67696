//! Event loop worker
//!
//! Consumes filesystem events one at a time. An event is always handled to
//! completion before the shutdown signal is looked at again.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::watch::events::FsEvent;
use crate::watch::handler::{DeploymentHandler, Outcome};

/// Counters kept by the event loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub events: u64,
    pub applied: u64,
    pub ignored: u64,
    pub dropped: u64,
}

impl LoopStats {
    fn record(&mut self, outcome: &Outcome) {
        self.events += 1;
        match outcome {
            Outcome::Ignored(_) => self.ignored += 1,
            Outcome::Dropped(_) => self.dropped += 1,
            _ => self.applied += 1,
        }
    }
}

/// Run the event loop until shutdown or until the event source closes
pub async fn run(
    handler: &DeploymentHandler,
    events: &mut mpsc::UnboundedReceiver<FsEvent>,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> LoopStats {
    info!("Watcher worker starting...");
    let mut stats = LoopStats::default();

    loop {
        let event = tokio::select! {
            biased;
            _ = &mut shutdown_signal => {
                info!("Watcher worker shutting down...");
                break;
            }
            event = events.recv() => match event {
                Some(event) => event,
                None => {
                    info!("Event source closed, watcher worker stopping...");
                    break;
                }
            },
        };

        let outcome = handler.handle(&event).await;
        debug!(?outcome, "Handled event");
        stats.record(&outcome);
    }

    info!(
        events = stats.events,
        applied = stats.applied,
        ignored = stats.ignored,
        dropped = stats.dropped,
        "Watcher worker stopped"
    );
    stats
}
