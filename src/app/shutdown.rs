use super::{ShutdownReason, VehicleDataProducer};
use crate::error::Result;
use crate::events::ProducerEvent;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

impl VehicleDataProducer {
    /// Perform graceful shutdown of both loops and the transport.
    ///
    /// Only the first call does any work; later calls return `Ok(0)`
    /// immediately. The returned exit code is 1 if a loop had to be aborted.
    pub async fn shutdown(&self, reason: ShutdownReason) -> Result<i32> {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            debug!("Shutdown already in progress, ignoring {}", reason);
            return Ok(0);
        }

        let core = &self.core;
        info!("Beginning graceful shutdown ({})", reason);
        core.event_bus.publish(ProducerEvent::ShutdownRequested {
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });

        // Wakes the startup gate, the blocked notifier and every sleep slice
        core.cancellation_token.cancel();

        core.transport.clear_all_handlers();
        core.withdraw_if_offered().await;

        let mut exit_code = 0;
        let loops = self.loops.lock().take();
        if let Some(loops) = loops {
            let join_timeout = core.config.shutdown.join_timeout();
            if !join_loop("lifecycle", loops.lifecycle, join_timeout).await {
                exit_code = 1;
            }
            if !join_loop("notifier", loops.notifier, join_timeout).await {
                exit_code = 1;
            }
        }

        if let Err(e) = core.transport.shutdown().await {
            warn!("Transport shutdown failed: {}", e);
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}

/// Wait for a loop task to finish, aborting it after `limit`.
/// Returns whether it exited on its own.
async fn join_loop(name: &str, mut handle: JoinHandle<()>, limit: Duration) -> bool {
    match timeout(limit, &mut handle).await {
        Ok(Ok(())) => {
            debug!("{} loop stopped", name);
            true
        }
        Ok(Err(e)) => {
            error!("{} loop failed: {}", name, e);
            false
        }
        Err(_) => {
            error!("{} loop stop timeout, aborting", name);
            handle.abort();
            false
        }
    }
}
