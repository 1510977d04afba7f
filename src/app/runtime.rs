use super::{ShutdownReason, VehicleDataProducer};
use crate::error::Result;
use tokio::signal;
use tracing::info;

impl VehicleDataProducer {
    /// Run until a termination signal arrives or the cancellation token is
    /// cancelled, then shut down. Returns the process exit code.
    pub async fn run(&self) -> Result<i32> {
        info!("Vehicle data producer is running");

        let token = self.cancellation_token();
        let reason = tokio::select! {
            reason = wait_for_shutdown_signal() => reason?,
            _ = token.cancelled() => ShutdownReason::UserRequest,
        };

        info!("Shutdown initiated: {}", reason);
        let exit_code = self.shutdown(reason).await?;

        info!("Vehicle data producer shutdown complete");
        Ok(exit_code)
    }
}

/// Completes on SIGINT (Ctrl+C) or, on Unix, SIGTERM
async fn wait_for_shutdown_signal() -> Result<ShutdownReason> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received SIGINT signal (Ctrl+C)");
                Ok(ShutdownReason::Signal("SIGINT".to_string()))
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
                Ok(ShutdownReason::Signal("SIGTERM".to_string()))
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received SIGINT signal (Ctrl+C)");
        Ok(ShutdownReason::Signal("SIGINT".to_string()))
    }
}
