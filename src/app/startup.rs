use super::registration::registration_handler;
use super::VehicleDataProducer;
use crate::error::{ProducerError, Result};
use crate::payload::Payload;
use crate::transport::EventKind;
use tracing::{error, info, warn};

impl VehicleDataProducer {
    /// One-time initialization: bring up the transport, attach the
    /// registration handler, register the event, create the payload buffer
    /// and finally open the startup gate for the lifecycle controller.
    pub async fn init(&self) -> Result<()> {
        let core = &self.core;
        info!(
            "Initializing {} ({} transport)",
            core.transport.name(),
            core.config.transport.mode
        );

        core.transport.initialize().await.map_err(|e| {
            error!("Couldn't initialize application: {}", e);
            ProducerError::initialization(e.to_string())
        })?;

        core.transport
            .register_state_handler(registration_handler(&self.core));

        if let Err(e) = core
            .transport
            .offer_event(
                core.ids,
                &[core.ids.eventgroup],
                EventKind::Field,
                core.config.transport.mode,
            )
            .await
        {
            warn!("Registering event {:#06x} failed: {}", core.ids.event, e);
        }

        *core.payload.lock().await = Some(Payload::new());

        core.ready.set(true);
        info!("Initialization complete");
        Ok(())
    }

    /// Start the transport. Registration callbacks may fire from here on.
    pub async fn start(&self) -> Result<()> {
        self.core.transport.start().await.map_err(|e| {
            error!("Failed to start transport: {}", e);
            ProducerError::from(e)
        })?;

        info!("Vehicle data producer started");
        Ok(())
    }
}
