use super::producer::ProducerCore;
use crate::events::ProducerEvent;
use crate::state::RegistrationState;
use crate::transport::StateHandler;
use chrono::Utc;
use std::sync::{Arc, Weak};
use tracing::info;

impl ProducerCore {
    /// Record a registration change reported by the transport.
    /// Never blocks: one watch write and one broadcast send.
    pub(super) fn on_registration(&self, state: RegistrationState) {
        info!("Application {} is {}.", self.transport.name(), state);

        self.registration.set(state);
        self.event_bus.publish(ProducerEvent::RegistrationChanged {
            state,
            timestamp: Utc::now(),
        });
    }
}

/// Build the callback handed to the transport. It holds the core weakly so
/// the transport does not keep the producer alive.
pub(super) fn registration_handler(core: &Arc<ProducerCore>) -> StateHandler {
    let core: Weak<ProducerCore> = Arc::downgrade(core);
    Arc::new(move |state: RegistrationState| {
        if let Some(core) = core.upgrade() {
            core.on_registration(state);
        }
    })
}
