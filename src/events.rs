use crate::state::RegistrationState;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Lifecycle events emitted by the producer
#[derive(Debug, Clone, PartialEq)]
pub enum ProducerEvent {
    /// The service instance was advertised
    ServiceOffered {
        service: u16,
        instance: u16,
        timestamp: DateTime<Utc>,
    },
    /// The advertisement was retracted
    ServiceWithdrawn {
        service: u16,
        instance: u16,
        timestamp: DateTime<Utc>,
    },
    /// The transport reported a registration change
    RegistrationChanged {
        state: RegistrationState,
        timestamp: DateTime<Utc>,
    },
    /// Shutdown has begun
    ShutdownRequested {
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl ProducerEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ProducerEvent::ServiceOffered { timestamp, .. }
            | ProducerEvent::ServiceWithdrawn { timestamp, .. }
            | ProducerEvent::RegistrationChanged { timestamp, .. }
            | ProducerEvent::ShutdownRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ProducerEvent::ServiceOffered {
                service, instance, ..
            } => format!("Service {:#06x}.{:#06x} offered", service, instance),
            ProducerEvent::ServiceWithdrawn {
                service, instance, ..
            } => format!("Service {:#06x}.{:#06x} withdrawn", service, instance),
            ProducerEvent::RegistrationChanged { state, .. } => {
                format!("Registration {}", state)
            }
            ProducerEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ProducerEvent::ServiceOffered { .. } => "service_offered",
            ProducerEvent::ServiceWithdrawn { .. } => "service_withdrawn",
            ProducerEvent::RegistrationChanged { .. } => "registration_changed",
            ProducerEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Broadcast bus for producer lifecycle events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProducerEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProducerEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns how many subscribers received it.
    /// Never blocks, so it is safe to call from transport callbacks.
    pub fn publish(&self, event: ProducerEvent) -> usize {
        match &event {
            ProducerEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        // no subscribers is not an error
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        let delivered = bus.publish(ProducerEvent::ServiceOffered {
            service: 0x1234,
            instance: 0x5678,
            timestamp: Utc::now(),
        });
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "service_offered");
        assert_eq!(event.description(), "Service 0x1234.0x5678 offered");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);

        let delivered = bus.publish(ProducerEvent::RegistrationChanged {
            state: RegistrationState::Registered,
            timestamp: Utc::now(),
        });
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_descriptions() {
        let now = Utc::now();
        let event = ProducerEvent::RegistrationChanged {
            state: RegistrationState::Deregistered,
            timestamp: now,
        };
        assert_eq!(event.description(), "Registration deregistered");
        assert_eq!(event.timestamp(), now);

        let event = ProducerEvent::ShutdownRequested {
            reason: "SIGTERM".to_string(),
            timestamp: now,
        };
        assert_eq!(event.event_type(), "shutdown_requested");
        assert_eq!(event.description(), "Shutdown requested: SIGTERM");
    }
}
