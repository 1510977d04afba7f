pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod payload;
pub mod state;
pub mod transport;

pub use app::{ShutdownReason, VehicleDataProducer};
pub use config::ProducerConfig;
pub use error::{ProducerError, Result, TransportError};
pub use events::{EventBus, ProducerEvent};
pub use payload::{NotificationPayload, Payload, PAYLOAD_LEN};
pub use state::{NotifierState, RegistrationState, ServiceAvailability, StateCell};
pub use transport::{
    EventKind, LoopbackTransport, Notification, ServiceIds, StateHandler, Transport, TransportMode,
};
