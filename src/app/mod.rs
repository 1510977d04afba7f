mod lifecycle;
mod notifier;
mod producer;
mod registration;
mod runtime;
mod shutdown;
mod startup;
mod types;


pub use producer::VehicleDataProducer;
pub use types::{LifecyclePhase, ShutdownReason};
