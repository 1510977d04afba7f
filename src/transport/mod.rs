//! Boundary to the publish/subscribe transport and service registry.
//!
//! The producer treats every call on [`Transport`] as fire-and-forget on the
//! steady-state path; only [`Transport::initialize`] failures are fatal.

mod loopback;

pub use loopback::{LoopbackTransport, Notification, TransportCall};

use crate::error::TransportError;
use crate::payload::Payload;
use crate::state::RegistrationState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Callback invoked by the transport when the registration state changes.
/// Runs on the transport's context and must not block.
pub type StateHandler = Arc<dyn Fn(RegistrationState) + Send + Sync>;

/// Delivery mode selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum TransportMode {
    #[serde(rename = "tcp")]
    Reliable,
    #[default]
    #[serde(rename = "udp")]
    Unreliable,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Reliable => write!(f, "tcp"),
            TransportMode::Unreliable => write!(f, "udp"),
        }
    }
}

/// How subscribers receive an advertised event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Plain event, nothing is cached for late subscribers
    Event,
    /// Field, the last value is delivered to new subscribers
    Field,
}

/// Identifiers of the one service endpoint this producer offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceIds {
    pub service: u16,
    pub instance: u16,
    pub event: u16,
    pub eventgroup: u16,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Application name used in status lines
    fn name(&self) -> &str;

    async fn initialize(&self) -> Result<(), TransportError>;

    async fn start(&self) -> Result<(), TransportError>;

    async fn shutdown(&self) -> Result<(), TransportError>;

    fn register_state_handler(&self, handler: StateHandler);

    /// Detach every callback registered with this transport
    fn clear_all_handlers(&self);

    /// Register the event and the eventgroups it belongs to
    async fn offer_event(
        &self,
        ids: ServiceIds,
        groups: &[u16],
        kind: EventKind,
        mode: TransportMode,
    ) -> Result<(), TransportError>;

    async fn offer_service(&self, service: u16, instance: u16) -> Result<(), TransportError>;

    async fn stop_offer_service(&self, service: u16, instance: u16)
        -> Result<(), TransportError>;

    async fn notify(
        &self,
        service: u16,
        instance: u16,
        event: u16,
        payload: &Payload,
    ) -> Result<(), TransportError>;
}
