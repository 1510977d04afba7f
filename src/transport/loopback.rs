use super::{EventKind, ServiceIds, StateHandler, Transport, TransportMode};
use crate::error::TransportError;
use crate::payload::Payload;
use crate::state::RegistrationState;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

/// One notification as seen by subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub service: u16,
    pub instance: u16,
    pub event: u16,
    pub data: Vec<u8>,
}

/// Control-plane calls recorded by [`LoopbackTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Initialize,
    Start,
    Shutdown,
    OfferEvent {
        ids: ServiceIds,
        groups: Vec<u16>,
        mode: TransportMode,
    },
    OfferService {
        service: u16,
        instance: u16,
    },
    StopOfferService {
        service: u16,
        instance: u16,
    },
    ClearHandlers,
}

#[derive(Default)]
struct LoopbackState {
    initialized: bool,
    closed: bool,
    events: HashMap<u16, (ServiceIds, EventKind)>,
    offered: HashSet<(u16, u16)>,
    calls: Vec<TransportCall>,
    delivered: Vec<Notification>,
}

/// In-process transport delivering notifications to local subscribers.
///
/// Keeps a full history of control calls and delivered notifications, and
/// rejects notifications for services that are not currently offered.
pub struct LoopbackTransport {
    name: String,
    init_failure: Option<String>,
    state: Mutex<LoopbackState>,
    handler: Mutex<Option<StateHandler>>,
    rejected: AtomicU64,
    subscribers: broadcast::Sender<Notification>,
}

impl LoopbackTransport {
    pub fn new<S: Into<String>>(name: S) -> Self {
        let (subscribers, _) = broadcast::channel(1024);
        Self {
            name: name.into(),
            init_failure: None,
            state: Mutex::new(LoopbackState::default()),
            handler: Mutex::new(None),
            rejected: AtomicU64::new(0),
            subscribers,
        }
    }

    /// Make `initialize` fail with the given details
    pub fn with_init_failure<S: Into<String>>(mut self, details: S) -> Self {
        self.init_failure = Some(details.into());
        self
    }

    /// Receive every notification delivered from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.subscribers.subscribe()
    }

    /// Deliver a registration change to the registered handler, if any
    pub fn emit_registration(&self, state: RegistrationState) {
        // clone out so the handler never runs under our lock
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => handler(state),
            None => trace!("No state handler registered, dropping {} notice", state),
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().calls.clone()
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.state.lock().delivered.clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.state.lock().delivered.len()
    }

    /// Notifications attempted while the service was not offered
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    pub fn is_offered(&self, service: u16, instance: u16) -> bool {
        self.state.lock().offered.contains(&(service, instance))
    }

    pub fn has_state_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn ensure_open(state: &LoopbackState) -> Result<(), TransportError> {
        if state.closed {
            Err(TransportError::Closed)
        } else if !state.initialized {
            Err(TransportError::NotInitialized)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.calls.push(TransportCall::Initialize);

        if let Some(details) = &self.init_failure {
            return Err(TransportError::InitFailed {
                details: details.clone(),
            });
        }

        state.initialized = true;
        debug!("Loopback transport '{}' initialized", self.name);
        Ok(())
    }

    async fn start(&self) -> Result<(), TransportError> {
        {
            let mut state = self.state.lock();
            state.calls.push(TransportCall::Start);
            Self::ensure_open(&state)?;
        }

        info!("Loopback transport '{}' started", self.name);
        self.emit_registration(RegistrationState::Registered);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        {
            let mut state = self.state.lock();
            state.calls.push(TransportCall::Shutdown);
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.offered.clear();
        }

        self.emit_registration(RegistrationState::Deregistered);
        info!("Loopback transport '{}' shut down", self.name);
        Ok(())
    }

    fn register_state_handler(&self, handler: StateHandler) {
        *self.handler.lock() = Some(handler);
    }

    fn clear_all_handlers(&self) {
        self.state.lock().calls.push(TransportCall::ClearHandlers);
        self.handler.lock().take();
    }

    async fn offer_event(
        &self,
        ids: ServiceIds,
        groups: &[u16],
        kind: EventKind,
        mode: TransportMode,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.calls.push(TransportCall::OfferEvent {
            ids,
            groups: groups.to_vec(),
            mode,
        });
        Self::ensure_open(&state)?;

        state.events.insert(ids.event, (ids, kind));
        debug!(
            "Event {:#06x} registered in groups {:?} ({:?}, {})",
            ids.event, groups, kind, mode
        );
        Ok(())
    }

    async fn offer_service(&self, service: u16, instance: u16) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(TransportCall::OfferService { service, instance });
        Self::ensure_open(&state)?;

        state.offered.insert((service, instance));
        Ok(())
    }

    async fn stop_offer_service(
        &self,
        service: u16,
        instance: u16,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(TransportCall::StopOfferService { service, instance });
        Self::ensure_open(&state)?;

        state.offered.remove(&(service, instance));
        Ok(())
    }

    async fn notify(
        &self,
        service: u16,
        instance: u16,
        event: u16,
        payload: &Payload,
    ) -> Result<(), TransportError> {
        let notification = {
            let mut state = self.state.lock();
            Self::ensure_open(&state)?;

            if !state.events.contains_key(&event) {
                return Err(TransportError::UnknownEvent { event });
            }

            if !state.offered.contains(&(service, instance)) {
                self.rejected.fetch_add(1, Ordering::SeqCst);
                warn!(
                    "Dropping notification for withdrawn service {:#06x}.{:#06x}",
                    service, instance
                );
                return Err(TransportError::NotOffered { service, instance });
            }

            let notification = Notification {
                service,
                instance,
                event,
                data: payload.data().to_vec(),
            };
            state.delivered.push(notification.clone());
            notification
        };

        let _ = self.subscribers.send(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const IDS: ServiceIds = ServiceIds {
        service: 0x1234,
        instance: 0x5678,
        event: 0x8778,
        eventgroup: 0x4465,
    };

    async fn ready_transport() -> LoopbackTransport {
        let transport = LoopbackTransport::new("test");
        transport.initialize().await.unwrap();
        transport
            .offer_event(IDS, &[IDS.eventgroup], EventKind::Field, TransportMode::Unreliable)
            .await
            .unwrap();
        transport
    }

    fn payload(bytes: &[u8]) -> Payload {
        let mut payload = Payload::new();
        payload.set_data(bytes);
        payload
    }

    #[tokio::test]
    async fn test_init_failure() {
        let transport = LoopbackTransport::new("test").with_init_failure("no routing manager");

        let err = transport.initialize().await.unwrap_err();
        assert_eq!(
            err,
            TransportError::InitFailed {
                details: "no routing manager".to_string()
            }
        );
        assert_eq!(
            transport.offer_service(IDS.service, IDS.instance).await,
            Err(TransportError::NotInitialized)
        );
    }

    #[tokio::test]
    async fn test_notify_requires_offer() {
        let transport = ready_transport().await;

        let result = transport
            .notify(IDS.service, IDS.instance, IDS.event, &payload(&[1, 2, 3, 4]))
            .await;
        assert!(matches!(result, Err(TransportError::NotOffered { .. })));
        assert_eq!(transport.rejected_count(), 1);

        transport.offer_service(IDS.service, IDS.instance).await.unwrap();
        transport
            .notify(IDS.service, IDS.instance, IDS.event, &payload(&[1, 2, 3, 4]))
            .await
            .unwrap();

        transport
            .stop_offer_service(IDS.service, IDS.instance)
            .await
            .unwrap();
        assert!(!transport.is_offered(IDS.service, IDS.instance));

        assert_eq!(transport.delivered_count(), 1);
        assert_eq!(transport.delivered()[0].data, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_unknown_event_rejected() {
        let transport = ready_transport().await;
        transport.offer_service(IDS.service, IDS.instance).await.unwrap();

        let result = transport
            .notify(IDS.service, IDS.instance, 0x0001, &payload(&[0]))
            .await;
        assert_eq!(result, Err(TransportError::UnknownEvent { event: 0x0001 }));
    }

    #[tokio::test]
    async fn test_subscribers_receive_notifications() {
        let transport = ready_transport().await;
        let mut rx = transport.subscribe();
        transport.offer_service(IDS.service, IDS.instance).await.unwrap();

        transport
            .notify(IDS.service, IDS.instance, IDS.event, &payload(&[12, 1, 12, 60]))
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event, IDS.event);
        assert_eq!(received.data, vec![12, 1, 12, 60]);
    }

    #[tokio::test]
    async fn test_registration_callbacks() {
        let transport = ready_transport().await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        transport.register_state_handler(Arc::new(move |state: RegistrationState| sink.lock().push(state)));

        transport.start().await.unwrap();
        transport.shutdown().await.unwrap();
        transport.shutdown().await.unwrap();

        assert_eq!(
            *seen.lock(),
            vec![RegistrationState::Registered, RegistrationState::Deregistered]
        );
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_cleared_handlers_are_not_called() {
        let transport = ready_transport().await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        transport.register_state_handler(Arc::new(move |state: RegistrationState| sink.lock().push(state)));
        assert!(transport.has_state_handler());

        transport.clear_all_handlers();
        transport.emit_registration(RegistrationState::Registered);

        assert!(seen.lock().is_empty());
        assert!(transport.calls().contains(&TransportCall::ClearHandlers));
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_calls() {
        let transport = ready_transport().await;
        transport.shutdown().await.unwrap();

        assert_eq!(
            transport.offer_service(IDS.service, IDS.instance).await,
            Err(TransportError::Closed)
        );
    }
}
