use super::lifecycle::LifecycleController;
use super::notifier::Notifier;
use crate::config::ProducerConfig;
use crate::error::Result;
use crate::events::{EventBus, ProducerEvent};
use crate::payload::Payload;
use crate::state::{NotifierState, RegistrationState, ServiceAvailability, StateCell};
use crate::transport::{ServiceIds, Transport};
use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// State shared between the producer handle, its two loops and the
/// transport callbacks
pub(super) struct ProducerCore {
    pub(super) config: ProducerConfig,
    pub(super) ids: ServiceIds,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) event_bus: EventBus,
    pub(super) cancellation_token: CancellationToken,

    /// Startup gate for the lifecycle controller
    pub(super) ready: StateCell<bool>,
    pub(super) availability: StateCell<ServiceAvailability>,
    pub(super) notifier_state: StateCell<NotifierState>,
    pub(super) registration: StateCell<RegistrationState>,

    /// Held by offer/withdraw transitions and by each notifier send, so a
    /// send never straddles a withdrawal
    pub(super) offer_lock: Mutex<()>,
    /// Transport payload buffer, created during `init`
    pub(super) payload: Mutex<Option<Payload>>,
}

impl ProducerCore {
    /// Advertise the service and wake the notifier
    pub(super) async fn offer(&self) {
        let _guard = self.offer_lock.lock().await;
        if self.cancellation_token.is_cancelled() {
            return;
        }

        if let Err(e) = self
            .transport
            .offer_service(self.ids.service, self.ids.instance)
            .await
        {
            warn!("Offer of service {:#06x} failed: {}", self.ids.service, e);
        }

        if self.availability.set(ServiceAvailability::Offered) {
            info!(
                "Service {:#06x}.{:#06x} offered",
                self.ids.service, self.ids.instance
            );
            self.event_bus.publish(ProducerEvent::ServiceOffered {
                service: self.ids.service,
                instance: self.ids.instance,
                timestamp: Utc::now(),
            });
        }
    }

    /// Retract the advertisement
    pub(super) async fn withdraw(&self) {
        let _guard = self.offer_lock.lock().await;
        self.withdraw_locked().await;
    }

    /// Retract the advertisement only if it is currently offered
    pub(super) async fn withdraw_if_offered(&self) {
        let _guard = self.offer_lock.lock().await;
        if self.availability.get() == ServiceAvailability::Offered {
            self.withdraw_locked().await;
        }
    }

    async fn withdraw_locked(&self) {
        if self.availability.set(ServiceAvailability::Withdrawn) {
            info!(
                "Service {:#06x}.{:#06x} withdrawn",
                self.ids.service, self.ids.instance
            );
            self.event_bus.publish(ProducerEvent::ServiceWithdrawn {
                service: self.ids.service,
                instance: self.ids.instance,
                timestamp: Utc::now(),
            });
        }

        if let Err(e) = self
            .transport
            .stop_offer_service(self.ids.service, self.ids.instance)
            .await
        {
            warn!("Withdrawal of service {:#06x} failed: {}", self.ids.service, e);
        }
    }
}

pub(super) struct LoopHandles {
    pub(super) lifecycle: JoinHandle<()>,
    pub(super) notifier: JoinHandle<()>,
}

/// Producer that toggles one service offer and streams vehicle data while
/// the service is offered
pub struct VehicleDataProducer {
    pub(super) core: Arc<ProducerCore>,
    pub(super) loops: SyncMutex<Option<LoopHandles>>,
    pub(super) shutdown_started: AtomicBool,
}

impl VehicleDataProducer {
    /// Create the producer and spawn its lifecycle controller and notifier.
    ///
    /// Both loops stay parked until [`init`](Self::init) succeeds.
    pub async fn new(config: ProducerConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let core = Arc::new(ProducerCore {
            ids: config.service.ids(),
            config,
            transport,
            event_bus: EventBus::default(),
            cancellation_token: CancellationToken::new(),
            ready: StateCell::new(false),
            availability: StateCell::default(),
            notifier_state: StateCell::default(),
            registration: StateCell::default(),
            offer_lock: Mutex::new(()),
            payload: Mutex::new(None),
        });

        let lifecycle = tokio::spawn(LifecycleController::new(Arc::clone(&core)).run());
        let notifier = tokio::spawn(Notifier::new(Arc::clone(&core)).run());

        Ok(Self {
            core,
            loops: SyncMutex::new(Some(LoopHandles {
                lifecycle,
                notifier,
            })),
            shutdown_started: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.core.config
    }

    pub fn availability(&self) -> ServiceAvailability {
        self.core.availability.get()
    }

    pub fn watch_availability(&self) -> watch::Receiver<ServiceAvailability> {
        self.core.availability.subscribe()
    }

    pub fn notifier_state(&self) -> NotifierState {
        self.core.notifier_state.get()
    }

    pub fn watch_notifier_state(&self) -> watch::Receiver<NotifierState> {
        self.core.notifier_state.subscribe()
    }

    pub fn registration_state(&self) -> RegistrationState {
        self.core.registration.get()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ProducerEvent> {
        self.core.event_bus.subscribe()
    }

    /// Token that stops the producer when cancelled; `run` then shuts down
    pub fn cancellation_token(&self) -> CancellationToken {
        self.core.cancellation_token.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.core.cancellation_token.is_cancelled()
    }

    pub fn is_ready(&self) -> bool {
        self.core.ready.get()
    }
}

impl Drop for VehicleDataProducer {
    fn drop(&mut self) {
        // loops exit on their own once the token is cancelled
        self.core.cancellation_token.cancel();
    }
}
