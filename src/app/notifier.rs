use super::producer::ProducerCore;
use crate::payload::NotificationPayload;
use crate::state::{NotifierState, ServiceAvailability};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

/// Outcome of one send attempt
#[derive(Debug, PartialEq, Eq)]
enum SendOutcome {
    Sent,
    Withdrawn,
    Cancelled,
}

/// Streams the vehicle data sample while the service is offered.
///
/// `Blocked` until the service is offered, `Sending` while it stays offered,
/// `Terminated` once the producer is cancelled.
pub(super) struct Notifier {
    core: Arc<ProducerCore>,
    sample: NotificationPayload,
}

impl Notifier {
    pub(super) fn new(core: Arc<ProducerCore>) -> Self {
        Self {
            core,
            sample: NotificationPayload::INITIAL,
        }
    }

    pub(super) async fn run(mut self) {
        let token = self.core.cancellation_token.clone();
        let interval = self.core.config.notifier.interval();

        'outer: while !token.is_cancelled() {
            self.core.notifier_state.set(NotifierState::Blocked);
            debug!("Notifier waiting for service offer");

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = self.core.availability.wait_until(|a| *a == ServiceAvailability::Offered) => {}
            }

            self.core.notifier_state.set(NotifierState::Sending);
            info!("Notifier sending every {:?}", interval);

            loop {
                match self.send_once().await {
                    SendOutcome::Sent => {}
                    SendOutcome::Withdrawn => {
                        debug!("Service withdrawn, notifier pausing");
                        continue 'outer;
                    }
                    SendOutcome::Cancelled => break 'outer,
                }

                self.sample.advance();

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break 'outer,
                    _ = sleep(interval) => {}
                }
            }
        }

        self.core.notifier_state.set(NotifierState::Terminated);
        debug!("Notifier stopped");
    }

    /// Submit the current sample. The availability check and the submission
    /// run under the offer lock, so nothing is sent once a withdrawal has
    /// completed.
    async fn send_once(&self) -> SendOutcome {
        let core = &self.core;
        let _offer = core.offer_lock.lock().await;

        if core.cancellation_token.is_cancelled() {
            return SendOutcome::Cancelled;
        }
        if core.availability.get() != ServiceAvailability::Offered {
            return SendOutcome::Withdrawn;
        }

        let mut buffer = core.payload.lock().await;
        let Some(payload) = buffer.as_mut() else {
            warn!("Payload buffer missing, skipping notification");
            return SendOutcome::Sent;
        };

        payload.set_data(&self.sample.encode());

        match core
            .transport
            .notify(core.ids.service, core.ids.instance, core.ids.event, payload)
            .await
        {
            Ok(()) => trace!("Notified subscribers: {}", self.sample),
            Err(e) => warn!("Notification failed: {}", e),
        }

        SendOutcome::Sent
    }
}
