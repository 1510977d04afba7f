use super::producer::ProducerCore;
use super::types::LifecyclePhase;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Alternates the service between offered and withdrawn.
///
/// A ticker with period `tick` drives the cycle; every `phase_ticks` ticks
/// the phase flips. The first tick fires immediately, so the service is
/// offered as soon as the startup gate opens.
pub(super) struct LifecycleController {
    core: Arc<ProducerCore>,
}

impl LifecycleController {
    pub(super) fn new(core: Arc<ProducerCore>) -> Self {
        Self { core }
    }

    pub(super) async fn run(self) {
        let core = self.core;
        let token = core.cancellation_token.clone();

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Lifecycle controller cancelled before initialization completed");
                return;
            }
            _ = core.ready.wait_until(|ready| *ready) => {}
        }

        let tick = core.config.lifecycle.tick();
        let phase_ticks = core.config.lifecycle.phase_ticks.max(1);
        info!(
            "Lifecycle controller started: {} ticks of {:?} per phase",
            phase_ticks, tick
        );

        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut phase = LifecyclePhase::Offer;
        let mut elapsed = 0;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if elapsed == 0 {
                match phase {
                    LifecyclePhase::Offer => core.offer().await,
                    LifecyclePhase::Withdraw => core.withdraw().await,
                }
            }

            elapsed += 1;
            if elapsed >= phase_ticks {
                elapsed = 0;
                phase = phase.next();
            }
        }

        debug!("Lifecycle controller stopped");
    }
}
