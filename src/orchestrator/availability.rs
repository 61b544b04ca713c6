use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::backends::TextBackend;
use crate::{log_debug, log_info, log_warn};

/// Shared reachability flag for one backend
#[derive(Debug, Clone, Default)]
pub struct Availability {
    reachable: Arc<AtomicBool>,
}

impl Availability {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: Arc::new(AtomicBool::new(reachable)),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }

    /// Record a probe or call outcome, returning the previous value
    pub fn set(&self, reachable: bool) -> bool {
        self.reachable.swap(reachable, Ordering::AcqRel)
    }
}

/// Background ticker that keeps an [`Availability`] flag current.
///
/// Stops when dropped or when [`AvailabilityMonitor::stop`] is called.
#[derive(Debug)]
pub struct AvailabilityMonitor {
    cancel: CancellationToken,
}

impl AvailabilityMonitor {
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

impl Drop for AvailabilityMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Probe `backend` once and store the result
pub async fn refresh(backend: &dyn TextBackend, availability: &Availability) -> bool {
    let reachable = backend.probe().await;
    let was = availability.set(reachable);
    if was != reachable {
        if reachable {
            log_info!("{} backend is reachable again", backend.provider());
        } else {
            log_warn!("{} backend became unreachable", backend.provider());
        }
    }
    reachable
}

/// Re-probe `backend` every `every` until the monitor is dropped.
///
/// Must be called from within a tokio runtime.
pub fn spawn_monitor(
    backend: Arc<dyn TextBackend>,
    availability: Availability,
    every: Duration,
) -> AvailabilityMonitor {
    let cancel = CancellationToken::new();
    let cancel_ticker = cancel.clone();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately; the caller has just probed
        interval.tick().await;

        loop {
            tokio::select! {
                () = cancel_ticker.cancelled() => break,
                _ = interval.tick() => {
                    refresh(backend.as_ref(), &availability).await;
                }
            }
        }
        log_debug!("Availability monitor for {} stopped", backend.provider());
    });

    AvailabilityMonitor { cancel }
}
