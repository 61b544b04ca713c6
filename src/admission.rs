//! Admission control for generation calls.
//!
//! The local backend degrades sharply past a couple of concurrent requests,
//! so at most `max_concurrent` generations may be in flight. The gate never
//! blocks and never queues: a caller that finds it full is turned away
//! immediately and decides for itself whether to retry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::error::GenerationError;
use crate::{log_debug, log_info, log_warn};

/// Concurrency limit used when nothing is configured
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// One granted concurrency unit
#[derive(Debug, Clone)]
pub struct AdmissionSlot {
    request_id: String,
    acquired_at: Instant,
}

impl AdmissionSlot {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }
}

/// Point-in-time view of the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionSnapshot {
    pub in_flight: usize,
    pub max: usize,
}

#[derive(Debug, Default)]
struct AdmissionState {
    in_flight: usize,
    started: HashMap<String, Instant>,
}

/// Non-blocking concurrency gate in front of the generation backends
#[derive(Debug)]
pub struct AdmissionController {
    max_concurrent: usize,
    state: Mutex<AdmissionState>,
}

impl AdmissionController {
    pub fn new(max_concurrent: usize) -> Self {
        log_info!("Admission controller initialized (max_concurrent: {max_concurrent})");
        Self {
            max_concurrent,
            state: Mutex::new(AdmissionState::default()),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            in_flight: self.in_flight(),
            max: self.max_concurrent,
        }
    }

    /// Try to take a slot for `request_id`.
    ///
    /// Returns `false` without touching any state when the gate is full or the
    /// id already holds a slot.
    pub fn acquire(&self, request_id: &str) -> bool {
        self.acquire_slot(request_id).is_some()
    }

    fn acquire_slot(&self, request_id: &str) -> Option<AdmissionSlot> {
        let mut state = self.state.lock();

        if state.started.contains_key(request_id) {
            log_warn!("Request {request_id} already holds an admission slot");
            return None;
        }

        if state.in_flight >= self.max_concurrent {
            log_warn!(
                "Request {request_id} rejected ({}/{})",
                state.in_flight,
                self.max_concurrent
            );
            return None;
        }

        let acquired_at = Instant::now();
        state.in_flight += 1;
        state.started.insert(request_id.to_string(), acquired_at);
        log_info!(
            "Request {request_id} acquired slot ({}/{})",
            state.in_flight,
            self.max_concurrent
        );

        Some(AdmissionSlot {
            request_id: request_id.to_string(),
            acquired_at,
        })
    }

    /// Give back the slot held by `request_id`.
    ///
    /// Unknown ids and repeated releases are no-ops, so the counter can never
    /// drop below the number of slots actually held.
    pub fn release(&self, request_id: &str) {
        let mut state = self.state.lock();

        let Some(started) = state.started.remove(request_id) else {
            log_debug!("Release for {request_id} ignored: no slot held");
            return;
        };

        state.in_flight = state.in_flight.saturating_sub(1);
        log_info!(
            "Request {request_id} released slot (duration: {:.1}s, remaining: {}/{})",
            started.elapsed().as_secs_f64(),
            state.in_flight,
            self.max_concurrent
        );
    }

    /// Take a slot that is released automatically when the permit is dropped
    pub fn try_admit(
        self: &Arc<Self>,
        request_id: &str,
    ) -> Result<AdmissionPermit, GenerationError> {
        match self.acquire_slot(request_id) {
            Some(slot) => Ok(AdmissionPermit {
                controller: Arc::clone(self),
                slot,
                released: false,
            }),
            None => {
                let snapshot = self.snapshot();
                Err(GenerationError::AdmissionRejected {
                    current: snapshot.in_flight,
                    max: snapshot.max,
                })
            }
        }
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

/// RAII handle for a granted slot
#[derive(Debug)]
pub struct AdmissionPermit {
    controller: Arc<AdmissionController>,
    slot: AdmissionSlot,
    released: bool,
}

impl AdmissionPermit {
    pub fn slot(&self) -> &AdmissionSlot {
        &self.slot
    }

    /// Release now instead of at drop
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.controller.release(&self.slot.request_id);
        }
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.release_once();
    }
}
