//! Bounded request queue with a concurrency cap.
//!
//! `admit` enqueues or rejects synchronously. A dispatch cycle, run by a
//! background task, hands concurrency slots to queued requests in FIFO order
//! and rejects any that have waited longer than the wait timeout.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::AdmissionError;
use wg_shared::AdmissionConfig;

#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    pub max_queue_size: usize,
    pub processing_concurrency: usize,
    pub wait_timeout: Duration,
    /// Retry hint returned with capacity rejections
    pub retry_after: Duration,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::from(&AdmissionConfig::default())
    }
}

impl From<&AdmissionConfig> for AdmissionPolicy {
    fn from(config: &AdmissionConfig) -> Self {
        Self {
            max_queue_size: config.max_queue_size,
            processing_concurrency: config.processing_concurrency.max(1),
            wait_timeout: Duration::from_secs(config.wait_timeout_seconds),
            retry_after: Duration::from_secs(5),
        }
    }
}

type Waiter = oneshot::Sender<Result<DispatchPermit, AdmissionError>>;

struct QueueEntry {
    id: u64,
    waiter: Waiter,
    enqueued_at: Instant,
}

/// Held for as long as the admitted request runs; frees its slot on drop
#[derive(Debug)]
pub struct DispatchPermit {
    slot: Option<OwnedSemaphorePermit>,
    notify: Arc<Notify>,
    pub waited: Duration,
}

impl Drop for DispatchPermit {
    fn drop(&mut self) {
        // Release before waking so the dispatcher finds the slot free
        drop(self.slot.take());
        self.notify.notify_one();
    }
}

/// Handed out by `admit`; resolves once the request is dispatched or rejected
#[derive(Debug)]
pub struct AdmissionTicket {
    pub id: u64,
    receiver: oneshot::Receiver<Result<DispatchPermit, AdmissionError>>,
}

impl AdmissionTicket {
    pub async fn wait(self) -> Result<DispatchPermit, AdmissionError> {
        self.receiver
            .await
            .unwrap_or(Err(AdmissionError::QueueTimeout))
    }
}

/// What one dispatch cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub dispatched: usize,
    pub timed_out: usize,
    pub abandoned: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionStats {
    pub queued: usize,
    pub in_flight: usize,
    pub available_slots: usize,
    pub max_queue_size: usize,
}

pub struct RequestAdmissionController {
    policy: AdmissionPolicy,
    queue: Mutex<VecDeque<QueueEntry>>,
    slots: Arc<Semaphore>,
    notify: Arc<Notify>,
    next_id: AtomicU64,
}

impl RequestAdmissionController {
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(policy.processing_concurrency)),
            queue: Mutex::new(VecDeque::with_capacity(policy.max_queue_size)),
            notify: Arc::new(Notify::new()),
            next_id: AtomicU64::new(1),
            policy,
        }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    pub fn admit(&self) -> Result<AdmissionTicket, AdmissionError> {
        self.admit_at(Instant::now())
    }

    /// Enqueue a request, or reject it immediately when the queue is full
    pub fn admit_at(&self, now: Instant) -> Result<AdmissionTicket, AdmissionError> {
        let mut queue = self.lock();
        if queue.len() >= self.policy.max_queue_size {
            warn!(
                queued = queue.len(),
                max_queue_size = self.policy.max_queue_size,
                "Admission queue full, rejecting request"
            );
            return Err(AdmissionError::QueueFull {
                retry_after_seconds: self.policy.retry_after.as_secs().max(1),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (waiter, receiver) = oneshot::channel();
        queue.push_back(QueueEntry {
            id,
            waiter,
            enqueued_at: now,
        });
        drop(queue);

        self.notify.notify_one();
        Ok(AdmissionTicket { id, receiver })
    }

    pub fn dispatch_cycle(&self) -> DispatchReport {
        self.dispatch_cycle_at(Instant::now())
    }

    /// Reject expired entries, then hand free slots to the oldest waiters
    pub fn dispatch_cycle_at(&self, now: Instant) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut queue = self.lock();

        let mut kept = VecDeque::with_capacity(queue.len());
        for entry in queue.drain(..) {
            if entry.waiter.is_closed() {
                report.abandoned += 1;
            } else if now.saturating_duration_since(entry.enqueued_at) > self.policy.wait_timeout {
                debug!(ticket = entry.id, "Queued request timed out");
                let _ = entry.waiter.send(Err(AdmissionError::QueueTimeout));
                report.timed_out += 1;
            } else {
                kept.push_back(entry);
            }
        }
        *queue = kept;

        while let Some(entry) = queue.front() {
            if entry.waiter.is_closed() {
                queue.pop_front();
                report.abandoned += 1;
                continue;
            }
            let Ok(slot) = Arc::clone(&self.slots).try_acquire_owned() else {
                break;
            };
            let Some(entry) = queue.pop_front() else {
                break;
            };
            let permit = DispatchPermit {
                slot: Some(slot),
                notify: Arc::clone(&self.notify),
                waited: now.saturating_duration_since(entry.enqueued_at),
            };
            // A receiver dropped since the check above returns the permit, freeing the slot
            if entry.waiter.send(Ok(permit)).is_ok() {
                report.dispatched += 1;
            } else {
                report.abandoned += 1;
            }
        }

        if report.timed_out > 0 {
            warn!(timed_out = report.timed_out, "Rejected requests that waited past the queue timeout");
        }
        report
    }

    pub fn stats(&self) -> AdmissionStats {
        let queued = self.lock().len();
        let available_slots = self.slots.available_permits();
        AdmissionStats {
            queued,
            in_flight: self.policy.processing_concurrency.saturating_sub(available_slots),
            available_slots,
            max_queue_size: self.policy.max_queue_size,
        }
    }

    /// Run dispatch cycles every `every`, and whenever a request arrives or finishes
    pub fn spawn_dispatcher(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        info!(
            interval_ms = every.as_millis() as u64,
            concurrency = controller.policy.processing_concurrency,
            max_queue_size = controller.policy.max_queue_size,
            "Starting admission dispatcher"
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = controller.notify.notified() => {}
                }
                controller.dispatch_cycle();
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueueEntry>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RequestAdmissionController {
    fn default() -> Self {
        Self::new(AdmissionPolicy::default())
    }
}

impl std::fmt::Debug for RequestAdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAdmissionController")
            .field("policy", &self.policy)
            .field("stats", &self.stats())
            .finish()
    }
}
