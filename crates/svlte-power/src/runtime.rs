//! Serialized owner of the power engine.
//!
//! All entry points execute on one worker thread: inbound events arrive on a
//! bounded control channel, deferred retries sit in a delay queue drained by
//! the same thread. Ordering between a retry and a freshly arriving event is
//! FIFO by scheduling time, never logical priority — replayed tasks
//! re-derive their conditions from live state, so a stale retry firing after
//! a fresh event converges to the same answer.
//!
//! Dropping the runtime triggers a graceful shutdown of the worker thread.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{info, warn};

use svlte_common::error::PowerError;
use svlte_common::events::{EngineEvent, PowerEvent, RetryTask};

use crate::engine::PowerStateEngine;

/// Control messages sent to the worker thread.
enum ControlMessage {
    Event(PowerEvent),
    Shutdown,
}

/// A retry waiting for its due time. Ordered for a min-heap on (due, seq);
/// seq keeps same-instant retries FIFO.
struct Pending {
    due: Instant,
    seq: u64,
    task: RetryTask,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest due first.
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

/// Thread-safe handle to the serialized power engine worker.
pub struct PowerRuntime {
    control_tx: Sender<ControlMessage>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PowerRuntime {
    /// Move the engine onto its worker thread and start processing.
    pub fn spawn(engine: PowerStateEngine) -> Self {
        let (control_tx, control_rx) = bounded(64);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let handle = thread::Builder::new()
            .name("svlte-power".into())
            .spawn(move || runtime_worker(engine, control_rx, shutdown_clone))
            .expect("failed to spawn power runtime worker");

        PowerRuntime {
            control_tx,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Enqueue a platform event for serialized processing.
    pub fn submit(&self, event: PowerEvent) -> Result<(), PowerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(PowerError::Disconnected);
        }
        self.control_tx
            .send(ControlMessage::Event(event))
            .map_err(|_| PowerError::Disconnected)
    }

    /// Gracefully shut down the worker thread. Idempotent.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.control_tx.send(ControlMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PowerRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn runtime_worker(
    mut engine: PowerStateEngine,
    control_rx: Receiver<ControlMessage>,
    shutdown: Arc<AtomicBool>,
) {
    let retry_interval = engine.config().retry_interval();
    let idle_tick = Duration::from_millis(200);
    let mut retries: BinaryHeap<Pending> = BinaryHeap::new();
    let mut seq: u64 = 0;

    loop {
        // Fire every retry that has come due.
        let now = Instant::now();
        while retries.peek().is_some_and(|p| p.due <= now) {
            let Some(pending) = retries.pop() else { break };
            let effects = engine.handle_task(pending.task);
            absorb(effects, &mut retries, &mut seq, retry_interval);
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        // Sleep until the next due retry, bounded by the idle tick so a
        // shutdown request is noticed promptly.
        let timeout = retries
            .peek()
            .map(|p| p.due.saturating_duration_since(Instant::now()))
            .unwrap_or(idle_tick)
            .min(idle_tick);

        match control_rx.recv_timeout(timeout) {
            Ok(ControlMessage::Event(event)) => {
                let effects = engine.handle(event);
                absorb(effects, &mut retries, &mut seq, retry_interval);
            }
            Ok(ControlMessage::Shutdown) => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Fold engine effects into the delay queue.
fn absorb(
    effects: Vec<EngineEvent>,
    retries: &mut BinaryHeap<Pending>,
    seq: &mut u64,
    interval: Duration,
) {
    for effect in effects {
        match effect {
            EngineEvent::RetryScheduled(task) => {
                info!(
                    op = task.event.name(),
                    attempt = task.attempt,
                    delay_ms = interval.as_millis() as u64,
                    "deferring operation"
                );
                retries.push(Pending {
                    due: Instant::now() + interval,
                    seq: *seq,
                    task,
                });
                *seq += 1;
            }
            EngineEvent::RetriesExhausted { event } => {
                warn!(op = event.name(), "operation abandoned, gate never opened");
            }
        }
    }
}
