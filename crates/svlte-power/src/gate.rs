//! Readiness precondition gate.
//!
//! Required preconditions (modem control channel ready, ICCID readable)
//! become true asynchronously and out of band. When a gate fails, the caller
//! defers the entire original operation — event payload captured by value —
//! for one fixed interval and replays the same entry point. No partial
//! retries of sub-steps, no exponential backoff.

use std::sync::Arc;

use tracing::warn;

use svlte_common::events::{EngineEvent, RetryTask};

use crate::props::{flag_set, PropertyStore};

/// Checks readiness properties and converts gate failures into retry tasks.
pub struct ReadinessGate {
    props: Arc<dyn PropertyStore>,
    max_attempts: Option<u32>,
}

impl ReadinessGate {
    pub fn new(props: Arc<dyn PropertyStore>, max_attempts: Option<u32>) -> Self {
        ReadinessGate {
            props,
            max_attempts,
        }
    }

    /// Whether a required readiness property currently reads "1".
    pub fn check_ready(&self, key: &str) -> bool {
        flag_set(&*self.props, key)
    }

    /// Defer `task` for another round, or drop it once the attempt cap is
    /// exceeded. Replays re-evaluate every condition from live state; only
    /// the event payload is carried over.
    pub fn defer(&self, task: RetryTask) -> EngineEvent {
        let attempt = task.attempt + 1;
        if let Some(cap) = self.max_attempts {
            if attempt > cap {
                warn!(
                    op = task.event.name(),
                    attempts = task.attempt,
                    "readiness gate never opened, dropping operation"
                );
                return EngineEvent::RetriesExhausted { event: task.event };
            }
        }
        EngineEvent::RetryScheduled(RetryTask {
            event: task.event,
            attempt,
        })
    }
}
