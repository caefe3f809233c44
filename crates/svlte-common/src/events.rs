//! Inbound platform events and engine-emitted effects.
//!
//! Every entry point of the power engine is addressable as a [`PowerEvent`]
//! value, so a deferred retry is just the original event captured by value
//! and replayed later — no callback objects. The engine answers each event
//! with zero or more [`EngineEvent`]s for the owning runtime to act on.

use serde::{Deserialize, Serialize};

use crate::models::{PhoneBitmap, PhoneId, PowerState, SimCardState};

/// An event entering the power engine.
///
/// Serde-serializable so simulation scenarios can be written as data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PowerEvent {
    /// Guarded radio power request for one phone.
    SetRadioPower { power: PowerState, phone: PhoneId },
    /// Emergency-path radio power request, bypassing SIM/preference checks.
    ForceRadioPower { power: PowerState, phone: PhoneId },
    /// Modem rail power for every phone selected by the bitmap.
    SetModemPower {
        power: PowerState,
        phones: PhoneBitmap,
    },
    /// SIM-state-changed notification from the platform.
    SimStateChanged {
        phone: PhoneId,
        state: SimCardState,
    },
    /// Airplane-mode-changed notification.
    AirplaneModeChanged { enabled: bool },
    /// Boot-time radio-available notification for one phone.
    RadioAvailable { phone: PhoneId },
    /// IPO shutdown: clear card-readiness state for the next boot cycle.
    IpoShutdown,
}

impl PowerEvent {
    /// Short tag for logging.
    pub fn name(&self) -> &'static str {
        match self {
            PowerEvent::SetRadioPower { .. } => "set_radio_power",
            PowerEvent::ForceRadioPower { .. } => "force_radio_power",
            PowerEvent::SetModemPower { .. } => "set_modem_power",
            PowerEvent::SimStateChanged { .. } => "sim_state_changed",
            PowerEvent::AirplaneModeChanged { .. } => "airplane_mode_changed",
            PowerEvent::RadioAvailable { .. } => "radio_available",
            PowerEvent::IpoShutdown => "ipo_shutdown",
        }
    }
}

/// A deferred re-invocation of an entry point with its original arguments.
///
/// Scheduled by the runtime after the fixed retry interval whenever a
/// precondition gate fails. Conditions are re-evaluated from live state on
/// replay; only the event payload is captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryTask {
    pub event: PowerEvent,
    /// How many times this operation has already been deferred.
    pub attempt: u32,
}

impl RetryTask {
    pub fn fresh(event: PowerEvent) -> Self {
        RetryTask { event, attempt: 0 }
    }
}

/// Effects the engine hands back to its owning runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A precondition gate failed; replay the task after the retry interval.
    RetryScheduled(RetryTask),
    /// The retry cap was exceeded; the operation is dropped as unavailable.
    RetriesExhausted { event: PowerEvent },
}
