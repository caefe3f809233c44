//! Per-slot SIM presence tracking and the manual-off preference set.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use svlte_common::models::{PhoneId, SimPresence, SlotId};

use crate::topology::SlotTopology;

/// Tracks inserted/absent state per physical slot plus the set of ICCIDs the
/// user has explicitly powered off.
///
/// Presence is mutated only by SIM-state-changed handling, radio/force power
/// recording, and modem power-off (which resets a slot to `Unknown`). The
/// manual-off set is consulted on every radio decision; its mutation path is
/// external to the engine.
pub struct SimStatusTracker {
    topology: Arc<dyn SlotTopology>,
    presence: HashMap<SlotId, SimPresence>,
    manual_off: HashSet<String>,
}

impl SimStatusTracker {
    pub fn new(topology: Arc<dyn SlotTopology>) -> Self {
        SimStatusTracker {
            topology,
            presence: HashMap::new(),
            manual_off: HashSet::new(),
        }
    }

    /// Record presence for a phone id's slot.
    ///
    /// No-op for a phone id mapped to the currently-inactive dual-mode
    /// technology, so a background technology never overwrites the active
    /// technology's tracked status.
    pub fn set_presence(&mut self, phone: PhoneId, presence: SimPresence) {
        if self.topology.is_inactive_svlte_phone(phone) {
            debug!(phone = %phone, "ignoring presence update for inactive dual-mode phone");
            return;
        }
        let slot = self.topology.slot_of(phone);
        self.presence.insert(slot, presence);
    }

    pub fn presence(&self, slot: SlotId) -> SimPresence {
        self.presence.get(&slot).copied().unwrap_or_default()
    }

    pub fn presence_of_phone(&self, phone: PhoneId) -> SimPresence {
        self.presence(self.topology.slot_of(phone))
    }

    /// Forget a slot's presence (modem rail powered off).
    pub fn reset(&mut self, phone: PhoneId) {
        let slot = self.topology.slot_of(phone);
        self.presence.remove(&slot);
    }

    /// Forget all presence state (IPO shutdown).
    pub fn reset_all(&mut self) {
        self.presence.clear();
    }

    // ─── Manual-off preference ──────────────────────────────────────

    pub fn is_manual_off(&self, iccid: &str) -> bool {
        self.manual_off.contains(iccid)
    }

    pub fn mark_manual_off(&mut self, iccid: impl Into<String>) {
        self.manual_off.insert(iccid.into());
    }

    pub fn clear_manual_off(&mut self, iccid: &str) {
        self.manual_off.remove(iccid);
    }
}
