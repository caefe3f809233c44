//! Phone/slot topology seam.
//!
//! Maps logical phone ids to physical SIM slots, identifies the
//! CDMA-capable slot, and reports which slot currently owns the dual-mode
//! (SVLTE) pairing. The mapping is a pure function of device configuration;
//! it never changes at runtime except through configuration reload, so the
//! engine may cache nothing and still read consistent answers.

use svlte_common::models::{ModemKind, PhoneId, SlotId};

/// Resolver for the device's phone/slot layout.
pub trait SlotTopology: Send + Sync {
    /// Number of logical phone instances.
    fn phone_count(&self) -> usize;

    /// Physical slot hosting a phone id.
    fn slot_of(&self, phone: PhoneId) -> SlotId;

    /// Phone id owning a physical slot.
    fn phone_of(&self, slot: SlotId) -> PhoneId;

    /// The CDMA-capable physical slot, if this device is SVLTE.
    fn cdma_slot(&self) -> Option<SlotId>;

    /// The slot currently active for the dual-mode pairing, if SVLTE.
    fn active_svlte_slot(&self) -> Option<SlotId>;

    /// Whether this device carries the dual-mode architecture at all.
    fn is_svlte(&self) -> bool {
        self.cdma_slot().is_some()
    }

    /// Whether a phone id sits on the CDMA-capable slot.
    fn is_cdma_phone(&self, phone: PhoneId) -> bool {
        self.cdma_slot() == Some(self.slot_of(phone))
    }

    /// Whether a phone id belongs to the currently-inactive dual-mode
    /// technology. Such a phone must not overwrite tracked SIM status or
    /// persisted settings of the active technology.
    fn is_inactive_svlte_phone(&self, phone: PhoneId) -> bool {
        match (self.cdma_slot(), self.active_svlte_slot()) {
            (Some(cdma), Some(active)) => self.slot_of(phone) == cdma && cdma != active,
            _ => false,
        }
    }

    /// Modem handles a phone id owns: both kinds on the CDMA-capable slot,
    /// a single LTE/GSM handle everywhere else.
    fn modem_kinds(&self, phone: PhoneId) -> Vec<ModemKind> {
        if self.is_cdma_phone(phone) {
            vec![ModemKind::Lte, ModemKind::C2k]
        } else {
            vec![ModemKind::Lte]
        }
    }
}

/// Identity-mapped topology built from device configuration.
#[derive(Debug, Clone)]
pub struct StaticTopology {
    phone_count: usize,
    cdma_slot: Option<SlotId>,
    active_svlte_slot: Option<SlotId>,
}

impl StaticTopology {
    /// A plain GSM/LTE device with `phone_count` slots and no CDMA subsystem.
    pub fn gsm_only(phone_count: usize) -> Self {
        StaticTopology {
            phone_count,
            cdma_slot: None,
            active_svlte_slot: None,
        }
    }

    /// A SVLTE device: `cdma_slot` hosts the C2K modem alongside LTE, and is
    /// also the initially active dual-mode slot.
    pub fn svlte(phone_count: usize, cdma_slot: SlotId) -> Self {
        StaticTopology {
            phone_count,
            cdma_slot: Some(cdma_slot),
            active_svlte_slot: Some(cdma_slot),
        }
    }

    /// Override the active dual-mode slot (configuration reload path).
    pub fn with_active_slot(mut self, slot: SlotId) -> Self {
        self.active_svlte_slot = Some(slot);
        self
    }
}

impl SlotTopology for StaticTopology {
    fn phone_count(&self) -> usize {
        self.phone_count
    }

    fn slot_of(&self, phone: PhoneId) -> SlotId {
        SlotId(phone.0)
    }

    fn phone_of(&self, slot: SlotId) -> PhoneId {
        PhoneId(slot.0)
    }

    fn cdma_slot(&self) -> Option<SlotId> {
        self.cdma_slot
    }

    fn active_svlte_slot(&self) -> Option<SlotId> {
        self.active_svlte_slot
    }
}
