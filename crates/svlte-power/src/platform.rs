//! Telephony-side collaborator seams.
//!
//! These traits are implemented by the platform's telephony stack in
//! production and by scripted fakes in `svlte-sim`. The engine only ever
//! asks questions through them; it never drives them.

use svlte_common::models::{ModemKind, PhoneId, SlotId};

/// Card-technology oracle backed by the low-level card utilities.
pub trait CardOracle: Send + Sync {
    /// Whether the card in this slot is dual-technology (USIM with CSIM).
    fn is_dual_tech(&self, slot: SlotId) -> bool;

    /// Electrical card-detect for this slot, independent of the RIL's SIM
    /// state. Used to reject spurious ABSENT events on the CDMA slot.
    fn physical_card_present(&self, slot: SlotId) -> bool;
}

/// RAT controller: power-on admission and call state.
pub trait RatController: Send + Sync {
    /// Whether radio power-on is currently allowed for this phone id and
    /// modem kind. Power-off is never gated. A disallowed power-on is
    /// dropped, not retried.
    fn radio_power_on_allowed(&self, phone: PhoneId, kind: ModemKind) -> bool;

    /// Whether an emergency call is in progress anywhere on the device.
    fn ecc_in_progress(&self) -> bool;
}

/// Carrier/regulatory policy oracle.
pub trait Regulatory: Send + Sync {
    /// CTA mode: at least one radio must stay powered for emergency
    /// reachability even with no SIM inserted.
    fn cta_mode_active(&self) -> bool;

    /// The phone id designated to carry the device's main capability, the
    /// target of the CTA redirect.
    fn main_capability_phone(&self) -> PhoneId;
}
