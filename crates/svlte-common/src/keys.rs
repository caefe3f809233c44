//! Semantic property-store key builders.
//!
//! The device property store is a flat string key/value space shared with
//! the modem control channel and the boot chain. Keys here are semantic
//! names for this subsystem; per-slot and per-modem keys are built by
//! function so no call site formats key strings by hand.

use crate::models::{PhoneId, SlotId};

/// Set to "1" once the modem control channel has announced readiness.
pub const EMD_STATUS_SENT: &str = "radio.emd.status_sent";

/// Persisted airplane-mode state, read at engine construction.
pub const AIRPLANE_MODE: &str = "persist.radio.airplane_mode";

/// Engineering mode selecting the active RAT set (e.g. [`ENG_MODE_CDMA_ONLY`]).
pub const ENGINEERING_MODE: &str = "persist.radio.engineering_mode";

/// Engineering-mode value gating the direct C2K power path.
pub const ENG_MODE_CDMA_ONLY: &str = "cdma_only";

/// Set to "1" during the crypt-keeper recovery boot.
pub const CRYPT_KEEPER_BOOT: &str = "boot.crypt_keeper";

/// Card-reset flags cleared on IPO shutdown.
pub const CARD_RESET: [&str; 2] = ["radio.card_reset.md1", "radio.card_reset.md2"];

/// ICCID read from the card in a physical slot. Empty or missing until the
/// card readout completes, which lags card detection.
pub fn iccid(slot: SlotId) -> String {
    format!("radio.iccid.slot{slot}")
}

/// Card-type detection result for a physical slot; set once the lower layer
/// has classified the card.
pub fn card_type(slot: SlotId) -> String {
    format!("radio.cardtype.slot{slot}")
}

/// "1" while the modem rail for a phone id is powered off.
pub fn modem_off(phone: PhoneId) -> String {
    format!("radio.modem{phone}.off")
}

/// Signals the driver layer to suppress user-visible reboot side effects.
pub fn silent_reboot(phone: PhoneId) -> String {
    format!("radio.modem{phone}.silent_reboot")
}

/// Persisted multi-SIM radio setting for a physical slot.
pub fn msim_mode(slot: SlotId) -> String {
    format!("persist.radio.msim_mode.slot{slot}")
}
