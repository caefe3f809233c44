//! Data models for the svlte power subsystem.
//!
//! These types are shared between the core engine, the drivers, and the
//! simulation harness. Identifiers are newtypes: a [`PhoneId`] names a
//! logical phone instance, a [`SlotId`] names a physical SIM slot, and the
//! topology layer is the only place allowed to convert between them.

use serde::{Deserialize, Serialize};

// ── Identifiers ─────────────────────────────────────────────────────

/// Logical phone instance handle (0..N-1).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PhoneId(pub usize);

impl std::fmt::Display for PhoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical SIM slot index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SlotId(pub usize);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bit-per-phone selection mask used by modem power commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PhoneBitmap(pub u32);

impl PhoneBitmap {
    /// Mask selecting a single phone.
    pub fn single(phone: PhoneId) -> Self {
        PhoneBitmap(1 << phone.0)
    }

    /// Mask selecting every phone in `0..count`.
    pub fn all(count: usize) -> Self {
        debug_assert!(count <= 32);
        if count >= 32 {
            PhoneBitmap(u32::MAX)
        } else {
            PhoneBitmap((1u32 << count) - 1)
        }
    }

    pub fn contains(&self, phone: PhoneId) -> bool {
        phone.0 < 32 && self.0 & (1 << phone.0) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate the selected phones among the first `count` ids.
    pub fn iter(&self, count: usize) -> impl Iterator<Item = PhoneId> + '_ {
        let mask = self.0;
        (0..count.min(32)).filter_map(move |i| {
            if mask & (1 << i) != 0 {
                Some(PhoneId(i))
            } else {
                None
            }
        })
    }
}

// ── Modem & power states ────────────────────────────────────────────

/// Modem technology owning a handle. A SVLTE-capable phone id owns one
/// handle per kind; a plain GSM/LTE phone id owns only `Lte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModemKind {
    Lte,
    C2k,
}

impl ModemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModemKind::Lte => "lte",
            ModemKind::C2k => "c2k",
        }
    }
}

impl std::fmt::Display for ModemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state for a modem rail or radio transmit enable.
///
/// Modem Off forces radio Off; a radio power request against a powered-off
/// modem is suppressed by the engine, never forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Off,
    On,
}

impl PowerState {
    pub fn is_on(&self) -> bool {
        matches!(self, PowerState::On)
    }

    /// Property-store representation ("1"/"0").
    pub fn as_flag(&self) -> &'static str {
        match self {
            PowerState::On => "1",
            PowerState::Off => "0",
        }
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerState::Off => write!(f, "off"),
            PowerState::On => write!(f, "on"),
        }
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }
}

// ── SIM states ──────────────────────────────────────────────────────

/// Wire states carried by a SIM-state-changed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimCardState {
    Ready,
    Locked,
    Loaded,
    Absent,
}

impl std::fmt::Display for SimCardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimCardState::Ready => write!(f, "READY"),
            SimCardState::Locked => write!(f, "LOCKED"),
            SimCardState::Loaded => write!(f, "LOADED"),
            SimCardState::Absent => write!(f, "ABSENT"),
        }
    }
}

impl std::str::FromStr for SimCardState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(SimCardState::Ready),
            "LOCKED" => Ok(SimCardState::Locked),
            "LOADED" => Ok(SimCardState::Loaded),
            "ABSENT" => Ok(SimCardState::Absent),
            other => Err(format!("unknown sim state: {other}")),
        }
    }
}

/// Tracked per-slot SIM presence.
///
/// Starts at `Unknown` on boot, and is reset to `Unknown` whenever the slot's
/// modem rail is powered off or an IPO shutdown clears the trackers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimPresence {
    #[default]
    Unknown,
    Inserted,
    Absent,
}
