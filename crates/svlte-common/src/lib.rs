//! Shared types for the svlte power subsystem.
//!
//! This crate contains:
//! - **Data models** — phone/slot identifiers, modem kinds, power and SIM states
//! - **Events** — inbound platform events and engine-emitted effects
//! - **Property keys** — semantic key builders for the device property store
//! - **Errors** — the typed failure surface of the core

pub mod error;
pub mod events;
pub mod keys;
pub mod models;
