//! SVLTE radio/modem power-state coordination.
//!
//! Decides, per physical SIM slot and per logical modem, whether the modem
//! rail and the RF transmit enable should be ON or OFF, given asynchronous
//! platform signals (SIM card state, airplane mode, emergency calls, modem
//! readiness, ICCID availability), and drives the decision through the modem
//! handles. Preconditions that are not yet met defer the whole operation onto
//! a delay queue instead of failing.
//!
//! Layout:
//! - [`engine`] — the policy decision engine and its entry points
//! - [`gate`] — readiness precondition checks behind the retry scheme
//! - [`driver`] — routing of power decisions to per-technology modem handles
//! - [`tracker`] — per-slot SIM presence and the manual-off ICCID set
//! - [`runtime`] — serialized worker thread owning the engine and delay queue
//! - [`props`], [`topology`], [`platform`] — collaborator seams

pub mod config;
pub mod driver;
pub mod engine;
pub mod gate;
pub mod platform;
pub mod props;
pub mod runtime;
pub mod topology;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::PowerConfig;
pub use engine::{Collaborators, PowerStateEngine};
pub use runtime::PowerRuntime;
