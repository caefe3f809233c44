//! Typed failure surface of the power core.
//!
//! The engine itself never fails its caller — invalid input is a logged
//! no-op and unmet preconditions defer (see the design notes). These
//! variants cover the places where a caller can actually observe failure:
//! submitting to a stopped runtime, or resolving a handle that was never
//! registered.

use crate::models::{ModemKind, PhoneId};

#[derive(Debug, thiserror::Error)]
pub enum PowerError {
    #[error("invalid phone id {0}")]
    InvalidPhone(PhoneId),

    #[error("unsupported slot topology: {0} active slots")]
    UnsupportedTopology(usize),

    #[error("no {kind} modem handle registered for phone {phone}")]
    MissingHandle { phone: PhoneId, kind: ModemKind },

    #[error("power runtime is shut down")]
    Disconnected,
}
