//! Timed scenarios replayed against a simulated device.
//!
//! A scenario is a list of steps, each pairing a timestamp offset with an
//! action. Scenarios are plain JSON so regression cases can be captured
//! from the field and replayed under the `svlte-sim-device` binary.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use svlte_common::events::PowerEvent;
use svlte_common::models::{PhoneId, PowerState, SimCardState};

use crate::device::SimDevice;

/// One scripted change to the simulated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Raw property write (readiness flags, engineering mode, ...).
    SetProperty { key: String, value: String },
    /// Seat a card in a phone's slot.
    InsertSim {
        phone: PhoneId,
        iccid: String,
        #[serde(default)]
        dual_tech: bool,
    },
    /// Pull the card from a phone's slot.
    RemoveSim { phone: PhoneId },
    /// Deliver a platform event to the engine.
    Deliver { event: PowerEvent },
    /// Replay whatever deferred retries are queued.
    FireRetries,
}

/// A timestamped scenario step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Offset from scenario start, used by the binary to pace replay.
    pub at_ms: u64,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("failed to parse scenario")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Apply every step in order, ignoring timestamps (deterministic replay
    /// for tests; the binary paces steps itself).
    pub fn run_on(&self, device: &mut SimDevice) {
        for step in &self.steps {
            apply(device, &step.action);
        }
    }

    /// Built-in demo: cold boot, cards appear, SIM events land before and
    /// after the readiness gates open, then an airplane-mode round trip.
    pub fn boot_and_attach(iccid0: String, iccid1: String) -> Self {
        let steps = vec![
            // SIM event arrives before the control channel is ready; the
            // engine must defer, not drop.
            Step {
                at_ms: 0,
                action: Action::InsertSim {
                    phone: PhoneId(0),
                    iccid: iccid0,
                    dual_tech: true,
                },
            },
            Step {
                at_ms: 10,
                action: Action::InsertSim {
                    phone: PhoneId(1),
                    iccid: iccid1,
                    dual_tech: false,
                },
            },
            Step {
                at_ms: 20,
                action: Action::Deliver {
                    event: PowerEvent::SetRadioPower {
                        power: PowerState::On,
                        phone: PhoneId(0),
                    },
                },
            },
            Step {
                at_ms: 200,
                action: Action::SetProperty {
                    key: svlte_common::keys::EMD_STATUS_SENT.into(),
                    value: "1".into(),
                },
            },
            Step {
                at_ms: 250,
                action: Action::FireRetries,
            },
            Step {
                at_ms: 300,
                action: Action::Deliver {
                    event: PowerEvent::SimStateChanged {
                        phone: PhoneId(1),
                        state: SimCardState::Ready,
                    },
                },
            },
            Step {
                at_ms: 500,
                action: Action::Deliver {
                    event: PowerEvent::AirplaneModeChanged { enabled: true },
                },
            },
            Step {
                at_ms: 900,
                action: Action::Deliver {
                    event: PowerEvent::AirplaneModeChanged { enabled: false },
                },
            },
            Step {
                at_ms: 950,
                action: Action::SetProperty {
                    key: svlte_common::keys::EMD_STATUS_SENT.into(),
                    value: "1".into(),
                },
            },
            Step {
                at_ms: 1000,
                action: Action::Deliver {
                    event: PowerEvent::SetRadioPower {
                        power: PowerState::On,
                        phone: PhoneId(1),
                    },
                },
            },
        ];
        Scenario {
            name: "boot_and_attach".into(),
            steps,
        }
    }
}

/// Apply a single action to the device.
pub fn apply(device: &mut SimDevice, action: &Action) {
    match action {
        Action::SetProperty { key, value } => {
            use svlte_power::props::PropertyStore;
            device.props().set(key, value);
        }
        Action::InsertSim {
            phone,
            iccid,
            dual_tech,
        } => device.insert_sim(*phone, iccid, *dual_tech),
        Action::RemoveSim { phone } => device.remove_sim(*phone),
        Action::Deliver { event } => device.deliver(event.clone()),
        Action::FireRetries => {
            device.fire_retries();
        }
    }
}
