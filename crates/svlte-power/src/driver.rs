//! Routing of power decisions to per-technology modem handles.
//!
//! The drivers' contract is "command issued", not "command completed" —
//! hardware acknowledgment is asynchronous and handled out of band. Radio
//! power-off is never gated; radio power-on passes the rat-controller
//! admission predicate per handle, and the C2K rail additionally requires
//! its engineering-mode and MD-status preconditions before being raised.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use svlte_common::error::PowerError;
use svlte_common::keys;
use svlte_common::models::{ModemKind, PhoneId, PowerState};

use crate::platform::RatController;
use crate::props::{flag_set, nonempty, PropertyStore};
use crate::topology::SlotTopology;

/// One modem control channel, per phone id and technology.
///
/// Implemented by the platform's modem binding in production and by
/// `FakeModem` in the simulation harness.
pub trait ModemHandle: Send + Sync {
    fn kind(&self) -> ModemKind;
    /// Command the hardware power rail. Returns once the command is issued.
    fn set_modem_power(&self, power: PowerState) -> anyhow::Result<()>;
    /// Command the RF transmit enable. Returns once the command is issued.
    fn set_radio_power(&self, power: PowerState) -> anyhow::Result<()>;
}

/// Pre-power gating for a handle, resolved from its technology. Replaces
/// the legacy proxy-object hierarchy with a tagged variant dispatched by
/// one decision function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerGate {
    /// LTE/GSM: power-on routes directly once admission passes.
    Plain,
    /// C2K: power-on also requires the CDMA preconditions.
    CdmaGated,
}

impl PowerGate {
    pub fn for_kind(kind: ModemKind) -> Self {
        match kind {
            ModemKind::Lte => PowerGate::Plain,
            ModemKind::C2k => PowerGate::CdmaGated,
        }
    }
}

/// Registered modem handles, keyed by phone id and technology.
#[derive(Default)]
pub struct HandleRegistry {
    handles: Mutex<HashMap<(PhoneId, ModemKind), Arc<dyn ModemHandle>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, phone: PhoneId, handle: Arc<dyn ModemHandle>) {
        let kind = handle.kind();
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((phone, kind), handle);
    }

    pub fn get(&self, phone: PhoneId, kind: ModemKind) -> Option<Arc<dyn ModemHandle>> {
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(phone, kind))
            .cloned()
    }
}

/// Drives modem rail power for a phone id across its technology handles.
pub struct ModemPowerDriver {
    registry: Arc<HandleRegistry>,
    props: Arc<dyn PropertyStore>,
    topology: Arc<dyn SlotTopology>,
}

impl ModemPowerDriver {
    pub fn new(
        registry: Arc<HandleRegistry>,
        props: Arc<dyn PropertyStore>,
        topology: Arc<dyn SlotTopology>,
    ) -> Self {
        ModemPowerDriver {
            registry,
            props,
            topology,
        }
    }

    /// Issue a modem rail command to every handle the phone id owns. The
    /// C2K rail is only raised after its own preconditions hold; a missing
    /// handle is a logged no-op, never a failure.
    pub fn set_modem_power(&self, power: PowerState, phone: PhoneId) {
        for kind in self.topology.modem_kinds(phone) {
            if power.is_on()
                && PowerGate::for_kind(kind) == PowerGate::CdmaGated
                && !self.c2k_rail_ready()
            {
                warn!(phone = %phone, "c2k preconditions unmet, leaving rail down");
                continue;
            }
            self.issue_modem(phone, kind, power);
        }
        self.props
            .set(&keys::modem_off(phone), if power.is_on() { "0" } else { "1" });
    }

    /// MD status announced and engineering mode known.
    fn c2k_rail_ready(&self) -> bool {
        flag_set(&*self.props, keys::EMD_STATUS_SENT)
            && nonempty(&*self.props, keys::ENGINEERING_MODE).is_some()
    }

    fn issue_modem(&self, phone: PhoneId, kind: ModemKind, power: PowerState) {
        let Some(handle) = self.registry.get(phone, kind) else {
            warn!(error = %PowerError::MissingHandle { phone, kind }, "dropping modem command");
            return;
        };
        if let Err(e) = handle.set_modem_power(power) {
            warn!(phone = %phone, kind = %kind, error = %e, "modem power command failed");
        } else {
            info!(phone = %phone, kind = %kind, power = %power, "modem power");
        }
    }
}

/// Drives radio (RF transmit) power for a phone id.
pub struct RadioPowerDriver {
    registry: Arc<HandleRegistry>,
    props: Arc<dyn PropertyStore>,
    topology: Arc<dyn SlotTopology>,
    rat: Arc<dyn RatController>,
}

impl RadioPowerDriver {
    pub fn new(
        registry: Arc<HandleRegistry>,
        props: Arc<dyn PropertyStore>,
        topology: Arc<dyn SlotTopology>,
        rat: Arc<dyn RatController>,
    ) -> Self {
        RadioPowerDriver {
            registry,
            props,
            topology,
            rat,
        }
    }

    /// Route a radio power decision to the correct handle(s).
    ///
    /// Power-off goes to every handle unconditionally. Power-on resolves its
    /// targets through [`Self::power_on_targets`] and drops any handle whose
    /// admission check fails — dropped, not deferred.
    pub fn set_radio_power(&self, power: PowerState, phone: PhoneId) {
        if !power.is_on() {
            for kind in self.topology.modem_kinds(phone) {
                self.issue_radio(phone, kind, PowerState::Off);
            }
            return;
        }
        for kind in self.power_on_targets(phone) {
            if !self.rat.radio_power_on_allowed(phone, kind) {
                debug!(phone = %phone, kind = %kind, "radio power-on disallowed, dropping");
                continue;
            }
            self.issue_radio(phone, kind, PowerState::On);
        }
    }

    /// Emergency path: issue to the phone's primary handle, skipping the
    /// admission predicate. On the CDMA-capable slot the primary handle is
    /// the C2K one; the engine fans out to the co-resident LTE handle for
    /// dual-technology cards.
    pub fn force_radio_power(&self, power: PowerState, phone: PhoneId) {
        let kind = if self.topology.is_cdma_phone(phone) {
            ModemKind::C2k
        } else {
            ModemKind::Lte
        };
        self.issue_radio(phone, kind, power);
    }

    /// Direct single-handle issue, used for the dual-technology force
    /// fan-out.
    pub fn issue_kind(&self, power: PowerState, phone: PhoneId, kind: ModemKind) {
        self.issue_radio(phone, kind, power);
    }

    /// The single power-on routing decision.
    ///
    /// On the CDMA-capable slot, engineering mode cdma-only selects the
    /// direct C2K path; any other mode takes the general dual-technology
    /// path powering both handles. A plain phone routes to its LTE handle.
    fn power_on_targets(&self, phone: PhoneId) -> Vec<ModemKind> {
        let kinds = self.topology.modem_kinds(phone);
        if !kinds.contains(&ModemKind::C2k) {
            return kinds;
        }
        let eng = nonempty(&*self.props, keys::ENGINEERING_MODE);
        if eng.as_deref() == Some(keys::ENG_MODE_CDMA_ONLY) {
            vec![ModemKind::C2k]
        } else {
            kinds
        }
    }

    fn issue_radio(&self, phone: PhoneId, kind: ModemKind, power: PowerState) {
        let Some(handle) = self.registry.get(phone, kind) else {
            warn!(error = %PowerError::MissingHandle { phone, kind }, "dropping radio command");
            return;
        };
        if let Err(e) = handle.set_radio_power(power) {
            warn!(phone = %phone, kind = %kind, error = %e, "radio power command failed");
        } else {
            info!(phone = %phone, kind = %kind, power = %power, "radio power");
        }
    }
}
