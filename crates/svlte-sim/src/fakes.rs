//! Scriptable fakes for the collaborator seams.
//!
//! All fakes use interior mutability so a test can hold shared handles and
//! mutate the simulated world while the engine owns the trait objects.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use svlte_common::models::{ModemKind, PhoneId, PowerState, SlotId};
use svlte_power::driver::ModemHandle;
use svlte_power::platform::{CardOracle, RatController, Regulatory};

/// A modem control channel that records every command issued to it.
pub struct FakeModem {
    kind: ModemKind,
    modem_cmds: Mutex<Vec<PowerState>>,
    radio_cmds: Mutex<Vec<PowerState>>,
}

impl FakeModem {
    pub fn new(kind: ModemKind) -> Self {
        FakeModem {
            kind,
            modem_cmds: Mutex::new(Vec::new()),
            radio_cmds: Mutex::new(Vec::new()),
        }
    }

    /// Every modem rail command, in issue order.
    pub fn modem_cmds(&self) -> Vec<PowerState> {
        self.modem_cmds.lock().unwrap().clone()
    }

    /// Every radio command, in issue order.
    pub fn radio_cmds(&self) -> Vec<PowerState> {
        self.radio_cmds.lock().unwrap().clone()
    }

    /// Last commanded modem rail state, if any command was issued.
    pub fn modem_power(&self) -> Option<PowerState> {
        self.modem_cmds.lock().unwrap().last().copied()
    }

    /// Last commanded radio state, if any command was issued.
    pub fn radio_power(&self) -> Option<PowerState> {
        self.radio_cmds.lock().unwrap().last().copied()
    }
}

impl ModemHandle for FakeModem {
    fn kind(&self) -> ModemKind {
        self.kind
    }

    fn set_modem_power(&self, power: PowerState) -> anyhow::Result<()> {
        self.modem_cmds.lock().unwrap().push(power);
        Ok(())
    }

    fn set_radio_power(&self, power: PowerState) -> anyhow::Result<()> {
        self.radio_cmds.lock().unwrap().push(power);
        Ok(())
    }
}

/// Card oracle whose answers are scripted per slot.
#[derive(Default)]
pub struct ScriptedCardOracle {
    dual_tech: Mutex<HashSet<SlotId>>,
    present: Mutex<HashSet<SlotId>>,
}

impl ScriptedCardOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_dual_tech(&self, slot: SlotId, dual: bool) {
        let mut set = self.dual_tech.lock().unwrap();
        if dual {
            set.insert(slot);
        } else {
            set.remove(&slot);
        }
    }

    pub fn set_present(&self, slot: SlotId, present: bool) {
        let mut set = self.present.lock().unwrap();
        if present {
            set.insert(slot);
        } else {
            set.remove(&slot);
        }
    }
}

impl CardOracle for ScriptedCardOracle {
    fn is_dual_tech(&self, slot: SlotId) -> bool {
        self.dual_tech.lock().unwrap().contains(&slot)
    }

    fn physical_card_present(&self, slot: SlotId) -> bool {
        self.present.lock().unwrap().contains(&slot)
    }
}

/// RAT controller allowing everything unless told otherwise.
#[derive(Default)]
pub struct ScriptedRatController {
    deny: Mutex<HashSet<(PhoneId, ModemKind)>>,
    ecc: AtomicBool,
}

impl ScriptedRatController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_allowed(&self, phone: PhoneId, kind: ModemKind, allowed: bool) {
        let mut deny = self.deny.lock().unwrap();
        if allowed {
            deny.remove(&(phone, kind));
        } else {
            deny.insert((phone, kind));
        }
    }

    pub fn set_ecc(&self, in_progress: bool) {
        self.ecc.store(in_progress, Ordering::Relaxed);
    }
}

impl RatController for ScriptedRatController {
    fn radio_power_on_allowed(&self, phone: PhoneId, kind: ModemKind) -> bool {
        !self.deny.lock().unwrap().contains(&(phone, kind))
    }

    fn ecc_in_progress(&self) -> bool {
        self.ecc.load(Ordering::Relaxed)
    }
}

/// Regulatory oracle with a scripted CTA flag.
pub struct ScriptedRegulatory {
    cta: AtomicBool,
    main: PhoneId,
}

impl ScriptedRegulatory {
    pub fn new(main: PhoneId) -> Self {
        ScriptedRegulatory {
            cta: AtomicBool::new(false),
            main,
        }
    }

    pub fn set_cta(&self, active: bool) {
        self.cta.store(active, Ordering::Relaxed);
    }
}

impl Regulatory for ScriptedRegulatory {
    fn cta_mode_active(&self) -> bool {
        self.cta.load(Ordering::Relaxed)
    }

    fn main_capability_phone(&self) -> PhoneId {
        self.main
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_modem_records_commands() {
        let m = FakeModem::new(ModemKind::Lte);
        m.set_radio_power(PowerState::On).unwrap();
        m.set_radio_power(PowerState::Off).unwrap();
        assert_eq!(m.radio_cmds(), vec![PowerState::On, PowerState::Off]);
        assert_eq!(m.radio_power(), Some(PowerState::Off));
        assert_eq!(m.modem_power(), None);
    }

    #[test]
    fn card_oracle_scripting() {
        let c = ScriptedCardOracle::new();
        assert!(!c.physical_card_present(SlotId(0)));
        c.set_present(SlotId(0), true);
        c.set_dual_tech(SlotId(0), true);
        assert!(c.physical_card_present(SlotId(0)));
        assert!(c.is_dual_tech(SlotId(0)));
        c.set_present(SlotId(0), false);
        assert!(!c.physical_card_present(SlotId(0)));
    }

    #[test]
    fn rat_denies_per_handle() {
        let r = ScriptedRatController::new();
        assert!(r.radio_power_on_allowed(PhoneId(0), ModemKind::Lte));
        r.set_allowed(PhoneId(0), ModemKind::Lte, false);
        assert!(!r.radio_power_on_allowed(PhoneId(0), ModemKind::Lte));
        assert!(r.radio_power_on_allowed(PhoneId(0), ModemKind::C2k));
    }
}
