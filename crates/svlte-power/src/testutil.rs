//! Shared fakes for unit tests across the crate.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use svlte_common::models::{ModemKind, PhoneId, PowerState, SlotId};

use crate::driver::ModemHandle;
use crate::platform::{CardOracle, RatController, Regulatory};

/// Modem handle recording every command it was issued.
pub struct FakeHandle {
    kind: ModemKind,
    radio: Mutex<Vec<PowerState>>,
    modem: Mutex<Vec<PowerState>>,
}

impl FakeHandle {
    pub fn new(kind: ModemKind) -> Arc<Self> {
        Arc::new(FakeHandle {
            kind,
            radio: Mutex::new(Vec::new()),
            modem: Mutex::new(Vec::new()),
        })
    }

    pub fn radio_cmds(&self) -> Vec<PowerState> {
        self.radio.lock().unwrap().clone()
    }

    pub fn modem_cmds(&self) -> Vec<PowerState> {
        self.modem.lock().unwrap().clone()
    }
}

impl ModemHandle for FakeHandle {
    fn kind(&self) -> ModemKind {
        self.kind
    }

    fn set_modem_power(&self, power: PowerState) -> anyhow::Result<()> {
        self.modem.lock().unwrap().push(power);
        Ok(())
    }

    fn set_radio_power(&self, power: PowerState) -> anyhow::Result<()> {
        self.radio.lock().unwrap().push(power);
        Ok(())
    }
}

/// Scriptable card oracle.
#[derive(Default)]
pub struct ScriptCards {
    dual_tech: Mutex<HashSet<SlotId>>,
    present: Mutex<HashSet<SlotId>>,
}

impl ScriptCards {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
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

impl CardOracle for ScriptCards {
    fn is_dual_tech(&self, slot: SlotId) -> bool {
        self.dual_tech.lock().unwrap().contains(&slot)
    }

    fn physical_card_present(&self, slot: SlotId) -> bool {
        self.present.lock().unwrap().contains(&slot)
    }
}

/// Scriptable RAT controller.
#[derive(Default)]
pub struct ScriptRat {
    deny: Mutex<HashSet<(PhoneId, ModemKind)>>,
    ecc: AtomicBool,
}

impl ScriptRat {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deny(&self, phone: PhoneId, kind: ModemKind) {
        self.deny.lock().unwrap().insert((phone, kind));
    }

    pub fn set_ecc(&self, in_progress: bool) {
        self.ecc.store(in_progress, Ordering::Relaxed);
    }
}

impl RatController for ScriptRat {
    fn radio_power_on_allowed(&self, phone: PhoneId, kind: ModemKind) -> bool {
        !self.deny.lock().unwrap().contains(&(phone, kind))
    }

    fn ecc_in_progress(&self) -> bool {
        self.ecc.load(Ordering::Relaxed)
    }
}

/// Scriptable regulatory oracle.
pub struct ScriptRegulatory {
    cta: AtomicBool,
    main: PhoneId,
}

impl ScriptRegulatory {
    pub fn new(main: PhoneId) -> Arc<Self> {
        Arc::new(ScriptRegulatory {
            cta: AtomicBool::new(false),
            main,
        })
    }

    pub fn set_cta(&self, active: bool) {
        self.cta.store(active, Ordering::Relaxed);
    }
}

impl Regulatory for ScriptRegulatory {
    fn cta_mode_active(&self) -> bool {
        self.cta.load(Ordering::Relaxed)
    }

    fn main_capability_phone(&self) -> PhoneId {
        self.main
    }
}
