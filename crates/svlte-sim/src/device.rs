//! A complete simulated SVLTE device.
//!
//! Wires a real [`PowerStateEngine`] to fake modems and scripted oracles,
//! and runs the retry scheme synchronously: deferred tasks queue up in the
//! harness instead of a timer thread, and [`SimDevice::fire_retries`]
//! replays them on demand. This keeps integration tests deterministic — no
//! sleeping on wall-clock retry intervals.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::warn;

use svlte_common::events::{EngineEvent, PowerEvent, RetryTask};
use svlte_common::keys;
use svlte_common::models::{ModemKind, PhoneId, SimCardState, SlotId};
use svlte_power::engine::{Collaborators, PowerStateEngine};
use svlte_power::props::{MemPropertyStore, PropertyStore};
use svlte_power::topology::{SlotTopology, StaticTopology};
use svlte_power::PowerConfig;

use crate::fakes::{FakeModem, ScriptedCardOracle, ScriptedRatController, ScriptedRegulatory};

pub struct SimDevice {
    engine: PowerStateEngine,
    props: Arc<MemPropertyStore>,
    cards: Arc<ScriptedCardOracle>,
    rat: Arc<ScriptedRatController>,
    regulatory: Arc<ScriptedRegulatory>,
    modems: HashMap<(PhoneId, ModemKind), Arc<FakeModem>>,
    pending: VecDeque<RetryTask>,
    exhausted: Vec<PowerEvent>,
}

impl SimDevice {
    /// Standard SVLTE layout: two phones, CDMA subsystem on slot 0.
    pub fn svlte(config: PowerConfig) -> Self {
        Self::build(config, StaticTopology::svlte(2, SlotId(0)))
    }

    /// Plain GSM/LTE device with `phones` slots.
    pub fn gsm(config: PowerConfig, phones: usize) -> Self {
        Self::build(config, StaticTopology::gsm_only(phones))
    }

    fn build(config: PowerConfig, topology: StaticTopology) -> Self {
        let props = Arc::new(MemPropertyStore::new());
        let cards = Arc::new(ScriptedCardOracle::new());
        let rat = Arc::new(ScriptedRatController::new());
        let regulatory = Arc::new(ScriptedRegulatory::new(PhoneId(0)));

        let phone_count = topology.phone_count();
        let topology = Arc::new(topology);
        let engine = PowerStateEngine::new(
            config,
            Collaborators {
                props: props.clone(),
                topology: topology.clone(),
                cards: cards.clone(),
                rat: rat.clone(),
                regulatory: regulatory.clone(),
            },
        );

        let mut modems = HashMap::new();
        for p in 0..phone_count {
            let phone = PhoneId(p);
            for kind in topology.modem_kinds(phone) {
                let modem = Arc::new(FakeModem::new(kind));
                engine.register_modem(phone, modem.clone());
                modems.insert((phone, kind), modem);
            }
        }

        SimDevice {
            engine,
            props,
            cards,
            rat,
            regulatory,
            modems,
            pending: VecDeque::new(),
            exhausted: Vec::new(),
        }
    }

    // ─── World mutation ─────────────────────────────────────────────

    pub fn props(&self) -> &Arc<MemPropertyStore> {
        &self.props
    }

    pub fn cards(&self) -> &Arc<ScriptedCardOracle> {
        &self.cards
    }

    pub fn rat(&self) -> &Arc<ScriptedRatController> {
        &self.rat
    }

    pub fn regulatory(&self) -> &Arc<ScriptedRegulatory> {
        &self.regulatory
    }

    /// Announce (or retract) modem control channel readiness.
    pub fn set_md_ready(&self, ready: bool) {
        self.props.set(
            keys::EMD_STATUS_SENT,
            if ready { "1" } else { "0" },
        );
    }

    /// Seat a card: electrical detect, card type, and ICCID readout.
    pub fn insert_sim(&self, phone: PhoneId, iccid: &str, dual_tech: bool) {
        let slot = SlotId(phone.0);
        self.cards.set_present(slot, true);
        self.cards.set_dual_tech(slot, dual_tech);
        self.props.set(
            &keys::card_type(slot),
            if dual_tech { "usim+csim" } else { "usim" },
        );
        self.props.set(&keys::iccid(slot), iccid);
    }

    /// Pull a card: detect drops and the ICCID readout clears.
    pub fn remove_sim(&self, phone: PhoneId) {
        let slot = SlotId(phone.0);
        self.cards.set_present(slot, false);
        self.props.set(&keys::iccid(slot), "");
    }

    // ─── Event driving ──────────────────────────────────────────────

    /// Deliver one platform event to the engine.
    pub fn deliver(&mut self, event: PowerEvent) {
        let effects = self.engine.handle(event);
        self.absorb(effects);
    }

    /// Shorthand for a SIM-state-changed delivery.
    pub fn sim_state(&mut self, phone: PhoneId, state: SimCardState) {
        self.deliver(PowerEvent::SimStateChanged { phone, state });
    }

    /// Replay everything currently in the retry queue once. Returns how
    /// many tasks fired.
    pub fn fire_retries(&mut self) -> usize {
        let batch: Vec<RetryTask> = self.pending.drain(..).collect();
        let fired = batch.len();
        for task in batch {
            let effects = self.engine.handle_task(task);
            self.absorb(effects);
        }
        fired
    }

    /// Keep firing retry rounds until the queue drains or `max_rounds` is
    /// reached. Returns true if the queue drained.
    pub fn settle(&mut self, max_rounds: usize) -> bool {
        for _ in 0..max_rounds {
            if self.pending.is_empty() {
                return true;
            }
            self.fire_retries();
        }
        self.pending.is_empty()
    }

    pub fn pending_retries(&self) -> usize {
        self.pending.len()
    }

    /// Operations dropped after exhausting their retry budget.
    pub fn exhausted(&self) -> &[PowerEvent] {
        &self.exhausted
    }

    fn absorb(&mut self, effects: Vec<EngineEvent>) {
        for effect in effects {
            match effect {
                EngineEvent::RetryScheduled(task) => self.pending.push_back(task),
                EngineEvent::RetriesExhausted { event } => {
                    warn!(op = event.name(), "operation abandoned");
                    self.exhausted.push(event);
                }
            }
        }
    }

    // ─── Observation ────────────────────────────────────────────────

    pub fn modem(&self, phone: PhoneId, kind: ModemKind) -> &Arc<FakeModem> {
        self.modems
            .get(&(phone, kind))
            .unwrap_or_else(|| panic!("no {kind} modem for phone {phone}"))
    }

    pub fn modems(&self) -> impl Iterator<Item = (&(PhoneId, ModemKind), &Arc<FakeModem>)> {
        self.modems.iter()
    }

    pub fn engine(&self) -> &PowerStateEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PowerStateEngine {
        &mut self.engine
    }
}
