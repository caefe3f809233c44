//! The power-state decision engine.
//!
//! One engine exists per device boot. All entry points run on a single
//! serialized event-processing context (see [`crate::runtime`]); there is no
//! internal locking because no mutation is concurrent with a read. Entry
//! points mutate state, drive the power drivers, and return the effects the
//! owning runtime must act on — most importantly deferred retries for
//! preconditions that are not yet met.

use std::sync::Arc;

use tracing::{debug, info, warn};

use svlte_common::error::PowerError;
use svlte_common::events::{EngineEvent, PowerEvent, RetryTask};
use svlte_common::keys;
use svlte_common::models::{
    PhoneBitmap, PhoneId, PowerState, SimCardState, SimPresence,
};

use crate::config::PowerConfig;
use crate::driver::{HandleRegistry, ModemHandle, ModemPowerDriver, RadioPowerDriver};
use crate::gate::ReadinessGate;
use crate::platform::{CardOracle, RatController, Regulatory};
use crate::props::{flag_set, nonempty, PropertyStore};
use crate::topology::SlotTopology;
use crate::tracker::SimStatusTracker;

/// External collaborators the engine consults but never owns.
pub struct Collaborators {
    pub props: Arc<dyn PropertyStore>,
    pub topology: Arc<dyn SlotTopology>,
    pub cards: Arc<dyn CardOracle>,
    pub rat: Arc<dyn RatController>,
    pub regulatory: Arc<dyn Regulatory>,
}

/// Maps (SIM presence, airplane mode, emergency flag, manual-off preference,
/// readiness gates, regulatory mode) to power actions per phone id.
pub struct PowerStateEngine {
    config: PowerConfig,
    props: Arc<dyn PropertyStore>,
    topology: Arc<dyn SlotTopology>,
    cards: Arc<dyn CardOracle>,
    rat: Arc<dyn RatController>,
    regulatory: Arc<dyn Regulatory>,
    registry: Arc<HandleRegistry>,
    tracker: SimStatusTracker,
    gate: ReadinessGate,
    modem_driver: ModemPowerDriver,
    radio_driver: RadioPowerDriver,
    airplane_mode: bool,
}

impl PowerStateEngine {
    pub fn new(config: PowerConfig, collab: Collaborators) -> Self {
        let Collaborators {
            props,
            topology,
            cards,
            rat,
            regulatory,
        } = collab;

        let registry = Arc::new(HandleRegistry::new());
        let gate = ReadinessGate::new(props.clone(), config.max_retry_attempts);
        let tracker = SimStatusTracker::new(topology.clone());
        let modem_driver =
            ModemPowerDriver::new(registry.clone(), props.clone(), topology.clone());
        let radio_driver = RadioPowerDriver::new(
            registry.clone(),
            props.clone(),
            topology.clone(),
            rat.clone(),
        );
        // Airplane mode survives reboots through the property store.
        let airplane_mode = flag_set(&*props, keys::AIRPLANE_MODE);

        PowerStateEngine {
            config,
            props,
            topology,
            cards,
            rat,
            regulatory,
            registry,
            tracker,
            gate,
            modem_driver,
            radio_driver,
            airplane_mode,
        }
    }

    /// Register the modem handle for a phone id's technology. A SVLTE phone
    /// registers two handles, one per kind.
    pub fn register_modem(&self, phone: PhoneId, handle: Arc<dyn ModemHandle>) {
        self.registry.register(phone, handle);
    }

    pub fn config(&self) -> &PowerConfig {
        &self.config
    }

    pub fn airplane_mode(&self) -> bool {
        self.airplane_mode
    }

    pub fn tracker(&self) -> &SimStatusTracker {
        &self.tracker
    }

    /// Manual-off preference mutation path (external to the decision flow).
    pub fn tracker_mut(&mut self) -> &mut SimStatusTracker {
        &mut self.tracker
    }

    // ─── Event dispatch ─────────────────────────────────────────────

    /// Process a fresh platform event.
    pub fn handle(&mut self, event: PowerEvent) -> Vec<EngineEvent> {
        self.handle_task(RetryTask::fresh(event))
    }

    /// Process an event, fresh or replayed from the delay queue. Conditions
    /// are re-derived from current state; only the payload was captured.
    pub fn handle_task(&mut self, task: RetryTask) -> Vec<EngineEvent> {
        let attempt = task.attempt;
        match task.event {
            PowerEvent::SetRadioPower { power, phone } => {
                self.radio_power_impl(power, phone, attempt)
            }
            PowerEvent::ForceRadioPower { power, phone } => {
                self.force_radio_power_impl(power, phone, attempt)
            }
            PowerEvent::SetModemPower { power, phones } => self.modem_power_impl(power, phones),
            PowerEvent::SimStateChanged { phone, state } => {
                self.sim_state_impl(phone, state, attempt)
            }
            PowerEvent::AirplaneModeChanged { enabled } => self.airplane_impl(enabled),
            PowerEvent::RadioAvailable { phone } => self.radio_available_impl(phone),
            PowerEvent::IpoShutdown => self.ipo_shutdown_impl(),
        }
    }

    // ─── Entry points ───────────────────────────────────────────────

    /// Guarded radio power request for one phone.
    pub fn set_radio_power(&mut self, power: PowerState, phone: PhoneId) -> Vec<EngineEvent> {
        self.handle(PowerEvent::SetRadioPower { power, phone })
    }

    /// Emergency-path radio power, bypassing SIM and preference checks.
    pub fn force_set_radio_power(&mut self, power: PowerState, phone: PhoneId) -> Vec<EngineEvent> {
        self.handle(PowerEvent::ForceRadioPower { power, phone })
    }

    /// Modem rail power for every phone selected by the bitmap.
    pub fn set_modem_power(&mut self, power: PowerState, phones: PhoneBitmap) -> Vec<EngineEvent> {
        self.handle(PowerEvent::SetModemPower { power, phones })
    }

    /// SIM-state-changed notification.
    pub fn on_sim_state_changed(
        &mut self,
        phone: PhoneId,
        state: SimCardState,
    ) -> Vec<EngineEvent> {
        self.handle(PowerEvent::SimStateChanged { phone, state })
    }

    /// Airplane-mode-changed notification.
    pub fn notify_airplane_mode_change(&mut self, enabled: bool) -> Vec<EngineEvent> {
        self.handle(PowerEvent::AirplaneModeChanged { enabled })
    }

    /// Boot-time radio-available notification.
    pub fn notify_radio_available(&mut self, phone: PhoneId) -> Vec<EngineEvent> {
        self.handle(PowerEvent::RadioAvailable { phone })
    }

    /// IPO shutdown notification.
    pub fn on_ipo_shutdown(&mut self) -> Vec<EngineEvent> {
        self.handle(PowerEvent::IpoShutdown)
    }

    // ─── set_radio_power ────────────────────────────────────────────

    fn radio_power_impl(
        &mut self,
        requested: PowerState,
        phone: PhoneId,
        attempt: u32,
    ) -> Vec<EngineEvent> {
        if !self.valid_phone(phone) {
            return Vec::new();
        }

        // 1. The modem control channel must have announced readiness.
        if !self.gate.check_ready(keys::EMD_STATUS_SENT) {
            debug!(phone = %phone, "md status not sent, deferring radio power");
            return vec![self.gate.defer(RetryTask {
                event: PowerEvent::SetRadioPower {
                    power: requested,
                    phone,
                },
                attempt,
            })];
        }

        // 2. Airplane mode owns power state while flight-mode power-off is on.
        if self.airplane_mode && self.config.flight_mode_power_off {
            info!(phone = %phone, "airplane mode active, suppressing radio power request");
            return Vec::new();
        }

        // 3. Never re-power radio on a powered-off modem.
        if flag_set(&*self.props, &keys::modem_off(phone)) {
            info!(phone = %phone, "modem is powered off, suppressing radio power request");
            return Vec::new();
        }

        // 4. The ICCID readout must have completed.
        let slot = self.topology.slot_of(phone);
        let Some(iccid) = nonempty(&*self.props, &keys::iccid(slot)) else {
            debug!(phone = %phone, "iccid not readable yet, deferring radio power");
            return vec![self.gate.defer(RetryTask {
                event: PowerEvent::SetRadioPower {
                    power: requested,
                    phone,
                },
                attempt,
            })];
        };

        // Preconditions passed; record what the card-detect layer sees now.
        let detected = self.cards.physical_card_present(slot);
        self.tracker.set_presence(
            phone,
            if detected {
                SimPresence::Inserted
            } else {
                SimPresence::Absent
            },
        );

        let mut power = requested;
        if power.is_on() && self.tracker.is_manual_off(&iccid) {
            info!(phone = %phone, "iccid is user-disabled, forcing radio off");
            power = PowerState::Off;
        }

        if self.tracker.presence(slot) != SimPresence::Inserted {
            // CTA: keep one radio reachable even with no SIM. Checked before
            // the emergency override; when both hold, the redirect wins.
            if self.regulatory.cta_mode_active() {
                let main = self.regulatory.main_capability_phone();
                info!(phone = %phone, main = %main, "no sim + cta, redirecting radio on to main phone");
                self.radio_driver.set_radio_power(PowerState::On, main);
                return Vec::new();
            }
            if self.rat.ecc_in_progress() {
                info!(phone = %phone, "no sim but emergency call in progress, honoring request");
                self.radio_driver.set_radio_power(power, phone);
                return Vec::new();
            }
            debug!(phone = %phone, "no sim inserted, forcing radio off");
            self.radio_driver.set_radio_power(PowerState::Off, phone);
            return Vec::new();
        }

        // SIM inserted: keep the persisted multi-SIM setting in step, unless
        // this slot belongs to the inactive dual-mode technology.
        if !self.topology.is_inactive_svlte_phone(phone) {
            self.props.set(&keys::msim_mode(slot), power.as_flag());
        }

        self.radio_driver.set_radio_power(power, phone);
        Vec::new()
    }

    // ─── force_set_radio_power ──────────────────────────────────────

    fn force_radio_power_impl(
        &mut self,
        power: PowerState,
        phone: PhoneId,
        attempt: u32,
    ) -> Vec<EngineEvent> {
        if !self.valid_phone(phone) {
            return Vec::new();
        }

        if !self.gate.check_ready(keys::EMD_STATUS_SENT) {
            debug!(phone = %phone, "md status not sent, deferring forced radio power");
            return vec![self.gate.defer(RetryTask {
                event: PowerEvent::ForceRadioPower { power, phone },
                attempt,
            })];
        }

        let slot = self.topology.slot_of(phone);
        let detected = self.cards.physical_card_present(slot);
        self.tracker.set_presence(
            phone,
            if detected {
                SimPresence::Inserted
            } else {
                SimPresence::Absent
            },
        );

        self.radio_driver.force_radio_power(power, phone);

        // A dual-technology card carries both identities: drive the
        // co-resident LTE handle to the same state.
        if self.topology.is_cdma_phone(phone) && self.cards.is_dual_tech(slot) {
            info!(phone = %phone, power = %power, "dual-technology card, mirroring lte handle");
            self.radio_driver
                .issue_kind(power, phone, svlte_common::models::ModemKind::Lte);
        }
        Vec::new()
    }

    // ─── set_modem_power ────────────────────────────────────────────

    fn modem_power_impl(&mut self, power: PowerState, phones: PhoneBitmap) -> Vec<EngineEvent> {
        let count = self.topology.phone_count();
        // Triple-SIM and beyond is outside this subsystem; a no-op, not an
        // error.
        if count > 2 {
            info!(
                reason = %PowerError::UnsupportedTopology(count),
                "ignoring modem power request"
            );
            return Vec::new();
        }
        for phone in phones.iter(count) {
            self.modem_driver.set_modem_power(power, phone);
            if !power.is_on() {
                // Presence is unknowable while the rail is down.
                self.tracker.reset(phone);
            }
        }
        Vec::new()
    }

    // ─── notify_radio_available ─────────────────────────────────────

    fn radio_available_impl(&mut self, phone: PhoneId) -> Vec<EngineEvent> {
        if !self.valid_phone(phone) {
            return Vec::new();
        }
        let crypt_keeper = flag_set(&*self.props, keys::CRYPT_KEEPER_BOOT);
        if self.airplane_mode && self.config.flight_mode_power_off && !crypt_keeper {
            info!(phone = %phone, "radio available during airplane mode, powering modem off");
            return self.modem_power_impl(PowerState::Off, PhoneBitmap::single(phone));
        }
        Vec::new()
    }

    // ─── notify_airplane_mode_change ────────────────────────────────

    fn airplane_impl(&mut self, enabled: bool) -> Vec<EngineEvent> {
        if enabled == self.airplane_mode {
            debug!(enabled, "duplicate airplane mode notification, ignoring");
            return Vec::new();
        }
        info!(enabled, "airplane mode changed");
        self.airplane_mode = enabled;
        self.props
            .set(keys::AIRPLANE_MODE, PowerState::from(enabled).as_flag());

        let count = self.topology.phone_count();
        let power = PowerState::from(!enabled);

        if self.config.flight_mode_power_off {
            // Suppress user-visible reboot side effects in the driver layer
            // before the rails move.
            for phone in (0..count).map(PhoneId) {
                self.props.set(&keys::silent_reboot(phone), "1");
            }
            let events = self.modem_power_impl(power, PhoneBitmap::all(count));
            // The control channel re-announces after the rails move; force
            // the next radio request to re-validate.
            self.props.set(keys::EMD_STATUS_SENT, "0");
            events
        } else if self.config.msim_supported {
            let mut events = Vec::new();
            for phone in (0..count).map(PhoneId) {
                events.extend(self.radio_power_impl(power, phone, 0));
            }
            events
        } else {
            Vec::new()
        }
    }

    // ─── on_sim_state_changed ───────────────────────────────────────

    fn sim_state_impl(
        &mut self,
        phone: PhoneId,
        state: SimCardState,
        attempt: u32,
    ) -> Vec<EngineEvent> {
        if !self.valid_phone(phone) {
            return Vec::new();
        }
        if !self.card_detection_complete() {
            info!(phone = %phone, state = %state, "card detection incomplete, ignoring sim state");
            return Vec::new();
        }

        let slot = self.topology.slot_of(phone);
        match state {
            SimCardState::Ready | SimCardState::Locked | SimCardState::Loaded => {
                self.tracker.set_presence(phone, SimPresence::Inserted);

                if nonempty(&*self.props, &keys::iccid(slot)).is_none() {
                    // On the CDMA slot a dual-technology card's ICCID readout
                    // lags the LOADED event; replay the whole event later.
                    if state == SimCardState::Loaded
                        && self.topology.is_cdma_phone(phone)
                        && self.cards.is_dual_tech(slot)
                    {
                        debug!(phone = %phone, "iccid lagging card load, deferring sim event");
                        return vec![self.gate.defer(RetryTask {
                            event: PowerEvent::SimStateChanged { phone, state },
                            attempt,
                        })];
                    }
                    return Vec::new();
                }

                if self.airplane_mode {
                    Vec::new()
                } else {
                    self.radio_power_impl(PowerState::On, phone, 0)
                }
            }
            SimCardState::Absent => {
                // The CDMA slot reports transient ABSENT while switching
                // identities; trust the electrical detect over the RIL.
                if self.topology.is_cdma_phone(phone) && self.cards.physical_card_present(slot) {
                    debug!(phone = %phone, "absent reported but card still detected, ignoring");
                    return Vec::new();
                }
                self.tracker.set_presence(phone, SimPresence::Absent);
                if self.airplane_mode {
                    Vec::new()
                } else {
                    self.radio_power_impl(PowerState::Off, phone, 0)
                }
            }
        }
    }

    // ─── on_ipo_shutdown ────────────────────────────────────────────

    fn ipo_shutdown_impl(&mut self) -> Vec<EngineEvent> {
        info!("ipo shutdown, clearing card readiness state");
        for key in keys::CARD_RESET {
            self.props.set(key, "0");
        }
        self.props.set(keys::EMD_STATUS_SENT, "0");
        self.tracker.reset_all();
        self.airplane_mode = flag_set(&*self.props, keys::AIRPLANE_MODE);
        Vec::new()
    }

    // ─── Helpers ────────────────────────────────────────────────────

    fn valid_phone(&self, phone: PhoneId) -> bool {
        if phone.0 >= self.topology.phone_count() {
            warn!(error = %PowerError::InvalidPhone(phone), "ignoring request");
            return false;
        }
        true
    }

    /// The configured SIM count must match the number of slots whose card
    /// type has been detected, otherwise SIM events are premature.
    fn card_detection_complete(&self) -> bool {
        let detected = (0..self.topology.phone_count())
            .filter(|&s| {
                nonempty(
                    &*self.props,
                    &keys::card_type(self.topology.slot_of(PhoneId(s))),
                )
                .is_some()
            })
            .count();
        detected == self.config.sim_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::MemPropertyStore;
    use crate::testutil::{FakeHandle, ScriptCards, ScriptRat, ScriptRegulatory};
    use crate::topology::StaticTopology;
    use svlte_common::models::{ModemKind, SlotId};

    struct Rig {
        engine: PowerStateEngine,
        props: Arc<MemPropertyStore>,
        cards: Arc<ScriptCards>,
        rat: Arc<ScriptRat>,
        regulatory: Arc<ScriptRegulatory>,
        lte0: Arc<FakeHandle>,
        c2k0: Arc<FakeHandle>,
        lte1: Arc<FakeHandle>,
    }

    fn rig_with(config: PowerConfig, topology: StaticTopology, airplane_persisted: bool) -> Rig {
        let props = Arc::new(MemPropertyStore::new());
        if airplane_persisted {
            props.set(keys::AIRPLANE_MODE, "1");
        }
        let cards = ScriptCards::new();
        let rat = ScriptRat::new();
        let regulatory = ScriptRegulatory::new(PhoneId(0));

        let engine = PowerStateEngine::new(
            config,
            Collaborators {
                props: props.clone(),
                topology: Arc::new(topology),
                cards: cards.clone(),
                rat: rat.clone(),
                regulatory: regulatory.clone(),
            },
        );

        let lte0 = FakeHandle::new(ModemKind::Lte);
        let c2k0 = FakeHandle::new(ModemKind::C2k);
        let lte1 = FakeHandle::new(ModemKind::Lte);
        engine.register_modem(PhoneId(0), lte0.clone());
        engine.register_modem(PhoneId(0), c2k0.clone());
        engine.register_modem(PhoneId(1), lte1.clone());

        Rig {
            engine,
            props,
            cards,
            rat,
            regulatory,
            lte0,
            c2k0,
            lte1,
        }
    }

    /// Standard SVLTE device: CDMA on slot 0, two phones.
    fn svlte_rig() -> Rig {
        rig_with(
            PowerConfig::default(),
            StaticTopology::svlte(2, SlotId(0)),
            false,
        )
    }

    /// Open every gate and seat cards in both slots.
    fn boot_ready(rig: &Rig) {
        rig.props.set(keys::EMD_STATUS_SENT, "1");
        for s in 0..2 {
            rig.props.set(&keys::card_type(SlotId(s)), "usim");
            rig.props.set(&keys::iccid(SlotId(s)), &format!("898600000{s}"));
            rig.cards.set_present(SlotId(s), true);
        }
    }

    // ─── Readiness gating ───────────────────────────────────────────

    #[test]
    fn radio_power_defers_until_md_status_sent() {
        let mut rig = svlte_rig();
        let fx = rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        assert!(matches!(
            fx.as_slice(),
            [EngineEvent::RetryScheduled(t)] if t.attempt == 1
        ));
        assert!(rig.lte1.radio_cmds().is_empty());
    }

    #[test]
    fn radio_power_defers_until_iccid_readable() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.props.set(&keys::iccid(SlotId(1)), "");
        let fx = rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        assert!(matches!(fx.as_slice(), [EngineEvent::RetryScheduled(_)]));
        assert!(rig.lte1.radio_cmds().is_empty());
    }

    #[test]
    fn replay_reevaluates_current_state() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.props.set(keys::EMD_STATUS_SENT, "0");

        let fx = rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        let task = match fx.into_iter().next() {
            Some(EngineEvent::RetryScheduled(task)) => task,
            other => panic!("expected deferral, got {other:?}"),
        };

        // Gate opens, but the card was pulled in the meantime; the ICCID
        // property is stale.
        rig.props.set(keys::EMD_STATUS_SENT, "1");
        rig.cards.set_present(SlotId(1), false);

        rig.engine.handle_task(task);
        assert_eq!(
            rig.lte1.radio_cmds(),
            vec![PowerState::Off],
            "replay must re-derive state, not apply the captured ON"
        );
    }

    #[test]
    fn retries_exhaust_at_the_cap() {
        let mut rig = rig_with(
            PowerConfig {
                max_retry_attempts: Some(1),
                ..PowerConfig::default()
            },
            StaticTopology::svlte(2, SlotId(0)),
            false,
        );
        let fx = rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        let task = match fx.into_iter().next() {
            Some(EngineEvent::RetryScheduled(task)) => task,
            other => panic!("expected deferral, got {other:?}"),
        };
        let fx = rig.engine.handle_task(task);
        assert!(matches!(
            fx.as_slice(),
            [EngineEvent::RetriesExhausted { .. }]
        ));
    }

    // ─── Suppression rules ──────────────────────────────────────────

    #[test]
    fn airplane_mode_suppresses_radio_requests() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.engine.notify_airplane_mode_change(true);
        // The control channel re-announced readiness since the flip.
        rig.props.set(keys::EMD_STATUS_SENT, "1");

        let before = rig.lte1.radio_cmds().len();
        let fx = rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        assert!(fx.is_empty(), "suppressed, not deferred");
        assert_eq!(rig.lte1.radio_cmds().len(), before);
    }

    #[test]
    fn powered_off_modem_suppresses_radio_requests() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.props.set(&keys::modem_off(PhoneId(1)), "1");
        let fx = rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        assert!(fx.is_empty());
        assert!(rig.lte1.radio_cmds().is_empty());
    }

    #[test]
    fn invalid_phone_is_ignored() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        let fx = rig.engine.set_radio_power(PowerState::On, PhoneId(5));
        assert!(fx.is_empty());
    }

    // ─── Manual-off preference ──────────────────────────────────────

    #[test]
    fn manual_off_iccid_forces_radio_off() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.engine.tracker_mut().mark_manual_off("8986000001");

        rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        assert_eq!(rig.lte1.radio_cmds(), vec![PowerState::Off]);
        // The persisted multi-SIM setting records the overridden state.
        assert_eq!(
            rig.props.get(&keys::msim_mode(SlotId(1))).as_deref(),
            Some("0")
        );
    }

    // ─── CTA / emergency overrides ──────────────────────────────────

    #[test]
    fn cta_redirects_power_on_to_main_phone() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.cards.set_present(SlotId(1), false);
        rig.regulatory.set_cta(true);

        rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        assert!(rig.lte1.radio_cmds().is_empty(), "requested id is skipped");
        assert_eq!(rig.lte0.radio_cmds(), vec![PowerState::On]);
        assert_eq!(rig.c2k0.radio_cmds(), vec![PowerState::On]);
    }

    #[test]
    fn emergency_call_honors_requested_power() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.cards.set_present(SlotId(1), false);
        rig.rat.set_ecc(true);

        rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        assert_eq!(rig.lte1.radio_cmds(), vec![PowerState::On]);
    }

    #[test]
    fn cta_takes_precedence_over_emergency_call() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.cards.set_present(SlotId(1), false);
        rig.regulatory.set_cta(true);
        rig.rat.set_ecc(true);

        rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        assert!(rig.lte1.radio_cmds().is_empty());
        assert_eq!(rig.lte0.radio_cmds(), vec![PowerState::On]);
    }

    #[test]
    fn no_sim_and_no_override_forces_off() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.cards.set_present(SlotId(1), false);

        rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        assert_eq!(rig.lte1.radio_cmds(), vec![PowerState::Off]);
    }

    // ─── Forced power ───────────────────────────────────────────────

    #[test]
    fn force_power_defers_until_md_ready() {
        let mut rig = svlte_rig();
        let fx = rig.engine.force_set_radio_power(PowerState::Off, PhoneId(0));
        assert!(matches!(fx.as_slice(), [EngineEvent::RetryScheduled(_)]));
    }

    #[test]
    fn force_power_on_dual_tech_card_mirrors_lte_handle() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.cards.set_dual_tech(SlotId(0), true);

        rig.engine.force_set_radio_power(PowerState::On, PhoneId(0));
        assert_eq!(rig.c2k0.radio_cmds(), vec![PowerState::On]);
        assert_eq!(rig.lte0.radio_cmds(), vec![PowerState::On]);
    }

    #[test]
    fn force_power_on_plain_card_targets_primary_only() {
        let mut rig = svlte_rig();
        boot_ready(&rig);

        rig.engine.force_set_radio_power(PowerState::On, PhoneId(0));
        assert_eq!(rig.c2k0.radio_cmds(), vec![PowerState::On]);
        assert!(rig.lte0.radio_cmds().is_empty());
    }

    // ─── Airplane mode ──────────────────────────────────────────────

    #[test]
    fn airplane_enable_is_idempotent() {
        let mut rig = svlte_rig();
        boot_ready(&rig);

        rig.engine.notify_airplane_mode_change(true);
        rig.engine.notify_airplane_mode_change(true);

        assert_eq!(
            rig.lte1.modem_cmds(),
            vec![PowerState::Off],
            "exactly one power-off sequence for duplicate notifications"
        );
        assert_eq!(rig.props.get(keys::EMD_STATUS_SENT).as_deref(), Some("0"));
        assert_eq!(
            rig.props
                .get(&keys::silent_reboot(PhoneId(0)))
                .as_deref(),
            Some("1")
        );
        assert_eq!(rig.props.get(keys::AIRPLANE_MODE).as_deref(), Some("1"));
    }

    #[test]
    fn airplane_roundtrip_restores_modem_power() {
        let mut rig = svlte_rig();
        boot_ready(&rig);

        rig.engine.notify_airplane_mode_change(true);
        rig.engine.notify_airplane_mode_change(false);

        assert_eq!(rig.lte1.modem_cmds(), vec![PowerState::Off, PowerState::On]);
        // The C2K rail stays down until the control channel re-announces.
        assert_eq!(rig.c2k0.modem_cmds(), vec![PowerState::Off]);
        assert!(!rig.engine.airplane_mode());
    }

    #[test]
    fn airplane_without_power_off_toggles_radio_instead() {
        let mut rig = rig_with(
            PowerConfig {
                flight_mode_power_off: false,
                ..PowerConfig::default()
            },
            StaticTopology::svlte(2, SlotId(0)),
            false,
        );
        boot_ready(&rig);

        rig.engine.notify_airplane_mode_change(true);
        assert!(rig.lte1.modem_cmds().is_empty(), "modem rails untouched");
        assert_eq!(rig.lte1.radio_cmds(), vec![PowerState::Off]);
        assert_eq!(rig.lte0.radio_cmds(), vec![PowerState::Off]);
        assert_eq!(rig.c2k0.radio_cmds(), vec![PowerState::Off]);
    }

    // ─── SIM state events ───────────────────────────────────────────

    #[test]
    fn sim_ready_event_powers_radio_on() {
        let mut rig = svlte_rig();
        boot_ready(&rig);

        rig.engine
            .on_sim_state_changed(PhoneId(1), SimCardState::Ready);
        assert_eq!(rig.lte1.radio_cmds(), vec![PowerState::On]);
        assert_eq!(
            rig.engine.tracker().presence_of_phone(PhoneId(1)),
            SimPresence::Inserted
        );
    }

    #[test]
    fn sim_event_ignored_until_card_detection_completes() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.props.set(&keys::card_type(SlotId(1)), "");

        let fx = rig
            .engine
            .on_sim_state_changed(PhoneId(1), SimCardState::Ready);
        assert!(fx.is_empty());
        assert!(rig.lte1.radio_cmds().is_empty());
        assert_eq!(
            rig.engine.tracker().presence_of_phone(PhoneId(1)),
            SimPresence::Unknown
        );
    }

    #[test]
    fn loaded_dual_tech_card_with_lagging_iccid_defers() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.props.set(&keys::iccid(SlotId(0)), "");
        rig.cards.set_dual_tech(SlotId(0), true);

        let fx = rig
            .engine
            .on_sim_state_changed(PhoneId(0), SimCardState::Loaded);
        assert!(matches!(
            fx.as_slice(),
            [EngineEvent::RetryScheduled(t)]
                if matches!(t.event, PowerEvent::SimStateChanged { .. })
        ));
        assert_eq!(
            rig.engine.tracker().presence_of_phone(PhoneId(0)),
            SimPresence::Inserted
        );
    }

    #[test]
    fn ready_without_iccid_does_nothing_this_cycle() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.props.set(&keys::iccid(SlotId(1)), "");

        let fx = rig
            .engine
            .on_sim_state_changed(PhoneId(1), SimCardState::Ready);
        assert!(fx.is_empty());
        assert!(rig.lte1.radio_cmds().is_empty());
    }

    #[test]
    fn absent_on_cdma_slot_with_card_detected_is_ignored() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.engine
            .on_sim_state_changed(PhoneId(0), SimCardState::Ready);
        let radio_cmds = rig.c2k0.radio_cmds();

        rig.engine
            .on_sim_state_changed(PhoneId(0), SimCardState::Absent);
        assert_eq!(
            rig.engine.tracker().presence_of_phone(PhoneId(0)),
            SimPresence::Inserted,
            "presence must not flap while the card is still detected"
        );
        assert_eq!(rig.c2k0.radio_cmds(), radio_cmds, "no extra commands");
    }

    #[test]
    fn absent_with_card_gone_powers_radio_off() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.cards.set_present(SlotId(1), false);

        rig.engine
            .on_sim_state_changed(PhoneId(1), SimCardState::Absent);
        assert_eq!(
            rig.engine.tracker().presence_of_phone(PhoneId(1)),
            SimPresence::Absent
        );
        assert_eq!(rig.lte1.radio_cmds(), vec![PowerState::Off]);
    }

    // ─── Modem power ────────────────────────────────────────────────

    #[test]
    fn modem_power_off_resets_presence_and_blocks_radio() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.engine
            .on_sim_state_changed(PhoneId(1), SimCardState::Ready);

        rig.engine
            .set_modem_power(PowerState::Off, PhoneBitmap::single(PhoneId(1)));
        assert_eq!(rig.lte1.modem_cmds(), vec![PowerState::Off]);
        assert_eq!(
            rig.engine.tracker().presence_of_phone(PhoneId(1)),
            SimPresence::Unknown
        );

        // Radio requests are now absorbed until the rail comes back.
        let before = rig.lte1.radio_cmds().len();
        rig.engine.set_radio_power(PowerState::On, PhoneId(1));
        assert_eq!(rig.lte1.radio_cmds().len(), before);
    }

    #[test]
    fn cdma_phone_modem_power_drives_both_handles() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.props.set(keys::ENGINEERING_MODE, "auto");

        rig.engine
            .set_modem_power(PowerState::On, PhoneBitmap::single(PhoneId(0)));
        assert_eq!(rig.lte0.modem_cmds(), vec![PowerState::On]);
        assert_eq!(rig.c2k0.modem_cmds(), vec![PowerState::On]);
    }

    #[test]
    fn triple_sim_topology_is_a_noop() {
        let mut rig = rig_with(
            PowerConfig::default(),
            StaticTopology::gsm_only(3),
            false,
        );
        boot_ready(&rig);

        let fx = rig.engine.set_modem_power(PowerState::Off, PhoneBitmap::all(3));
        assert!(fx.is_empty());
        assert!(rig.lte0.modem_cmds().is_empty());
        assert!(rig.lte1.modem_cmds().is_empty());
    }

    // ─── Boot / shutdown notifications ──────────────────────────────

    #[test]
    fn radio_available_in_airplane_boot_powers_modem_off() {
        let mut rig = rig_with(
            PowerConfig::default(),
            StaticTopology::svlte(2, SlotId(0)),
            true,
        );
        rig.engine.notify_radio_available(PhoneId(0));
        assert_eq!(rig.lte0.modem_cmds(), vec![PowerState::Off]);
        assert_eq!(rig.c2k0.modem_cmds(), vec![PowerState::Off]);
    }

    #[test]
    fn crypt_keeper_boot_leaves_modems_alone() {
        let mut rig = rig_with(
            PowerConfig::default(),
            StaticTopology::svlte(2, SlotId(0)),
            true,
        );
        rig.props.set(keys::CRYPT_KEEPER_BOOT, "1");
        rig.engine.notify_radio_available(PhoneId(1));
        assert!(rig.lte1.modem_cmds().is_empty());
    }

    #[test]
    fn ipo_shutdown_clears_readiness_state() {
        let mut rig = svlte_rig();
        boot_ready(&rig);
        rig.engine
            .on_sim_state_changed(PhoneId(1), SimCardState::Ready);

        rig.engine.on_ipo_shutdown();
        for key in keys::CARD_RESET {
            assert_eq!(rig.props.get(key).as_deref(), Some("0"));
        }
        assert_eq!(rig.props.get(keys::EMD_STATUS_SENT).as_deref(), Some("0"));
        assert_eq!(
            rig.engine.tracker().presence_of_phone(PhoneId(1)),
            SimPresence::Unknown
        );
    }

    // ─── Dual-mode slot arbitration ─────────────────────────────────

    #[test]
    fn inactive_dual_mode_slot_skips_msim_refresh() {
        let mut rig = rig_with(
            PowerConfig::default(),
            StaticTopology::svlte(2, SlotId(0)).with_active_slot(SlotId(1)),
            false,
        );
        boot_ready(&rig);

        rig.engine.set_radio_power(PowerState::On, PhoneId(0));
        assert!(
            rig.props.get(&keys::msim_mode(SlotId(0))).is_none(),
            "inactive technology must not clobber persisted settings"
        );
    }
}
