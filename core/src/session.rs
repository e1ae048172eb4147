//! The game session: one save slot being played.
//!
//! EXECUTION ORDER within `tick()` (fixed, never reordered):
//!   1. Clock advances and returns its cascade.
//!   2. Each cascade event is broadcast to every live entity, in order:
//!        NewDayStarted    → on_new_day
//!        TimeOfDayChanged → on_time_change, on_hour_change, then save all
//!        HourChanged      → on_hour_change
//!   3. Every live entity gets its per-frame `update`.
//!   4. Every event of the tick except MinuteChanged is appended to the
//!      event log.
//!
//! RULES:
//!   - The session is the only owner of the clock, the save data and the
//!     store. Entities see them through an EntityContext.
//!   - Scenes own entities. The registry only observes them.
//!   - All randomness flows through the RngBank.
//!   - Operations outside `tick()` (spawning, saving, freezing, sleeping)
//!     log their events immediately and hand them out at the front of the
//!     next `tick()` result.

use crate::{
    clock::GameClock,
    command::SessionCommand,
    config::GameConfig,
    error::{GameError, GameResult},
    event::{EventLogEntry, GameEvent},
    npc::Npc,
    player::PlayerController,
    registry::{EntityHandle, EntityRegistry},
    rng::RngBank,
    save::SaveData,
    scene::Scene,
    shop::{PurchaseOutcome, Shop},
    sleeping_cot::next_occurrence,
    store::GameStore,
    time_affected::{reconcile, EntityContext, Reconciliation, TimeAffected},
    time_data::TimeData,
    types::SlotId,
};
use std::{cell::RefCell, rc::Rc};

pub struct GameSession {
    slot:     SlotId,
    config:   GameConfig,
    clock:    GameClock,
    registry: EntityRegistry,
    save:     SaveData,
    store:    GameStore,
    rng_bank: RngBank,
    pending:  Vec<GameEvent>,
}

impl GameSession {
    pub fn new(slot: impl Into<SlotId>, config: GameConfig, store: GameStore) -> GameResult<Self> {
        config.validate()?;
        let clock = GameClock::new(&config.clock)?;
        let save = SaveData {
            time:       clock.time(),
            time_speed: clock.speed(),
            ..SaveData::default()
        };
        Ok(Self {
            slot: slot.into(),
            rng_bank: RngBank::new(config.seed),
            clock,
            registry: EntityRegistry::new(),
            save,
            store,
            config,
            pending: Vec::new(),
        })
    }

    /// Session on a migrated in-memory store with the test config.
    pub fn build_test(seed: u64) -> GameResult<Self> {
        let store = GameStore::in_memory()?;
        store.migrate()?;
        let config = GameConfig { seed, ..GameConfig::default_test() };
        Self::new("test", config, store)
    }

    pub fn slot(&self) -> &str { &self.slot }
    pub fn config(&self) -> &GameConfig { &self.config }
    pub fn clock(&self) -> &GameClock { &self.clock }
    pub fn time(&self) -> TimeData { self.clock.time() }
    pub fn registry(&self) -> &EntityRegistry { &self.registry }
    pub fn save(&self) -> &SaveData { &self.save }
    pub fn store(&self) -> &GameStore { &self.store }
    pub fn money(&self) -> i64 { self.save.money }

    pub fn add_money(&mut self, amount: i64) {
        self.save.money += amount;
    }

    /// End the session and hand back its store, e.g. to continue the same
    /// slot in a fresh session.
    pub fn into_store(self) -> GameStore {
        self.store
    }

    /// Events produced outside a tick that no tick has returned yet.
    pub fn take_pending(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending)
    }

    // ── Frame loop ─────────────────────────────────────────────

    /// Advance one frame. Returns every event of the frame, in order.
    pub fn tick(&mut self) -> GameResult<Vec<GameEvent>> {
        let mut events = self.take_pending();
        let logged_from = events.len();

        let cascade = self.clock.tick();
        self.dispatch(cascade, &mut events)?;
        self.broadcast(&mut events, |entity, ctx| entity.update(ctx))?;

        self.log_events(&events[logged_from..])?;
        Ok(events)
    }

    /// Run n frames. Used by tests and the day runner.
    pub fn run_ticks(&mut self, n: u64) -> GameResult<()> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    fn dispatch(&mut self, cascade: Vec<GameEvent>, events: &mut Vec<GameEvent>) -> GameResult<()> {
        for event in cascade {
            let callback: Option<Broadcast> = match event {
                GameEvent::NewDayStarted { .. } => Some(new_day),
                GameEvent::TimeOfDayChanged { .. } => Some(time_change),
                GameEvent::HourChanged { .. } => Some(hour_change),
                _ => None,
            };
            let segment_changed = matches!(event, GameEvent::TimeOfDayChanged { .. });

            events.push(event);
            if let Some(callback) = callback {
                self.broadcast(events, callback)?;
            }
            if segment_changed {
                self.save_all(events)?;
            }
        }
        Ok(())
    }

    fn broadcast<F>(&self, events: &mut Vec<GameEvent>, mut f: F) -> GameResult<()>
    where
        F: FnMut(&mut dyn TimeAffected, &mut EntityContext<'_>) -> GameResult<()>,
    {
        let mut ctx = EntityContext::new(
            self.clock.time(),
            self.clock.current_tick(),
            &self.rng_bank,
            events,
        );
        self.registry.for_each(|entity| f(entity, &mut ctx))
    }

    // ── Entities ───────────────────────────────────────────────

    /// Create an entity in `scene`: register it, reconcile it against the
    /// save data and hand back a typed handle. The scene keeps it alive.
    pub fn spawn<T: TimeAffected + 'static>(
        &mut self,
        scene: &mut Scene,
        entity: T,
    ) -> GameResult<Rc<RefCell<T>>> {
        let typed = Rc::new(RefCell::new(entity));
        let handle: EntityHandle = typed.clone();
        self.activate(scene, handle)?;
        Ok(typed)
    }

    /// Register an already-built handle and reconcile it.
    pub fn activate(&mut self, scene: &mut Scene, handle: EntityHandle) -> GameResult<Reconciliation> {
        self.registry.register(&handle)?;
        handle.borrow_mut().tracker_mut().scene = scene.name().to_string();

        let mut events = Vec::new();
        let outcome = {
            let mut ctx = EntityContext::new(
                self.clock.time(),
                self.clock.current_tick(),
                &self.rng_bank,
                &mut events,
            );
            let mut entity = handle.borrow_mut();
            reconcile(&mut *entity, &self.save, &mut ctx)
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.registry.deregister_entity(&handle);
                return Err(e);
            }
        };

        scene.hold(handle);
        self.record(events)?;
        Ok(outcome)
    }

    /// Unload a scene. Its entities are copied into the save data, then
    /// dropped, so they catch up when the scene is loaded again.
    pub fn leave_scene(&mut self, scene: Scene) -> GameResult<()> {
        let name = scene.name().to_string();
        let entities = scene.into_entities();
        for handle in &entities {
            handle.borrow().copy_to_save(&mut self.save)?;
            self.registry.deregister_entity(handle);
        }
        log::debug!("left scene '{name}' ({} entities)", entities.len());
        Ok(())
    }

    // ── Persistence ────────────────────────────────────────────

    /// Re-stamp and copy every live entity, then write the slot.
    pub fn save_game(&mut self) -> GameResult<()> {
        let mut events = Vec::new();
        self.save_all(&mut events)?;
        self.record(events)
    }

    fn save_all(&mut self, events: &mut Vec<GameEvent>) -> GameResult<()> {
        let now = self.clock.time();
        self.save.time = now;
        self.save.time_speed = self.clock.speed();

        let save = &mut self.save;
        let mut entities = 0;
        self.registry.for_each(|entity| {
            entity.tracker_mut().restamp(now);
            entity.copy_to_save(save)?;
            entities += 1;
            Ok(())
        })?;

        self.store.write_save(&self.slot, &self.save)?;
        log::info!("saved slot '{}' at {now} ({entities} entities)", self.slot);
        events.push(GameEvent::GameSaved {
            slot: self.slot.clone(),
            time: now,
            entities,
        });
        Ok(())
    }

    /// Read the slot from the store. A slot that was never written starts a
    /// new game at the configured time. Returns whether a save was found.
    ///
    /// Entities spawned before loading keep their reconciliation against
    /// the old data; load first, then spawn.
    pub fn load_game(&mut self) -> GameResult<bool> {
        if !self.registry.is_empty() {
            log::warn!("loading slot '{}' with {} live entities", self.slot, self.registry.len());
        }

        let Some(save) = self.store.read_save(&self.slot)? else {
            log::info!("slot '{}' is empty; starting a new game", self.slot);
            self.clock.load(self.config.clock.start, self.config.clock.ticks_per_update)?;
            self.save = SaveData {
                time:       self.clock.time(),
                time_speed: self.clock.speed(),
                ..SaveData::default()
            };
            return Ok(false);
        };

        self.clock.load(save.time, save.time_speed)?;
        self.save = save;
        log::info!("loaded slot '{}' at {}", self.slot, self.clock.time());
        self.record(vec![GameEvent::GameLoaded {
            slot: self.slot.clone(),
            time: self.clock.time(),
        }])?;
        Ok(true)
    }

    /// Like `load_game`, but a missing slot is an error.
    pub fn continue_game(&mut self) -> GameResult<()> {
        if self.load_game()? {
            Ok(())
        } else {
            Err(GameError::SlotNotFound { slot: self.slot.clone() })
        }
    }

    // ── Clock control ──────────────────────────────────────────

    /// Returns false if the clock was already frozen.
    pub fn freeze_clock(&mut self) -> GameResult<bool> {
        if self.clock.is_frozen() {
            return Ok(false);
        }
        self.clock.freeze();
        self.record(vec![GameEvent::ClockFrozen { time: self.clock.time() }])?;
        Ok(true)
    }

    /// Returns false if the clock was already running.
    pub fn unfreeze_clock(&mut self) -> GameResult<bool> {
        if !self.clock.is_frozen() {
            return Ok(false);
        }
        self.clock.unfreeze();
        self.record(vec![GameEvent::ClockUnfrozen { time: self.clock.time() }])?;
        Ok(true)
    }

    pub fn set_speed(&mut self, ticks_per_update: u32) {
        log::debug!("clock speed {} -> {ticks_per_update}", self.clock.speed());
        self.clock.set_speed(ticks_per_update);
    }

    /// Skip forward to `wake`, broadcasting a single cascade.
    pub fn sleep_until(&mut self, wake: TimeData) -> GameResult<TimeData> {
        let from = self.clock.time();
        let cascade = self.clock.advance_to(wake)?;
        let mut events = Vec::new();
        self.dispatch(cascade, &mut events)?;
        log::info!("slept from {from} to {}", self.clock.time());
        self.record(events)?;
        Ok(self.clock.time())
    }

    // ── Interactions ───────────────────────────────────────────

    /// Start talking. Both sides enter their talking state and time stops.
    /// Returns false if the NPC was already in a conversation.
    pub fn begin_conversation(
        &mut self,
        player: &Rc<RefCell<PlayerController>>,
        npc: &Rc<RefCell<Npc>>,
    ) -> GameResult<bool> {
        if !npc.borrow_mut().start_talk() {
            return Ok(false);
        }
        player.borrow_mut().on_talk();
        self.freeze_clock()?;
        Ok(true)
    }

    pub fn end_conversation(
        &mut self,
        player: &Rc<RefCell<PlayerController>>,
        npc: &Rc<RefCell<Npc>>,
    ) -> GameResult<()> {
        npc.borrow_mut().end_talk();
        player.borrow_mut().end_talk();
        self.unfreeze_clock()?;
        Ok(())
    }

    /// Open the shop menu. The player stands still, as in a conversation,
    /// until the menu is closed. Time keeps running. Returns false if the
    /// shop was already open or the player is busy.
    pub fn open_shop(
        &mut self,
        player: &Rc<RefCell<PlayerController>>,
        shop: &Rc<RefCell<Shop>>,
    ) -> bool {
        if player.borrow().is_busy() || !shop.borrow_mut().open() {
            return false;
        }
        player.borrow_mut().on_talk();
        true
    }

    /// Close the shop menu and release the player. Returns false while the
    /// menu is closed or still locked from the last input.
    pub fn close_shop(
        &mut self,
        player: &Rc<RefCell<PlayerController>>,
        shop: &Rc<RefCell<Shop>>,
    ) -> bool {
        if !shop.borrow_mut().close() {
            return false;
        }
        player.borrow_mut().end_talk();
        true
    }

    /// Buy the item under the shop's cursor with the save's money.
    pub fn purchase(&mut self, shop: &Rc<RefCell<Shop>>) -> PurchaseOutcome {
        let outcome = shop.borrow_mut().buy(&mut self.save.money);
        log::debug!("purchase at '{}': {outcome:?}", shop.borrow().unique_id());
        outcome
    }

    // ── Commands ───────────────────────────────────────────────

    pub fn apply(&mut self, command: SessionCommand) -> GameResult<()> {
        match command {
            SessionCommand::Freeze => {
                self.freeze_clock()?;
            }
            SessionCommand::Unfreeze => {
                self.unfreeze_clock()?;
            }
            SessionCommand::SetSpeed { speed } => self.set_speed(speed),
            SessionCommand::Sleep { hour, minute } => {
                let now = self.clock.time();
                let wake = next_occurrence(hour, minute, now)
                    .ok_or(GameError::InvalidTime { day: now.day, hour, minute })?;
                self.sleep_until(wake)?;
            }
            SessionCommand::Save => self.save_game()?,
            SessionCommand::Load => {
                self.load_game()?;
            }
        }
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    fn record(&mut self, events: Vec<GameEvent>) -> GameResult<()> {
        self.log_events(&events)?;
        self.pending.extend(events);
        Ok(())
    }

    fn log_events(&self, events: &[GameEvent]) -> GameResult<()> {
        let tick = self.clock.current_tick();
        for event in events {
            // Minute ticks only drive the on-screen clock.
            if matches!(event, GameEvent::MinuteChanged { .. }) {
                continue;
            }
            let entry = EventLogEntry {
                id:         None,
                slot:       self.slot.clone(),
                tick,
                source:     event_source(event).to_string(),
                event_type: event.type_name().to_string(),
                payload:    serde_json::to_string(event)?,
            };
            self.store.append_event(&entry)?;
        }
        Ok(())
    }
}

type Broadcast = fn(&mut dyn TimeAffected, &mut EntityContext<'_>) -> GameResult<()>;

fn new_day(entity: &mut dyn TimeAffected, ctx: &mut EntityContext<'_>) -> GameResult<()> {
    entity.on_new_day(ctx)
}

fn hour_change(entity: &mut dyn TimeAffected, ctx: &mut EntityContext<'_>) -> GameResult<()> {
    entity.on_hour_change(ctx)
}

/// A segment change is also an hour change.
fn time_change(entity: &mut dyn TimeAffected, ctx: &mut EntityContext<'_>) -> GameResult<()> {
    entity.on_time_change(ctx)?;
    entity.on_hour_change(ctx)
}

/// Which part of the game produced an event, for the event_log source column.
fn event_source(event: &GameEvent) -> &str {
    match event {
        GameEvent::MinuteChanged { .. }
        | GameEvent::HourChanged { .. }
        | GameEvent::TimeOfDayChanged { .. }
        | GameEvent::NewDayStarted { .. }
        | GameEvent::ClockFrozen { .. }
        | GameEvent::ClockUnfrozen { .. } => "clock",
        GameEvent::GameSaved { .. } | GameEvent::GameLoaded { .. } => "session",
        GameEvent::EntityFirstLoad { entity, .. }
        | GameEvent::EntityCaughtUp { entity, .. }
        | GameEvent::EntityClockRewound { entity, .. }
        | GameEvent::StateTransitioned { entity, .. }
        | GameEvent::PromptShown { entity }
        | GameEvent::PromptHidden { entity }
        | GameEvent::ShopRestocked { entity, .. }
        | GameEvent::ItemPurchased { entity, .. } => entity.as_str(),
    }
}
