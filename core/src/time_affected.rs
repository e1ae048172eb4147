//! Time-affected entities and load-time reconciliation.
//!
//! RULE: An entity's `last_update_time` is written only by its own
//! time callbacks (and the save-all re-stamp). Nothing else touches it.
//!
//! When an entity becomes active it is reconciled against the save data:
//!   - never stamped        → on_first_load, nothing else
//!   - stamped in the past  → at most one on_hour_change, then at most one
//!                            on_new_day, regardless of how long it was away
//!   - stamped in the future (clock restored from an older save)
//!                          → re-stamped, no catch-up

use crate::{
    error::{GameError, GameResult},
    event::GameEvent,
    rng::{EntityRng, RngBank},
    save::{ObjectRecord, SaveData},
    state_machine::{StateLabel, Transitioned},
    time_data::TimeData,
    types::{EntityId, Position, Tick},
};

/// Per-entity time and persistence bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeTracker {
    pub unique_id:    EntityId,
    pub position:     Position,
    pub scene:        String,
    last_update_time: Option<TimeData>,
}

impl TimeTracker {
    pub fn new(unique_id: impl Into<EntityId>) -> Self {
        Self {
            unique_id:        unique_id.into(),
            position:         [0.0; 3],
            scene:            String::new(),
            last_update_time: None,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn last_update_time(&self) -> Option<TimeData> {
        self.last_update_time
    }

    pub fn restamp(&mut self, now: TimeData) {
        self.last_update_time = Some(now);
    }

    pub fn record(&self) -> Option<ObjectRecord> {
        self.last_update_time.map(|last_update_time| ObjectRecord {
            last_update_time,
            position: self.position,
            scene: self.scene.clone(),
        })
    }

    /// Pull this entity's record out of the save. Returns false on a miss,
    /// leaving the tracker untouched.
    pub fn load_record(&mut self, save: &SaveData, with_position: bool) -> bool {
        let Some(record) = save.record(&self.unique_id) else {
            return false;
        };
        self.last_update_time = Some(record.last_update_time);
        if with_position {
            self.position = record.position;
        }
        true
    }
}

/// What an entity callback may touch while the session is dispatching.
pub struct EntityContext<'a> {
    now:    TimeData,
    tick:   Tick,
    rng:    &'a RngBank,
    events: &'a mut Vec<GameEvent>,
}

impl<'a> EntityContext<'a> {
    pub fn new(now: TimeData, tick: Tick, rng: &'a RngBank, events: &'a mut Vec<GameEvent>) -> Self {
        Self { now, tick, rng, events }
    }

    pub fn now(&self) -> TimeData { self.now }
    pub fn tick(&self) -> Tick { self.tick }

    /// This entity's RNG stream for the current in-game day.
    pub fn rng_for(&self, unique_id: &str) -> EntityRng {
        self.rng.for_entity(unique_id, self.now.day)
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

/// Events an entity produced outside a dispatch (e.g. from an input
/// handler). Flushed into the context on the entity's next update.
#[derive(Debug, Default, Clone)]
pub struct EventBuffer {
    pending: Vec<GameEvent>,
}

impl EventBuffer {
    pub fn push(&mut self, event: GameEvent) {
        self.pending.push(event);
    }

    pub fn record_transition<S: StateLabel>(
        &mut self,
        entity: &str,
        machine: &str,
        transition: Transitioned<S>,
    ) {
        log::debug!(
            "{entity}.{machine}: {} -> {}",
            transition.from.label(),
            transition.to.label()
        );
        self.pending.push(GameEvent::StateTransitioned {
            entity:  entity.to_string(),
            machine: machine.to_string(),
            from:    transition.from.label().to_string(),
            to:      transition.to.label().to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn flush(&mut self, ctx: &mut EntityContext<'_>) {
        for event in self.pending.drain(..) {
            ctx.emit(event);
        }
    }
}

/// The contract every gameplay object affected by in-game time fulfils.
///
/// The default callbacks only re-stamp. Overrides that add behaviour must
/// re-stamp too.
pub trait TimeAffected {
    fn tracker(&self) -> &TimeTracker;
    fn tracker_mut(&mut self) -> &mut TimeTracker;

    fn unique_id(&self) -> &str {
        &self.tracker().unique_id
    }

    /// An in-game hour passed.
    fn on_hour_change(&mut self, ctx: &mut EntityContext<'_>) -> GameResult<()> {
        self.tracker_mut().restamp(ctx.now());
        Ok(())
    }

    /// The time-of-day segment changed (morning → evening, ...).
    fn on_time_change(&mut self, ctx: &mut EntityContext<'_>) -> GameResult<()> {
        self.tracker_mut().restamp(ctx.now());
        Ok(())
    }

    fn on_new_day(&mut self, ctx: &mut EntityContext<'_>) -> GameResult<()> {
        self.tracker_mut().restamp(ctx.now());
        Ok(())
    }

    /// First time this entity is ever loaded for the current save.
    fn on_first_load(&mut self, ctx: &mut EntityContext<'_>) -> GameResult<()> {
        self.tracker_mut().restamp(ctx.now());
        Ok(())
    }

    /// Called once per frame by the session, after the clock cascade.
    fn update(&mut self, _ctx: &mut EntityContext<'_>) -> GameResult<()> {
        Ok(())
    }

    fn copy_to_save(&self, save: &mut SaveData) -> GameResult<()> {
        if let Some(record) = self.tracker().record() {
            save.write_entity(self.unique_id(), record);
        }
        Ok(())
    }

    /// Returns whether a record was found.
    fn load_from_save(&mut self, save: &SaveData) -> GameResult<bool> {
        Ok(self.tracker_mut().load_record(save, true))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    FirstLoad,
    CaughtUp {
        elapsed:     TimeData,
        hour_change: bool,
        new_day:     bool,
    },
    ClockRewound {
        last_update: TimeData,
    },
}

/// Bring a freshly activated entity up to date with the clock.
pub fn reconcile(
    entity: &mut dyn TimeAffected,
    save: &SaveData,
    ctx: &mut EntityContext<'_>,
) -> GameResult<Reconciliation> {
    entity.load_from_save(save)?;

    let now = ctx.now();
    let Some(last_update) = entity.tracker().last_update_time() else {
        entity.on_first_load(ctx)?;
        ctx.emit(GameEvent::EntityFirstLoad {
            entity: entity.unique_id().to_string(),
            time:   now,
        });
        return Ok(Reconciliation::FirstLoad);
    };

    let elapsed = match now.elapsed_since(&last_update) {
        Ok(elapsed) => elapsed,
        Err(GameError::NegativeElapsed { .. }) => {
            log::warn!(
                "'{}' was last updated at {last_update}, after the clock ({now}); re-stamping",
                entity.unique_id()
            );
            entity.tracker_mut().restamp(now);
            ctx.emit(GameEvent::EntityClockRewound {
                entity: entity.unique_id().to_string(),
                last_update,
                now,
            });
            return Ok(Reconciliation::ClockRewound { last_update });
        }
        Err(e) => return Err(e),
    };

    // Whole days fold into the hour check: a day away is also an hour away.
    let hour_change = elapsed.day > 0 || elapsed.hour > 0;
    let new_day = elapsed.day > 0;

    if hour_change {
        entity.on_hour_change(ctx)?;
    }
    if new_day {
        entity.on_new_day(ctx)?;
    }

    if hour_change || new_day {
        log::debug!("'{}' caught up {elapsed} of elapsed time", entity.unique_id());
        ctx.emit(GameEvent::EntityCaughtUp {
            entity: entity.unique_id().to_string(),
            elapsed,
            hour_change,
            new_day,
        });
    }

    Ok(Reconciliation::CaughtUp { elapsed, hour_change, new_day })
}
