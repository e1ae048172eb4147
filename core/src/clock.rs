//! Game clock: tick state, speed control and freeze.
//!
//! CASCADE ORDER (fixed, never reordered), within a single `tick()`:
//!   - minute changed only        → MinuteChanged
//!   - hour (or day) changed      → [NewDayStarted] → [TimeOfDayChanged] → HourChanged
//!
//! At most one of the two branches runs per tick and the whole cascade is
//! returned before `tick()` does. Nothing is deferred to a later frame.

use crate::{
    config::ClockConfig,
    error::{GameError, GameResult},
    event::GameEvent,
    time_data::{TimeData, HOURS_PER_DAY, MINUTES_PER_HOUR},
    types::Tick,
};
use serde::{Deserialize, Serialize};

pub const TIME_OF_DAY_SEGMENTS: u32 = 4;
pub const HOURS_PER_SEGMENT: u32 = HOURS_PER_DAY / TIME_OF_DAY_SEGMENTS;

/// One quarter of the 24-hour cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Dawn,    // 00:00–05:59
    Morning, // 06:00–11:59
    Evening, // 12:00–17:59
    Night,   // 18:00–23:59
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match (hour % HOURS_PER_DAY) / HOURS_PER_SEGMENT {
            0 => Self::Dawn,
            1 => Self::Morning,
            2 => Self::Evening,
            _ => Self::Night,
        }
    }

    pub fn start_hour(&self) -> u32 {
        *self as u32 * HOURS_PER_SEGMENT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    Running,
    Frozen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameClock {
    current_tick:     Tick,
    ticks_per_update: u32,
    ticks_per_minute: u32,
    time:             TimeData,
    time_of_day:      TimeOfDay,
    state:            ClockState,
}

impl GameClock {
    pub fn new(config: &ClockConfig) -> GameResult<Self> {
        if config.ticks_per_minute == 0 {
            return Err(GameError::InvalidConfig("clock.ticks_per_minute must be > 0".into()));
        }
        config.start.validate()?;
        Ok(Self {
            current_tick:     config.start.to_ticks(config.ticks_per_minute),
            ticks_per_update: config.ticks_per_update,
            ticks_per_minute: config.ticks_per_minute,
            time:             config.start,
            time_of_day:      TimeOfDay::from_hour(config.start.hour),
            state:            ClockState::Running,
        })
    }

    pub fn time(&self) -> TimeData { self.time }
    pub fn time_of_day(&self) -> TimeOfDay { self.time_of_day }
    pub fn current_tick(&self) -> Tick { self.current_tick }
    pub fn speed(&self) -> u32 { self.ticks_per_update }
    pub fn ticks_per_minute(&self) -> u32 { self.ticks_per_minute }
    pub fn state(&self) -> ClockState { self.state }
    pub fn is_frozen(&self) -> bool { self.state == ClockState::Frozen }

    pub fn ticks_per_hour(&self) -> Tick {
        u64::from(self.ticks_per_minute) * u64::from(MINUTES_PER_HOUR)
    }

    /// Suspend time, e.g. while a conversation is running.
    pub fn freeze(&mut self) { self.state = ClockState::Frozen; }
    pub fn unfreeze(&mut self) { self.state = ClockState::Running; }

    /// Change how many ticks pass per external update. Default is 1.
    pub fn set_speed(&mut self, ticks_per_update: u32) {
        self.ticks_per_update = ticks_per_update;
    }

    /// Advance one external update. Returns the cascade, in order.
    /// A frozen clock returns nothing and does not move.
    pub fn tick(&mut self) -> Vec<GameEvent> {
        if self.is_frozen() {
            return Vec::new();
        }
        self.current_tick += u64::from(self.ticks_per_update);
        self.sync_time()
    }

    /// Jump forward to `target` (sleeping). Runs a single hour-change
    /// cascade like one very large tick. Works while frozen.
    pub fn advance_to(&mut self, target: TimeData) -> GameResult<Vec<GameEvent>> {
        target.validate()?;
        target.elapsed_since(&self.time)?;
        self.current_tick = self.current_tick.max(target.to_ticks(self.ticks_per_minute));
        Ok(self.sync_time())
    }

    /// Restore time and speed from a save. Emits nothing.
    pub fn load(&mut self, time: TimeData, ticks_per_update: u32) -> GameResult<()> {
        time.validate()?;
        self.time = time;
        self.current_tick = time.to_ticks(self.ticks_per_minute);
        self.ticks_per_update = ticks_per_update;
        self.time_of_day = TimeOfDay::from_hour(time.hour);
        log::debug!("clock loaded at {time} speed={ticks_per_update}");
        Ok(())
    }

    fn sync_time(&mut self) -> Vec<GameEvent> {
        let next = TimeData::from_ticks(self.current_tick, self.ticks_per_minute);

        if next.day != self.time.day || next.hour != self.time.hour {
            let previous = self.time;
            self.time = next;
            self.on_hour_change(previous)
        } else if next.minute != self.time.minute {
            self.time.minute = next.minute;
            vec![GameEvent::MinuteChanged { time: self.time }]
        } else {
            Vec::new()
        }
    }

    fn on_hour_change(&mut self, previous: TimeData) -> Vec<GameEvent> {
        let mut events = Vec::with_capacity(3);

        let old_segment = self.time_of_day;
        self.time_of_day = TimeOfDay::from_hour(self.time.hour);
        let segment_changed = old_segment != self.time_of_day;

        // Crossing midnight lands in Dawn. A large jump can skip Dawn, or
        // land back in the segment it left, so an advanced day counter
        // counts on its own.
        if (segment_changed && self.time_of_day == TimeOfDay::Dawn) || self.time.day > previous.day {
            log::debug!("new day: {}", self.time);
            events.push(GameEvent::NewDayStarted { time: self.time });
        }
        if segment_changed {
            log::debug!("time of day {:?} -> {:?}", old_segment, self.time_of_day);
            events.push(GameEvent::TimeOfDayChanged {
                time:    self.time,
                segment: self.time_of_day,
            });
        }

        events.push(GameEvent::HourChanged { time: self.time });
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_split_the_day_in_quarters() {
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Dawn);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Dawn);
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(23), TimeOfDay::Night);
        assert_eq!(TimeOfDay::Night.start_hour(), 18);
    }

    #[test]
    fn rejects_zero_tick_minutes() {
        let config = ClockConfig { ticks_per_minute: 0, ..ClockConfig::default() };
        assert!(GameClock::new(&config).is_err());
    }
}
