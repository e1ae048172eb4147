//! A bed the player can sleep in until a chosen time of day.
//!
//! The cot only picks the wake time. `GameSession::sleep_until` moves the
//! clock and broadcasts the cascade.

use crate::{
    config::{SleepConfig, WakeOption},
    event::GameEvent,
    error::GameResult,
    interaction::{InteractionPrompt, PromptEdge},
    time_affected::{EntityContext, EventBuffer, TimeAffected, TimeTracker},
    time_data::TimeData,
    types::{EntityId, Position},
};

pub struct SleepingCot {
    tracker:  TimeTracker,
    options:  Vec<WakeOption>,
    selected: usize,
    open:     bool,
    prompt:   InteractionPrompt,
    events:   EventBuffer,
}

impl SleepingCot {
    pub fn new(unique_id: impl Into<EntityId>, position: Position, config: &SleepConfig) -> Self {
        Self {
            tracker:  TimeTracker::new(unique_id).with_position(position),
            options:  config.wake_options.clone(),
            selected: 0,
            open:     false,
            prompt:   InteractionPrompt::new(),
            events:   EventBuffer::default(),
        }
    }

    pub fn options(&self) -> &[WakeOption] { &self.options }
    pub fn is_open(&self) -> bool { self.open }

    pub fn selected_option(&self) -> Option<&WakeOption> {
        self.options.get(self.selected)
    }

    /// Returns true when the player asked to sleep.
    pub fn observe(&mut self, facing: bool, interact_pressed: bool, player_busy: bool) -> bool {
        let outcome = self.prompt.observe(facing, interact_pressed, !self.open, player_busy);
        let entity = self.tracker.unique_id.clone();
        match outcome.edge {
            Some(PromptEdge::Shown) => self.events.push(GameEvent::PromptShown { entity }),
            Some(PromptEdge::Hidden) => self.events.push(GameEvent::PromptHidden { entity }),
            None => {}
        }
        if outcome.interact {
            self.open = true;
            self.selected = 0;
        }
        outcome.interact
    }

    pub fn select_next(&mut self) {
        if self.open && !self.options.is_empty() {
            self.selected = (self.selected + 1) % self.options.len();
        }
    }

    pub fn select_previous(&mut self) {
        if self.open && !self.options.is_empty() {
            self.selected = (self.selected + self.options.len() - 1) % self.options.len();
        }
    }

    pub fn cancel(&mut self) {
        self.open = false;
    }

    /// Close the menu and return when the selected option next comes round.
    pub fn confirm(&mut self, now: TimeData) -> Option<TimeData> {
        if !self.open {
            return None;
        }
        self.open = false;
        let option = self.options.get(self.selected)?;
        wake_time(option, now)
    }
}

/// The first time strictly after `now` matching the option's clock time.
/// Returns None for an option with an impossible hour or minute.
pub fn wake_time(option: &WakeOption, now: TimeData) -> Option<TimeData> {
    next_occurrence(option.hour, option.minute, now)
}

pub fn next_occurrence(hour: u32, minute: u32, now: TimeData) -> Option<TimeData> {
    let today = TimeData::new(now.day, hour, minute).ok()?;
    if today > now {
        Some(today)
    } else {
        TimeData::new(now.day + 1, hour, minute).ok()
    }
}

impl TimeAffected for SleepingCot {
    fn tracker(&self) -> &TimeTracker { &self.tracker }
    fn tracker_mut(&mut self) -> &mut TimeTracker { &mut self.tracker }

    fn update(&mut self, ctx: &mut EntityContext<'_>) -> GameResult<()> {
        self.events.flush(ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TimeOfDay;

    fn option(hour: u32) -> WakeOption {
        WakeOption { segment: TimeOfDay::from_hour(hour), hour, minute: 0, label: String::new() }
    }

    #[test]
    fn wake_time_later_today() {
        let now = TimeData::new(3, 10, 0).unwrap();
        assert_eq!(wake_time(&option(18), now), Some(TimeData::new(3, 18, 0).unwrap()));
    }

    #[test]
    fn wake_time_rolls_to_tomorrow() {
        let now = TimeData::new(3, 10, 0).unwrap();
        assert_eq!(wake_time(&option(6), now), Some(TimeData::new(4, 6, 0).unwrap()));
        assert_eq!(wake_time(&option(10), now), Some(TimeData::new(4, 10, 0).unwrap()));
    }

    #[test]
    fn confirm_requires_open_menu() {
        let mut cot = SleepingCot::new("cot", [0.0; 3], &SleepConfig::default());
        assert_eq!(cot.confirm(TimeData::default()), None);
        assert!(cot.observe(true, true, false));
        cot.select_next();
        let wake = cot.confirm(TimeData::new(1, 10, 0).unwrap());
        assert_eq!(wake, Some(TimeData::new(2, 6, 0).unwrap()));
        assert!(!cot.is_open());
    }
}
