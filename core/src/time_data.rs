//! In-game calendar time: day, hour, minute.
//!
//! Ordering is lexicographic by (day, hour, minute), which is exactly the
//! derived `Ord` given the field order below. Do not reorder the fields.

use crate::error::{GameError, GameResult};
use crate::types::Tick;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MINUTES_PER_HOUR: u32 = 60;
pub const HOURS_PER_DAY: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeData {
    pub day:    u32,
    pub hour:   u32,
    pub minute: u32,
}

impl TimeData {
    /// Build a validated time. Hour must be 0..=23 and minute 0..=59.
    pub fn new(day: u32, hour: u32, minute: u32) -> GameResult<Self> {
        let time = Self { day, hour, minute };
        time.validate()?;
        Ok(time)
    }

    pub fn validate(&self) -> GameResult<()> {
        if self.hour >= HOURS_PER_DAY || self.minute >= MINUTES_PER_HOUR {
            return Err(GameError::InvalidTime {
                day:    self.day,
                hour:   self.hour,
                minute: self.minute,
            });
        }
        Ok(())
    }

    /// Minutes since day 0, 00:00.
    pub fn total_minutes(&self) -> u64 {
        (u64::from(self.day) * u64::from(HOURS_PER_DAY) + u64::from(self.hour))
            * u64::from(MINUTES_PER_HOUR)
            + u64::from(self.minute)
    }

    pub fn from_total_minutes(total: u64) -> Self {
        let minute = (total % u64::from(MINUTES_PER_HOUR)) as u32;
        let hours = total / u64::from(MINUTES_PER_HOUR);
        let hour = (hours % u64::from(HOURS_PER_DAY)) as u32;
        let day = u32::try_from(hours / u64::from(HOURS_PER_DAY)).unwrap_or(u32::MAX);
        Self { day, hour, minute }
    }

    /// Decompose an absolute clock tick count into calendar time.
    pub fn from_ticks(ticks: Tick, ticks_per_minute: u32) -> Self {
        Self::from_total_minutes(ticks / u64::from(ticks_per_minute.max(1)))
    }

    /// Absolute tick count at the start of this minute.
    pub fn to_ticks(&self, ticks_per_minute: u32) -> Tick {
        self.total_minutes() * u64::from(ticks_per_minute)
    }

    /// Elapsed duration from `earlier` to `self`, using borrow arithmetic
    /// across the minute → hour → day boundaries.
    ///
    /// Errors with `NegativeElapsed` when `earlier` comes after `self`.
    pub fn elapsed_since(&self, earlier: &TimeData) -> GameResult<TimeData> {
        if self < earlier {
            return Err(GameError::NegativeElapsed {
                later:   *self,
                earlier: *earlier,
            });
        }

        let mut day = self.day - earlier.day;
        let mut hour = if earlier.hour > self.hour {
            day -= 1;
            HOURS_PER_DAY + self.hour - earlier.hour
        } else {
            self.hour - earlier.hour
        };

        let minute = if earlier.minute > self.minute {
            if hour == 0 {
                day -= 1;
                hour = HOURS_PER_DAY;
            }
            hour -= 1;
            MINUTES_PER_HOUR + self.minute - earlier.minute
        } else {
            self.minute - earlier.minute
        };

        Ok(TimeData { day, hour, minute })
    }
}

impl Default for TimeData {
    /// A fresh save file starts on day 1 at 10:00.
    fn default() -> Self {
        Self { day: 1, hour: 10, minute: 0 }
    }
}

impl fmt::Display for TimeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {} - {}:{:02}", self.day, self.hour, self.minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(day: u32, hour: u32, minute: u32) -> TimeData {
        TimeData::new(day, hour, minute).unwrap()
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(t(0, 10, 0) < t(0, 10, 1));
        assert!(t(0, 10, 1) < t(0, 11, 0));
        assert!(t(0, 11, 0) < t(1, 0, 0));
        assert!(t(1, 0, 0) > t(0, 23, 59));
        assert_eq!(t(3, 4, 5), t(3, 4, 5));
    }

    #[test]
    fn subtraction_borrows_across_boundaries() {
        assert_eq!(t(1, 5, 0).elapsed_since(&t(0, 5, 30)).unwrap(), t(0, 23, 30));
        assert_eq!(t(3, 1, 10).elapsed_since(&t(1, 22, 40)).unwrap(), t(1, 2, 30));
        assert_eq!(t(2, 0, 0).elapsed_since(&t(1, 23, 59)).unwrap(), t(0, 0, 1));
        assert_eq!(t(4, 6, 6).elapsed_since(&t(4, 6, 6)).unwrap(), t(0, 0, 0));
    }

    #[test]
    fn subtraction_matches_total_minutes() {
        let samples = [t(0, 0, 0), t(0, 23, 59), t(1, 10, 0), t(2, 3, 45), t(7, 0, 1)];
        for a in &samples {
            for b in samples.iter().filter(|b| *b <= a) {
                let d = a.elapsed_since(b).unwrap();
                assert_eq!(d.total_minutes(), a.total_minutes() - b.total_minutes(), "{a} - {b}");
            }
        }
    }

    #[test]
    fn negative_elapsed_is_rejected() {
        let err = t(1, 0, 0).elapsed_since(&t(1, 0, 1)).unwrap_err();
        assert!(matches!(err, GameError::NegativeElapsed { .. }));
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        assert!(TimeData::new(0, 24, 0).is_err());
        assert!(TimeData::new(0, 0, 60).is_err());
    }

    #[test]
    fn ticks_round_trip_through_calendar() {
        let time = t(1, 10, 0);
        assert_eq!(TimeData::from_ticks(time.to_ticks(24), 24), time);
        assert_eq!(TimeData::from_ticks(time.to_ticks(24) + 23, 24), time);
        assert_eq!(time.to_string(), "Day 1 - 10:00");
    }
}
