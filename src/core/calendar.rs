//! Game clock
//!
//! Game time runs in hours and is scaled from real time, not 1:1. The
//! clock also provides the day/hour breakdown and the position within the
//! year that drives the seasonal temperature curve.

use serde::{Deserialize, Serialize};

use crate::core::types::GameHours;

/// Time of day periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    Morning,   // 06:00-12:00
    Afternoon, // 12:00-18:00
    Evening,   // 18:00-22:00
    Night,     // 22:00-06:00
}

impl TimePeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimePeriod::Morning,
            12..=17 => TimePeriod::Afternoon,
            18..=21 => TimePeriod::Evening,
            _ => TimePeriod::Night, // 22-23, 0-5
        }
    }
}

/// Simulation clock measured in game hours
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameClock {
    hours: GameHours,
    hours_per_real_second: f64,
    hours_per_year: f64,
}

impl GameClock {
    pub fn new(hours_per_real_second: f64, hours_per_year: f64) -> Self {
        Self {
            hours: 0.0,
            hours_per_real_second,
            hours_per_year,
        }
    }

    /// Advance by a slice of real time, returning the game hours elapsed
    pub fn advance_real(&mut self, real_seconds: f64) -> GameHours {
        let delta = real_seconds * self.hours_per_real_second;
        self.hours += delta;
        delta
    }

    /// Game hours elapsed for a given slice of real time, without advancing
    pub fn scale(&self, real_seconds: f64) -> GameHours {
        real_seconds * self.hours_per_real_second
    }

    pub fn now(&self) -> GameHours {
        self.hours
    }

    pub fn set_now(&mut self, hours: GameHours) {
        self.hours = hours;
    }

    pub fn day(&self) -> u64 {
        (self.hours / 24.0).floor() as u64
    }

    pub fn hour_of_day(&self) -> u32 {
        (self.hours.rem_euclid(24.0)).floor() as u32
    }

    pub fn current_time_period(&self) -> TimePeriod {
        TimePeriod::from_hour(self.hour_of_day())
    }

    /// Position within the current year in [0, 1)
    pub fn year_fraction(&self) -> f64 {
        if self.hours_per_year <= 0.0 {
            return 0.0;
        }
        (self.hours / self.hours_per_year).fract()
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(0.4, 96.0)
    }
}
