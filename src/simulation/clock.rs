//! Wall-clock seam for prediction requests
//!
//! The prediction contract wants day-of-week and time-of-day fields, and
//! the generation strategy scales its behaviour by peak hours. Both read
//! the clock through this trait so tests can pin the time.

use std::time::{SystemTime, UNIX_EPOCH};

/// A calendar instant reduced to the fields the prediction contract needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    /// 1 = Monday .. 7 = Sunday
    pub day_of_week: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    /// Morning (07-09) and evening (17-19) rush windows
    pub fn is_peak_hour(&self) -> bool {
        (7..=9).contains(&self.hour) || (17..=19).contains(&self.hour)
    }

    /// Late-night window with reduced traffic (22:00-06:59)
    pub fn is_off_peak(&self) -> bool {
        self.hour >= 22 || self.hour <= 6
    }
}

pub trait Clock {
    fn now(&self) -> TimeOfDay;
}

/// System clock, UTC. The simulation only uses coarse time-of-day buckets,
/// so timezone drift is acceptable here.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeOfDay {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let days = secs / 86_400;
        let of_day = secs % 86_400;
        // The Unix epoch fell on a Thursday
        let day_of_week = ((days + 3) % 7 + 1) as u8;
        TimeOfDay {
            day_of_week,
            hour: (of_day / 3600) as u8,
            minute: (of_day % 3600 / 60) as u8,
            second: (of_day % 60) as u8,
        }
    }
}

/// Fixed clock for deterministic tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub TimeOfDay);

impl Clock for FixedClock {
    fn now(&self) -> TimeOfDay {
        self.0
    }
}
