//! Travel direction and timetable day-type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown direction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction: {0:?} (expected \"zwolle\" or \"apeldoorn\")")]
pub struct InvalidDirection(String);

/// Which end of the line the bus is heading to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Zwolle,
    Apeldoorn,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Zwolle => "zwolle",
            Direction::Apeldoorn => "apeldoorn",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = InvalidDirection;

    /// Accepts the lowercase names stored in user preferences.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zwolle" => Ok(Direction::Zwolle),
            "apeldoorn" => Ok(Direction::Apeldoorn),
            other => Err(InvalidDirection(other.to_string())),
        }
    }
}

/// Schedule variant. The timetable differs by category of day, not by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Weekday,
    Saturday,
    SundayOrHoliday,
}

impl DayType {
    /// Classify a weekday number counted from Sunday = 0 (so Saturday = 6).
    ///
    /// Numbers come from a validated [`TimeWindow`](crate::window::TimeWindow);
    /// anything other than 0 and 6 is a working day.
    pub fn from_weekday(weekday: u8) -> Self {
        match weekday {
            0 => DayType::SundayOrHoliday,
            6 => DayType::Saturday,
            _ => DayType::Weekday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Weekday => "weekday",
            DayType::Saturday => "saturday",
            DayType::SundayOrHoliday => "sunday",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
