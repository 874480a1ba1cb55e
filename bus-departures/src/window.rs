//! Local time windows for timetable lookups.
//!
//! A query looks at two adjacent hour columns of the timetable: the current
//! local hour and the one after it. The timetable is local wall-clock time,
//! so the conversion has to follow the zone's daylight-saving rules.

use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;
use serde::Serialize;

use crate::domain::DayType;

/// Timezone the line's timetable is published in.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Amsterdam;

/// First hour without service.
const BLACKOUT_START: u8 = 1;

/// First hour with service again.
const BLACKOUT_END: u8 = 5;

/// Errors from building a time window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// The timezone name is not in the tz database
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    /// The timestamp cannot be represented as a date
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    /// A component is outside its range
    #[error("invalid {field}: {value}")]
    OutOfRange { field: &'static str, value: u8 },
}

/// Local weekday and time of a query, in the timetable's timezone.
///
/// `weekday` counts from Sunday = 0 to Saturday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    weekday: u8,
    hour: u8,
    minute: u8,
}

impl TimeWindow {
    /// Build a window from components, checking their ranges.
    pub fn new(weekday: u8, hour: u8, minute: u8) -> Result<Self, WindowError> {
        let fields = [("weekday", weekday, 6), ("hour", hour, 23), ("minute", minute, 59)];
        for (field, value, max) in fields {
            if value > max {
                return Err(WindowError::OutOfRange { field, value });
            }
        }

        Ok(Self {
            weekday,
            hour,
            minute,
        })
    }

    /// The local window for a Unix timestamp (seconds) in `tz`.
    pub fn at(timestamp: i64, tz: Tz) -> Result<Self, WindowError> {
        let utc = DateTime::from_timestamp(timestamp, 0)
            .ok_or(WindowError::TimestampOutOfRange(timestamp))?;
        let local = utc.with_timezone(&tz);

        // chrono guarantees these ranges, so the narrowing is lossless.
        Ok(Self {
            weekday: local.weekday().num_days_from_sunday() as u8,
            hour: local.hour() as u8,
            minute: local.minute() as u8,
        })
    }

    pub fn weekday(&self) -> u8 {
        self.weekday
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn day_type(&self) -> DayType {
        DayType::from_weekday(self.weekday)
    }

    /// The following hour column. Stays on the same day-type across midnight.
    pub fn next_hour(&self) -> u8 {
        next_hour(self.hour)
    }

    pub fn is_blackout(&self) -> bool {
        is_blackout(self.hour)
    }
}

/// Resolve a Unix timestamp to a window in the named timezone.
///
/// ```
/// use bus_departures::window::compute_window;
///
/// // 2024-01-17 06:40 UTC is a Wednesday, 07:40 in Amsterdam.
/// let window = compute_window(1_705_473_600, "Europe/Amsterdam").unwrap();
/// assert_eq!((window.weekday(), window.hour(), window.minute()), (3, 7, 40));
/// ```
pub fn compute_window(timestamp: i64, timezone: &str) -> Result<TimeWindow, WindowError> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| WindowError::UnknownTimezone(timezone.to_string()))?;
    TimeWindow::at(timestamp, tz)
}

/// Whether the line runs no buses at this local hour (01:00 to 04:59).
pub fn is_blackout(hour: u8) -> bool {
    (BLACKOUT_START..BLACKOUT_END).contains(&hour)
}

/// The next hour on a 24-hour clock. Out-of-range input is taken modulo 24.
pub fn next_hour(hour: u8) -> u8 {
    (hour % 24 + 1) % 24
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().timestamp()
    }

    #[test]
    fn blackout_boundaries() {
        assert!(!is_blackout(0));
        assert!(is_blackout(1));
        assert!(is_blackout(4));
        assert!(!is_blackout(5));
        assert!(!is_blackout(23));
    }

    #[test]
    fn next_hour_wraps() {
        assert_eq!(next_hour(7), 8);
        assert_eq!(next_hour(23), 0);
    }

    #[test]
    fn next_hour_tolerates_out_of_range_input() {
        assert_eq!(next_hour(24), 1);
        assert_eq!(next_hour(u8::MAX), 16);
    }

    #[test]
    fn next_hour_keeps_day_type() {
        // Saturday 23:30
        let window = TimeWindow::new(6, 23, 30).unwrap();
        assert_eq!(window.next_hour(), 0);
        assert_eq!(window.day_type(), DayType::Saturday);
    }

    #[test]
    fn winter_time_is_utc_plus_one() {
        // Wednesday 17 January 2024
        let window = compute_window(utc(2024, 1, 17, 6, 40), "Europe/Amsterdam").unwrap();
        assert_eq!(window, TimeWindow::new(3, 7, 40).unwrap());
        assert_eq!(window.day_type(), DayType::Weekday);
    }

    #[test]
    fn summer_time_is_utc_plus_two() {
        // Wednesday 10 July 2024
        let window = compute_window(utc(2024, 7, 10, 5, 40), "Europe/Amsterdam").unwrap();
        assert_eq!(window, TimeWindow::new(3, 7, 40).unwrap());
    }

    #[test]
    fn dst_switch_skips_an_hour() {
        // Clocks go forward on Sunday 31 March 2024 at 02:00 local.
        let before = TimeWindow::at(utc(2024, 3, 31, 0, 59), DEFAULT_TIMEZONE).unwrap();
        let after = TimeWindow::at(utc(2024, 3, 31, 1, 0), DEFAULT_TIMEZONE).unwrap();
        assert_eq!((before.hour(), before.minute()), (1, 59));
        assert_eq!((after.hour(), after.minute()), (3, 0));
        assert_eq!(after.day_type(), DayType::SundayOrHoliday);
    }

    #[test]
    fn local_date_decides_weekday() {
        // Friday 23:30 UTC is already Saturday in Amsterdam.
        let window = TimeWindow::at(utc(2024, 1, 19, 23, 30), DEFAULT_TIMEZONE).unwrap();
        assert_eq!(window.weekday(), 6);
        assert_eq!(window.hour(), 0);
        assert_eq!(window.day_type(), DayType::Saturday);
        assert!(!window.is_blackout());
    }

    #[test]
    fn unknown_timezone() {
        assert_eq!(
            compute_window(0, "Europe/Atlantis"),
            Err(WindowError::UnknownTimezone("Europe/Atlantis".into()))
        );
    }

    #[test]
    fn timestamp_out_of_range() {
        assert_eq!(
            TimeWindow::at(i64::MAX, DEFAULT_TIMEZONE),
            Err(WindowError::TimestampOutOfRange(i64::MAX))
        );
    }

    #[test]
    fn new_checks_ranges() {
        assert!(TimeWindow::new(6, 23, 59).is_ok());
        assert_eq!(
            TimeWindow::new(7, 0, 0),
            Err(WindowError::OutOfRange { field: "weekday", value: 7 })
        );
        assert_eq!(
            TimeWindow::new(0, 24, 0).unwrap_err().to_string(),
            "invalid hour: 24"
        );
        assert!(TimeWindow::new(0, 0, 60).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Windows from timestamps are always in range
        #[test]
        fn components_in_range(ts in -2_000_000_000i64..4_000_000_000i64) {
            let w = TimeWindow::at(ts, DEFAULT_TIMEZONE).unwrap();
            prop_assert_eq!(TimeWindow::new(w.weekday(), w.hour(), w.minute()), Ok(w));
        }

        /// next_hour stays on the clock and advances by one
        #[test]
        fn next_hour_on_clock(hour in 0u8..24) {
            let next = next_hour(hour);
            prop_assert!(next < 24);
            prop_assert_eq!((u32::from(hour) + 1) % 24, u32::from(next));
        }

        /// The blackout is exactly hours 1 through 4
        #[test]
        fn blackout_is_early_morning(hour in 0u8..24) {
            prop_assert_eq!(is_blackout(hour), (1..=4).contains(&hour));
        }
    }
}
