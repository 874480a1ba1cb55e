//! Timetable data providers.
//!
//! A provider answers one question: which departure times does the published
//! timetable list for a stop, in a direction and day-type, in two given hour
//! columns. Real sources are stateful sessions (a direction and day-type have
//! to be selected before rows can be read), so providers take `&mut self`
//! and are driven by a single owner; see [`crate::coordinator`].

mod client;
mod error;
mod grid;
mod mock;

use std::future::Future;

use serde::Serialize;

use crate::domain::{DayType, Direction, Stop};
use crate::window::TimeWindow;

pub use client::{HttpTimetableProvider, ProviderConfig};
pub use error::ProviderError;
pub use grid::{GridRow, TimetableGrid};
pub use mock::MockTimetableProvider;

/// Everything a provider needs to look up two hour columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DepartureQuery {
    pub stop: Stop,
    pub direction: Direction,
    pub day_type: DayType,
    pub hour: u8,
    pub next_hour: u8,
}

impl DepartureQuery {
    /// The query for a window: its hour, the following hour, and the
    /// window's own day-type for both (no roll-over at midnight).
    pub fn new(stop: Stop, direction: Direction, window: &TimeWindow) -> Self {
        Self {
            stop,
            direction,
            day_type: window.day_type(),
            hour: window.hour(),
            next_hour: window.next_hour(),
        }
    }
}

/// Unfiltered cell text for the two hour columns, in timetable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDepartures {
    pub current_hour: Vec<String>,
    pub next_hour: Vec<String>,
}

/// A source of timetable data.
///
/// Implementations may keep session state between calls; callers must not
/// run two calls on the same provider at once.
pub trait TimetableProvider {
    /// Read the current- and next-hour cells for a stop.
    ///
    /// A stop with no row in the timetable yields empty columns, not an error.
    fn fetch_departures(
        &mut self,
        query: &DepartureQuery,
    ) -> impl Future<Output = Result<RawDepartures, ProviderError>> + Send;

    /// Drop any session state and start afresh. Called after a failed or
    /// timed-out fetch, before the next one.
    fn reset(&mut self) -> impl Future<Output = Result<(), ProviderError>> + Send;
}
