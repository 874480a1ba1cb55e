//! Timetable grids and hour-column extraction.
//!
//! A grid is one page of the published timetable: a row per stop (a stop
//! can have more than one row), each row holding every departure of the day
//! for one direction and day-type.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Stop;

use super::RawDepartures;

/// One direction/day-type page of the timetable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableGrid {
    pub rows: Vec<GridRow>,
}

/// A stop's row: its label and the text of each time cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRow {
    pub stop: String,
    pub cells: Vec<String>,
}

impl TimetableGrid {
    /// Cells for `hour` and `next_hour` from every row labelled with `stop`.
    ///
    /// A row matches when its label contains the stop name; a cell belongs
    /// to hour `h` when its text contains `"hh:"`. Cells keep row order, then
    /// cell order. Cell text is trimmed but otherwise passed through as is.
    pub fn departures(&self, stop: Stop, hour: u8, next_hour: u8) -> RawDepartures {
        let rows: Vec<&GridRow> = self
            .rows
            .iter()
            .filter(|row| row.stop.contains(stop.name()))
            .collect();

        if rows.is_empty() {
            debug!(stop = %stop, "no timetable row for stop");
            return RawDepartures::default();
        }

        RawDepartures {
            current_hour: cells_for_hour(&rows, hour),
            next_hour: cells_for_hour(&rows, next_hour),
        }
    }
}

fn cells_for_hour(rows: &[&GridRow], hour: u8) -> Vec<String> {
    let label = format!("{hour:02}:");
    rows.iter()
        .flat_map(|row| row.cells.iter())
        .map(|cell| cell.trim())
        .filter(|cell| cell.contains(&label))
        .map(str::to_string)
        .collect()
}
