//! Mock timetable provider for running without a timetable service.
//!
//! Serves grids loaded from JSON files (or built in memory) as if they were
//! live timetable pages.

use std::collections::HashMap;
use std::path::Path;

use crate::domain::{DayType, Direction};

use super::error::ProviderError;
use super::grid::TimetableGrid;
use super::{DepartureQuery, RawDepartures, TimetableProvider};

const DIRECTIONS: [Direction; 2] = [Direction::Zwolle, Direction::Apeldoorn];
const DAY_TYPES: [DayType; 3] = [DayType::Weekday, DayType::Saturday, DayType::SundayOrHoliday];

/// Provider that serves fixed grids, keyed by direction and day-type.
#[derive(Debug, Clone, Default)]
pub struct MockTimetableProvider {
    grids: HashMap<(Direction, DayType), TimetableGrid>,
}

impl MockTimetableProvider {
    /// Create an empty mock; add pages with [`with_grid`](Self::with_grid).
    pub fn new() -> Self {
        Self::default()
    }

    /// Load grids from a directory.
    ///
    /// Expects files named `{direction}-{day_type}.json` (e.g.
    /// `zwolle-weekday.json`, `apeldoorn-sunday.json`). Missing files are
    /// skipped, but at least one must exist.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let data_dir = data_dir.as_ref();
        let mut grids = HashMap::new();

        for direction in DIRECTIONS {
            for day_type in DAY_TYPES {
                let path = data_dir.join(format!("{direction}-{day_type}.json"));
                if !path.is_file() {
                    continue;
                }

                let json = std::fs::read_to_string(&path).map_err(|e| ProviderError::Fixture {
                    path: path.clone(),
                    message: e.to_string(),
                })?;

                let grid: TimetableGrid =
                    serde_json::from_str(&json).map_err(|e| ProviderError::Fixture {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;

                grids.insert((direction, day_type), grid);
            }
        }

        if grids.is_empty() {
            return Err(ProviderError::Fixture {
                path: data_dir.to_path_buf(),
                message: "no timetable files found".to_string(),
            });
        }

        Ok(Self { grids })
    }

    /// Add or replace the page for a direction and day-type.
    pub fn with_grid(mut self, direction: Direction, day_type: DayType, grid: TimetableGrid) -> Self {
        self.grids.insert((direction, day_type), grid);
        self
    }
}

impl TimetableProvider for MockTimetableProvider {
    async fn fetch_departures(
        &mut self,
        query: &DepartureQuery,
    ) -> Result<RawDepartures, ProviderError> {
        let grid = self
            .grids
            .get(&(query.direction, query.day_type))
            .ok_or_else(|| {
                ProviderError::Unavailable(format!(
                    "no mock timetable for {} on {}",
                    query.direction, query.day_type
                ))
            })?;

        Ok(grid.departures(query.stop, query.hour, query.next_hour))
    }

    async fn reset(&mut self) -> Result<(), ProviderError> {
        Ok(())
    }
}
