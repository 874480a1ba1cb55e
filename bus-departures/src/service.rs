//! Entry point for the chat transport.
//!
//! The transport decides once what a user action means and hands over a
//! [`Request`]; it gets back structured data and does all the wording and
//! keyboards itself.

use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info};

use crate::coordinator::{DepartureResult, QueryError, TimetableQueryCoordinator};
use crate::domain::{Direction, Gazetteer, Stop};
use crate::preferences::{
    Language, PreferenceError, PreferenceStore, PreferencesUpdate, UserId, UserPreferences,
};
use crate::resolver::{ResolutionResult, StopResolver};
use crate::window::{TimeWindow, WindowError};

/// A user action, already decoded by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Match typed text against the stop list.
    FindStop { text: String },
    /// Next departures from a stop, at a Unix timestamp (seconds).
    Departures { stop: Stop, at: i64 },
    SelectDirection(Direction),
    SelectLanguage(Language),
    AddFavorite(Stop),
    RemoveFavorite(Stop),
}

/// Structured reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Resolution { result: ResolutionResult },
    Departures(DepartureReport),
    Preferences { preferences: UserPreferences },
}

/// Departures together with what they were looked up for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartureReport {
    pub stop: Stop,
    pub direction: Direction,
    pub window: TimeWindow,
    pub result: DepartureResult,
}

/// Errors surfaced to the transport. None of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Departures were asked for before a direction was chosen
    #[error("no direction selected")]
    DirectionNotSelected,

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Preferences(#[from] PreferenceError),
}

/// Stop resolution, timetable queries and preferences behind one call.
pub struct BusService<S> {
    gazetteer: Gazetteer,
    resolver: StopResolver,
    coordinator: TimetableQueryCoordinator,
    preferences: S,
    timezone: Tz,
}

impl<S: PreferenceStore> BusService<S> {
    pub fn new(
        gazetteer: Gazetteer,
        coordinator: TimetableQueryCoordinator,
        preferences: S,
        timezone: Tz,
    ) -> Self {
        Self {
            resolver: StopResolver::new(&gazetteer),
            gazetteer,
            coordinator,
            preferences,
            timezone,
        }
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    /// Match typed text against the stop list. Needs no user state.
    pub fn resolve(&self, text: &str) -> ResolutionResult {
        self.resolver.resolve(text)
    }

    /// Handle one request for `user`.
    pub async fn handle(&self, user: UserId, request: Request) -> Result<Response, ServiceError> {
        match request {
            Request::FindStop { text } => Ok(Response::Resolution {
                result: self.resolve(&text),
            }),
            Request::Departures { stop, at } => {
                let report = self.departures(user, stop, at).await?;
                Ok(Response::Departures(report))
            }
            Request::SelectDirection(direction) => {
                self.update(user, PreferencesUpdate::direction(direction)).await
            }
            Request::SelectLanguage(language) => {
                self.update(user, PreferencesUpdate::language(language)).await
            }
            Request::AddFavorite(stop) => {
                let prefs = self.preferences.load(user).await?;
                let favorites = prefs.with_favorite(stop);
                self.update(user, PreferencesUpdate::favorite_stops(favorites)).await
            }
            Request::RemoveFavorite(stop) => {
                let prefs = self.preferences.load(user).await?;
                let favorites = prefs.without_favorite(stop);
                self.update(user, PreferencesUpdate::favorite_stops(favorites)).await
            }
        }
    }

    /// Favorites that still name a stop on the line, in stored order.
    pub async fn favorites(&self, user: UserId) -> Result<Vec<Stop>, ServiceError> {
        let prefs = self.preferences.load(user).await?;
        Ok(prefs
            .favorite_stops
            .iter()
            .filter_map(|name| self.gazetteer.get(name))
            .collect())
    }

    async fn departures(
        &self,
        user: UserId,
        stop: Stop,
        at: i64,
    ) -> Result<DepartureReport, ServiceError> {
        let prefs = self.preferences.load(user).await?;
        let direction = prefs.direction.ok_or(ServiceError::DirectionNotSelected)?;
        let window = TimeWindow::at(at, self.timezone)?;

        info!(
            %user,
            stop = %stop,
            %direction,
            hour = window.hour(),
            minute = window.minute(),
            "departure query"
        );
        let result = self.coordinator.query(stop, direction, window).await?;
        debug!(
            %user,
            current = result.current_hour.len(),
            next = result.next_hour.len(),
            "departure query answered"
        );

        Ok(DepartureReport {
            stop,
            direction,
            window,
            result,
        })
    }

    async fn update(
        &self,
        user: UserId,
        update: PreferencesUpdate,
    ) -> Result<Response, ServiceError> {
        let preferences = self.preferences.save(user, update).await?;
        Ok(Response::Preferences { preferences })
    }
}
