//! HTTP timetable provider.
//!
//! Fetches one timetable page per (direction, day-type) as a JSON
//! [`TimetableGrid`] and extracts the requested hour columns from it.

use std::time::Duration;

use tracing::debug;

use crate::domain::{DayType, Direction};

use super::error::ProviderError;
use super::grid::TimetableGrid;
use super::{DepartureQuery, RawDepartures, TimetableProvider};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How much of an unparseable body to keep for diagnostics.
const BODY_EXCERPT_CHARS: usize = 500;

/// Configuration for the HTTP provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the timetable service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Create a new config for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The timetable site's name for a direction: trips towards Zwolle are its
/// return leg.
fn direction_code(direction: Direction) -> &'static str {
    match direction {
        Direction::Zwolle => "Return",
        Direction::Apeldoorn => "Away",
    }
}

/// The timetable site's label for a day-type.
fn day_label(day_type: DayType) -> &'static str {
    match day_type {
        DayType::Weekday => "maandag t/m vrijdag",
        DayType::Saturday => "zaterdag",
        DayType::SundayOrHoliday => "zon- en feestdagen",
    }
}

/// Timetable provider backed by an HTTP service.
#[derive(Debug)]
pub struct HttpTimetableProvider {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl HttpTimetableProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = build_client(&config)?;
        Ok(Self { http, config })
    }

    fn timetable_url(&self) -> String {
        format!("{}/timetable", self.config.base_url.trim_end_matches('/'))
    }

    /// Fetch the timetable page for a direction and day-type.
    pub async fn fetch_grid(
        &self,
        direction: Direction,
        day_type: DayType,
    ) -> Result<TimetableGrid, ProviderError> {
        let response = self
            .http
            .get(self.timetable_url())
            .query(&[
                ("direction", direction_code(direction)),
                ("day", day_label(day_type)),
            ])
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unavailable(
                "unauthorized by timetable service".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "API error {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;

        serde_json::from_str(&body).map_err(|e| {
            let excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
            debug!(%direction, %day_type, body = %excerpt, "unparseable timetable page");
            ProviderError::Malformed(e.to_string())
        })
    }

    fn request_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.config.timeout())
        } else {
            ProviderError::Http(err)
        }
    }
}

impl TimetableProvider for HttpTimetableProvider {
    async fn fetch_departures(
        &mut self,
        query: &DepartureQuery,
    ) -> Result<RawDepartures, ProviderError> {
        let grid = self.fetch_grid(query.direction, query.day_type).await?;
        Ok(grid.departures(query.stop, query.hour, query.next_hour))
    }

    /// Replace the HTTP client, dropping pooled connections.
    async fn reset(&mut self) -> Result<(), ProviderError> {
        self.http = build_client(&self.config)?;
        Ok(())
    }
}

fn build_client(config: &ProviderConfig) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder().timeout(config.timeout()).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Gazetteer;
    use crate::window::TimeWindow;

    #[test]
    fn config_builder() {
        let config = ProviderConfig::new("http://localhost:8080").with_timeout(5);

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn config_defaults() {
        let config = ProviderConfig::new("http://localhost:8080");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn site_codes() {
        assert_eq!(direction_code(Direction::Zwolle), "Return");
        assert_eq!(direction_code(Direction::Apeldoorn), "Away");
        assert_eq!(day_label(DayType::Weekday), "maandag t/m vrijdag");
        assert_eq!(day_label(DayType::Saturday), "zaterdag");
        assert_eq!(day_label(DayType::SundayOrHoliday), "zon- en feestdagen");
    }

    #[test]
    fn url_ignores_trailing_slash() {
        let provider =
            HttpTimetableProvider::new(ProviderConfig::new("http://localhost:8080/")).unwrap();
        assert_eq!(provider.timetable_url(), "http://localhost:8080/timetable");
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        // Nothing listens on port 1.
        let config = ProviderConfig::new("http://127.0.0.1:1").with_timeout(5);
        let mut provider = HttpTimetableProvider::new(config).unwrap();
        let stop = Gazetteer::line().get("Epe, Centrum").unwrap();
        let query =
            DepartureQuery::new(stop, Direction::Zwolle, &TimeWindow::new(3, 7, 40).unwrap());

        assert!(provider.fetch_departures(&query).await.is_err());
        assert!(provider.reset().await.is_ok());
    }

    // Tests against a live timetable service would go here; they need a
    // reachable TIMETABLE_URL and should be marked #[ignore].
}
