//! Application configuration from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::cache::CacheConfig;
use crate::coordinator::QueueConfig;
use crate::timetable::ProviderConfig;
use crate::window::DEFAULT_TIMEZONE;

/// Default location of the user preference file.
const DEFAULT_PREFERENCES_PATH: &str = "user_db.json";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable is set but can't be used
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Everything needed to run the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Timezone the timetable is published in.
    pub timezone: Tz,
    pub provider: ProviderConfig,
    pub queue: QueueConfig,
    pub cache: CacheConfig,
    pub preferences_path: PathBuf,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    ///
    /// | Variable | Meaning | Default |
    /// |---|---|---|
    /// | `TIMETABLE_URL` | base URL of the timetable service | required |
    /// | `TIMETABLE_TIMEOUT_SECS` | HTTP timeout | 30 |
    /// | `TIMETABLE_TZ` | timetable timezone | `Europe/Amsterdam` |
    /// | `QUEUE_TIMEOUT_SECS` | bound on one provider call | 60 |
    /// | `QUEUE_CAPACITY` | queries waiting for the provider | 32 |
    /// | `CACHE_TTL_SECS` | lifetime of cached timetable columns | 3600 |
    /// | `USER_DB` | preference file | `user_db.json` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("TIMETABLE_URL").ok_or(ConfigError::Missing("TIMETABLE_URL"))?;

        let mut provider = ProviderConfig::new(base_url);
        if let Some(secs) = parse(&lookup, "TIMETABLE_TIMEOUT_SECS")? {
            provider = provider.with_timeout(secs);
        }

        let timezone = parse(&lookup, "TIMETABLE_TZ")?.unwrap_or(DEFAULT_TIMEZONE);

        let mut queue = QueueConfig::default();
        if let Some(secs) = parse(&lookup, "QUEUE_TIMEOUT_SECS")? {
            queue = queue.with_call_timeout(Duration::from_secs(secs));
        }
        if let Some(capacity) = parse(&lookup, "QUEUE_CAPACITY")? {
            queue = queue.with_capacity(capacity);
        }

        let mut cache = CacheConfig::default();
        if let Some(secs) = parse(&lookup, "CACHE_TTL_SECS")? {
            cache.ttl = Duration::from_secs(secs);
        }

        let preferences_path = lookup("USER_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFERENCES_PATH));

        Ok(Self {
            timezone,
            provider,
            queue,
            cache,
            preferences_path,
        })
    }
}

/// Parse an optional variable; set but unparseable is an error.
fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[("TIMETABLE_URL", "http://timetable.local")]).unwrap();

        assert_eq!(config.provider.base_url, "http://timetable.local");
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.timezone, chrono_tz::Europe::Amsterdam);
        assert_eq!(config.queue.call_timeout, Duration::from_secs(60));
        assert_eq!(config.queue.capacity, 32);
        assert_eq!(config.queue.retries, 1);
        assert_eq!(config.cache.ttl, Duration::from_secs(3600));
        assert_eq!(config.preferences_path, PathBuf::from("user_db.json"));
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("TIMETABLE_URL", "http://timetable.local"),
            ("TIMETABLE_TIMEOUT_SECS", "10"),
            ("TIMETABLE_TZ", "Europe/Brussels"),
            ("QUEUE_TIMEOUT_SECS", " 20 "),
            ("QUEUE_CAPACITY", "4"),
            ("CACHE_TTL_SECS", "60"),
            ("USER_DB", "/var/lib/bus/users.json"),
        ])
        .unwrap();

        assert_eq!(config.provider.timeout_secs, 10);
        assert_eq!(config.timezone, chrono_tz::Europe::Brussels);
        assert_eq!(config.queue.call_timeout, Duration::from_secs(20));
        assert_eq!(config.queue.capacity, 4);
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.preferences_path, PathBuf::from("/var/lib/bus/users.json"));
    }

    #[test]
    fn url_is_required() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::Missing("TIMETABLE_URL"));
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = config(&[
            ("TIMETABLE_URL", "http://timetable.local"),
            ("QUEUE_CAPACITY", "many"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "QUEUE_CAPACITY",
                value: "many".into()
            }
        );

        let err = config(&[
            ("TIMETABLE_URL", "http://timetable.local"),
            ("TIMETABLE_TZ", "Mars/Olympus"),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid TIMETABLE_TZ: \"Mars/Olympus\"");
    }
}
