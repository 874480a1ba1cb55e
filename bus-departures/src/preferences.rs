//! Per-user preferences: travel direction, language and favorite stops.
//!
//! Stores are last-write-wins per field. [`JsonFilePreferenceStore`] keeps
//! everything in one JSON object keyed by user id, the way the bot has
//! always stored it; [`MemoryPreferenceStore`] is for tests and embedding.
//!
//! Records may carry keys this crate doesn't know (older bot versions wrote
//! more); they are kept on rewrite.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::domain::{Direction, Stop};

/// Chat user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Nl,
    Uk,
}

/// Stored preferences for one user. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,

    #[serde(
        default,
        rename = "language_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub language: Option<Language>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub favorite_stops: Vec<String>,

    /// Name the user gave when first starting the bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Stored keys without a field here, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserPreferences {
    /// Apply the fields set in `update`, leaving the rest alone.
    pub fn merge(&mut self, update: PreferencesUpdate) {
        if let Some(direction) = update.direction {
            self.direction = Some(direction);
        }
        if let Some(language) = update.language {
            self.language = Some(language);
        }
        if let Some(favorites) = update.favorite_stops {
            self.favorite_stops = favorites;
        }
    }

    /// Favorites with `stop` appended, unless it is already there.
    pub fn with_favorite(&self, stop: Stop) -> Vec<String> {
        let mut favorites = self.favorite_stops.clone();
        if !favorites.iter().any(|f| f == stop.name()) {
            favorites.push(stop.name().to_string());
        }
        favorites
    }

    /// Favorites without `stop`.
    pub fn without_favorite(&self, stop: Stop) -> Vec<String> {
        self.favorite_stops
            .iter()
            .filter(|f| *f != stop.name())
            .cloned()
            .collect()
    }
}

/// A partial write: `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub direction: Option<Direction>,
    pub language: Option<Language>,
    pub favorite_stops: Option<Vec<String>>,
}

impl PreferencesUpdate {
    pub fn direction(direction: Direction) -> Self {
        Self {
            direction: Some(direction),
            ..Default::default()
        }
    }

    pub fn language(language: Language) -> Self {
        Self {
            language: Some(language),
            ..Default::default()
        }
    }

    pub fn favorite_stops(favorites: Vec<String>) -> Self {
        Self {
            favorite_stops: Some(favorites),
            ..Default::default()
        }
    }
}

/// Errors from a preference store.
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    /// Reading or writing the backing file failed
    #[error("preference file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but is not a JSON object of records
    #[error("preference file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Preferences could not be encoded
    #[error("could not encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key-value storage of user preferences.
pub trait PreferenceStore {
    /// Stored preferences, or the defaults for an unknown user.
    fn load(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<UserPreferences, PreferenceError>> + Send;

    /// Merge `update` into the user's preferences and return the result.
    fn save(
        &self,
        user: UserId,
        update: PreferencesUpdate,
    ) -> impl Future<Output = Result<UserPreferences, PreferenceError>> + Send;
}

/// In-memory preference store.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    inner: Arc<RwLock<HashMap<UserId, UserPreferences>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self, user: UserId) -> Result<UserPreferences, PreferenceError> {
        let guard = self.inner.read().await;
        Ok(guard.get(&user).cloned().unwrap_or_default())
    }

    async fn save(
        &self,
        user: UserId,
        update: PreferencesUpdate,
    ) -> Result<UserPreferences, PreferenceError> {
        let mut guard = self.inner.write().await;
        let prefs = guard.entry(user).or_default();
        prefs.merge(update);
        Ok(prefs.clone())
    }
}

/// All users, keyed by the decimal user id. Records stay raw JSON so that
/// one bad record doesn't stop the others being read or written back.
type PreferenceFile = Map<String, Value>;

/// Preference store backed by a single JSON file.
///
/// Writes rewrite the whole file through a temporary file and a rename; a
/// lock serializes read-modify-write cycles within this process. A file that
/// can't be parsed is never overwritten.
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file. A missing file counts as empty.
    async fn read_all(&self) -> Result<PreferenceFile, PreferenceError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PreferenceFile::new()),
            Err(source) => {
                return Err(PreferenceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&json).map_err(|source| PreferenceError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the file with `all`, atomically on the same filesystem.
    async fn write_all(&self, all: &PreferenceFile) -> Result<(), PreferenceError> {
        let json = serde_json::to_string_pretty(all)?;
        let staging = self.staging_path();

        tokio::fs::write(&staging, json)
            .await
            .map_err(|source| PreferenceError::Io {
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|source| PreferenceError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Sibling of the preference file used while writing.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Decode one user's record. A record that doesn't decode is treated
    /// as unset.
    fn decode(&self, user: UserId, record: Value) -> UserPreferences {
        serde_json::from_value(record).unwrap_or_else(|e| {
            warn!(
                path = ?self.path,
                %user,
                error = %e,
                "unreadable preference record, using defaults"
            );
            UserPreferences::default()
        })
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    async fn load(&self, user: UserId) -> Result<UserPreferences, PreferenceError> {
        let _guard = self.lock.lock().await;
        let mut all = match self.read_all().await {
            Ok(all) => all,
            Err(e) => {
                warn!(error = %e, "cannot read preference file, using defaults");
                return Ok(UserPreferences::default());
            }
        };

        Ok(all
            .remove(&user.to_string())
            .map(|record| self.decode(user, record))
            .unwrap_or_default())
    }

    async fn save(
        &self,
        user: UserId,
        update: PreferencesUpdate,
    ) -> Result<UserPreferences, PreferenceError> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        let key = user.to_string();

        let mut prefs = all
            .remove(&key)
            .map(|record| self.decode(user, record))
            .unwrap_or_default();
        prefs.merge(update);

        all.insert(key, serde_json::to_value(&prefs)?);
        self.write_all(&all).await?;

        Ok(prefs)
    }
}
