//! Persistent key-value store backed by fjall.
//!
//! Holds the last weather and forecast payloads, the chart data and the
//! dark mode preference between runs. Entries may carry an expiry; expired
//! entries are removed on read.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use fjall::Keyspace;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task;

/// Last current-weather payload and when it was fetched
pub const WEATHER_DATA_KEY: &str = "weatherData";
/// Last forecast payload and when it was fetched
pub const FORECAST_DATA_KEY: &str = "forecastData";
/// Daily aggregates prepared for the chart view
pub const CHART_DATA_KEY: &str = "chartData";
/// Manual dark mode preference
pub const DARK_MODE_KEY: &str = "darkMode";

/// A payload together with the moment it was fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> Stamped<T> {
    pub fn now(data: T) -> Self {
        Self {
            data,
            timestamp: Utc::now(),
        }
    }

    /// Whether the payload is younger than `max_age`
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        (Utc::now() - self.timestamp)
            .to_std()
            .map(|age| age < max_age)
            .unwrap_or(true)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: Option<u64>, // Unix timestamp (seconds)
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

#[derive(Clone)]
pub struct Storage {
    store: Keyspace,
}

impl Storage {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create storage directory {}", path.display()))?;
        let db = fjall::Database::builder(path)
            .open()
            .with_context(|| format!("Failed to open storage at {}", path.display()))?;
        let items = db.keyspace("clima", fjall::KeyspaceCreateOptions::default)?;
        Ok(Storage { store: items })
    }

    /// Stores a serializable value, optionally with a time-to-live.
    #[tracing::instrument(name = "put_storage", level = "debug", skip(self))]
    pub async fn put<T: Serialize + Send + Debug + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = match ttl {
            Some(ttl) => Some(
                SystemTime::now()
                    .checked_add(ttl)
                    .ok_or(anyhow!("TTL overflow"))?
                    .duration_since(UNIX_EPOCH)?
                    .as_secs(),
            ),
            None => None,
        };
        let entry = StoredEntry { value, expires_at };
        let bytes = postcard::to_stdvec(&entry)?;

        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for missing or expired entries.
    #[tracing::instrument(name = "query_storage", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        let Some(bytes) = maybe_bytes else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        let entry: StoredEntry<T> = postcard::from_bytes(&bytes)
            .with_context(|| format!("Corrupt storage entry for {key}"))?;

        match entry.expires_at {
            Some(expires_at) if unix_now()? >= expires_at => {
                tracing::debug!("Key found but expired");
                self.remove(key).await?;
                Ok(None)
            }
            _ => Ok(Some(entry.value)),
        }
    }

    /// Stores a value as JSON text.
    ///
    /// For payloads whose serde representation is self-describing
    /// (`serde_json::Value`, tagged timestamps) and can't round trip
    /// through postcard directly.
    pub async fn put_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.put(key, text, ttl).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get::<String>(key).await? {
            Some(text) => Ok(Some(
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid JSON stored under {key}"))?,
            )),
            None => Ok(None),
        }
    }

    /// Removes a key from the store.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}
