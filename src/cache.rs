//! In-memory response cache shared by one API client

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

struct CachedResponse {
    data: Value,
    stored_at: Instant,
}

impl CachedResponse {
    fn is_valid(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Raw JSON payloads keyed by endpoint and sorted query parameters
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedResponse>>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Build the key `endpoint|k1:v1|k2:v2` with parameters sorted by name.
    #[must_use]
    pub fn key(endpoint: &str, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let joined = sorted
            .iter()
            .map(|(name, value)| format!("{name}:{value}"))
            .collect::<Vec<_>>()
            .join("|");
        format!("{endpoint}|{joined}")
    }

    /// Return the payload stored under `key` if it is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|entry| entry.is_valid(self.ttl))
            .map(|entry| entry.data.clone())
    }

    pub fn insert(&self, key: String, data: Value) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CachedResponse {
                    data,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// Drop every expired entry and return how many were removed.
    pub fn cleanup(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(self.ttl));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "Dropped expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_sorts_params() {
        let key = ResponseCache::key(
            "weather",
            &[("lon", "-3.703800".to_string()), ("lat", "40.416800".to_string())],
        );
        assert_eq!(key, "weather|lat:40.416800|lon:-3.703800");
    }

    #[test]
    fn test_key_without_params() {
        assert_eq!(ResponseCache::key("uvi", &[]), "uvi|");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = ResponseCache::new(Duration::from_secs(600));
        cache.insert("weather|lat:1|lon:2".to_string(), json!({"name": "Madrid"}));

        assert_eq!(
            cache.get("weather|lat:1|lon:2"),
            Some(json!({"name": "Madrid"}))
        );

        tokio::time::advance(Duration::from_secs(601)).await;
        assert_eq!(cache.get("weather|lat:1|lon:2"), None);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.cleanup(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_keeps_fresh_entries() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("old".to_string(), json!(1));
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.insert("new".to_string(), json!(2));
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.get("new"), Some(json!(2)));

        cache.clear();
        assert!(cache.is_empty());
    }
}
