//! On-disk key/value cache with read-time expiry
//!
//! Entries live in a single sled tree as JSON `{ value, timestamp }` records.
//! Expiry is passive: a stale entry reads as absent but stays in storage until
//! the same key is written again.

use crate::TravelError;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

const TREE_NAME: &str = "cache";

#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    value: T,
    timestamp: DateTime<Utc>,
}

/// Cache handle. Cloning shares the underlying database.
#[derive(Clone)]
pub struct Cache {
    tree: sled::Tree,
    ttl: Duration,
}

impl Cache {
    pub const DEFAULT_TTL_HOURS: i64 = 24;

    /// Open (or create) the cache database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TravelError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening cache database");
        let db = sled::open(path)?;
        Self::from_db(&db)
    }

    /// In-memory database removed on drop
    pub fn temporary() -> Result<Self, TravelError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(&db)
    }

    fn from_db(db: &sled::Db) -> Result<Self, TravelError> {
        Ok(Self {
            tree: db.open_tree(TREE_NAME)?,
            ttl: Duration::hours(Self::DEFAULT_TTL_HOURS),
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, or `None` when missing or expired
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, TravelError> {
        self.get_at(key, Utc::now())
    }

    /// [`Cache::get`] evaluated at `now`
    #[instrument(level = "debug", skip(self))]
    pub fn get_at<T: DeserializeOwned>(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<T>, TravelError> {
        let Some(bytes) = self.tree.get(key.as_bytes())? else {
            debug!("Cache miss");
            return Ok(None);
        };

        let entry: CacheEntry<T> = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "Undecodable cache entry, treating as miss");
                return Ok(None);
            }
        };

        if now - entry.timestamp < self.ttl {
            debug!("Cache hit");
            Ok(Some(entry.value))
        } else {
            debug!(stored_at = %entry.timestamp, "Cache entry expired");
            Ok(None)
        }
    }

    /// Store `value` under `key`, replacing any previous entry
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), TravelError> {
        self.set_at(key, value, Utc::now())
    }

    /// [`Cache::set`] stamped with `now`
    #[instrument(level = "debug", skip(self, value))]
    pub fn set_at<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        now: DateTime<Utc>,
    ) -> Result<(), TravelError> {
        let entry = CacheEntry { value, timestamp: now };
        let bytes = serde_json::to_vec(&entry)?;
        self.tree.insert(key.as_bytes(), bytes)?;
        self.tree.flush()?;
        debug!("Cache entry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        let cache = Cache::temporary().unwrap();
        let value = json!({"dest_id": "-1456928", "labels": ["Paris", "France"]});

        cache.set("destination:paris", &value).unwrap();
        let cached: Option<serde_json::Value> = cache.get("destination:paris").unwrap();
        assert_eq!(cached, Some(value));
    }

    #[test]
    fn test_missing_key() {
        let cache = Cache::temporary().unwrap();
        let cached: Option<String> = cache.get("nothing-here").unwrap();
        assert!(cached.is_none());
    }

    #[test]
    fn test_expired_entry_reads_as_absent_but_is_kept() {
        let cache = Cache::temporary().unwrap();
        let now = Utc::now();
        let stored_at = now - Duration::hours(24);

        cache.set_at("key", &"value".to_string(), stored_at).unwrap();

        let cached: Option<String> = cache.get_at("key", now).unwrap();
        assert!(cached.is_none());

        // Row is still there, just stale
        let cached: Option<String> = cache.get_at("key", stored_at).unwrap();
        assert_eq!(cached.as_deref(), Some("value"));
    }

    #[test]
    fn test_entry_just_inside_ttl() {
        let cache = Cache::temporary().unwrap();
        let now = Utc::now();
        cache
            .set_at("key", &42u32, now - Duration::hours(23) - Duration::minutes(59))
            .unwrap();
        assert_eq!(cache.get_at::<u32>("key", now).unwrap(), Some(42));
    }

    #[test]
    fn test_set_overwrites_and_refreshes() {
        let cache = Cache::temporary().unwrap();
        let now = Utc::now();
        cache.set_at("key", &1u32, now - Duration::hours(30)).unwrap();
        cache.set_at("key", &2u32, now).unwrap();
        assert_eq!(cache.get_at::<u32>("key", now).unwrap(), Some(2));
    }

    #[test]
    fn test_custom_ttl() {
        let cache = Cache::temporary().unwrap().with_ttl(Duration::hours(1));
        let now = Utc::now();
        cache.set_at("key", &1u32, now - Duration::hours(2)).unwrap();
        assert_eq!(cache.get_at::<u32>("key", now).unwrap(), None);
    }

    #[test]
    fn test_mismatched_type_is_a_miss() {
        let cache = Cache::temporary().unwrap();
        cache.set("key", &"not a number").unwrap();
        assert_eq!(cache.get::<u32>("key").unwrap(), None);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache-db");

        {
            let cache = Cache::open(&path).unwrap();
            cache.set("details:42", &vec!["Pool", "Spa"]).unwrap();
        }

        let cache = Cache::open(&path).unwrap();
        let cached: Option<Vec<String>> = cache.get("details:42").unwrap();
        assert_eq!(cached, Some(vec!["Pool".to_string(), "Spa".to_string()]));
    }
}
