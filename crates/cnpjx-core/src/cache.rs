//! Time-bounded result cache.
//!
//! [`ResultCache`] sits in front of a [`ProfileStore`] and decides freshness;
//! the store only does exact-key reads and upserts. Cache trouble never fails a
//! lookup: unreadable or stale rows read as misses and write errors are logged.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cnpjx_warehouse::{CachedLookup, ProfileWarehouse};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::{CompanyProfile, CoreError, RegistryId, UtcDateTime};

/// One stored cache row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProfile {
    pub registry_id: String,
    /// Fetch time as written; parsed leniently on read.
    pub fetched_at: String,
    /// JSON-serialized [`CompanyProfile`].
    pub payload: String,
    pub source: Option<String>,
}

/// Key-value storage behind the result cache.
///
/// Implementations may block on I/O. The orchestrator reaches them through
/// [`ResultCache::fetch`] and [`ResultCache::store`], which run on tokio's
/// blocking pool.
pub trait ProfileStore: Send + Sync {
    fn get(&self, registry_id: &str) -> Result<Option<StoredProfile>, CoreError>;

    /// Inserts or replaces the row for `entry.registry_id`.
    fn put(&self, entry: StoredProfile) -> Result<(), CoreError>;
}

/// In-process store; contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    rows: Mutex<HashMap<String, StoredProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows
            .lock()
            .expect("memory store lock should not be poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, registry_id: &str) -> Result<Option<StoredProfile>, CoreError> {
        Ok(self
            .rows
            .lock()
            .expect("memory store lock should not be poisoned")
            .get(registry_id)
            .cloned())
    }

    fn put(&self, entry: StoredProfile) -> Result<(), CoreError> {
        self.rows
            .lock()
            .expect("memory store lock should not be poisoned")
            .insert(entry.registry_id.clone(), entry);
        Ok(())
    }
}

impl From<CachedLookup> for StoredProfile {
    fn from(row: CachedLookup) -> Self {
        Self {
            registry_id: row.registry_id,
            fetched_at: row.fetched_at,
            payload: row.payload,
            source: row.source,
        }
    }
}

impl From<StoredProfile> for CachedLookup {
    fn from(entry: StoredProfile) -> Self {
        Self {
            registry_id: entry.registry_id,
            fetched_at: entry.fetched_at,
            payload: entry.payload,
            source: entry.source,
        }
    }
}

impl ProfileStore for ProfileWarehouse {
    fn get(&self, registry_id: &str) -> Result<Option<StoredProfile>, CoreError> {
        Ok(ProfileWarehouse::get(self, registry_id)?.map(StoredProfile::from))
    }

    fn put(&self, entry: StoredProfile) -> Result<(), CoreError> {
        Ok(self.upsert(&CachedLookup::from(entry))?)
    }
}

/// Freshness policy over a [`ProfileStore`].
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn ProfileStore>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    pub fn new(store: Arc<dyn ProfileStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { store, ttl, clock }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached profile for `registry_id`, if any.
    pub fn get(&self, registry_id: &RegistryId) -> Option<CompanyProfile> {
        let key = registry_id.as_str();
        let entry = match self.store.get(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(registry_id = key, "cache miss");
                return None;
            }
            Err(error) => {
                warn!(registry_id = key, %error, "cache read failed, treating as miss");
                return None;
            }
        };

        let fetched_at = match UtcDateTime::parse(&entry.fetched_at) {
            Ok(fetched_at) => fetched_at,
            Err(error) => {
                warn!(registry_id = key, %error, "cached fetch time unreadable, treating as expired");
                return None;
            }
        };

        let age = self.clock.now().saturating_since(fetched_at);
        if age > self.ttl {
            debug!(registry_id = key, age_secs = age.as_secs(), "cache entry expired");
            return None;
        }

        match serde_json::from_str::<CompanyProfile>(&entry.payload) {
            Ok(profile) => {
                debug!(registry_id = key, age_secs = age.as_secs(), "cache hit");
                Some(profile)
            }
            Err(error) => {
                warn!(registry_id = key, %error, "cached payload unreadable, treating as miss");
                None
            }
        }
    }

    /// [`get`](Self::get) on the blocking pool, for use from async code.
    pub async fn fetch(&self, registry_id: &RegistryId) -> Option<CompanyProfile> {
        let cache = self.clone();
        let registry_id = registry_id.clone();
        tokio::task::spawn_blocking(move || cache.get(&registry_id))
            .await
            .unwrap_or_else(|error| {
                warn!(%error, "cache read task failed, treating as miss");
                None
            })
    }

    /// [`put`](Self::put) on the blocking pool, for use from async code.
    pub async fn store(&self, registry_id: &RegistryId, profile: &CompanyProfile) {
        let cache = self.clone();
        let registry_id = registry_id.clone();
        let profile = profile.clone();
        if let Err(error) =
            tokio::task::spawn_blocking(move || cache.put(&registry_id, &profile)).await
        {
            warn!(%error, "cache write task failed");
        }
    }

    /// Stores `profile` under `registry_id`, stamped with the current time.
    pub fn put(&self, registry_id: &RegistryId, profile: &CompanyProfile) {
        let key = registry_id.as_str();
        let payload = match serde_json::to_string(profile) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(registry_id = key, %error, "profile could not be serialized for the cache");
                return;
            }
        };

        let entry = StoredProfile {
            registry_id: key.to_owned(),
            fetched_at: self.clock.now().format_rfc3339(),
            payload,
            source: Some(profile.source.clone()),
        };

        if let Err(error) = self.store.put(entry) {
            warn!(registry_id = key, %error, "cache write failed");
        }
    }
}
