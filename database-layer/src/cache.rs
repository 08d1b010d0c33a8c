//! Read-through query cache.
//!
//! Entries are keyed by `table:` plus the canonical JSON of the filter and
//! expire a fixed time after insertion. Reads never extend an entry's life.
//! The cache is process-local and never authoritative: writers evict the
//! whole table after a successful write and readers tolerate staleness up
//! to the TTL.

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    inserted_at: Instant,
    data: Value,
}

pub struct QueryCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached data for `table` and `filter`, if present and not expired.
    pub fn get(&self, table: &str, filter: &Value) -> Option<Value> {
        let key = cache_key(table, filter);
        {
            let entry = self.entries.get(&key)?;
            if entry.inserted_at.elapsed() <= self.ttl {
                return Some(entry.data.clone());
            }
        }
        self.entries.remove(&key);
        debug!(key = %key, "Query cache entry expired");
        None
    }

    /// Store `data`, sweeping expired entries first so distinct filters that
    /// are never read again do not accumulate.
    pub fn set(&self, table: &str, filter: &Value, data: Value) {
        self.purge_expired();
        self.entries.insert(
            cache_key(table, filter),
            CacheEntry {
                inserted_at: Instant::now(),
                data,
            },
        );
    }

    fn purge_expired(&self) {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "Purged expired query cache entries");
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Evict every entry cached for `table`.
    pub fn clear_table(&self, table: &str) {
        let prefix = format!("{}:", table);
        self.entries.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached value or run `loader`, caching a successful result.
    /// Loader errors propagate and are not cached.
    pub async fn get_or_load<T, E, F, Fut>(&self, table: &str, filter: &Value, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(table, filter) {
            match serde_json::from_value::<T>(cached) {
                Ok(value) => return Ok(value),
                Err(e) => warn!(table, error = %e, "Discarding undecodable cache entry"),
            }
        }

        let loaded = loader().await?;
        match serde_json::to_value(&loaded) {
            Ok(data) => self.set(table, filter, data),
            Err(e) => warn!(table, error = %e, "Query result not cacheable"),
        }
        Ok(loaded)
    }
}

/// `table:` followed by the filter serialized with object keys sorted at every level.
pub fn cache_key(table: &str, filter: &Value) -> String {
    let mut key = String::with_capacity(table.len() + 32);
    key.push_str(table);
    key.push(':');
    write_canonical(filter, &mut key);
    key
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(key) {
                    write_canonical(inner, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
