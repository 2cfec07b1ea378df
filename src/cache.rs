//! Result caching keyed by (tool name, canonical arguments).
//!
//! Two calls hit the same entry exactly when they name the same tool and
//! their argument objects are structurally equal, regardless of key order.
//! Canonicalization sorts object keys recursively before hashing, so
//! `{"a": 1, "b": 2}` and `{"b": 2, "a": 1}` share a fingerprint.
//!
//! Only successful results are cached; error results and streaming calls
//! never enter the cache. Entries live until [`ToolCache::clear`] is
//! called.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Compute the cache fingerprint for a call.
///
/// Stable across argument key order but sensitive to every value.
pub fn fingerprint(tool_name: &str, arguments: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    tool_name.hash(&mut hasher);
    hash_value(arguments, &mut hasher);
    hasher.finish()
}

/// Hash a JSON value with object keys visited in sorted order
fn hash_value(value: &Value, hasher: &mut DefaultHasher) {
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Number(n) => {
            2u8.hash(hasher);
            n.to_string().hash(hasher);
        }
        Value::String(s) => {
            3u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Array(items) => {
            4u8.hash(hasher);
            items.len().hash(hasher);
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Object(map) => {
            5u8.hash(hasher);
            map.len().hash(hasher);
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                key.hash(hasher);
                hash_value(&map[key], hasher);
            }
        }
    }
}

/// A cached successful result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: Value,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: u64,
    misses: u64,
}

/// In-memory result cache shared across calls.
///
/// The lock is held only for map operations, never across tool execution,
/// so concurrent identical misses may each compute once; the last insert
/// wins and subsequent calls hit.
#[derive(Debug, Clone, Default)]
pub struct ToolCache {
    entries: Arc<Mutex<HashMap<u64, CacheEntry>>>,
    stats: Arc<Mutex<CacheStats>>,
}

impl ToolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a cached result, counting the hit or miss
    pub fn get(&self, tool_name: &str, arguments: &Value) -> Option<Value> {
        let key = fingerprint(tool_name, arguments);
        let entries = self.entries.lock().unwrap();
        let mut stats = self.stats.lock().unwrap();
        match entries.get(&key) {
            Some(entry) => {
                stats.hits += 1;
                debug!("cache hit for '{}'", tool_name);
                Some(entry.result.clone())
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    /// Store a successful result
    pub fn insert(&self, tool_name: &str, arguments: &Value, result: Value) {
        let key = fingerprint(tool_name, arguments);
        self.entries.lock().unwrap().insert(
            key,
            CacheEntry {
                result,
                cached_at: Utc::now(),
            },
        );
    }

    /// Serve from the cache or compute and store.
    ///
    /// Only successful computations are stored; an `Err` leaves the cache
    /// untouched so the next call retries.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        tool_name: &str,
        arguments: &Value,
        compute: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Value, E>>,
    {
        if let Some(hit) = self.get(tool_name, arguments) {
            return Ok(hit);
        }
        let value = compute().await?;
        self.insert(tool_name, arguments, value.clone());
        Ok(value)
    }

    /// Drop every entry and reset counters
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
        let mut stats = self.stats.lock().unwrap();
        stats.hits = 0;
        stats.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// (hits, misses) since construction or the last clear
    pub fn stats(&self) -> (u64, u64) {
        let stats = self.stats.lock().unwrap();
        (stats.hits, stats.misses)
    }
}
