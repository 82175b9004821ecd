use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Read-through cache of gateway responses, keyed by URL.
///
/// Entries expire `ttl` after insertion. Clones share the same entries, so
/// one cache can be handed to several readers and invalidated from outside.
#[derive(Debug, Clone)]
pub struct ReadCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

#[derive(Debug)]
struct CacheEntry {
    bytes: Bytes,
    inserted: Instant,
}

impl ReadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh bytes for `url`, if any. Expired entries are dropped on access.
    pub fn get(&self, url: &str) -> Option<Bytes> {
        let mut entries = self.entries.lock();
        match entries.get(url) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => Some(entry.bytes.clone()),
            Some(_) => {
                entries.remove(url);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, url: &str, bytes: Bytes) {
        self.entries.lock().insert(
            url.to_string(),
            CacheEntry {
                bytes,
                inserted: Instant::now(),
            },
        );
    }

    /// Drop the entry for `url`. Returns whether there was one.
    pub fn invalidate(&self, url: &str) -> bool {
        self.entries.lock().remove(url).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries
            .lock()
            .retain(|_, entry| entry.inserted.elapsed() < ttl);
    }

    /// Number of entries held, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
