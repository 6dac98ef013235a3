//! Device info caching
//!
//! Counter blocks change on the order of minutes; pollers that check
//! terminal health every few seconds memoize them under the endpoint
//! address with a short TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use punchcard_types::DeviceInfo;

/// Get-or-store cache for device info, keyed by endpoint address
pub trait InfoCache: Send + Sync {
    /// Fetch a live entry, if any
    fn get(&self, key: &str) -> Option<DeviceInfo>;

    /// Store an entry that expires after `ttl`
    fn put(&self, key: &str, info: DeviceInfo, ttl: Duration);
}

struct Entry {
    info: DeviceInfo,
    expires_at: Instant,
}

/// In-process [`InfoCache`] backed by a mutexed map
#[derive(Default)]
pub struct MemoryInfoCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryInfoCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InfoCache for MemoryInfoCache {
    fn get(&self, key: &str) -> Option<DeviceInfo> {
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.info.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, info: DeviceInfo, ttl: Duration) {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                info,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}
