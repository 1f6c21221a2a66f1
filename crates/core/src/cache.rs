//! Commit cache.
//!
//! Commits are immutable and content-addressed, so a cache entry can never
//! go stale: once a (endpoint, commit id) pair is populated, every later
//! resolution of that id returns the same value. The cache is an explicit
//! object injected into each [`Repository`](crate::repository::Repository)
//! handle rather than process-wide state; handles pointing at the same
//! endpoint share one via `Arc`.
//!
//! Concurrent population by multiple handles is harmless: values are
//! immutable, so the last writer for a key wins with no torn reads.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::commit::Commit;

/// Cache key: (repository endpoint URL, commit id).
pub type CacheKey = (String, String);

/// Default number of commits retained before eviction.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A bounded LRU cache of resolved commits.
#[derive(Debug)]
pub struct CommitCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    map: HashMap<CacheKey, Arc<Commit>>,
    // Recency queue: front = least recently used.
    order: VecDeque<CacheKey>,
}

impl CommitCache {
    /// Create a cache retaining at most `capacity` commits.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Look up a commit, marking it most-recently-used on a hit.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Commit>> {
        let mut inner = self.lock();
        let hit = inner.map.get(key).cloned();
        if hit.is_some() {
            inner.order.retain(|k| k != key);
            inner.order.push_back(key.clone());
        }
        hit
    }

    /// Insert a commit, evicting the least-recently-used entry when full.
    ///
    /// Re-inserting an existing key replaces the value; since commits are
    /// immutable this only matters for recency bookkeeping.
    pub fn put(&self, key: CacheKey, commit: Arc<Commit>) {
        let mut inner = self.lock();
        if inner.map.insert(key.clone(), commit).is_some() {
            inner.order.retain(|k| k != &key);
        }
        inner.order.push_back(key);
        while inner.map.len() > self.capacity {
            match inner.order.pop_front() {
                Some(evicted) => {
                    inner.map.remove(&evicted);
                }
                None => break,
            }
        }
    }

    /// Number of cached commits.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.order.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-operation;
        // the map itself is still structurally sound.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for CommitCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::NULL_ID;
    use chrono::{TimeZone, Utc};

    fn commit(id: &str) -> Arc<Commit> {
        Arc::new(Commit {
            id: id.to_string(),
            tree_id: "t".repeat(40),
            parent_ids: vec![NULL_ID.to_string()],
            message: "m".to_string(),
            author_name: "a".to_string(),
            author_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            committer_name: "a".to_string(),
            committer_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            added: 0,
            removed: 0,
            modified: 0,
        })
    }

    fn key(id: &str) -> CacheKey {
        ("http://localhost:8182/repos/test".to_string(), id.to_string())
    }

    #[test]
    fn test_get_miss_then_hit() {
        let cache = CommitCache::new(4);
        assert!(cache.get(&key("aa")).is_none());
        cache.put(key("aa"), commit("aa"));
        let hit = cache.get(&key("aa")).unwrap();
        assert_eq!(hit.id, "aa");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_per_endpoint() {
        let cache = CommitCache::new(4);
        cache.put(key("aa"), commit("aa"));
        let other = ("http://other:8182/repos/x".to_string(), "aa".to_string());
        assert!(cache.get(&other).is_none());
    }

    #[test]
    fn test_eviction_is_lru() {
        let cache = CommitCache::new(2);
        cache.put(key("aa"), commit("aa"));
        cache.put(key("bb"), commit("bb"));
        // Touch "aa" so "bb" becomes the eviction candidate.
        assert!(cache.get(&key("aa")).is_some());
        cache.put(key("cc"), commit("cc"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("aa")).is_some());
        assert!(cache.get(&key("bb")).is_none());
        assert!(cache.get(&key("cc")).is_some());
    }

    #[test]
    fn test_reinsert_does_not_grow() {
        let cache = CommitCache::new(2);
        cache.put(key("aa"), commit("aa"));
        cache.put(key("aa"), commit("aa"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = CommitCache::new(2);
        cache.put(key("aa"), commit("aa"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_population_last_writer_wins() {
        let cache = Arc::new(CommitCache::new(16));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    let id = format!("{:040x}", i);
                    cache.put(key(&id), commit(&id));
                    let _ = cache.get(&key(&id));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 16);
    }
}
