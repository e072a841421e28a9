//! Thread-safe LRU cache for query results.
//!
//! Keys pair the match mode with the normalized query; values are the item
//! indices the query produced. All operations serialize under one mutex;
//! `get` promotes the entry to most-recently-used and `put` evicts the
//! least-recently-used entry when over capacity.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::index::MatchMode;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueryKey {
    mode: MatchMode,
    query: String,
}

#[derive(Debug)]
pub struct QueryCache {
    entries: Mutex<LruCache<QueryKey, Vec<u32>>>,
}

impl QueryCache {
    /// Construction always succeeds; capacity ≤ 0 is coerced to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, mode: MatchMode, query: &str) -> Option<Vec<u32>> {
        let key = QueryKey { mode, query: query.to_string() };
        self.entries.lock().unwrap().get(&key).cloned()
    }

    pub fn put(&self, mode: MatchMode, query: &str, indices: Vec<u32>) {
        let key = QueryKey { mode, query: query.to_string() };
        self.entries.lock().unwrap().put(key, indices);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_coerced_to_one() {
        let cache = QueryCache::new(0);
        cache.put(MatchMode::Exact, "a", vec![1]);
        cache.put(MatchMode::Exact, "b", vec![2]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(MatchMode::Exact, "b"), Some(vec![2]));
        assert_eq!(cache.get(MatchMode::Exact, "a"), None);
    }

    #[test]
    fn test_size_is_min_of_inserts_and_capacity() {
        let cache = QueryCache::new(3);
        for (i, q) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            cache.put(MatchMode::Contains, q, vec![i as u32]);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_get_promotes_against_eviction() {
        let cache = QueryCache::new(2);
        cache.put(MatchMode::Prefix, "old", vec![0]);
        cache.put(MatchMode::Prefix, "mid", vec![1]);
        // Touch "old" so "mid" becomes least recently used.
        assert_eq!(cache.get(MatchMode::Prefix, "old"), Some(vec![0]));
        cache.put(MatchMode::Prefix, "new", vec![2]);
        assert_eq!(cache.get(MatchMode::Prefix, "mid"), None);
        assert_eq!(cache.get(MatchMode::Prefix, "old"), Some(vec![0]));
    }

    #[test]
    fn test_mode_is_part_of_the_key() {
        let cache = QueryCache::new(4);
        cache.put(MatchMode::Exact, "q", vec![1]);
        cache.put(MatchMode::Prefix, "q", vec![2]);
        assert_eq!(cache.get(MatchMode::Exact, "q"), Some(vec![1]));
        assert_eq!(cache.get(MatchMode::Prefix, "q"), Some(vec![2]));
    }
}
