mod entry;
mod key;

pub use entry::CacheEntry;
pub use key::CacheKey;

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::config::CacheConfig;
use crate::translator::TranslationResult;

/// Size report of a [`TranslationCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Bumped on every insert and hit
    clock: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Bounded in-memory translation cache with batch LRU eviction.
///
/// When a new key arrives and the cache is full, the least recently accessed
/// `capacity * eviction_fraction` entries (at least one) are dropped in one go
/// instead of popping a single entry per insert.
///
/// Every operation holds a single mutex; lookups mutate recency, so there is
/// no read-only path to share.
pub struct TranslationCache {
    state: Mutex<CacheState>,
    capacity: usize,
    eviction_fraction: f64,
}

impl TranslationCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_capacity(config.capacity, config.eviction_fraction)
    }

    pub fn with_capacity(capacity: usize, eviction_fraction: f64) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity,
            eviction_fraction: eviction_fraction.clamp(0.0, 1.0),
        }
    }

    /// Number of entries removed by one eviction batch
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn eviction_batch_size(&self) -> usize {
        // floor(capacity * fraction); fraction is clamped to [0, 1] so the
        // product fits back into usize
        let batch = (self.capacity as f64 * self.eviction_fraction).floor() as usize;
        batch.max(1)
    }

    /// Look up a translation and mark it as recently used
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut state = self.state.lock();
        let seq = state.tick();

        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(seq);
                debug!("Cache hit for {} (accessed {} times)", key, entry.access_count);
                Some(entry.clone())
            }
            None => {
                debug!("Cache miss for {}", key);
                None
            }
        }
    }

    /// Store a translation, evicting a batch of stale entries if full
    pub fn put(&self, key: CacheKey, result: TranslationResult) {
        if self.capacity == 0 {
            return;
        }

        let mut state = self.state.lock();
        let seq = state.tick();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let evicted = self.evict_oldest(&mut state);
            debug!(
                "Evicted {} cache entries ({} remaining, capacity {})",
                evicted,
                state.entries.len(),
                self.capacity
            );
        }

        state.entries.insert(key, CacheEntry::new(result, seq));
    }

    fn evict_oldest(&self, state: &mut CacheState) -> usize {
        let mut by_age: Vec<_> = state
            .entries
            .iter()
            .map(|(key, entry)| (entry.recency(), key.clone()))
            .collect();
        by_age.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let count = self.eviction_batch_size().min(by_age.len());
        for (_, key) in by_age.into_iter().take(count) {
            state.entries.remove(&key);
        }
        count
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        debug!("Translation cache cleared ({} entries)", dropped);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            capacity: self.capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Lang;

    fn key(n: usize) -> CacheKey {
        CacheKey::new(&format!("line {n}"), None, &Lang::new("en"))
    }

    fn result(n: usize) -> TranslationResult {
        TranslationResult {
            original_text: format!("line {n}"),
            translated_text: format!("ligne {n}"),
            detected_lang: Lang::new("en"),
            confidence: 0.9,
            provider: "test".to_string(),
            latency_ms: 1,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_put_then_get() {
        let cache = TranslationCache::with_capacity(10, 0.2);
        cache.put(key(1), result(1));

        let entry = cache.get(&key(1)).expect("entry should be cached");
        assert_eq!(entry.result.translated_text, "ligne 1");
        assert_eq!(entry.access_count, 1);
        assert!(cache.get(&key(2)).is_none());
    }

    #[test]
    fn test_get_bumps_access_count() {
        let cache = TranslationCache::with_capacity(10, 0.2);
        cache.put(key(1), result(1));
        cache.get(&key(1));
        cache.get(&key(1));
        assert_eq!(cache.get(&key(1)).map(|e| e.access_count), Some(3));
    }

    #[test]
    fn test_eleventh_insert_evicts_batch() {
        let cache = TranslationCache::with_capacity(10, 0.2);
        for n in 0..10 {
            cache.put(key(n), result(n));
        }
        assert_eq!(cache.len(), 10);

        cache.put(key(10), result(10));
        assert_eq!(cache.len(), 10 - 2 + 1);
        // The two oldest are gone
        assert!(!cache.contains(&key(0)));
        assert!(!cache.contains(&key(1)));
        assert!(cache.contains(&key(2)));
        assert!(cache.contains(&key(10)));
    }

    #[test]
    fn test_eviction_respects_recent_access() {
        let cache = TranslationCache::with_capacity(5, 0.2);
        for n in 0..5 {
            cache.put(key(n), result(n));
        }
        // Touch the oldest so key(1) becomes the least recently used
        cache.get(&key(0));

        cache.put(key(5), result(5));
        assert!(cache.contains(&key(0)));
        assert!(!cache.contains(&key(1)));
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let cache = TranslationCache::with_capacity(7, 0.2);
        for n in 0..100 {
            cache.put(key(n), result(n));
            assert!(cache.len() <= 7);
        }
    }

    #[test]
    fn test_small_capacity_still_evicts() {
        // floor(3 * 0.2) == 0, one entry is removed anyway
        let cache = TranslationCache::with_capacity(3, 0.2);
        assert_eq!(cache.eviction_batch_size(), 1);
        for n in 0..4 {
            cache.put(key(n), result(n));
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_replacing_existing_key_does_not_evict() {
        let cache = TranslationCache::with_capacity(2, 0.5);
        cache.put(key(1), result(1));
        cache.put(key(2), result(2));
        cache.put(key(2), result(3));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&key(1)));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = TranslationCache::with_capacity(0, 0.2);
        cache.put(key(1), result(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_and_stats() {
        let cache = TranslationCache::with_capacity(10, 0.2);
        cache.put(key(1), result(1));
        cache.put(key(2), result(2));
        assert_eq!(cache.stats(), CacheStats { size: 2, capacity: 10 });

        cache.clear();
        assert_eq!(cache.stats(), CacheStats { size: 0, capacity: 10 });
    }
}
