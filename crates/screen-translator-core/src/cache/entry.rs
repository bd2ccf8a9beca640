use std::time::Instant;

use crate::translator::TranslationResult;

/// A cached translation plus its access bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: TranslationResult,
    pub access_count: u64,
    pub last_accessed_at: Instant,
    /// Monotonic access stamp; orders entries whose instants compare equal
    pub(crate) access_seq: u64,
}

impl CacheEntry {
    pub(crate) fn new(result: TranslationResult, seq: u64) -> Self {
        Self {
            result,
            access_count: 0,
            last_accessed_at: Instant::now(),
            access_seq: seq,
        }
    }

    pub(crate) fn touch(&mut self, seq: u64) {
        self.access_count += 1;
        self.last_accessed_at = Instant::now();
        self.access_seq = seq;
    }

    pub(crate) fn recency(&self) -> (Instant, u64) {
        (self.last_accessed_at, self.access_seq)
    }
}
