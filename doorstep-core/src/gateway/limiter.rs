//! Courtesy rate limiting toward free upstream services.
//!
//! Both upstream dependencies are shared community infrastructure with
//! published usage policies; the buckets here keep this system inside
//! them regardless of inbound load.

use std::time::Instant;

use dashmap::DashMap;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A per-key token bucket.
///
/// `try_take` never blocks: it either consumes a token and returns
/// `true`, or returns `false` and leaves the caller to decide between
/// surfacing an error and degrading to cached data. State is keyed so
/// that contention stays at the key level; the map's shard locks are the
/// only synchronization.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    buckets: DashMap<String, BucketState>,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            buckets: DashMap::new(),
        }
    }

    /// Consume one token for `key` if available.
    pub fn try_take(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| BucketState {
                tokens: self.capacity,
                last_refill: now,
            });

        let state = entry.value_mut();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bucket_starts_full() {
        let bucket = TokenBucket::new(2.0, 1.0);
        assert!(bucket.try_take("k"));
        assert!(bucket.try_take("k"));
        assert!(!bucket.try_take("k"));
    }

    #[test]
    fn test_refusal_does_not_block_or_consume() {
        let bucket = TokenBucket::new(1.0, 0.0);
        assert!(bucket.try_take("k"));
        // Repeated refusals are cheap and side-effect free.
        for _ in 0..10 {
            assert!(!bucket.try_take("k"));
        }
    }

    #[test]
    fn test_bucket_refills_over_time() {
        let bucket = TokenBucket::new(1.0, 1000.0);
        assert!(bucket.try_take("k"));
        assert!(!bucket.try_take("k"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(bucket.try_take("k"));
    }

    #[test]
    fn test_refill_caps_at_capacity() {
        let bucket = TokenBucket::new(2.0, 1000.0);
        std::thread::sleep(Duration::from_millis(10));
        // Even after plenty of refill time only `capacity` tokens exist.
        assert!(bucket.try_take("k"));
        assert!(bucket.try_take("k"));
        assert!(!bucket.try_take("k"));
    }

    #[test]
    fn test_keys_are_independent() {
        let bucket = TokenBucket::new(1.0, 0.0);
        assert!(bucket.try_take("a"));
        assert!(bucket.try_take("b"));
        assert!(!bucket.try_take("a"));
    }
}
