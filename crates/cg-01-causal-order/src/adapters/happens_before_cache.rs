//! # Happens-Before Cache
//!
//! Bounded LRU memo of pairs the temporal-order service has already ordered.
//!
//! The service never changes an answer, so a remembered fact stays valid.
//! Keys carry the full clock, epoch included, so facts from different
//! epochs cannot collide.

use lru::LruCache;
use parking_lot::Mutex;
use shared_types::VectorClock;
use std::num::NonZeroUsize;

use crate::domain::OrderRelation;

type Key = (VectorClock, VectorClock);

/// Thread-safe memo keyed by `(earlier, later)`.
pub struct HappensBeforeCache {
    inner: Mutex<LruCache<Key, ()>>,
}

impl HappensBeforeCache {
    /// Cache holding at most `capacity` facts (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Remember that `earlier` happens before `later`.
    pub fn record(&self, earlier: &VectorClock, later: &VectorClock) {
        self.inner
            .lock()
            .put((earlier.clone(), later.clone()), ());
    }

    /// Known relation of `a` to `b`, in either direction.
    pub fn lookup(&self, a: &VectorClock, b: &VectorClock) -> Option<OrderRelation> {
        let mut cache = self.inner.lock();
        let forward = (a.clone(), b.clone());
        if cache.get(&forward).is_some() {
            return Some(OrderRelation::HappensBefore);
        }
        let (a, b) = forward;
        if cache.get(&(b, a)).is_some() {
            return Some(OrderRelation::HappensAfter);
        }
        None
    }

    /// Number of remembered facts.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}
