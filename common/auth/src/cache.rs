use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;

struct CachedKey {
    key: DecodingKey,
    inserted_at: Instant,
}

/// Thread-safe, size-bounded store of resolved signing keys.
///
/// Entries older than `max_age` read as missing; inserting into a full
/// cache evicts the oldest entry first.
#[derive(Clone)]
pub struct SigningKeyCache {
    inner: Arc<RwLock<HashMap<String, CachedKey>>>,
    max_entries: usize,
    max_age: Duration,
}

impl SigningKeyCache {
    pub fn new(max_entries: usize, max_age: Duration) -> Self {
        Self {
            inner: Arc::default(),
            max_entries,
            max_age,
        }
    }

    pub fn get(&self, kid: &str) -> Option<DecodingKey> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(kid)
            .filter(|cached| cached.inserted_at.elapsed() < self.max_age)
            .map(|cached| cached.key.clone())
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.get(kid).is_some()
    }

    pub fn insert(&self, kid: impl Into<String>, key: DecodingKey) {
        if self.max_entries == 0 {
            return;
        }

        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let max_age = self.max_age;
        guard.retain(|_, cached| cached.inserted_at.elapsed() < max_age);

        let kid = kid.into();
        while guard.len() >= self.max_entries && !guard.contains_key(&kid) {
            let oldest = guard
                .iter()
                .min_by_key(|(_, cached)| cached.inserted_at)
                .map(|(kid, _)| kid.clone());
            match oldest {
                Some(oldest) => guard.remove(&oldest),
                None => break,
            };
        }

        guard.insert(
            kid,
            CachedKey {
                key,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .values()
            .filter(|cached| cached.inserted_at.elapsed() < self.max_age)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.clear();
    }
}
