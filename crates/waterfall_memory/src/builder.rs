// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory caches.

use std::fmt::Debug;
use std::hash::Hash;

use moka::future::{Cache, CacheBuilder};

use crate::tier::InMemoryCache;

/// Builder for configuring an [`InMemoryCache`].
///
/// # Examples
///
/// ```
/// use waterfall_memory::InMemoryCache;
///
/// let cache = InMemoryCache::<String, i32>::builder()
///     .max_capacity(1000)
///     .initial_capacity(100)
///     .name("sessions")
///     .build();
/// ```
pub struct InMemoryCacheBuilder<K, V> {
    inner: CacheBuilder<K, V, Cache<K, V>>,
}

impl<K, V> Debug for InMemoryCacheBuilder<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCacheBuilder").finish_non_exhaustive()
    }
}

impl<K, V> Default for InMemoryCacheBuilder<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> InMemoryCacheBuilder<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new builder for an unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Cache::builder() }
    }

    /// Caps the tier at `capacity` entries.
    ///
    /// Past the cap moka evicts with its `TinyLFU` policy. An evicted key reads as a
    /// miss, so a waterfall falls through to the next tier.
    #[must_use]
    pub fn max_capacity(self, capacity: u64) -> Self {
        Self {
            inner: self.inner.max_capacity(capacity),
        }
    }

    /// Pre-allocates room for `capacity` entries.
    #[must_use]
    pub fn initial_capacity(self, capacity: usize) -> Self {
        Self {
            inner: self.inner.initial_capacity(capacity),
        }
    }

    /// Names the underlying moka cache.
    #[must_use]
    pub fn name(self, name: &str) -> Self {
        Self {
            inner: self.inner.name(name),
        }
    }

    /// Builds the configured [`InMemoryCache`].
    #[must_use]
    pub fn build(self) -> InMemoryCache<K, V> {
        InMemoryCache::from_moka(self.inner.build())
    }
}
