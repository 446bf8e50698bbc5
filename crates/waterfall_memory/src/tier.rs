// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory cache tier using moka.

use std::hash::Hash;

use moka::future::Cache;
use waterfall_tier::{CacheTier, Error};

use crate::builder::InMemoryCacheBuilder;

/// An in-memory cache tier backed by moka.
///
/// Clones share the same storage. No operation on this tier ever fails; removal
/// and clearing are always acknowledged.
///
/// # Examples
///
/// ```
/// use waterfall_memory::InMemoryCache;
/// use waterfall_tier::CacheTier;
/// # futures::executor::block_on(async {
///
/// let cache = InMemoryCache::<String, i32>::new();
///
/// cache.put(&"key".to_string(), 42).await.unwrap();
/// assert!(cache.contains(&"key".to_string()).await.unwrap());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
}

impl<K, V> Default for InMemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> InMemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new unbounded in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new in-memory cache holding at most `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a new builder for configuring an in-memory cache.
    #[must_use]
    pub fn builder() -> InMemoryCacheBuilder<K, V> {
        InMemoryCacheBuilder::new()
    }

    /// Returns the approximate number of entries.
    ///
    /// Moka applies writes lazily, so the count can lag behind recent writes.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub(crate) fn from_moka(inner: Cache<K, V>) -> Self {
        Self { inner }
    }
}

impl<K, V> CacheTier<K, V> for InMemoryCache<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        Ok(self.inner.get(key).await)
    }

    async fn put(&self, key: &K, value: V) -> Result<bool, Error> {
        self.inner.insert(key.clone(), value).await;
        Ok(true)
    }

    async fn contains(&self, key: &K) -> Result<bool, Error> {
        Ok(self.inner.contains_key(key))
    }

    async fn remove(&self, key: &K) -> Result<bool, Error> {
        self.inner.invalidate(key).await;
        Ok(true)
    }

    async fn clear(&self) -> Result<bool, Error> {
        self.inner.invalidate_all();
        Ok(true)
    }
}
