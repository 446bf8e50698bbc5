// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type-erased cache tiers for heterogeneous tier lists.

use std::{fmt::Debug, sync::Arc};

use crate::{CacheTier, Error, tier::DynCacheTier};

/// Extension trait for converting any `CacheTier` into a `DynamicCache`.
///
/// This trait is automatically implemented for all types that implement `CacheTier`.
///
/// # Examples
///
/// ```
/// use waterfall_tier::{CacheTier, DynamicCache, DynamicCacheExt};
///
/// fn erase<T>(tier: T) -> DynamicCache<String, i32>
/// where
///     T: CacheTier<String, i32> + 'static,
/// {
///     tier.into_dynamic()
/// }
/// ```
pub trait DynamicCacheExt<K, V>: Sized {
    /// Converts this cache tier into a `DynamicCache`.
    fn into_dynamic(self) -> DynamicCache<K, V>;
}

impl<K, V, T> DynamicCacheExt<K, V> for T
where
    T: CacheTier<K, V> + 'static,
{
    fn into_dynamic(self) -> DynamicCache<K, V> {
        DynamicCache::new(self)
    }
}

/// A cloneable cache tier with type erasure.
///
/// `DynamicCache` wraps a trait object in an `Arc`, so clones share the same
/// underlying tier. The waterfall orchestrator keeps its ordered tier list as
/// `DynamicCache` values and hands clones to background populate-back tasks.
pub struct DynamicCache<K, V>(Arc<DynCacheTier<'static, K, V>>);

impl<K, V> DynamicCache<K, V> {
    pub(crate) fn new<T>(tier: T) -> Self
    where
        T: CacheTier<K, V> + Send + Sync + 'static,
    {
        Self(DynCacheTier::new_arc(tier))
    }
}

impl<K, V> Debug for DynamicCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicCache").finish_non_exhaustive()
    }
}

impl<K, V> Clone for DynamicCache<K, V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K, V> CacheTier<K, V> for DynamicCache<K, V>
where
    K: Sync,
    V: Send,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        self.0.get(key).await
    }

    async fn put(&self, key: &K, value: V) -> Result<bool, Error> {
        self.0.put(key, value).await
    }

    async fn contains(&self, key: &K) -> Result<bool, Error> {
        self.0.contains(key).await
    }

    async fn remove(&self, key: &K) -> Result<bool, Error> {
        self.0.remove(key).await
    }

    async fn clear(&self) -> Result<bool, Error> {
        self.0.clear().await
    }
}
