// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache tiers.
//!
//! [`CacheTier`] is the uniform contract shared by concrete storage backends,
//! decorators such as the lazy-expiring cache, and the waterfall orchestrator.

use crate::Error;

/// Trait for cache tier implementations.
///
/// Every operation returns a future that does nothing until polled. A miss is reported
/// as `Ok(None)` from [`get`](CacheTier::get); an `Err` always means the tier could not
/// answer.
///
/// # Acknowledgements
///
/// [`put`](CacheTier::put), [`remove`](CacheTier::remove) and [`clear`](CacheTier::clear)
/// resolve to `true` when the tier acknowledged the request. Removal is idempotent:
/// removing a key that was never stored is still acknowledged with `true`. A tier that
/// declines a request reports `false` rather than failing.
///
/// # Presence
///
/// [`contains`](CacheTier::contains) must agree with [`get`](CacheTier::get): it returns
/// `true` only if a `get` issued at the same moment would return a value. Decorators
/// that hide entries (for example because they expired) must hide them here too.
#[dynosaur::dynosaur(pub(crate) DynCacheTier = dyn(box) CacheTier, bridge(none))]
pub trait CacheTier<K, V>: Send + Sync {
    /// Gets a value, returning `Ok(None)` if the key is unknown to this tier.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<V>, Error>> + Send;

    /// Stores a value, overwriting any existing entry.
    fn put(&self, key: &K, value: V) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Returns `true` if a `get` for the key would currently return a value.
    fn contains(&self, key: &K) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Removes a value.
    fn remove(&self, key: &K) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Removes every entry visible to this tier.
    fn clear(&self) -> impl Future<Output = Result<bool, Error>> + Send;
}
