// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The waterfall orchestrator.
//!
//! [`WaterfallCache`] holds an ordered list of tiers. Reads walk the list from the
//! first tier to the last and stop at the first hit; the hit is then copied back into
//! every earlier tier by a background task. Writes, removals and clears are sent to
//! every tier at once.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use anyspawn::Spawner;
use futures::future::join_all;
use tick::Clock;
use waterfall_tier::{CacheTier, DynamicCache, Error};

use crate::builder::WaterfallBuilder;
use crate::telemetry::{
    CacheActivity, CacheName, CacheOperation, CacheTelemetry,
    ext::{CacheTelemetryExt, ClockExt},
};

/// A multi-tier cache that reads with fallback and populates back.
///
/// # Reads
///
/// `get` queries tiers in order, awaiting each one before moving on. The first tier
/// that fails ends the read with its error and later tiers are never consulted. On a
/// hit at tier `i > 0` the value is returned at once, and a task spawned on the
/// configured [`Spawner`] writes it into tiers `0..i` in order. That task is not tied to
/// the caller: dropping the read does not cancel it, and its failures are logged rather
/// than reported.
///
/// `contains` is a `get` followed by a presence test, populate-back included.
///
/// # Writes
///
/// `put`, `remove` and `clear` run against every tier concurrently. Every tier is
/// attempted even if some fail. The first error in tier order is returned; otherwise
/// the result is `true` only if every tier acknowledged. Nothing is rolled back.
///
/// # Examples
///
/// ```
/// use tick::Clock;
/// use waterfall::{CacheTier, InMemoryCache, WaterfallCache};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), waterfall::Error> {
/// let memory = InMemoryCache::<String, String>::new();
/// let disk = InMemoryCache::<String, String>::new();
/// disk.put(&"k".to_string(), "v".to_string()).await?;
///
/// let cache = WaterfallCache::builder::<String, String>(Clock::new_frozen())
///     .tier(memory.clone())
///     .tier(disk)
///     .build();
///
/// assert_eq!(cache.get(&"k".to_string()).await?, Some("v".to_string()));
/// # Ok(())
/// # }
/// ```
pub struct WaterfallCache<K, V> {
    tiers: Arc<[DynamicCache<K, V>]>,
    spawner: Spawner,
    clock: Clock,
    telemetry: Option<CacheTelemetry>,
    name: CacheName,
}

impl<K, V> Debug for WaterfallCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaterfallCache")
            .field("name", &self.name)
            .field("tiers", &self.tiers.len())
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl<K, V> Clone for WaterfallCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            tiers: Arc::clone(&self.tiers),
            spawner: self.spawner.clone(),
            clock: self.clock.clone(),
            telemetry: self.telemetry.clone(),
            name: self.name,
        }
    }
}

impl WaterfallCache<(), ()> {
    /// Creates a builder for a waterfall cache.
    ///
    /// The clock stamps entries of expiring tiers and times operations for telemetry.
    #[must_use]
    pub fn builder<K, V>(clock: Clock) -> WaterfallBuilder<K, V> {
        WaterfallBuilder::new(clock)
    }
}

impl<K, V> WaterfallCache<K, V> {
    pub(crate) fn new(
        tiers: Vec<DynamicCache<K, V>>,
        spawner: Spawner,
        clock: Clock,
        telemetry: Option<CacheTelemetry>,
        name: CacheName,
    ) -> Self {
        Self {
            tiers: tiers.into(),
            spawner,
            clock,
            telemetry,
            name,
        }
    }

    /// Returns the tiers in lookup order.
    #[must_use]
    pub fn tiers(&self) -> &[DynamicCache<K, V>] {
        &self.tiers
    }

    /// Returns the number of tiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Returns `true` if the waterfall has no tiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Returns the name used in telemetry.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }

    pub(crate) fn spawner(&self) -> &Spawner {
        &self.spawner
    }
}

impl<K, V> WaterfallCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn lookup(&self, key: &K) -> Result<Option<(usize, V)>, (usize, Error)> {
        for (index, tier) in self.tiers.iter().enumerate() {
            match tier.get(key).await {
                Ok(Some(value)) => return Ok(Some((index, value))),
                Ok(None) => {}
                Err(error) => return Err((index, error)),
            }
        }
        Ok(None)
    }

    fn populate_back(&self, key: &K, value: &V, hit: usize) {
        let tiers: Vec<DynamicCache<K, V>> = self.tiers[..hit].to_vec();
        let key = key.clone();
        let value = value.clone();
        let telemetry = self.telemetry.clone();
        let name = self.name;

        self.spawner.spawn(async move {
            for (index, tier) in tiers.iter().enumerate() {
                let activity = match tier.put(&key, value.clone()).await {
                    Ok(true) => CacheActivity::PopulateBack,
                    Ok(false) => {
                        tracing::warn!(cache.name = name, cache.tier = index, "populate-back write was not acknowledged");
                        CacheActivity::PopulateBackFailed
                    }
                    Err(error) => {
                        tracing::warn!(cache.name = name, cache.tier = index, error = %error, "populate-back write failed");
                        CacheActivity::PopulateBackFailed
                    }
                };
                telemetry.record(name, CacheOperation::Put, activity, Some(index), None);
            }
        });
    }

    async fn broadcast<'a, F, Fut>(&'a self, operation: CacheOperation, apply: F) -> Result<bool, Error>
    where
        F: Fn(&'a DynamicCache<K, V>) -> Fut,
        Fut: Future<Output = Result<bool, Error>>,
    {
        let timed = self.clock.timed_async(join_all(self.tiers.iter().map(apply))).await;
        self.aggregate(operation, timed.result, timed.duration)
    }

    fn aggregate(&self, operation: CacheOperation, results: Vec<Result<bool, Error>>, duration: Duration) -> Result<bool, Error> {
        let mut acknowledged = true;
        let mut first_error = None;

        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(true) => {}
                Ok(false) => {
                    acknowledged = false;
                    self.telemetry
                        .record(self.name, operation, CacheActivity::Refused, Some(index), None);
                }
                Err(error) => {
                    self.telemetry
                        .record(self.name, operation, CacheActivity::Error, Some(index), None);
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => {
                self.telemetry
                    .record(self.name, operation, CacheActivity::Ok, None, Some(duration));
                Ok(acknowledged)
            }
        }
    }
}

impl<K, V> CacheTier<K, V> for WaterfallCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        let timed = self.clock.timed_async(self.lookup(key)).await;

        match timed.result {
            Ok(Some((index, value))) => {
                self.telemetry
                    .record(self.name, CacheOperation::Get, CacheActivity::Hit, Some(index), Some(timed.duration));
                if index > 0 {
                    self.populate_back(key, &value, index);
                }
                Ok(Some(value))
            }
            Ok(None) => {
                self.telemetry
                    .record(self.name, CacheOperation::Get, CacheActivity::Miss, None, Some(timed.duration));
                Ok(None)
            }
            Err((index, error)) => {
                self.telemetry
                    .record(self.name, CacheOperation::Get, CacheActivity::Error, Some(index), Some(timed.duration));
                Err(error)
            }
        }
    }

    async fn put(&self, key: &K, value: V) -> Result<bool, Error> {
        self.broadcast(CacheOperation::Put, |tier| tier.put(key, value.clone())).await
    }

    async fn contains(&self, key: &K) -> Result<bool, Error> {
        Ok(self.get(key).await?.is_some())
    }

    async fn remove(&self, key: &K) -> Result<bool, Error> {
        self.broadcast(CacheOperation::Remove, |tier| tier.remove(key)).await
    }

    async fn clear(&self) -> Result<bool, Error> {
        self.broadcast(CacheOperation::Clear, |tier| tier.clear()).await
    }
}
