// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for waterfall caches.

use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use anyspawn::{BoxedFuture, Spawner};
use tick::Clock;
use tokio::runtime::Handle;
use waterfall_tier::{CacheTier, DynamicCache, DynamicCacheExt, Error};

use crate::adapter::AsyncCache;
use crate::delivery::DeliveryContext;
use crate::expire::{LazyExpiringCache, TimedValue};
use crate::telemetry::{CacheName, CacheTelemetry};
use crate::waterfall::WaterfallCache;

const DEFAULT_NAME: CacheName = "waterfall";
const BACKGROUND_THREAD: &str = "waterfall-background";

/// Spawns on the ambient Tokio runtime when there is one, otherwise runs the task to
/// completion on a short-lived background thread.
fn default_spawner() -> Spawner {
    Spawner::new_custom("waterfall-default", spawn_anywhere)
}

fn spawn_anywhere(task: BoxedFuture) {
    if let Ok(handle) = Handle::try_current() {
        drop(handle.spawn(task));
        return;
    }

    tracing::debug!(thread = BACKGROUND_THREAD, "no tokio runtime, running background task on a thread");
    if let Err(error) = thread::Builder::new()
        .name(BACKGROUND_THREAD.to_string())
        .spawn(move || futures::executor::block_on(task))
    {
        tracing::warn!(%error, "could not start background thread, task dropped");
    }
}

/// Assembles a [`WaterfallCache`] from an ordered list of tiers.
///
/// Tiers are consulted in the order they are added. Created by
/// [`WaterfallCache::builder`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tick::Clock;
/// use waterfall::{InMemoryCache, TimedValue, WaterfallCache};
///
/// let cache = WaterfallCache::builder::<String, String>(Clock::new_frozen())
///     .memory()
///     .expiring_tier(InMemoryCache::<String, TimedValue<String>>::new(), Duration::from_secs(60))?
///     .build();
///
/// assert_eq!(cache.len(), 2);
/// # Ok::<(), waterfall::Error>(())
/// ```
pub struct WaterfallBuilder<K, V> {
    clock: Clock,
    tiers: Vec<DynamicCache<K, V>>,
    spawner: Option<Spawner>,
    telemetry: Option<CacheTelemetry>,
    name: CacheName,
}

impl<K, V> Debug for WaterfallBuilder<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaterfallBuilder")
            .field("name", &self.name)
            .field("tiers", &self.tiers.len())
            .field("spawner", &self.spawner)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl<K, V> WaterfallBuilder<K, V> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            tiers: Vec::new(),
            spawner: None,
            telemetry: None,
            name: DEFAULT_NAME,
        }
    }

    /// Appends a tier.
    #[must_use]
    pub fn tier<S>(mut self, storage: S) -> Self
    where
        S: CacheTier<K, V> + 'static,
    {
        self.tiers.push(storage.into_dynamic());
        self
    }

    /// Appends `storage` wrapped in a [`LazyExpiringCache`] with the given time-to-live.
    ///
    /// The decorator uses the builder's clock. It reports expirations to the telemetry
    /// configured so far, so call [`telemetry`](Self::telemetry) first when both are used.
    ///
    /// # Errors
    ///
    /// Returns an error if `ttl` is zero.
    pub fn expiring_tier<S>(self, storage: S, ttl: Duration) -> Result<Self, Error>
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
        S: CacheTier<K, TimedValue<V>> + 'static,
    {
        let mut tier = LazyExpiringCache::new(storage, ttl, self.clock.clone())?;
        if let Some(telemetry) = &self.telemetry {
            tier = tier.with_telemetry(telemetry.clone(), self.name);
        }
        Ok(self.tier(tier))
    }

    /// Appends an unbounded in-memory tier.
    #[cfg(feature = "memory")]
    #[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
    #[must_use]
    pub fn memory(self) -> Self
    where
        K: Clone + std::hash::Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.tier(waterfall_memory::InMemoryCache::<K, V>::new())
    }

    /// Sets the spawner for populate-back writes and for operations started through
    /// [`build_async`](Self::build_async).
    ///
    /// By default tasks go to the Tokio runtime current at spawn time, or to a
    /// short-lived `waterfall-background` thread when the caller is outside any runtime.
    #[must_use]
    pub fn spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Enables telemetry, reported under `name`.
    #[must_use]
    pub fn telemetry(mut self, telemetry: CacheTelemetry, name: CacheName) -> Self {
        self.telemetry = Some(telemetry);
        self.name = name;
        self
    }

    /// Builds the waterfall cache.
    #[must_use]
    pub fn build(self) -> WaterfallCache<K, V> {
        let spawner = self.spawner.unwrap_or_else(default_spawner);
        WaterfallCache::new(self.tiers, spawner, self.clock, self.telemetry, self.name)
    }

    /// Builds the waterfall cache behind a callback adapter that delivers on `delivery`.
    ///
    /// The adapter runs operations on the same spawner as populate-back.
    #[must_use]
    pub fn build_async(self, delivery: DeliveryContext) -> AsyncCache<K, V, WaterfallCache<K, V>> {
        let cache = self.build();
        let spawner = cache.spawner().clone();
        AsyncCache::new(cache, spawner, delivery)
    }
}
