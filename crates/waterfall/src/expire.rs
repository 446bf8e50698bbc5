// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lazy time-to-live expiration for a single cache tier.
//!
//! [`LazyExpiringCache`] stores every value inside a [`TimedValue`] envelope that
//! records when it was written. Nothing sweeps the underlying tier in the background:
//! staleness is only judged when an entry is read, and a stale entry is removed from
//! the underlying tier at that moment.

use std::{marker::PhantomData, time::Duration, time::SystemTime};

use serde::{Deserialize, Serialize};
use tick::Clock;
use waterfall_tier::{CacheTier, Error};

use crate::telemetry::{
    CacheActivity, CacheName, CacheOperation, CacheTelemetry,
    ext::CacheTelemetryExt,
};

const DEFAULT_NAME: CacheName = "expiring";

/// A value paired with the moment it was written.
///
/// This is what a [`LazyExpiringCache`] stores in its underlying tier. Persistent
/// tiers can serialize it with `serde`.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
/// use waterfall::TimedValue;
///
/// let written = SystemTime::UNIX_EPOCH;
/// let timed = TimedValue::new("v", written);
///
/// assert!(!timed.is_expired_at(Duration::from_millis(100), written + Duration::from_millis(100)));
/// assert!(timed.is_expired_at(Duration::from_millis(100), written + Duration::from_millis(101)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedValue<V> {
    value: V,
    added_on: SystemTime,
}

impl<V> TimedValue<V> {
    /// Wraps a value with the time it was written.
    #[must_use]
    pub fn new(value: V, added_on: SystemTime) -> Self {
        Self { value, added_on }
    }

    /// Returns the wrapped value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Returns the time the value was written.
    #[must_use]
    pub fn added_on(&self) -> SystemTime {
        self.added_on
    }

    /// Consumes the envelope, returning the wrapped value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns `true` if `added_on + ttl` lies strictly before `now`.
    ///
    /// An entry read exactly at its deadline is still fresh. A deadline that does not
    /// fit in a `SystemTime` never expires.
    #[must_use]
    pub fn is_expired_at(&self, ttl: Duration, now: SystemTime) -> bool {
        self.added_on.checked_add(ttl).is_some_and(|deadline| deadline < now)
    }
}

/// Decorates a tier with lazy time-to-live expiration.
///
/// The underlying tier stores [`TimedValue<V>`] envelopes while this decorator exposes a
/// plain `CacheTier<K, V>`, so it can sit in a waterfall next to undecorated tiers.
///
/// - `put` stamps the value with the current time of the injected clock.
/// - `get` samples the clock once, before reading. A stale entry is removed from the
///   underlying tier and reported as a miss. If that removal fails the failure is
///   logged and the read still reports a miss.
/// - `contains` is a `get` followed by a presence test, so it agrees with `get` at the
///   expiry boundary and evicts stale entries the same way.
/// - `remove` and `clear` pass through unchanged.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tick::ClockControl;
/// use waterfall::{CacheTier, InMemoryCache, LazyExpiringCache, TimedValue};
///
/// # futures::executor::block_on(async {
/// let control = ClockControl::new();
/// let storage = InMemoryCache::<String, TimedValue<String>>::new();
/// let cache = LazyExpiringCache::<String, String, _>::new(storage, Duration::from_millis(100), control.to_clock())?;
///
/// cache.put(&"k".to_string(), "v".to_string()).await?;
/// control.advance_millis(50);
/// assert_eq!(cache.get(&"k".to_string()).await?, Some("v".to_string()));
///
/// control.advance_millis(100);
/// assert_eq!(cache.get(&"k".to_string()).await?, None);
/// # Ok::<(), waterfall::Error>(())
/// # });
/// ```
#[derive(Debug)]
pub struct LazyExpiringCache<K, V, S> {
    inner: S,
    ttl: Duration,
    clock: Clock,
    telemetry: Option<CacheTelemetry>,
    name: CacheName,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V, S> LazyExpiringCache<K, V, S> {
    /// Wraps `inner` so that entries expire `ttl` after they were written.
    ///
    /// # Errors
    ///
    /// Returns an error if `ttl` is zero.
    pub fn new(inner: S, ttl: Duration, clock: Clock) -> Result<Self, Error> {
        if ttl.is_zero() {
            return Err(Error::from_message("time-to-live must be greater than zero"));
        }

        Ok(Self {
            inner,
            ttl,
            clock,
            telemetry: None,
            name: DEFAULT_NAME,
            _phantom: PhantomData,
        })
    }

    /// Reports expirations to `telemetry` under the given cache name.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: CacheTelemetry, name: CacheName) -> Self {
        self.telemetry = Some(telemetry);
        self.name = name;
        self
    }

    /// Returns the configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a reference to the wrapped storage tier.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns the name used in telemetry.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }
}

impl<K, V, S> LazyExpiringCache<K, V, S>
where
    K: Send + Sync,
    V: Send + Sync,
    S: CacheTier<K, TimedValue<V>>,
{
    async fn evict(&self, key: &K) {
        self.telemetry
            .record(self.name, CacheOperation::Get, CacheActivity::Expired, None, None);

        match self.inner.remove(key).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(cache.name = self.name, "expired entry removal was not acknowledged"),
            Err(error) => tracing::warn!(cache.name = self.name, error = %error, "expired entry removal failed"),
        }
    }
}

impl<K, V, S> CacheTier<K, V> for LazyExpiringCache<K, V, S>
where
    K: Send + Sync,
    V: Send + Sync,
    S: CacheTier<K, TimedValue<V>>,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        let now = self.clock.system_time();

        let Some(timed) = self.inner.get(key).await? else {
            return Ok(None);
        };

        if timed.is_expired_at(self.ttl, now) {
            self.evict(key).await;
            return Ok(None);
        }

        Ok(Some(timed.into_value()))
    }

    async fn put(&self, key: &K, value: V) -> Result<bool, Error> {
        let timed = TimedValue::new(value, self.clock.system_time());
        self.inner.put(key, timed).await
    }

    async fn contains(&self, key: &K) -> Result<bool, Error> {
        Ok(self.get(key).await?.is_some())
    }

    async fn remove(&self, key: &K) -> Result<bool, Error> {
        self.inner.remove(key).await
    }

    async fn clear(&self) -> Result<bool, Error> {
        self.inner.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tick::ClockControl;
    use waterfall_tier::testing::{CacheOp, MockCache};

    use crate::telemetry::testing::LogCapture;

    type TestResult = Result<(), Error>;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    fn key() -> String {
        "k".to_string()
    }

    #[test]
    fn timed_value_is_fresh_up_to_its_deadline() {
        let start = SystemTime::UNIX_EPOCH;
        let timed = TimedValue::new(1, start);
        let ttl = Duration::from_millis(100);

        assert!(!timed.is_expired_at(ttl, start));
        assert!(!timed.is_expired_at(ttl, start + ttl));
        assert!(timed.is_expired_at(ttl, start + ttl + Duration::from_nanos(1)));
    }

    #[test]
    fn timed_value_with_unrepresentable_deadline_never_expires() {
        let timed = TimedValue::new(1, SystemTime::UNIX_EPOCH);
        assert!(!timed.is_expired_at(Duration::MAX, SystemTime::UNIX_EPOCH + Duration::from_secs(1)));
    }

    #[test]
    fn timed_value_serializes_with_serde() {
        let timed = TimedValue::new(vec!["a".to_string(), "b".to_string()], SystemTime::UNIX_EPOCH + Duration::from_secs(5));

        let json = serde_json::to_string(&timed).expect("serialization failed");
        let decoded: TimedValue<Vec<String>> = serde_json::from_str(&json).expect("deserialization failed");

        assert_eq!(decoded, timed);
        assert!(json.contains("added_on"));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = LazyExpiringCache::<String, i32, _>::new(MockCache::<String, TimedValue<i32>>::new(), Duration::ZERO, Clock::new_frozen())
            .expect_err("zero ttl should be rejected");
        assert!(err.to_string().contains("time-to-live"));
    }

    #[test]
    fn put_stamps_value_with_clock_time() -> TestResult {
        block_on(async {
            let control = ClockControl::new();
            control.advance_millis(42);
            let storage = MockCache::<String, TimedValue<i32>>::new();
            let cache = LazyExpiringCache::<String, i32, _>::new(storage.clone(), Duration::from_secs(1), control.to_clock())?;

            assert!(cache.put(&key(), 7).await?);

            let stored = storage.peek(&key()).expect("value should be stored");
            assert_eq!(stored.value(), &7);
            assert_eq!(stored.added_on(), SystemTime::UNIX_EPOCH + Duration::from_millis(42));
            Ok(())
        })
    }

    #[test]
    fn expired_read_removes_entry_from_storage() -> TestResult {
        block_on(async {
            let control = ClockControl::new();
            let storage = MockCache::<String, TimedValue<i32>>::new();
            let cache = LazyExpiringCache::<String, i32, _>::new(storage.clone(), Duration::from_millis(10), control.to_clock())?;

            cache.put(&key(), 1).await?;
            control.advance_millis(11);
            storage.clear_operations();

            assert_eq!(cache.get(&key()).await?, None);
            assert_eq!(storage.operations(), vec![CacheOp::Get(key()), CacheOp::Remove(key())]);
            assert!(!storage.contains_key(&key()));
            Ok(())
        })
    }

    #[test]
    fn failed_eviction_is_logged_and_read_misses() -> TestResult {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        block_on(async {
            let control = ClockControl::new();
            let storage = MockCache::<String, TimedValue<i32>>::new();
            let cache = LazyExpiringCache::<String, i32, _>::new(storage.clone(), Duration::from_millis(10), control.to_clock())?;

            cache.put(&key(), 1).await?;
            control.advance_millis(20);
            storage.fail_when(|op| matches!(op, CacheOp::Remove(_)));

            assert_eq!(cache.get(&key()).await?, None);
            Ok::<(), Error>(())
        })?;

        capture.assert_contains("WARN");
        capture.assert_contains("expired entry removal failed");
        capture.assert_contains("mock: remove failed");
        Ok(())
    }

    #[test]
    fn refused_eviction_is_logged() -> TestResult {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        block_on(async {
            let control = ClockControl::new();
            let storage = MockCache::<String, TimedValue<i32>>::new();
            let cache = LazyExpiringCache::<String, i32, _>::new(storage.clone(), Duration::from_millis(10), control.to_clock())?;

            cache.put(&key(), 1).await?;
            control.advance_millis(20);
            storage.reject_when(|op| matches!(op, CacheOp::Remove(_)));

            assert!(!cache.contains(&key()).await?);
            Ok::<(), Error>(())
        })?;

        capture.assert_contains("expired entry removal was not acknowledged");
        Ok(())
    }

    #[test]
    fn read_failure_propagates() -> TestResult {
        block_on(async {
            let storage = MockCache::<String, TimedValue<i32>>::new();
            storage.fail_when(|op| matches!(op, CacheOp::Get(_)));
            let cache = LazyExpiringCache::<String, i32, _>::new(storage, Duration::from_secs(1), Clock::new_frozen())?;

            let err = cache.get(&key()).await.expect_err("get should fail");
            assert!(err.to_string().contains("mock: get failed"));
            assert!(cache.contains(&key()).await.is_err());
            Ok(())
        })
    }

    #[test]
    fn remove_and_clear_pass_through() -> TestResult {
        block_on(async {
            let storage = MockCache::<String, TimedValue<i32>>::new();
            let cache = LazyExpiringCache::<String, i32, _>::new(storage.clone(), Duration::from_secs(1), Clock::new_frozen())?;

            assert!(cache.remove(&key()).await?);
            assert!(cache.clear().await?);
            assert_eq!(storage.operations(), vec![CacheOp::Remove(key()), CacheOp::Clear]);

            storage.reject_when(|op| matches!(op, CacheOp::Clear));
            assert!(!cache.clear().await?);
            Ok(())
        })
    }

    #[test]
    fn expiration_is_reported_to_telemetry() -> TestResult {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        block_on(async {
            let control = ClockControl::new();
            let telemetry = CacheTelemetry::new(true, control.to_clock());
            let cache = LazyExpiringCache::<String, i32, _>::new(MockCache::<String, TimedValue<i32>>::new(), Duration::from_millis(5), control.to_clock())?
                .with_telemetry(telemetry, "sessions");

            cache.put(&key(), 1).await?;
            control.advance_millis(6);
            assert_eq!(cache.get(&key()).await?, None);
            Ok::<(), Error>(())
        })?;

        capture.assert_contains("sessions");
        capture.assert_contains(CacheActivity::Expired.as_str());
        Ok(())
    }

    /// Moves the clock forward while a read is in flight, like a slow backing store would.
    struct SlowTier {
        inner: MockCache<String, TimedValue<i32>>,
        control: ClockControl,
        delay: Duration,
    }

    impl CacheTier<String, TimedValue<i32>> for SlowTier {
        async fn get(&self, key: &String) -> Result<Option<TimedValue<i32>>, Error> {
            self.control.advance(self.delay);
            self.inner.get(key).await
        }

        async fn put(&self, key: &String, value: TimedValue<i32>) -> Result<bool, Error> {
            self.inner.put(key, value).await
        }

        async fn contains(&self, key: &String) -> Result<bool, Error> {
            self.inner.contains(key).await
        }

        async fn remove(&self, key: &String) -> Result<bool, Error> {
            self.inner.remove(key).await
        }

        async fn clear(&self) -> Result<bool, Error> {
            self.inner.clear().await
        }
    }

    #[test]
    fn freshness_is_judged_by_the_time_the_read_started() -> TestResult {
        block_on(async {
            let control = ClockControl::new();
            let storage = MockCache::<String, TimedValue<i32>>::new();
            let slow = SlowTier {
                inner: storage.clone(),
                control: control.clone(),
                delay: Duration::from_millis(50),
            };
            let cache = LazyExpiringCache::<String, i32, _>::new(slow, Duration::from_millis(100), control.to_clock())?;

            cache.put(&key(), 1).await?;
            control.advance_millis(90);

            assert_eq!(cache.get(&key()).await?, Some(1));
            assert!(storage.contains_key(&key()));
            assert!(!storage.operations().contains(&CacheOp::Remove(key())));

            // The clock is now past the deadline, so the next read misses.
            assert_eq!(cache.get(&key()).await?, None);
            assert!(!storage.contains_key(&key()));
            Ok(())
        })
    }

    #[test]
    fn accessors_report_configuration() -> TestResult {
        let cache = LazyExpiringCache::<String, i32, _>::new(MockCache::<String, TimedValue<i32>>::new(), Duration::from_secs(3), Clock::new_frozen())?;

        assert_eq!(cache.ttl(), Duration::from_secs(3));
        assert_eq!(cache.name(), "expiring");
        assert_eq!(cache.inner().entry_count(), 0);
        Ok(())
    }
}
