// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache telemetry implementation and recording.
//!
//! Every activity becomes at most one `cache.event` log line and, when metrics are
//! configured, one counter increment plus a duration sample if the operation was timed.
//! Log fields and metric attributes share the key names below.

use std::sync::Arc;
use std::time::Duration;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::{
    InstrumentationScope, KeyValue,
    metrics::{Counter, Histogram, MeterProvider},
};
use tick::Clock;
use tracing::Level;

use crate::telemetry::{CacheActivity, CacheName, CacheOperation, CacheTelemetry};

#[cfg(any(feature = "metrics", test))]
const NAME_KEY: &str = "cache.name";
#[cfg(any(feature = "metrics", test))]
const OPERATION_KEY: &str = "cache.operation";
#[cfg(any(feature = "metrics", test))]
const ACTIVITY_KEY: &str = "cache.activity";
#[cfg(any(feature = "metrics", test))]
const TIER_KEY: &str = "cache.tier";

#[cfg(any(feature = "metrics", test))]
const EVENT_COUNT: &str = "cache.event.count";
#[cfg(any(feature = "metrics", test))]
const OPERATION_DURATION: &str = "cache.operation.duration";

/// The two instruments a metrics-enabled collector writes to.
#[cfg(any(feature = "metrics", test))]
#[derive(Debug)]
struct Instruments {
    events: Counter<u64>,
    durations: Histogram<f64>,
}

#[cfg(any(feature = "metrics", test))]
impl Instruments {
    fn new(meter_provider: &dyn MeterProvider) -> Self {
        let meter = meter_provider.meter_with_scope(
            InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
                .with_version(env!("CARGO_PKG_VERSION"))
                .build(),
        );

        Self {
            events: meter
                .u64_counter(EVENT_COUNT)
                .with_description("Cache activities, one per tier touched")
                .with_unit("{activity}")
                .build(),
            durations: meter
                .f64_histogram(OPERATION_DURATION)
                .with_description("Time spent in a whole waterfall or tier operation")
                .with_unit("s")
                .build(),
        }
    }

    fn record(&self, cache_name: CacheName, operation: CacheOperation, activity: CacheActivity, tier: Option<usize>, duration: Option<Duration>) {
        let mut attrs = vec![
            KeyValue::new(NAME_KEY, cache_name),
            KeyValue::new(OPERATION_KEY, operation.as_str()),
            KeyValue::new(ACTIVITY_KEY, activity.as_str()),
        ];
        if let Some(index) = tier.and_then(|t| i64::try_from(t).ok()) {
            attrs.push(KeyValue::new(TIER_KEY, index));
        }

        self.events.add(1, &attrs);
        if let Some(duration) = duration {
            self.durations.record(duration.as_secs_f64(), &attrs);
        }
    }
}

#[derive(Debug)]
pub(crate) struct CacheTelemetryInner {
    clock: Clock,
    logging_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    instruments: Option<Instruments>,
}

impl CacheTelemetry {
    /// Creates a telemetry collector that only emits log events.
    ///
    /// # Arguments
    ///
    /// * `logging_enabled` - Emit a `cache.event` tracing event per activity
    /// * `clock` - The clock used to time operations
    #[must_use]
    pub fn new(logging_enabled: bool, clock: Clock) -> Self {
        Self {
            inner: Arc::new(CacheTelemetryInner {
                clock,
                logging_enabled,
                #[cfg(any(feature = "metrics", test))]
                instruments: None,
            }),
        }
    }

    /// Creates a telemetry collector that also records OpenTelemetry metrics.
    ///
    /// Two instruments are created on a meter scoped to this crate: the
    /// `cache.event.count` counter and the `cache.operation.duration` histogram.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn with_metrics(logging_enabled: bool, meter_provider: &dyn MeterProvider, clock: Clock) -> Self {
        Self {
            inner: Arc::new(CacheTelemetryInner {
                clock,
                logging_enabled,
                instruments: Some(Instruments::new(meter_provider)),
            }),
        }
    }

    /// Returns a reference to the clock used for timing operations.
    #[inline]
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    /// Returns `true` if activities are emitted as log events.
    #[must_use]
    pub fn logging_enabled(&self) -> bool {
        self.inner.logging_enabled
    }

    /// Records a cache activity.
    ///
    /// # Arguments
    ///
    /// * `cache_name` - Static string identifying the cache instance
    /// * `operation` - The type of cache operation
    /// * `activity` - The operation activity
    /// * `tier` - Index of the tier the activity concerns, if any
    /// * `duration` - Optional operation duration
    #[inline]
    pub(crate) fn record(
        &self,
        cache_name: CacheName,
        operation: CacheOperation,
        activity: CacheActivity,
        tier: Option<usize>,
        duration: Option<Duration>,
    ) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(instruments) = &self.inner.instruments {
            instruments.record(cache_name, operation, activity, tier, duration);
        }

        if self.inner.logging_enabled {
            Self::emit(cache_name, operation, activity, tier, duration);
        }
    }

    fn emit(cache_name: CacheName, operation: CacheOperation, activity: CacheActivity, tier: Option<usize>, duration: Option<Duration>) {
        let op = operation.as_str();
        let act = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());

        // Tracing levels are static, hence one macro arm per level.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = cache_name,
                    cache.operation = op,
                    cache.activity = act,
                    cache.tier = ?tier,
                    cache.duration_ns = ?duration_ns,
                    "cache.event"
                )
            };
        }

        match activity.level() {
            Level::ERROR => emit_event!(error),
            Level::WARN => emit_event!(warn),
            Level::INFO => emit_event!(info),
            _ => emit_event!(debug),
        }
    }
}
