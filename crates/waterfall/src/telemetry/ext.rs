// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Extension traits for telemetry recording.

use std::time::Duration;

use tick::Clock;

use crate::telemetry::{CacheActivity, CacheName, CacheOperation, CacheTelemetry};

/// Result of a timed async operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimedResult<R> {
    /// The result of the operation.
    pub result: R,
    /// The duration of the operation.
    pub duration: Duration,
}

/// Extension trait for timing async operations.
pub(crate) trait ClockExt {
    /// Times an async operation and returns both the result and elapsed duration.
    fn timed_async<F, R>(&self, f: F) -> impl Future<Output = TimedResult<R>>
    where
        F: Future<Output = R>;
}

impl ClockExt for Clock {
    async fn timed_async<F, R>(&self, f: F) -> TimedResult<R>
    where
        F: Future<Output = R>,
    {
        let start = self.instant();
        let result = f.await;
        TimedResult {
            result,
            duration: self.instant().saturating_duration_since(start),
        }
    }
}

pub(crate) trait CacheTelemetryExt {
    /// Records a cache activity if telemetry is enabled.
    fn record(&self, name: CacheName, operation: CacheOperation, activity: CacheActivity, tier: Option<usize>, duration: Option<Duration>);
}

impl CacheTelemetryExt for Option<CacheTelemetry> {
    fn record(&self, name: CacheName, operation: CacheOperation, activity: CacheActivity, tier: Option<usize>, duration: Option<Duration>) {
        if let Some(t) = self {
            t.record(name, operation, activity, tier, duration);
        }
    }
}
