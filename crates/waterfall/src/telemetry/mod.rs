// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache telemetry: structured `tracing` events and optional OpenTelemetry metrics.
//!
//! Every waterfall operation reports an activity (hit, miss, expired, populate-back, and
//! so on). Activities become `cache.event` log records when logging is enabled, and
//! counter and histogram samples when the `metrics` feature is enabled and a meter
//! provider was supplied.

use std::sync::Arc;

use tracing::Level;

use cache::CacheTelemetryInner;

pub(crate) mod cache;
pub(crate) mod ext;
#[cfg(test)]
pub(crate) mod testing;

/// Static string identifying a cache instance in telemetry.
pub type CacheName = &'static str;

/// Cache telemetry provider.
///
/// Construct this and pass it to the builder via
/// [`WaterfallBuilder::telemetry`](crate::WaterfallBuilder::telemetry). Clones share the
/// same instruments.
///
/// # Examples
///
/// ```
/// use tick::Clock;
/// use waterfall::CacheTelemetry;
///
/// let telemetry = CacheTelemetry::new(true, Clock::new_frozen());
/// assert!(telemetry.logging_enabled());
/// ```
#[derive(Clone, Debug)]
pub struct CacheTelemetry {
    inner: Arc<CacheTelemetryInner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Put,
    Remove,
    Clear,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Put => "cache.put",
            Self::Remove => "cache.remove",
            Self::Clear => "cache.clear",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Expired,
    Ok,
    Refused,
    PopulateBack,
    PopulateBackFailed,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Expired => "cache.expired",
            Self::Ok => "cache.ok",
            Self::Refused => "cache.refused",
            Self::PopulateBack => "cache.populate_back",
            Self::PopulateBackFailed => "cache.populate_back_failed",
            Self::Error => "cache.error",
        }
    }

    pub fn level(self) -> Level {
        match self {
            Self::Hit | Self::Miss | Self::Ok => Level::DEBUG,
            Self::Expired | Self::PopulateBack => Level::INFO,
            Self::Refused | Self::PopulateBackFailed => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}
