// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Multi-tier waterfall caching with lazy expiration and callback delivery.
//!
//! This crate layers a few pieces over the [`CacheTier`] contract:
//! - [`LazyExpiringCache`] stamps values on write and drops them on the first read past
//!   their time-to-live
//! - [`WaterfallCache`] reads through an ordered list of tiers, returns the first hit and
//!   copies it back into the faster tiers in the background
//! - [`AsyncCache`] exposes any tier through success/failure callbacks delivered on a
//!   chosen [`DeliveryContext`]
//!
//! # Examples
//!
//! ## Two Tiers, One Expiring
//!
//! ```
//! use std::time::Duration;
//!
//! use tick::Clock;
//! use waterfall::{CacheTier, InMemoryCache, TimedValue, WaterfallCache};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), waterfall::Error> {
//! let cache = WaterfallCache::builder::<String, String>(Clock::new_frozen())
//!     .memory()
//!     .expiring_tier(InMemoryCache::<String, TimedValue<String>>::new(), Duration::from_secs(300))?
//!     .build();
//!
//! cache.put(&"user:1".to_string(), "Ada".to_string()).await?;
//! assert_eq!(cache.get(&"user:1".to_string()).await?, Some("Ada".to_string()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Callbacks on a Dedicated Thread
//!
//! ```
//! use std::sync::mpsc;
//!
//! use tick::Clock;
//! use waterfall::{DeliveryContext, WaterfallCache, callback};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), waterfall::Error> {
//! let cache = WaterfallCache::builder::<String, i32>(Clock::new_frozen())
//!     .memory()
//!     .build_async(DeliveryContext::dedicated_thread("cache-callbacks")?);
//!
//! let (tx, rx) = mpsc::channel();
//! let failures = tx.clone();
//! cache.put_async(
//!     &"answer".to_string(),
//!     42,
//!     callback(move || tx.send(true).unwrap(), move |_| failures.send(false).unwrap()),
//! );
//! # assert!(rx.recv().unwrap());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `memory` (default): the moka-backed [`InMemoryCache`] tier and
//!   [`WaterfallBuilder::memory`]
//! - `metrics`: OpenTelemetry counters and histograms via
//!   [`CacheTelemetry::with_metrics`]
//! - `test-util`: the [`MockCache`] test double and `tick` clock control

mod adapter;
mod builder;
mod callback;
mod delivery;
mod expire;
mod telemetry;
mod waterfall;

#[doc(inline)]
pub use adapter::{AsyncCache, Subscription};
#[doc(inline)]
pub use builder::WaterfallBuilder;
#[doc(inline)]
pub use callback::{Callback, FnCallback, FnGetCallback, GetCallback, callback, get_callback};
#[doc(inline)]
pub use delivery::DeliveryContext;
#[doc(inline)]
pub use expire::{LazyExpiringCache, TimedValue};
#[doc(inline)]
pub use telemetry::{CacheName, CacheTelemetry};
#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use waterfall_tier::testing::{CacheOp, MockCache};
#[doc(inline)]
pub use waterfall_tier::{CacheTier, DynamicCache, DynamicCacheExt, Error, Result};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use waterfall_memory::{InMemoryCache, InMemoryCacheBuilder};
#[doc(inline)]
pub use waterfall::WaterfallCache;
