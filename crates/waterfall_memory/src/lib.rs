// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-memory cache tier backed by moka.
//!
//! This crate provides [`InMemoryCache`], a concurrent in-memory implementation of
//! [`CacheTier`](waterfall_tier::CacheTier). It is the usual first tier of a waterfall
//! cache: fast to consult, bounded in size, and populated back from slower tiers on a
//! hit further down the list. Use [`InMemoryCacheBuilder`] to configure capacity
//! without exposing moka types.
//!
//! Time-based expiration is intentionally left to the expiring decorator in the
//! `waterfall` crate so that every tier shares one clock.
//!
//! # Quick Start
//!
//! ```
//! use waterfall_memory::InMemoryCacheBuilder;
//! use waterfall_tier::CacheTier;
//!
//! # futures::executor::block_on(async {
//! let cache = InMemoryCacheBuilder::<String, i32>::new()
//!     .max_capacity(1000)
//!     .build();
//!
//! cache.put(&"key".to_string(), 42).await.unwrap();
//! let value = cache.get(&"key".to_string()).await.unwrap();
//! assert_eq!(value, Some(42));
//! # });
//! ```

pub mod builder;
pub mod tier;

#[doc(inline)]
pub use builder::InMemoryCacheBuilder;
#[doc(inline)]
pub use tier::InMemoryCache;
