// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! The cache tier contract for waterfall caches.
//!
//! This crate defines the [`CacheTier`] trait that every cache backend, every decorator
//! and the waterfall orchestrator itself implement, along with the [`Error`] type for
//! fallible operations and [`DynamicCache`] for holding heterogeneous tiers in one list.
//!
//! # Overview
//!
//! A tier answers five questions about keys it owns: `get`, `put`, `contains`, `remove`
//! and `clear`. Every answer is a future resolving to a `Result`, and a missing key is a
//! successful `Ok(None)`, never an error. Implement [`CacheTier`] for your storage, then
//! use the `waterfall` crate to add lazy expiration, multi-tier fallback and callback
//! delivery on top.
//!
//! # Implementing a Cache Tier
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! use waterfall_tier::{CacheTier, Error};
//!
//! struct SimpleCache<K, V>(RwLock<HashMap<K, V>>);
//!
//! impl<K, V> CacheTier<K, V> for SimpleCache<K, V>
//! where
//!     K: Clone + Eq + std::hash::Hash + Send + Sync,
//!     V: Clone + Send + Sync,
//! {
//!     async fn get(&self, key: &K) -> Result<Option<V>, Error> {
//!         Ok(self.0.read().unwrap().get(key).cloned())
//!     }
//!
//!     async fn put(&self, key: &K, value: V) -> Result<bool, Error> {
//!         self.0.write().unwrap().insert(key.clone(), value);
//!         Ok(true)
//!     }
//!
//!     async fn contains(&self, key: &K) -> Result<bool, Error> {
//!         Ok(self.0.read().unwrap().contains_key(key))
//!     }
//!
//!     async fn remove(&self, key: &K) -> Result<bool, Error> {
//!         self.0.write().unwrap().remove(key);
//!         Ok(true)
//!     }
//!
//!     async fn clear(&self) -> Result<bool, Error> {
//!         self.0.write().unwrap().clear();
//!         Ok(true)
//!     }
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! [`DynamicCache`] wraps any `CacheTier` in a cloneable, type-erased handle. The
//! waterfall orchestrator stores its tiers this way so an in-memory tier, a disk tier and
//! an expiring decorator can sit in the same ordered list.

mod dynamic;
pub mod error;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub(crate) mod tier;

#[doc(inline)]
pub use dynamic::{DynamicCache, DynamicCacheExt};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use tier::CacheTier;
