// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock cache tier for testing.
//!
//! This module provides `MockCache`, an in-memory tier that records every
//! operation and supports failure injection and refused acknowledgements for
//! testing error paths and aggregation rules.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use crate::{CacheTier, Error};

/// Recorded cache operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp<K, V> {
    /// A get operation was performed with the given key.
    Get(K),
    /// A put operation was performed with the given key and value.
    Put {
        /// The key that was written.
        key: K,
        /// The value that was written.
        value: V,
    },
    /// A contains operation was performed with the given key.
    Contains(K),
    /// A remove operation was performed with the given key.
    Remove(K),
    /// A clear operation was performed.
    Clear,
}

type OpPredicate<K, V> = Box<dyn Fn(&CacheOp<K, V>) -> bool + Send + Sync>;

/// A configurable mock cache tier for testing.
///
/// Values are stored in memory. Every operation is recorded, including the ones
/// that were made to fail, so tests can verify which tiers were consulted and in
/// which order.
///
/// Use [`fail_when`](MockCache::fail_when) to make matching operations return an
/// [`Error`] and [`reject_when`](MockCache::reject_when) to make writes answer `false`.
pub struct MockCache<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
    operations: Arc<Mutex<Vec<CacheOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<OpPredicate<K, V>>>>,
    reject_when: Arc<Mutex<Option<OpPredicate<K, V>>>>,
}

impl<K, V> std::fmt::Debug for MockCache<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCache")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("reject_when", &self.reject_when.lock().is_some())
            .finish()
    }
}

impl<K, V> Clone for MockCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            reject_when: Arc::clone(&self.reject_when),
        }
    }
}

impl<K, V> Default for MockCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockCache<K, V> {
    /// Creates a new empty mock cache.
    #[must_use]
    pub fn new() -> Self {
        Self::from_map(HashMap::new())
    }

    fn from_map(data: HashMap<K, V>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            reject_when: Arc::new(Mutex::new(None)),
        }
    }
}

impl<K, V> MockCache<K, V>
where
    K: Eq + Hash,
{
    /// Creates a mock cache with pre-populated data.
    ///
    /// Seeding does not record any operation.
    #[must_use]
    pub fn with_data(data: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::from_map(data.into_iter().collect())
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the raw storage holds the given key.
    ///
    /// Unlike [`CacheTier::contains`], this inspects storage directly and
    /// records nothing.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Returns a clone of the raw stored value, recording nothing.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.data.lock().get(key).cloned()
    }
}

impl<K, V> MockCache<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Sets a predicate that determines when operations fail with an [`Error`].
    ///
    /// Failing operations are still recorded but leave the storage untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&CacheOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Sets a predicate that determines when `put`, `remove` and `clear` are
    /// answered with `Ok(false)` instead of being applied.
    pub fn reject_when<F>(&self, predicate: F)
    where
        F: Fn(&CacheOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.reject_when.lock() = Some(Box::new(predicate));
    }

    /// Clears both the failure and the rejection predicates.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
        *self.reject_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<CacheOp<K, V>> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: &CacheOp<K, V>) -> Verdict {
        self.operations.lock().push(op.clone());
        if self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op)) {
            Verdict::Fail
        } else if self.reject_when.lock().as_ref().is_some_and(|predicate| predicate(op)) {
            Verdict::Reject
        } else {
            Verdict::Apply
        }
    }
}

enum Verdict {
    Apply,
    Reject,
    Fail,
}

impl<K, V> CacheTier<K, V> for MockCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        match self.record(&CacheOp::Get(key.clone())) {
            Verdict::Fail => Err(Error::from_message("mock: get failed")),
            Verdict::Apply | Verdict::Reject => Ok(self.data.lock().get(key).cloned()),
        }
    }

    async fn put(&self, key: &K, value: V) -> Result<bool, Error> {
        let op = CacheOp::Put {
            key: key.clone(),
            value: value.clone(),
        };
        match self.record(&op) {
            Verdict::Fail => Err(Error::from_message("mock: put failed")),
            Verdict::Reject => Ok(false),
            Verdict::Apply => {
                self.data.lock().insert(key.clone(), value);
                Ok(true)
            }
        }
    }

    async fn contains(&self, key: &K) -> Result<bool, Error> {
        match self.record(&CacheOp::Contains(key.clone())) {
            Verdict::Fail => Err(Error::from_message("mock: contains failed")),
            Verdict::Apply | Verdict::Reject => Ok(self.data.lock().contains_key(key)),
        }
    }

    async fn remove(&self, key: &K) -> Result<bool, Error> {
        match self.record(&CacheOp::Remove(key.clone())) {
            Verdict::Fail => Err(Error::from_message("mock: remove failed")),
            Verdict::Reject => Ok(false),
            Verdict::Apply => {
                self.data.lock().remove(key);
                Ok(true)
            }
        }
    }

    async fn clear(&self) -> Result<bool, Error> {
        match self.record(&CacheOp::Clear) {
            Verdict::Fail => Err(Error::from_message("mock: clear failed")),
            Verdict::Reject => Ok(false),
            Verdict::Apply => {
                self.data.lock().clear();
                Ok(true)
            }
        }
    }
}
