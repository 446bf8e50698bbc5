// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Callback-style access to any cache tier.
//!
//! [`AsyncCache`] runs each operation of the wrapped cache as a task on an execution
//! [`Spawner`] and hands the outcome to a callback on the configured
//! [`DeliveryContext`]. The wrapped cache stays reachable through
//! [`AsyncCache::cache`], so callers can mix the callback style with plain futures on
//! the same instance.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use anyspawn::Spawner;
use futures::future::{AbortHandle, Abortable};
use parking_lot::Mutex;
use waterfall_tier::{CacheTier, Error};

use crate::callback::{Callback, GetCallback};
use crate::delivery::DeliveryContext;

/// Adapts a cache to success/failure callbacks.
///
/// Every `*_async` method returns immediately with a [`Subscription`]. Exactly one of
/// the callback's methods runs later, unless the subscription is cancelled first.
///
/// # Examples
///
/// ```
/// use std::sync::mpsc;
///
/// use anyspawn::Spawner;
/// use waterfall::{AsyncCache, DeliveryContext, InMemoryCache, get_callback};
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = AsyncCache::<String, i32, _>::new(
///     InMemoryCache::<String, i32>::new(),
///     Spawner::new_tokio(),
///     DeliveryContext::immediate(),
/// );
///
/// let (tx, rx) = mpsc::channel();
/// let failures = tx.clone();
/// cache.get_async(
///     &"missing".to_string(),
///     get_callback(
///         move |value: Option<i32>| tx.send(Ok(value)).unwrap(),
///         move |error| failures.send(Err(error)).unwrap(),
///     ),
/// );
/// # assert!(matches!(rx.recv().unwrap(), Ok(None)));
/// # }
/// ```
pub struct AsyncCache<K, V, C> {
    cache: Arc<C>,
    spawner: Spawner,
    delivery: DeliveryContext,
    _phantom: PhantomData<fn(K) -> V>,
}

impl<K, V, C> Debug for AsyncCache<K, V, C>
where
    C: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncCache")
            .field("cache", &self.cache)
            .field("delivery", &self.delivery)
            .finish_non_exhaustive()
    }
}

impl<K, V, C> Clone for AsyncCache<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            spawner: self.spawner.clone(),
            delivery: self.delivery.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<K, V, C> AsyncCache<K, V, C> {
    /// Wraps `cache`, running operations on `spawner` and callbacks on `delivery`.
    #[must_use]
    pub fn new(cache: C, spawner: Spawner, delivery: DeliveryContext) -> Self {
        Self {
            cache: Arc::new(cache),
            spawner,
            delivery,
            _phantom: PhantomData,
        }
    }

    /// Returns the wrapped cache for future-based access.
    #[must_use]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns the context callbacks are delivered on.
    #[must_use]
    pub fn delivery(&self) -> &DeliveryContext {
        &self.delivery
    }
}

impl<K, V, C> AsyncCache<K, V, C>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    C: CacheTier<K, V> + 'static,
{
    /// Looks up `key` and reports the value, or `None` on a miss.
    pub fn get_async<G>(&self, key: &K, callback: G) -> Subscription
    where
        G: GetCallback<Option<V>>,
    {
        let cache = Arc::clone(&self.cache);
        let key = key.clone();
        self.run(async move { cache.get(&key).await }, move |result| match result {
            Ok(value) => callback.on_success(value),
            Err(error) => callback.on_failure(error),
        })
    }

    /// Reports whether a lookup of `key` would currently find a value.
    pub fn contains_async<G>(&self, key: &K, callback: G) -> Subscription
    where
        G: GetCallback<bool>,
    {
        let cache = Arc::clone(&self.cache);
        let key = key.clone();
        self.run(async move { cache.contains(&key).await }, move |result| match result {
            Ok(present) => callback.on_success(present),
            Err(error) => callback.on_failure(error),
        })
    }

    /// Stores `value` under `key`.
    pub fn put_async<B>(&self, key: &K, value: V, callback: B) -> Subscription
    where
        B: Callback,
    {
        let cache = Arc::clone(&self.cache);
        let key = key.clone();
        self.run(async move { cache.put(&key, value).await }, acknowledge(callback, "put"))
    }

    /// Removes `key`.
    pub fn remove_async<B>(&self, key: &K, callback: B) -> Subscription
    where
        B: Callback,
    {
        let cache = Arc::clone(&self.cache);
        let key = key.clone();
        self.run(async move { cache.remove(&key).await }, acknowledge(callback, "remove"))
    }

    /// Removes every entry.
    pub fn clear_async<B>(&self, callback: B) -> Subscription
    where
        B: Callback,
    {
        let cache = Arc::clone(&self.cache);
        self.run(async move { cache.clear().await }, acknowledge(callback, "clear"))
    }

    fn run<T, Fut, D>(&self, operation: Fut, deliver: D) -> Subscription
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
        D: FnOnce(Result<T, Error>) + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Some(deliver)));
        let (abort, registration) = AbortHandle::new_pair();
        let operation = Abortable::new(operation, registration);
        let delivery = self.delivery.clone();
        let pending = Arc::clone(&slot);

        self.spawner.spawn(async move {
            let Ok(result) = operation.await else {
                return;
            };
            delivery.deliver(move || {
                let deliver = pending.lock().take();
                if let Some(deliver) = deliver {
                    deliver(result);
                }
            });
        });

        Subscription { abort, slot }
    }
}

fn acknowledge<B>(callback: B, operation: &'static str) -> impl FnOnce(Result<bool, Error>) + Send + 'static
where
    B: Callback,
{
    move |result| match result {
        Ok(true) => callback.on_success(),
        Ok(false) => callback.on_failure(Error::from_message(format!("{operation} was not acknowledged by the cache"))),
        Err(error) => callback.on_failure(error),
    }
}

trait CallbackSlot: Send + Sync {
    fn release(&self);

    fn is_pending(&self) -> bool;
}

impl<D: Send> CallbackSlot for Mutex<Option<D>> {
    fn release(&self) {
        let callback = self.lock().take();
        drop(callback);
    }

    fn is_pending(&self) -> bool {
        self.lock().is_some()
    }
}

/// Handle to one in-flight callback operation.
///
/// Dropping a subscription leaves the operation running; call
/// [`cancel`](Subscription::cancel) to abandon it.
pub struct Subscription {
    abort: AbortHandle,
    slot: Arc<dyn CallbackSlot>,
}

impl Subscription {
    /// Abandons the operation.
    ///
    /// The operation future is aborted at its next suspension point and the callback is
    /// dropped without being invoked. Once `cancel` returns, no callback starts. A
    /// callback that already started before the call runs to completion. Writes the
    /// cache has already issued, such as waterfall populate-back tasks, are not undone.
    pub fn cancel(&self) {
        self.abort.abort();
        self.slot.release();
    }

    /// Returns `true` while the callback has neither started nor been cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.is_pending()
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}
