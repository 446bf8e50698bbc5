// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Callback traits for the async adapter.
//!
//! Both traits consume `self` in their terminal methods, so a callback value can
//! complete at most once.

use std::fmt::Debug;

use waterfall_tier::Error;

/// Receives the outcome of an operation that produces a value.
///
/// Used by [`AsyncCache::get_async`](crate::AsyncCache::get_async) (with
/// `T = Option<V>`) and [`AsyncCache::contains_async`](crate::AsyncCache::contains_async)
/// (with `T = bool`).
pub trait GetCallback<T>: Send + 'static {
    /// Called with the value when the operation succeeds.
    fn on_success(self, value: T);

    /// Called with the cause when the operation fails.
    fn on_failure(self, error: Error);
}

/// Receives the outcome of an operation that produces no value.
///
/// Used by `put_async`, `remove_async` and `clear_async`. An operation the cache did not
/// acknowledge is reported through [`on_failure`](Callback::on_failure).
pub trait Callback: Send + 'static {
    /// Called when the operation was acknowledged.
    fn on_success(self);

    /// Called with the cause when the operation failed or was not acknowledged.
    fn on_failure(self, error: Error);
}

/// A [`GetCallback`] built from two closures. Created by [`get_callback`].
pub struct FnGetCallback<S, F> {
    on_success: S,
    on_failure: F,
}

impl<S, F> Debug for FnGetCallback<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnGetCallback").finish_non_exhaustive()
    }
}

impl<T, S, F> GetCallback<T> for FnGetCallback<S, F>
where
    S: FnOnce(T) + Send + 'static,
    F: FnOnce(Error) + Send + 'static,
{
    fn on_success(self, value: T) {
        (self.on_success)(value);
    }

    fn on_failure(self, error: Error) {
        (self.on_failure)(error);
    }
}

/// A [`Callback`] built from two closures. Created by [`callback`].
pub struct FnCallback<S, F> {
    on_success: S,
    on_failure: F,
}

impl<S, F> Debug for FnCallback<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCallback").finish_non_exhaustive()
    }
}

impl<S, F> Callback for FnCallback<S, F>
where
    S: FnOnce() + Send + 'static,
    F: FnOnce(Error) + Send + 'static,
{
    fn on_success(self) {
        (self.on_success)();
    }

    fn on_failure(self, error: Error) {
        (self.on_failure)(error);
    }
}

/// Builds a [`GetCallback`] from a success closure and a failure closure.
///
/// # Examples
///
/// ```
/// use waterfall::{GetCallback, get_callback};
///
/// let callback = get_callback(
///     |value: Option<i32>| assert_eq!(value, Some(1)),
///     |error| panic!("unexpected failure: {error}"),
/// );
/// callback.on_success(Some(1));
/// ```
pub fn get_callback<T, S, F>(on_success: S, on_failure: F) -> FnGetCallback<S, F>
where
    S: FnOnce(T) + Send + 'static,
    F: FnOnce(Error) + Send + 'static,
{
    FnGetCallback { on_success, on_failure }
}

/// Builds a [`Callback`] from a success closure and a failure closure.
pub fn callback<S, F>(on_success: S, on_failure: F) -> FnCallback<S, F>
where
    S: FnOnce() + Send + 'static,
    F: FnOnce(Error) + Send + 'static,
{
    FnCallback { on_success, on_failure }
}
