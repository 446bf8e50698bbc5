// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for callback delivery through the async adapter.

#![cfg(feature = "memory")]

use std::pin::Pin;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use anyspawn::Spawner;
use parking_lot::Mutex;
use tick::Clock;
use waterfall::{AsyncCache, CacheTier, DeliveryContext, Error, InMemoryCache, WaterfallCache, callback, get_callback};
use waterfall_tier::testing::{CacheOp, MockCache};

type TestResult = Result<(), Error>;
type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

const WAIT: Duration = Duration::from_secs(5);
const DELIVERY_THREAD: &str = "waterfall-delivery";

/// Runs every task to completion on a fresh OS thread.
fn thread_spawner() -> Spawner {
    Spawner::new_custom("thread", |task| {
        thread::spawn(move || futures::executor::block_on(task));
    })
}

fn queued_spawner() -> (Spawner, Arc<Mutex<Vec<Task>>>) {
    let queue: Arc<Mutex<Vec<Task>>> = Arc::default();
    let sink = Arc::clone(&queue);
    (Spawner::new_custom("queued", move |task| sink.lock().push(task)), queue)
}

fn run_queued(queue: &Mutex<Vec<Task>>) {
    loop {
        let tasks: Vec<Task> = queue.lock().drain(..).collect();
        if tasks.is_empty() {
            break;
        }
        for task in tasks {
            futures::executor::block_on(task);
        }
    }
}

fn key() -> String {
    "k".to_string()
}

#[test]
fn get_callback_runs_on_dedicated_thread() -> TestResult {
    let memory = InMemoryCache::<String, String>::new();
    futures::executor::block_on(memory.put(&key(), "v".to_string()))?;

    let cache = WaterfallCache::builder::<String, String>(Clock::new_frozen())
        .tier(memory)
        .spawner(thread_spawner())
        .build_async(DeliveryContext::dedicated_thread(DELIVERY_THREAD)?);

    let (tx, rx) = mpsc::channel();
    let failures = tx.clone();
    let caller = thread::spawn(move || {
        drop(cache.get_async(
            &key(),
            get_callback(
                move |value: Option<String>| {
                    let name = thread::current().name().map(ToString::to_string);
                    tx.send(Ok((value, name))).expect("send failed");
                },
                move |error: Error| failures.send(Err(error.to_string())).expect("send failed"),
            ),
        ));
    });
    caller.join().expect("caller thread panicked");

    let (value, name) = rx.recv_timeout(WAIT).expect("callback did not run").expect("get failed");
    assert_eq!(value, Some("v".to_string()));
    assert_eq!(name.as_deref(), Some(DELIVERY_THREAD));
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    Ok(())
}

#[test]
fn failure_is_delivered_on_dedicated_thread() -> TestResult {
    let storage = MockCache::<String, i32>::new();
    storage.fail_when(|op| matches!(op, CacheOp::Put { .. }));

    let cache = AsyncCache::<String, i32, _>::new(storage, thread_spawner(), DeliveryContext::dedicated_thread(DELIVERY_THREAD)?);

    let (tx, rx) = mpsc::channel();
    let failures = tx.clone();
    cache.put_async(
        &key(),
        1,
        callback(
            move || tx.send(Ok(())).expect("send failed"),
            move |error: Error| {
                let name = thread::current().name().map(ToString::to_string);
                failures.send(Err((error.to_string(), name))).expect("send failed");
            },
        ),
    );

    let (message, name) = rx.recv_timeout(WAIT).expect("callback did not run").expect_err("put should fail");
    assert!(message.contains("mock: put failed"));
    assert_eq!(name.as_deref(), Some(DELIVERY_THREAD));
    Ok(())
}

#[test]
fn callbacks_on_one_context_arrive_in_completion_order() -> TestResult {
    let storage = MockCache::<String, i32>::new();
    let inline = Spawner::new_custom("inline", |task| futures::executor::block_on(task));
    let cache = AsyncCache::<String, i32, _>::new(storage, inline, DeliveryContext::dedicated_thread(DELIVERY_THREAD)?);

    let (tx, rx) = mpsc::channel();
    for value in 0..5 {
        let done = tx.clone();
        let failed = tx.clone();
        cache.put_async(
            &format!("key-{value}"),
            value,
            callback(move || done.send(value).expect("send failed"), move |_| failed.send(-1).expect("send failed")),
        );
    }

    for expected in 0..5 {
        assert_eq!(rx.recv_timeout(WAIT).expect("callback did not run"), expected);
    }
    Ok(())
}

#[test]
fn cancelled_subscription_never_calls_back() -> TestResult {
    let storage = MockCache::<String, i32>::with_data([(key(), 1)]);
    let (spawner, parked) = queued_spawner();
    let cache = AsyncCache::<String, i32, _>::new(storage, spawner, DeliveryContext::dedicated_thread(DELIVERY_THREAD)?);

    let (tx, rx) = mpsc::channel();
    let failures = tx.clone();
    let subscription = cache.get_async(
        &key(),
        get_callback(
            move |value: Option<i32>| tx.send(Ok(value)).expect("send failed"),
            move |error: Error| failures.send(Err(error.to_string())).expect("send failed"),
        ),
    );
    subscription.cancel();

    let tasks: Vec<Task> = parked.lock().drain(..).collect();
    for task in tasks {
        futures::executor::block_on(task);
    }

    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert!(!subscription.is_pending());
    Ok(())
}

#[test]
fn cancel_after_a_lower_tier_hit_keeps_the_populate_back() -> TestResult {
    let fast = MockCache::<String, i32>::new();
    let slow = MockCache::<String, i32>::with_data([(key(), 1)]);
    let (operations, operation_queue) = queued_spawner();
    let (deliveries, delivery_queue) = queued_spawner();

    let cache = WaterfallCache::builder::<String, i32>(Clock::new_frozen())
        .tier(fast.clone())
        .tier(slow)
        .spawner(operations)
        .build_async(DeliveryContext::spawner(deliveries));

    let (tx, rx) = mpsc::channel();
    let failures = tx.clone();
    let subscription = cache.get_async(
        &key(),
        get_callback(
            move |value: Option<i32>| tx.send(Ok(value)).expect("send failed"),
            move |error: Error| failures.send(Err(error.to_string())).expect("send failed"),
        ),
    );

    // Only the read itself; it queues the populate-back write behind it.
    let read = operation_queue.lock().remove(0);
    futures::executor::block_on(read);
    assert!(!fast.contains_key(&key()));

    subscription.cancel();
    run_queued(&operation_queue);
    run_queued(&delivery_queue);

    assert_eq!(fast.peek(&key()), Some(1));
    assert!(rx.try_recv().is_err());
    assert!(!subscription.is_pending());
    Ok(())
}

#[test]
fn default_spawner_delivers_without_a_runtime() -> TestResult {
    let fast = InMemoryCache::<String, String>::new();
    let slow = InMemoryCache::<String, String>::new();
    futures::executor::block_on(slow.put(&key(), "v".to_string()))?;

    let cache = WaterfallCache::builder::<String, String>(Clock::new_frozen())
        .tier(fast)
        .tier(slow)
        .build_async(DeliveryContext::immediate());

    let (tx, rx) = mpsc::channel();
    let failures = tx.clone();
    drop(cache.get_async(
        &key(),
        get_callback(
            move |value: Option<String>| tx.send(Ok(value)).expect("send failed"),
            move |error: Error| failures.send(Err(error.to_string())).expect("send failed"),
        ),
    ));

    let value = rx.recv_timeout(WAIT).expect("callback did not run").expect("get failed");
    assert_eq!(value, Some("v".to_string()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn future_and_callback_styles_share_one_cache() -> TestResult {
    let cache = WaterfallCache::builder::<String, i32>(Clock::new_frozen())
        .memory()
        .build_async(DeliveryContext::spawner(Spawner::new_tokio()));

    cache.cache().put(&key(), 11).await?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    cache.contains_async(&key(), get_callback(move |present: bool| drop(tx.send(present)), |_| {}));

    assert!(rx.await.expect("callback dropped without running"));
    Ok(())
}
