// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Where callbacks of the async adapter run.

use std::fmt::Debug;
use std::sync::Arc;
use std::thread;

use anyspawn::Spawner;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::executor::block_on_stream;
use waterfall_tier::Error;

type Job = Box<dyn FnOnce() + Send>;

/// The execution context that callbacks are delivered on.
///
/// The context is fixed when an [`AsyncCache`](crate::AsyncCache) is built. Clones share
/// the same underlying context, including the same dedicated thread.
///
/// # Examples
///
/// ```
/// use waterfall::DeliveryContext;
///
/// let delivery = DeliveryContext::dedicated_thread("cache-callbacks")?;
/// assert_eq!(delivery.thread_name(), Some("cache-callbacks"));
/// # Ok::<(), waterfall::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DeliveryContext(Kind);

#[derive(Debug, Clone)]
enum Kind {
    Immediate,
    Spawner(Spawner),
    Dedicated(Arc<DedicatedThread>),
}

#[derive(Debug)]
struct DedicatedThread {
    name: String,
    sender: UnboundedSender<Job>,
}

impl DeliveryContext {
    /// Delivers callbacks on whichever thread completes the operation.
    #[must_use]
    pub fn immediate() -> Self {
        Self(Kind::Immediate)
    }

    /// Delivers each callback as a task on the given spawner.
    #[must_use]
    pub fn spawner(spawner: Spawner) -> Self {
        Self(Kind::Spawner(spawner))
    }

    /// Delivers callbacks, one at a time and in completion order, on a named worker
    /// thread owned by this context.
    ///
    /// The thread exits once every clone of the context has been dropped and the queued
    /// callbacks have run. If the thread is gone when a callback is due (for example
    /// because an earlier callback panicked), the callback runs on the completing thread
    /// instead and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the operating system refuses to start the thread.
    pub fn dedicated_thread(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        let (sender, receiver) = mpsc::unbounded::<Job>();

        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                for job in block_on_stream(receiver) {
                    job();
                }
            })
            .map_err(Error::from_message)?;

        Ok(Self(Kind::Dedicated(Arc::new(DedicatedThread { name, sender }))))
    }

    /// Returns the name of the dedicated delivery thread, if this context owns one.
    #[must_use]
    pub fn thread_name(&self) -> Option<&str> {
        match &self.0 {
            Kind::Dedicated(thread) => Some(&thread.name),
            Kind::Immediate | Kind::Spawner(_) => None,
        }
    }

    pub(crate) fn deliver<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.0 {
            Kind::Immediate => job(),
            Kind::Spawner(spawner) => {
                spawner.spawn(async move { job() });
            }
            Kind::Dedicated(thread) => {
                if let Err(rejected) = thread.sender.unbounded_send(Box::new(job)) {
                    tracing::warn!(
                        delivery.thread = thread.name.as_str(),
                        "delivery thread is gone, running callback on the current thread"
                    );
                    (rejected.into_inner())();
                }
            }
        }
    }
}

impl Default for DeliveryContext {
    fn default() -> Self {
        Self::immediate()
    }
}
