//! Async runtime abstraction for background resource loads
//!
//! The resource cache never blocks the render thread: every cache miss is
//! turned into one task handed to an [`AsyncSpawner`]. Which executor runs
//! those tasks (Tokio, a test mock, something host-provided) is up to the
//! embedding application.

pub mod mock;
#[cfg(feature = "runtime-tokio")]
pub mod tokio_impl;

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

/// A boxed future that can be sent across threads
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handle to a spawned async task
///
/// This is a type-erased handle; loads are not cancellable, so the cache
/// drops it right away.
#[derive(Debug)]
pub struct JoinHandle {
    _inner: Box<dyn std::any::Any + Send>,
}

impl JoinHandle {
    /// Create a new join handle
    pub fn new<T: Send + 'static>(handle: T) -> Self {
        Self {
            _inner: Box::new(handle),
        }
    }
}

/// Async task spawner trait
///
/// # Example
/// ```ignore
/// let spawner = TokioSpawner::new();
/// spawner.spawn(async {
///     // Load a model here
/// });
/// ```
pub trait AsyncSpawner: Send + Sync + Clone + Debug {
    /// Spawn an async task that runs in the background
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static;

    /// Get the name of this runtime (for debugging)
    fn runtime_name(&self) -> &'static str;
}

pub use mock::{MockSpawnBehavior, MockSpawner};

#[cfg(feature = "runtime-tokio")]
pub use tokio_impl::TokioSpawner;
