//! Tokio async runtime implementation

use super::{AsyncSpawner, JoinHandle};
use std::future::Future;

/// Tokio-based async spawner
///
/// Spawns resource loads on whichever Tokio runtime is current when
/// [`TokioSpawner::new`] is called, or on the one passed to
/// [`TokioSpawner::with_handle`]. Keeping the handle lets the render thread,
/// which is not itself inside the runtime, start loads.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Create a spawner bound to the current Tokio runtime
    ///
    /// # Panics
    /// Panics when called outside of a Tokio runtime.
    pub fn new() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Create a spawner bound to an explicit runtime handle
    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl AsyncSpawner for TokioSpawner {
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        JoinHandle::new(self.handle.spawn(task))
    }

    fn runtime_name(&self) -> &'static str {
        "Tokio"
    }
}
