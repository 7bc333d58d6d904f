//! Mock async spawner for testing
//!
//! Can drop tasks, run them synchronously on the spawning thread, or queue
//! them until the test decides to run them. The queued mode is what lets a
//! test observe a cache entry while it is still Pending.

use super::{AsyncSpawner, BoxFuture, JoinHandle};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

/// Spawn behavior for MockSpawner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSpawnBehavior {
    /// Drop tasks immediately (don't execute)
    Drop,
    /// Block on tasks synchronously using a simple executor
    BlockSync,
    /// Queue tasks until [`MockSpawner::run_pending`] is called
    Deferred,
}

/// Mock async spawner for testing
#[derive(Clone)]
pub struct MockSpawner {
    behavior: MockSpawnBehavior,
    queue: Arc<Mutex<Vec<BoxFuture<'static, ()>>>>,
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSpawner")
            .field("behavior", &self.behavior)
            .field("pending", &self.pending())
            .finish()
    }
}

impl MockSpawner {
    /// Create a new mock spawner that drops tasks
    pub fn new() -> Self {
        Self::with_behavior(MockSpawnBehavior::Drop)
    }

    /// Create a mock spawner with specific behavior
    pub fn with_behavior(behavior: MockSpawnBehavior) -> Self {
        Self {
            behavior,
            queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock spawner that runs tasks synchronously
    pub fn blocking() -> Self {
        Self::with_behavior(MockSpawnBehavior::BlockSync)
    }

    /// Create a mock spawner that queues tasks
    pub fn deferred() -> Self {
        Self::with_behavior(MockSpawnBehavior::Deferred)
    }

    /// Number of queued tasks
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run every queued task to completion, in spawn order
    ///
    /// Returns how many tasks ran. Tasks queued while running are run too.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let tasks = std::mem::take(&mut *self.queue.lock());
            if tasks.is_empty() {
                return ran;
            }
            for task in tasks {
                futures::executor::block_on(task);
                ran += 1;
            }
        }
    }
}

impl AsyncSpawner for MockSpawner {
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.behavior {
            MockSpawnBehavior::Drop => {
                drop(task);
            }
            MockSpawnBehavior::BlockSync => {
                futures::executor::block_on(task);
            }
            MockSpawnBehavior::Deferred => {
                self.queue.lock().push(Box::pin(task));
            }
        }
        JoinHandle::new(())
    }

    fn runtime_name(&self) -> &'static str {
        "Mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_mock_spawner_drop() {
        let spawner = MockSpawner::new();
        let _handle = spawner.spawn(async {
            panic!("Should not run");
        });
        assert_eq!(spawner.pending(), 0);
    }

    #[test]
    fn test_mock_spawner_blocking() {
        let spawner = MockSpawner::blocking();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();

        spawner.spawn(async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mock_spawner_deferred_runs_in_order() {
        let spawner = MockSpawner::deferred();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            spawner.spawn(async move {
                order.lock().push(i);
            });
        }

        assert_eq!(spawner.pending(), 3);
        assert!(order.lock().is_empty());

        assert_eq!(spawner.run_pending(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert_eq!(spawner.pending(), 0);
    }

    #[test]
    fn test_mock_spawner_clones_share_queue() {
        let spawner = MockSpawner::deferred();
        let clone = spawner.clone();
        clone.spawn(async {});
        assert_eq!(spawner.pending(), 1);
    }
}
