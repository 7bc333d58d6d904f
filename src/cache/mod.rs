//! Asynchronous, request-coalescing resource cache
//!
//! A [`ResourceCache`] maps a path-like key to one shared, lazily produced
//! payload. The first [`ResourceCache::get`] for a key creates a Pending
//! entry and hands the load to an [`AsyncSpawner`]; every later `get` for the
//! same key returns a handle to that same entry, so a loader never runs twice
//! concurrently for one key.
//!
//! Entries are held weakly by the cache: an entry lives as long as its
//! longest holder (consumer handles, plus the load task while Pending). When
//! the last handle is dropped the payload's destructor runs. Failed entries
//! are the exception: they are pinned so a broken file is not reloaded every
//! time a new consumer asks for it.
//!
//! A load that succeeds after every consumer has gone is held by the cache
//! until the next `get` for its key claims it. From then on it is weak again.

pub mod metrics;
pub mod recycler;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Instant;
use thiserror::Error;

use crate::runtime::AsyncSpawner;
use metrics::CacheMetricsHandle;

/// Loading state of a cache entry
///
/// Transitions strictly Pending -> Succeeded or Pending -> Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// The loader has not finished yet
    Pending,
    /// The payload is available and immutable
    Succeeded,
    /// The loader gave up; permanent for this entry
    Failed,
}

/// Why a load failed, shared by every consumer of the Failed entry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct LoadFailure(Arc<str>);

impl LoadFailure {
    /// Create a failure from anything printable
    pub fn new(reason: impl fmt::Display) -> Self {
        Self(Arc::from(reason.to_string()))
    }

    /// The failure message
    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// Produces a payload for a key, off the render thread
///
/// # Example
/// ```ignore
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl ResourceLoader<String> for Echo {
///     async fn load(&self, key: &str) -> Result<String, LoadFailure> {
///         Ok(key.to_owned())
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceLoader<T>: Send + Sync + 'static {
    /// Load the payload for `key`
    async fn load(&self, key: &str) -> Result<T, LoadFailure>;
}

struct CacheEntry<T> {
    key: String,
    outcome: OnceLock<Result<T, LoadFailure>>,
}

impl<T> CacheEntry<T> {
    fn state(&self) -> LoadState {
        match self.outcome.get() {
            None => LoadState::Pending,
            Some(Ok(_)) => LoadState::Succeeded,
            Some(Err(_)) => LoadState::Failed,
        }
    }
}

impl<T> Drop for CacheEntry<T> {
    fn drop(&mut self) {
        log::debug!("Released {}", self.key);
    }
}

/// Shared, reference-counted handle to one cache entry
///
/// All handles for a key point at the same entry and therefore at the same
/// payload instance.
pub struct ResourceHandle<T> {
    entry: Arc<CacheEntry<T>>,
}

impl<T> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<T> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("key", &self.entry.key)
            .field("state", &self.state())
            .finish()
    }
}

impl<T> ResourceHandle<T> {
    /// The key this entry was requested with
    pub fn key(&self) -> &str {
        &self.entry.key
    }

    /// Current loading state
    pub fn state(&self) -> LoadState {
        self.entry.state()
    }

    /// The payload, once Succeeded
    pub fn payload(&self) -> Option<&T> {
        self.entry.outcome.get().and_then(|outcome| outcome.as_ref().ok())
    }

    /// The failure, once Failed
    pub fn failure(&self) -> Option<&LoadFailure> {
        self.entry
            .outcome
            .get()
            .and_then(|outcome| outcome.as_ref().err())
    }

    /// Check the state and record what this consumer has seen
    pub fn poll(&self, transient: &mut TransientState) -> LoadState {
        let state = self.state();
        transient.observe(state);
        state
    }

    /// Whether two handles share one entry
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.entry, &b.entry)
    }

    /// Number of live handles to this entry, including an in-flight load
    pub fn holder_count(&self) -> usize {
        Arc::strong_count(&self.entry)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Observed {
    #[default]
    Nothing,
    Pending,
    Resolved,
}

/// Per-consumer view of an entry's progress
///
/// Lets one consumer see the Pending -> Succeeded/Failed transition exactly
/// once, without polling shared state for changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransientState {
    observed: Observed,
    just_resolved: bool,
}

impl TransientState {
    /// Fresh state for a consumer that has not looked yet
    pub fn new() -> Self {
        Self::default()
    }

    /// True only for the observation during which the entry was first seen resolved
    pub fn just_resolved(&self) -> bool {
        self.just_resolved
    }

    /// True while the last observation was Pending
    pub fn is_waiting(&self) -> bool {
        self.observed == Observed::Pending
    }

    /// True once this consumer has seen a resolved state
    pub fn is_resolved(&self) -> bool {
        self.observed == Observed::Resolved
    }

    /// Forget everything this consumer has seen
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn observe(&mut self, state: LoadState) {
        match state {
            LoadState::Pending => {
                self.observed = Observed::Pending;
                self.just_resolved = false;
            }
            LoadState::Succeeded | LoadState::Failed => {
                self.just_resolved = self.observed != Observed::Resolved;
                self.observed = Observed::Resolved;
            }
        }
    }
}

enum Slot<T> {
    /// Pending or Succeeded: lives as long as its holders
    Live(Weak<CacheEntry<T>>),
    /// Failed: kept so the loader is not retried
    Pinned(Arc<CacheEntry<T>>),
    /// Succeeded with no holder left: kept until the next `get`
    Unclaimed(Arc<CacheEntry<T>>),
}

impl<T> Slot<T> {
    fn upgrade(&self) -> Option<Arc<CacheEntry<T>>> {
        match self {
            Slot::Live(weak) => weak.upgrade(),
            Slot::Pinned(entry) | Slot::Unclaimed(entry) => Some(Arc::clone(entry)),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Slot::Live(weak) => weak.strong_count() > 0,
            Slot::Pinned(_) | Slot::Unclaimed(_) => true,
        }
    }
}

type EntryMap<T> = Arc<Mutex<HashMap<String, Slot<T>>>>;

/// Generic asynchronous resource cache
///
/// Generic over the payload type, the loader producing it and the spawner
/// that runs the loader.
pub struct ResourceCache<T, L, S>
where
    L: ResourceLoader<T>,
    S: AsyncSpawner,
{
    entries: EntryMap<T>,
    loader: Arc<L>,
    spawner: S,
    metrics: CacheMetricsHandle,
}

impl<T, L, S> ResourceCache<T, L, S>
where
    T: Send + Sync + 'static,
    L: ResourceLoader<T>,
    S: AsyncSpawner,
{
    /// Creates a new cache around a loader and a spawner
    pub fn new(loader: L, spawner: S) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            loader: Arc::new(loader),
            spawner,
            metrics: CacheMetricsHandle::new(),
        }
    }

    /// Get the handle for `key`, starting a background load on a miss
    ///
    /// Never blocks on the loader. `transient` records what this consumer has
    /// observed; see [`TransientState::just_resolved`].
    pub fn get(&self, key: &str, transient: &mut TransientState) -> ResourceHandle<T> {
        let handle = self.lookup_or_load(key);
        handle.poll(transient);
        handle
    }

    /// Whether a live entry exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|slot| slot.is_alive())
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|slot| slot.is_alive())
            .count()
    }

    /// Whether the cache holds no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a reference to the metrics handle
    pub fn metrics(&self) -> &CacheMetricsHandle {
        &self.metrics
    }

    /// Get a reference to the loader
    pub fn loader(&self) -> &L {
        &self.loader
    }

    fn lookup_or_load(&self, key: &str) -> ResourceHandle<T> {
        let entry = {
            let mut entries = self.entries.lock();
            if let Some(slot) = entries.get_mut(key) {
                if let Some(entry) = slot.upgrade() {
                    if matches!(slot, Slot::Unclaimed(_)) {
                        *slot = Slot::Live(Arc::downgrade(&entry));
                    }
                    self.metrics.record_cache_hit();
                    return ResourceHandle { entry };
                }
            }

            self.metrics.record_cache_miss();
            prune_dead(&mut entries);

            let entry = Arc::new(CacheEntry {
                key: key.to_owned(),
                outcome: OnceLock::new(),
            });
            entries.insert(key.to_owned(), Slot::Live(Arc::downgrade(&entry)));
            entry
        };

        self.start_load(Arc::clone(&entry));
        ResourceHandle { entry }
    }

    fn start_load(&self, entry: Arc<CacheEntry<T>>) {
        let loader = Arc::clone(&self.loader);
        let entries = Arc::clone(&self.entries);
        let metrics = self.metrics.clone();

        log::debug!("Loading {}", entry.key);
        metrics.record_load_started();

        let _ = self.spawner.spawn(async move {
            let start_time = Instant::now();
            let outcome = loader.load(&entry.key).await;
            metrics.record_load_time(entry.key.clone(), start_time.elapsed());

            match &outcome {
                Ok(_) => metrics.record_load_succeeded(),
                Err(failure) => {
                    log::warn!("{} failed to load: {}", entry.key, failure);
                    metrics.record_load_failed();
                }
            }

            let failed = outcome.is_err();
            if entry.outcome.set(outcome).is_err() {
                log::error!("{} was resolved twice", entry.key);
                return;
            }

            let mut entries = entries.lock();
            // Only hold on if nobody replaced the slot in the meantime
            let current = entries
                .get(&entry.key)
                .and_then(Slot::upgrade)
                .is_some_and(|live| Arc::ptr_eq(&live, &entry));
            if !current {
                return;
            }
            if failed {
                entries.insert(entry.key.clone(), Slot::Pinned(Arc::clone(&entry)));
            } else if Arc::strong_count(&entry) == 1 {
                // Handles are only created under the map lock, so nobody can
                // claim the entry between the count and the insert
                log::debug!("{} finished with no consumer, holding it", entry.key);
                entries.insert(entry.key.clone(), Slot::Unclaimed(Arc::clone(&entry)));
            }
        });
    }
}

fn prune_dead<T>(entries: &mut HashMap<String, Slot<T>>) {
    // Would have to allocate after the next insert
    if entries.len() == entries.capacity() {
        entries.retain(|_, slot| slot.is_alive());
    }
}

impl<T, L, S> fmt::Debug for ResourceCache<T, L, S>
where
    L: ResourceLoader<T>,
    S: AsyncSpawner,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.entries.lock().len())
            .field("spawner", &self.spawner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockSpawner;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingLoader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResourceLoader<String> for CountingLoader {
        async fn load(&self, key: &str) -> Result<String, LoadFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if key.starts_with("missing") {
                Err(LoadFailure::new(format!("{key} not found")))
            } else {
                Ok(key.to_uppercase())
            }
        }
    }

    #[test]
    fn test_cache_creation() {
        let cache = ResourceCache::new(CountingLoader::default(), MockSpawner::blocking());
        assert!(cache.is_empty());
        assert_eq!(cache.metrics().cache_hit_rate(), 0.0);
    }

    #[test]
    fn test_pending_until_task_runs() {
        let spawner = MockSpawner::deferred();
        let cache = ResourceCache::new(CountingLoader::default(), spawner.clone());
        let mut transient = TransientState::new();

        let handle = cache.get("a.obj", &mut transient);
        assert_eq!(handle.state(), LoadState::Pending);
        assert!(handle.payload().is_none());
        assert!(transient.is_waiting());
        assert!(!transient.just_resolved());

        spawner.run_pending();
        assert_eq!(handle.poll(&mut transient), LoadState::Succeeded);
        assert!(transient.just_resolved());
        assert_eq!(handle.payload().map(String::as_str), Some("A.OBJ"));

        handle.poll(&mut transient);
        assert!(!transient.just_resolved());
        assert!(transient.is_resolved());
    }

    #[test]
    fn test_transition_seen_once_per_consumer() {
        let spawner = MockSpawner::deferred();
        let cache = ResourceCache::new(CountingLoader::default(), spawner.clone());
        let mut first = TransientState::new();
        let mut second = TransientState::new();

        let handle = cache.get("shared.png", &mut first);
        spawner.run_pending();

        let _ = cache.get("shared.png", &mut second);
        assert!(second.just_resolved());
        handle.poll(&mut first);
        assert!(first.just_resolved());

        let _ = cache.get("shared.png", &mut second);
        handle.poll(&mut first);
        assert!(!second.just_resolved());
        assert!(!first.just_resolved());
    }

    #[test]
    fn test_failed_entry_is_pinned_and_not_retried() {
        let cache = ResourceCache::new(CountingLoader::default(), MockSpawner::blocking());
        let mut transient = TransientState::new();

        let handle = cache.get("missing.obj", &mut transient);
        assert_eq!(handle.state(), LoadState::Failed);
        assert_eq!(
            handle.failure().map(LoadFailure::reason),
            Some("missing.obj not found")
        );
        drop(handle);

        let again = cache.get("missing.obj", &mut TransientState::new());
        assert_eq!(again.state(), LoadState::Failed);
        assert_eq!(cache.loader().calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.metrics().loads_failed(), 1);
    }

    #[test]
    fn test_entry_released_with_last_handle() {
        let cache = ResourceCache::new(CountingLoader::default(), MockSpawner::blocking());

        let first = cache.get("b.obj", &mut TransientState::new());
        let second = cache.get("b.obj", &mut TransientState::new());
        assert!(ResourceHandle::ptr_eq(&first, &second));
        assert_eq!(first.holder_count(), 2);
        assert!(cache.contains("b.obj"));

        drop(first);
        assert!(cache.contains("b.obj"));
        drop(second);
        assert!(!cache.contains("b.obj"));

        // A new consumer after teardown loads again
        let _third = cache.get("b.obj", &mut TransientState::new());
        assert_eq!(cache.loader().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_in_flight_load_keeps_entry_alive() {
        let spawner = MockSpawner::deferred();
        let cache = ResourceCache::new(CountingLoader::default(), spawner.clone());

        let handle = cache.get("c.obj", &mut TransientState::new());
        drop(handle);
        assert!(cache.contains("c.obj"));

        spawner.run_pending();
        assert!(cache.contains("c.obj"));
        assert_eq!(cache.metrics().loads_succeeded(), 1);

        // The next consumer gets the finished payload without a reload
        let mut state = TransientState::new();
        let handle = cache.get("c.obj", &mut state);
        assert_eq!(handle.poll(&mut state), LoadState::Succeeded);
        assert_eq!(cache.loader().calls.load(Ordering::SeqCst), 1);
        assert_eq!(spawner.pending(), 0);

        // Claimed again, so it goes with its last holder
        drop(handle);
        assert!(!cache.contains("c.obj"));
    }
}
