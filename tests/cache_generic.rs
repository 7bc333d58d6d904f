//! Integration tests for the generic ResourceCache

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use csl_multiplayer::{
    LoadFailure, LoadState, MockSpawner, ResourceCache, ResourceLoader, TransientState,
};

/// Upper-cases the key, failing on keys starting with "bad"
#[derive(Default)]
struct UpperLoader {
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ResourceLoader<String> for UpperLoader {
    async fn load(&self, key: &str) -> Result<String, LoadFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if key.starts_with("bad") {
            return Err(LoadFailure::new(format!("{} is corrupt", key)));
        }
        Ok(key.to_uppercase())
    }
}

#[test]
fn test_concurrent_requests_share_one_load() {
    let spawner = MockSpawner::deferred();
    let loader = UpperLoader::default();
    let calls = Arc::clone(&loader.calls);
    let cache = ResourceCache::new(loader, spawner.clone());

    let mut first = TransientState::new();
    let mut second = TransientState::new();
    let a = cache.get("wing.obj", &mut first);
    let b = cache.get("wing.obj", &mut second);

    assert!(csl_multiplayer::ResourceHandle::ptr_eq(&a, &b));
    assert_eq!(a.state(), LoadState::Pending);
    assert!(first.is_waiting());
    assert_eq!(spawner.pending(), 1);

    spawner.run_pending();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.poll(&mut first), LoadState::Succeeded);
    assert_eq!(b.poll(&mut second), LoadState::Succeeded);
    assert!(first.just_resolved());
    assert!(second.just_resolved());
    assert_eq!(b.payload().map(String::as_str), Some("WING.OBJ"));

    let metrics = cache.metrics();
    assert_eq!(metrics.cache_misses(), 1);
    assert_eq!(metrics.cache_hits(), 1);
    assert_eq!(metrics.loads_succeeded(), 1);
}

#[test]
fn test_failure_is_seen_by_every_consumer() {
    let spawner = MockSpawner::blocking();
    let loader = UpperLoader::default();
    let calls = Arc::clone(&loader.calls);
    let cache = ResourceCache::new(loader, spawner);

    let mut state = TransientState::new();
    let handle = cache.get("bad.png", &mut state);
    assert_eq!(handle.state(), LoadState::Failed);
    assert_eq!(
        handle.failure().map(LoadFailure::reason),
        Some("bad.png is corrupt")
    );
    drop(handle);

    // Still cached after every holder is gone
    let mut other = TransientState::new();
    let again = cache.get("bad.png", &mut other);
    assert_eq!(again.state(), LoadState::Failed);
    assert!(other.just_resolved());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.metrics().loads_failed(), 1);
}

#[test]
fn test_released_entry_is_loaded_again() {
    let loader = UpperLoader::default();
    let calls = Arc::clone(&loader.calls);
    let cache = ResourceCache::new(loader, MockSpawner::blocking());

    let mut state = TransientState::new();
    drop(cache.get("tail.obj", &mut state));
    assert!(!cache.contains("tail.obj"));

    state.reset();
    let handle = cache.get("tail.obj", &mut state);
    assert_eq!(handle.state(), LoadState::Succeeded);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_dropped_consumer_keeps_in_flight_load() {
    let spawner = MockSpawner::deferred();
    let loader = UpperLoader::default();
    let calls = Arc::clone(&loader.calls);
    let cache = ResourceCache::new(loader, spawner.clone());

    let mut state = TransientState::new();
    drop(cache.get("gear.obj", &mut state));
    assert!(cache.contains("gear.obj"));

    spawner.run_pending();
    assert!(cache.contains("gear.obj"));

    let mut late = TransientState::new();
    let handle = cache.get("gear.obj", &mut late);
    assert_eq!(spawner.run_pending(), 0);
    assert_eq!(handle.poll(&mut late), LoadState::Succeeded);
    assert_eq!(handle.payload().map(String::as_str), Some("GEAR.OBJ"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.metrics().cache_hits(), 1);
}

#[cfg(feature = "runtime-tokio")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tokio_threads_share_one_entry() {
    let loader = UpperLoader::default();
    let calls = Arc::clone(&loader.calls);
    let cache = Arc::new(ResourceCache::new(
        loader,
        csl_multiplayer::TokioSpawner::new(),
    ));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        tasks.push(tokio::spawn(async move {
            let mut state = TransientState::new();
            let handle = cache.get("fuselage.obj", &mut state);
            while handle.poll(&mut state) == LoadState::Pending {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            }
            handle
        }));
    }

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for handle in &handles {
        assert_eq!(handle.payload().map(String::as_str), Some("FUSELAGE.OBJ"));
        assert!(csl_multiplayer::ResourceHandle::ptr_eq(handle, &handles[0]));
    }
}
