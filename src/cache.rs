//! In-flight request coalescing.
//!
//! A [`RequestCache`] guarantees at most one outstanding fetch per
//! [`FetchKey`].  The first caller becomes the *leader* and gets a
//! [`FlightGuard`]; anyone asking for the same key while the leader is still
//! running becomes a *follower* and receives the leader's result when it
//! lands.  The cache tracks flights, not data: once a flight completes the key
//! is free again and the next request goes to the network.
//!
//! Release is tied to the guard's lifetime.  Completing it broadcasts the
//! result; dropping it on any other path (an error before completion, the
//! fetching task being aborted, a panic) still frees the key and wakes
//! followers with [`FetchError::Abandoned`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{FetchError, FetchResult};

/// What kind of resource a key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    SearchPage,
    GameThread,
    Comments,
    BoxScore,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::SearchPage => "search",
            ResourceType::GameThread => "thread",
            ResourceType::Comments => "comments",
            ResourceType::BoxScore => "box-score",
        };
        f.write_str(name)
    }
}

/// Unit of de-duplication.  Compared structurally: two keys built from the
/// same resource, entity and parameters (in the same order) are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    resource: ResourceType,
    entity: String,
    params: Vec<(&'static str, String)>,
}

impl FetchKey {
    pub fn new(resource: ResourceType, entity: impl Into<String>) -> Self {
        Self {
            resource,
            entity: entity.into(),
            params: Vec::new(),
        }
    }

    /// Add a parameter that changes the result (sort kind, cursor, ...).
    pub fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    pub fn resource(&self) -> ResourceType {
        self.resource
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.entity)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{name}={value}")?;
        }
        Ok(())
    }
}

struct Flight<V> {
    id: u64,
    waiters: Vec<oneshot::Sender<FetchResult<V>>>,
}

struct Flights<V> {
    by_key: HashMap<FetchKey, Flight<V>>,
    next_id: u64,
}

/// Shared in-flight tracker.  Cloning yields another handle to the same set
/// of flights.
pub struct RequestCache<V> {
    inner: Arc<Mutex<Flights<V>>>,
}

impl<V> Clone for RequestCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for RequestCache<V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Flights {
                by_key: HashMap::new(),
                next_id: 0,
            })),
        }
    }
}

/// Outcome of [`RequestCache::acquire`].
pub enum Acquire<V: Clone> {
    /// Nobody is fetching this key: go to the network, then complete the guard.
    Leader(FlightGuard<V>),
    /// Someone already is: wait for their result.
    Follower(Waiter<V>),
}

impl<V: Clone> Acquire<V> {
    pub fn already_in_flight(&self) -> bool {
        matches!(self, Acquire::Follower(_))
    }
}

impl<V: Clone> RequestCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, key: FetchKey) -> Acquire<V> {
        let mut flights = self.inner.lock();

        if let Some(flight) = flights.by_key.get_mut(&key) {
            let (tx, rx) = oneshot::channel();
            flight.waiters.push(tx);
            debug!(key = %key, waiters = flight.waiters.len(), "joined in-flight request");
            return Acquire::Follower(Waiter { rx });
        }

        flights.next_id += 1;
        let id = flights.next_id;
        flights.by_key.insert(
            key.clone(),
            Flight {
                id,
                waiters: Vec::new(),
            },
        );

        Acquire::Leader(FlightGuard {
            cache: self.clone(),
            key,
            id,
            completed: false,
        })
    }

    /// Advisory: is a fetch for `key` running right now?
    pub fn is_in_flight(&self, key: &FetchKey) -> bool {
        self.inner.lock().by_key.contains_key(key)
    }

    pub fn in_flight(&self) -> usize {
        self.inner.lock().by_key.len()
    }

    /// Run `fetch` as the leader for `key`, or wait for the current leader.
    pub async fn fetch<F, Fut>(&self, key: FetchKey, fetch: F) -> FetchResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult<V>>,
    {
        match self.acquire(key) {
            Acquire::Leader(guard) => {
                let result = fetch().await;
                guard.complete(&result);
                result
            }
            Acquire::Follower(waiter) => waiter.wait().await,
        }
    }

    /// Forget every flight.  Followers of forgotten flights see
    /// [`FetchError::Abandoned`]; their leaders' later completions are ignored.
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut self.inner.lock().by_key);
        if !dropped.is_empty() {
            debug!(flights = dropped.len(), "request cache cleared");
        }
    }

    fn finish(&self, key: &FetchKey, id: u64, result: Option<&FetchResult<V>>) {
        let flight = {
            let mut flights = self.inner.lock();
            match flights.by_key.get(key) {
                Some(flight) if flight.id == id => flights.by_key.remove(key),
                _ => None,
            }
        };

        let (Some(flight), Some(result)) = (flight, result) else {
            return;
        };
        for waiter in flight.waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

/// Leadership of one flight.  See the module docs for release semantics.
pub struct FlightGuard<V: Clone> {
    cache: RequestCache<V>,
    key: FetchKey,
    id: u64,
    completed: bool,
}

impl<V: Clone> FlightGuard<V> {
    pub fn key(&self) -> &FetchKey {
        &self.key
    }

    /// Hand `result` to every follower and free the key.
    pub fn complete(mut self, result: &FetchResult<V>) {
        self.completed = true;
        self.cache.finish(&self.key, self.id, Some(result));
    }

    /// Free the key without a result.
    pub fn release(self) {}
}

impl<V: Clone> Drop for FlightGuard<V> {
    fn drop(&mut self) {
        if !self.completed {
            debug!(key = %self.key, "flight released without a result");
            self.cache.finish(&self.key, self.id, None);
        }
    }
}

/// A follower's handle on someone else's flight.
pub struct Waiter<V> {
    rx: oneshot::Receiver<FetchResult<V>>,
}

impl<V> Waiter<V> {
    pub async fn wait(self) -> FetchResult<V> {
        self.rx.await.unwrap_or(Err(FetchError::Abandoned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key(entity: &str) -> FetchKey {
        FetchKey::new(ResourceType::BoxScore, entity).with("league", "mlb")
    }

    #[test]
    fn keys_compare_structurally() {
        let a = FetchKey::new(ResourceType::Comments, "77").with("sort", "top");
        let b = FetchKey::new(ResourceType::Comments, "77").with("sort", "top");
        let c = FetchKey::new(ResourceType::Comments, "77").with("sort", "new");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, FetchKey::new(ResourceType::GameThread, "77").with("sort", "top"));
        assert_eq!(a.to_string(), "comments:77?sort=top");
    }

    #[test]
    fn second_acquire_reports_in_flight() {
        let cache: RequestCache<u32> = RequestCache::new();
        let first = cache.acquire(key("1"));
        let second = cache.acquire(key("1"));
        assert!(!first.already_in_flight());
        assert!(second.already_in_flight());
        assert!(!cache.acquire(key("2")).already_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fetches_share_one_call() {
        let cache: RequestCache<u32> = RequestCache::new();
        let calls = AtomicUsize::new(0);
        let slow = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(42)
        };

        let (a, b) = tokio::join!(cache.fetch(key("1"), slow), cache.fetch(key("1"), slow));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, Ok(42));
        assert_eq!(b, Ok(42));
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_reach_followers_too() {
        let cache: RequestCache<u32> = RequestCache::new();
        let failing = || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(FetchError::RateLimited)
        };

        let (a, b) = tokio::join!(cache.fetch(key("1"), failing), cache.fetch(key("1"), failing));
        assert_eq!(a, Err(FetchError::RateLimited));
        assert_eq!(b, Err(FetchError::RateLimited));
    }

    #[tokio::test]
    async fn completed_key_is_fetched_again() {
        let cache: RequestCache<u32> = RequestCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            cache
                .fetch(key("1"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_leader_releases_and_abandons_followers() {
        let cache: RequestCache<u32> = RequestCache::new();
        let Acquire::Leader(guard) = cache.acquire(key("1")) else {
            panic!("first acquire must lead");
        };
        let Acquire::Follower(waiter) = cache.acquire(key("1")) else {
            panic!("second acquire must follow");
        };

        drop(guard);

        assert!(!cache.is_in_flight(&key("1")));
        assert_eq!(waiter.wait().await, Err(FetchError::Abandoned));
    }

    #[tokio::test]
    async fn aborted_leader_task_releases_key() {
        let cache: RequestCache<u32> = RequestCache::new();
        let task_cache = cache.clone();
        let handle = tokio::spawn(async move {
            task_cache
                .fetch(key("1"), || std::future::pending::<FetchResult<u32>>())
                .await
        });
        tokio::task::yield_now().await;
        assert!(cache.is_in_flight(&key("1")));

        handle.abort();
        let _ = handle.await;
        assert!(!cache.is_in_flight(&key("1")));
    }

    #[tokio::test]
    async fn stale_guard_does_not_release_newer_flight_after_clear() {
        let cache: RequestCache<u32> = RequestCache::new();
        let Acquire::Leader(old) = cache.acquire(key("1")) else {
            panic!("first acquire must lead");
        };

        cache.clear();
        assert!(!cache.is_in_flight(&key("1")));

        let new = cache.acquire(key("1"));
        assert!(!new.already_in_flight());

        old.complete(&Ok(7));
        assert!(cache.is_in_flight(&key("1")), "newer flight survives");
        drop(new);
        assert_eq!(cache.in_flight(), 0);
    }
}
