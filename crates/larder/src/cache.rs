// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The loading cache: lookup, load coordination, and refresh-ahead serving.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};

use larder_store::EntryStore;

use crate::builder::{CacheBuilder, CapacityPolicy, Config};
use crate::clock::Clock;
use crate::error::Result;
use crate::freshness::{Freshness, classify};
use crate::runtime::Scheduler;

/// The loader installed at build time.
pub(crate) type LoaderFn<K, V> = Box<dyn Fn(&K) -> Result<V> + Send + Sync>;

/// A cache that computes missing values through a loader.
///
/// Every read classifies the entry it finds as fresh, refreshable, or
/// expired, and either serves it, serves it while arranging a reload, or
/// drops it and reloads in place. Capacity is enforced by least-recently-used
/// eviction.
///
/// `LoadingCache` is a cheap handle: clones share the same entries, loader,
/// and configuration, and it can be used from many threads at once. Reads
/// proceed concurrently; structural changes (inserts, evictions, recency
/// updates) are serialized internally. At most one loader invocation runs at
/// any time across all keys.
///
/// # Examples
///
/// ```
/// use larder::LoadingCache;
/// use std::convert::Infallible;
///
/// let cache = LoadingCache::<String, usize>::builder()
///     .build(|key: &String| Ok::<_, Infallible>(key.len()));
///
/// assert!(cache.get_if_present(&"hello".to_string()).is_none());
/// assert_eq!(cache.get(&"hello".to_string())?, 5);
/// assert_eq!(cache.get_if_present(&"hello".to_string()), Some(5));
/// # Ok::<(), larder::Error>(())
/// ```
pub struct LoadingCache<K, V> {
    inner: Arc<CacheInner<K, V>>,
}

pub(crate) struct CacheInner<K, V> {
    pub(crate) config: Config,
    pub(crate) store: RwLock<EntryStore<K, V>>,
    loader: LoaderFn<K, V>,
    /// Serializes loader execution across all keys.
    load_gate: Mutex<()>,
    /// True while some caller is inside the load gate. Non-blocking paths
    /// read this instead of waiting on the gate.
    load_in_flight: AtomicBool,
    pub(crate) capacity_policy: CapacityPolicy,
    clock: Clock,
    pub(crate) scheduler: Arc<dyn Scheduler>,
}

/// What a classified lookup produced.
enum Probe<V> {
    Absent,
    Fresh(V),
    Stale(V),
}

/// Clears the in-flight flag when the load section is left, on success and
/// failure alike.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<K, V> LoadingCache<K, V> {
    /// Creates a builder for a loading cache.
    ///
    /// # Examples
    ///
    /// ```
    /// use larder::LoadingCache;
    /// use std::convert::Infallible;
    /// use std::time::Duration;
    ///
    /// let cache = LoadingCache::<String, usize>::builder()
    ///     .initial_capacity(256)
    ///     .expire_after_access(Duration::from_secs(120))
    ///     .build(|key: &String| Ok::<_, Infallible>(key.len()));
    /// ```
    #[must_use]
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }
}

impl<K, V> LoadingCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn from_parts(
        config: Config,
        loader: LoaderFn<K, V>,
        capacity_policy: CapacityPolicy,
        clock: Clock,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let store = RwLock::new(EntryStore::new(config.store_capacity()));
        let inner = Arc::new(CacheInner {
            config,
            store,
            loader,
            load_gate: Mutex::new(()),
            load_in_flight: AtomicBool::new(false),
            capacity_policy,
            clock,
            scheduler,
        });
        CacheInner::start_governor(&inner);
        Self { inner }
    }

    /// Returns the cached value for `key` only if it is within every
    /// configured bound.
    ///
    /// Never invokes the loader. A hit counts as a use for recency and
    /// access-expiry purposes; an entry found past an expiry bound is
    /// removed on the spot and reported as absent.
    #[must_use]
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        self.inner.get_if_present(key)
    }

    /// Returns the value for `key`, invoking the loader if the cache has
    /// nothing usable.
    ///
    /// - A fresh entry is returned directly.
    /// - A missing or expired entry blocks the caller while the loader runs
    ///   (one loader invocation at a time, across all keys).
    /// - A refreshable entry is returned as-is while a reload is arranged:
    ///   in the background when the cache was built with
    ///   [`auto_refresh`](crate::CacheBuilder::auto_refresh), otherwise on
    ///   the first caller to find no load already running.
    ///
    /// # Errors
    ///
    /// Returns an error when the loader fails. Nothing is cached for the
    /// key in that case; a previously cached stale value stays in place.
    pub fn get(&self, key: &K) -> Result<V> {
        match self.inner.probe(key) {
            Probe::Absent => self.inner.load_blocking(key),
            Probe::Fresh(value) => Ok(value),
            Probe::Stale(value) => self.serve_stale(key, value),
        }
    }

    /// Stores a value directly, bypassing the loader.
    ///
    /// The entry becomes the most recently used; if the insert pushes the
    /// cache over capacity, the least recently used entries are evicted.
    pub fn insert(&self, key: &K, value: V) {
        self.inner.insert(key, value);
    }

    /// Returns the usable values among `keys`.
    ///
    /// Applies [`get_if_present`](Self::get_if_present) per key; absent and
    /// expired keys are simply left out of the result.
    pub fn get_all_present<'a>(&self, keys: impl IntoIterator<Item = &'a K>) -> HashMap<K, V>
    where
        K: 'a,
    {
        keys.into_iter()
            .filter_map(|key| self.get_if_present(key).map(|value| (key.clone(), value)))
            .collect()
    }

    /// Removes the entry for `key`, if any. Idempotent.
    pub fn invalidate(&self, key: &K) {
        self.inner.store.write().remove(key);
    }

    /// Returns whether an entry exists for `key`, without consulting the
    /// freshness bounds or counting as a use.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.store.read().contains_key(key)
    }

    /// Returns the number of cached entries, including ones that would
    /// expire on their next access.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.store.read().len()
    }

    /// Returns whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.store.read().is_empty()
    }

    /// Returns the current capacity bound.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.store.read().capacity()
    }

    /// Returns a snapshot of the cached keys, most recently used first.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.store.read().keys()
    }

    fn serve_stale(&self, key: &K, stale: V) -> Result<V> {
        // Stale without a refresh bound has no background path; reload in
        // place.
        if self.inner.config.refresh_after_write.is_none() {
            return self.inner.load_blocking(key);
        }

        if self.inner.config.auto_refresh {
            if !self.inner.load_in_flight() {
                self.spawn_refresh(key);
            }
            self.inner.touch(key);
            return Ok(stale);
        }

        // Manual refresh: the first caller to find no load running reloads
        // on its own thread; everyone else keeps the stale value.
        if self.inner.load_in_flight() {
            self.inner.touch(key);
            return Ok(stale);
        }
        self.inner.load_blocking(key)
    }

    fn spawn_refresh(&self, key: &K) {
        let inner = Arc::clone(&self.inner);
        let key = key.clone();
        self.inner.scheduler.spawn(Box::new(move || {
            if inner.load_in_flight() {
                return;
            }
            if let Err(error) = inner.load_blocking(&key) {
                tracing::warn!(error = %error, "background refresh failed; keeping the previous value");
            }
        }));
    }

    #[cfg(test)]
    pub(crate) fn config_for_tests(&self) -> &Config {
        &self.inner.config
    }
}

impl<K, V> CacheInner<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn load_in_flight(&self) -> bool {
        self.load_in_flight.load(Ordering::Acquire)
    }

    /// Looks up and classifies the entry for `key` in one pass.
    ///
    /// Starts with shared access and upgrades only when the classification
    /// demands a structural change: a fresh hit is touched, an expired entry
    /// is removed. The upgrade is atomic with respect to other upgraders, so
    /// two hits on the same entry cannot corrupt the recency order.
    fn probe(&self, key: &K) -> Probe<V> {
        let now = self.clock.instant();
        let store = self.store.upgradable_read();
        let Some(entry) = store.lookup(key) else {
            return Probe::Absent;
        };

        match classify(entry.last_access(), entry.last_write(), &self.config, now) {
            Freshness::Expired => {
                let mut store = RwLockUpgradableReadGuard::upgrade(store);
                store.remove(key);
                Probe::Absent
            }
            Freshness::Fresh => {
                let mut store = RwLockUpgradableReadGuard::upgrade(store);
                store.touch(key, now);
                Probe::Fresh(entry.into_value())
            }
            Freshness::Stale => Probe::Stale(entry.into_value()),
        }
    }

    fn get_if_present(&self, key: &K) -> Option<V> {
        match self.probe(key) {
            Probe::Fresh(value) => Some(value),
            Probe::Absent | Probe::Stale(_) => None,
        }
    }

    /// Runs the loader for `key` inside the process-wide load section.
    fn load_blocking(&self, key: &K) -> Result<V> {
        let _gate = self.load_gate.lock();
        let _flag = InFlightGuard::set(&self.load_in_flight);

        // A concurrent load or write may have satisfied this key while we
        // waited on the gate.
        if let Some(value) = self.get_if_present(key) {
            return Ok(value);
        }

        let value = (self.loader)(key)?;
        self.insert(key, value.clone());
        Ok(value)
    }

    fn insert(&self, key: &K, value: V) {
        let now = self.clock.instant();
        self.store.write().insert_or_update(key.clone(), value, now);
    }

    /// Counts a use of `key`: recency front, access stamp. No-op when the
    /// entry is gone.
    fn touch(&self, key: &K) {
        let now = self.clock.instant();
        self.store.write().touch(key, now);
    }
}

impl<K, V> Clone for LoadingCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Debug for LoadingCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::AtomicUsize;

    use crate::clock::ClockControl;
    use crate::testing::ManualScheduler;

    use super::*;

    #[test]
    fn in_flight_guard_clears_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = InFlightGuard::set(&flag);
            assert!(flag.load(Ordering::Acquire));
        }
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn failed_load_leaves_cache_usable() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let cache = LoadingCache::<String, i32>::builder().build(move |_key: &String| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(std::io::Error::other("backend down"))
            } else {
                Ok(7)
            }
        });

        cache.get(&"a".to_string()).expect_err("first load should fail");
        assert!(cache.is_empty());

        // The failure released the load section; the retry succeeds.
        assert_eq!(cache.get(&"a".to_string()).expect("retry should succeed"), 7);
    }

    #[test]
    fn expired_entry_is_removed_on_classification() {
        let control = ClockControl::new();
        let cache = LoadingCache::<String, i32>::builder()
            .expire_after_write(std::time::Duration::from_secs(10))
            .clock(control.to_clock())
            .scheduler(ManualScheduler::new())
            .build(|_key: &String| Ok::<_, Infallible>(1));

        cache.insert(&"a".to_string(), 1);
        control.advance(std::time::Duration::from_secs(11));

        assert!(cache.get_if_present(&"a".to_string()).is_none());
        // Lazy expiry removed the entry outright.
        assert!(!cache.contains_key(&"a".to_string()));
    }

    #[test]
    fn assert_auto_traits() {
        static_assertions::assert_impl_all!(LoadingCache<String, i32>: Send, Sync, Clone, Debug);
    }
}
