// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache builder and its resolved configuration.
//!
//! The builder collects user settings, resolves defaults, and is consumed by
//! [`build`](CacheBuilder::build); once a cache exists its configuration is
//! immutable.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::LoadingCache;
use crate::clock::Clock;
use crate::error::Error;
use crate::runtime::{Scheduler, ThreadScheduler};

/// Store capacity used when none is configured.
pub(crate) const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// How often the capacity pass runs when none is configured.
pub(crate) const DEFAULT_RESIZE_PERIOD: Duration = Duration::from_secs(60);

/// Capacity target applied by the default resize policy.
///
/// Stands in for a measurement of available memory until a caller supplies
/// a real policy via [`CacheBuilder::capacity_policy`].
pub(crate) const DEFAULT_TARGET_CAPACITY: usize = 100_000;

/// Computes the capacity target for the periodic resize pass.
pub(crate) type CapacityPolicy = Box<dyn Fn() -> usize + Send + Sync>;

/// The settings a cache runs with, resolved from the builder.
///
/// Time bounds use `None` for "disabled"; a zero duration passed to the
/// builder resolves to `None` as well.
#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub(crate) initial_capacity: usize,
    pub(crate) max_capacity: Option<u64>,
    pub(crate) expire_after_access: Option<Duration>,
    pub(crate) expire_after_write: Option<Duration>,
    pub(crate) refresh_after_write: Option<Duration>,
    pub(crate) auto_resize: bool,
    pub(crate) auto_refresh: bool,
    pub(crate) resize_period: Duration,
}

impl Config {
    /// The capacity the entry store starts out with.
    pub(crate) fn store_capacity(&self) -> usize {
        match self.max_capacity {
            Some(max) => self.initial_capacity.min(usize::try_from(max).unwrap_or(usize::MAX)),
            None => self.initial_capacity,
        }
    }
}

/// Builder for a [`LoadingCache`].
///
/// Created by [`LoadingCache::builder`]. All settings are optional; an
/// unconfigured builder produces a cache of capacity 16 whose entries never
/// expire and never refresh.
///
/// # Examples
///
/// ```
/// use larder::LoadingCache;
/// use std::convert::Infallible;
/// use std::time::Duration;
///
/// let cache = LoadingCache::<String, usize>::builder()
///     .initial_capacity(64)
///     .expire_after_write(Duration::from_secs(300))
///     .build(|key: &String| Ok::<_, Infallible>(key.len()));
///
/// let value = cache.get(&"hello".to_string())?;
/// assert_eq!(value, 5);
/// # Ok::<(), larder::Error>(())
/// ```
pub struct CacheBuilder<K, V> {
    initial_capacity: usize,
    max_capacity: Option<u64>,
    expire_after_access: Option<Duration>,
    expire_after_write: Option<Duration>,
    refresh_after_write: Option<Duration>,
    auto_resize: bool,
    auto_refresh: bool,
    resize_period: Duration,
    capacity_policy: Option<CapacityPolicy>,
    clock: Clock,
    scheduler: Arc<dyn Scheduler>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> CacheBuilder<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: None,
            expire_after_access: None,
            expire_after_write: None,
            refresh_after_write: None,
            auto_resize: false,
            auto_refresh: false,
            resize_period: DEFAULT_RESIZE_PERIOD,
            capacity_policy: None,
            clock: Clock::new(),
            scheduler: Arc::new(ThreadScheduler::new()),
            _phantom: PhantomData,
        }
    }

    /// Sets the capacity the cache starts out with. Defaults to 16.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets an upper bound on the number of cached entries.
    ///
    /// Unset means unbounded growth by the resize pass; the store still
    /// starts at the initial capacity.
    #[must_use]
    pub fn max_capacity(mut self, max: u64) -> Self {
        self.max_capacity = Some(max);
        self
    }

    /// Expires entries that go unread and unwritten for `bound`.
    ///
    /// A zero duration disables the bound (the default).
    #[must_use]
    pub fn expire_after_access(mut self, bound: Duration) -> Self {
        self.expire_after_access = Some(bound);
        self
    }

    /// Expires entries that go unwritten for `bound`.
    ///
    /// A zero duration disables the bound (the default).
    #[must_use]
    pub fn expire_after_write(mut self, bound: Duration) -> Self {
        self.expire_after_write = Some(bound);
        self
    }

    /// Marks entries older than `bound` (by write time) as refreshable:
    /// they keep being served while a reload is arranged.
    ///
    /// Pick a value below the expiry bounds, otherwise entries expire
    /// before ever becoming refreshable. A zero duration disables
    /// refreshing (the default).
    #[must_use]
    pub fn refresh_after_write(mut self, bound: Duration) -> Self {
        self.refresh_after_write = Some(bound);
        self
    }

    /// Enables the periodic capacity pass. Defaults to off.
    #[must_use]
    pub fn auto_resize(mut self, enabled: bool) -> Self {
        self.auto_resize = enabled;
        self
    }

    /// Reloads refreshable entries in the background instead of on a
    /// caller's thread. Defaults to off.
    #[must_use]
    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// Sets how often the capacity pass runs. Defaults to one minute.
    #[must_use]
    pub fn resize_period(mut self, period: Duration) -> Self {
        self.resize_period = period;
        self
    }

    /// Supplies the computation the capacity pass uses to pick a target
    /// capacity, e.g. from available memory.
    #[must_use]
    pub fn capacity_policy(mut self, policy: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        self.capacity_policy = Some(Box::new(policy));
        self
    }

    /// Sets the clock the cache reads timestamps from.
    ///
    /// Defaults to the system clock; tests inject a controlled clock.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the scheduler that runs background refreshes and the capacity
    /// pass.
    ///
    /// Defaults to [`ThreadScheduler`]; tests inject
    /// [`ManualScheduler`](crate::testing::ManualScheduler).
    #[must_use]
    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Arc::new(scheduler);
        self
    }
}

impl<K, V> CacheBuilder<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Builds the cache around the given loader.
    ///
    /// The loader produces the value for a key whenever the cache has
    /// nothing usable. Loaders that cannot fail use
    /// [`std::convert::Infallible`] as their error type.
    ///
    /// # Examples
    ///
    /// ```
    /// use larder::LoadingCache;
    /// use std::convert::Infallible;
    ///
    /// let cache = LoadingCache::<u32, u32>::builder()
    ///     .build(|key: &u32| Ok::<_, Infallible>(key * 2));
    ///
    /// assert_eq!(cache.get(&21)?, 42);
    /// # Ok::<(), larder::Error>(())
    /// ```
    pub fn build<F, E>(self, loader: F) -> LoadingCache<K, V>
    where
        F: Fn(&K) -> std::result::Result<V, E> + Send + Sync + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let config = Config {
            initial_capacity: self.initial_capacity,
            max_capacity: self.max_capacity,
            expire_after_access: self.expire_after_access.filter(|bound| !bound.is_zero()),
            expire_after_write: self.expire_after_write.filter(|bound| !bound.is_zero()),
            refresh_after_write: self.refresh_after_write.filter(|bound| !bound.is_zero()),
            auto_resize: self.auto_resize,
            auto_refresh: self.auto_refresh,
            resize_period: self.resize_period,
        };
        let capacity_policy = self
            .capacity_policy
            .unwrap_or_else(|| Box::new(|| DEFAULT_TARGET_CAPACITY));
        let loader = move |key: &K| loader(key).map_err(Error::from_source);

        LoadingCache::from_parts(config, Box::new(loader), capacity_policy, self.clock, self.scheduler)
    }
}

impl<K, V> Default for CacheBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Debug for CacheBuilder<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("initial_capacity", &self.initial_capacity)
            .field("max_capacity", &self.max_capacity)
            .field("expire_after_access", &self.expire_after_access)
            .field("expire_after_write", &self.expire_after_write)
            .field("refresh_after_write", &self.refresh_after_write)
            .field("auto_resize", &self.auto_resize)
            .field("auto_refresh", &self.auto_refresh)
            .field("resize_period", &self.resize_period)
            .finish_non_exhaustive()
    }
}
