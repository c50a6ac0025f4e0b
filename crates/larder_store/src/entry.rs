// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{ops::Deref, time::Instant};

/// A cached value together with its bookkeeping timestamps.
///
/// `CacheEntry` is the snapshot handed out by
/// [`EntryStore::lookup`](crate::EntryStore::lookup): the value plus the two
/// timestamps the freshness policy cares about. It is a copy; holding one
/// never pins the underlying store entry, so callers can keep it across
/// blocking sections without affecting the store.
///
/// # Examples
///
/// ```
/// use larder_store::CacheEntry;
/// use std::time::Instant;
///
/// let now = Instant::now();
/// let entry = CacheEntry::new(42, now);
/// assert_eq!(*entry.value(), 42);
/// assert_eq!(entry.last_access(), now);
/// assert_eq!(entry.last_write(), now);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
    value: V,
    last_access: Instant,
    last_write: Instant,
}

impl<V> CacheEntry<V> {
    /// Creates an entry whose access and write timestamps are both `now`.
    ///
    /// This matches the state of a freshly inserted entry.
    pub fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            last_access: now,
            last_write: now,
        }
    }

    pub(crate) fn with_timestamps(value: V, last_access: Instant, last_write: Instant) -> Self {
        Self {
            value,
            last_access,
            last_write,
        }
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the time the entry was last returned to a caller.
    #[must_use]
    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    /// Returns the time the entry's value was last stored or replaced.
    #[must_use]
    pub fn last_write(&self) -> Instant {
        self.last_write
    }
}

impl<V> Deref for CacheEntry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
