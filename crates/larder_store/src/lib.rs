// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! The entry store backing the `larder` cache.
//!
//! This crate provides the single shared data structure of the cache: a set
//! of keyed entries reachable two ways at once, through a hash index for
//! O(1) lookup and through a recency-ordered list for LRU eviction. The two
//! views always agree: a key is either in both or in neither.
//!
//! The store is a plain, lock-free-of-its-own data structure. It never reads
//! the clock and never synchronizes; callers pass in the current instant and
//! wrap the store in whatever locking discipline they need. This keeps every
//! operation deterministic and directly testable.
//!
//! # Examples
//!
//! ```
//! use larder_store::EntryStore;
//! use std::time::Instant;
//!
//! let mut store = EntryStore::new(16);
//! let now = Instant::now();
//!
//! store.insert_or_update("user:1".to_string(), "alice".to_string(), now);
//!
//! let entry = store.lookup(&"user:1".to_string()).unwrap();
//! assert_eq!(entry.value(), "alice");
//! ```

mod entry;
mod store;

pub use entry::CacheEntry;
pub use store::EntryStore;
