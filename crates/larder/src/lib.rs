// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A loading cache with LRU bounds, time-based expiry, and refresh-ahead
//! reloads.
//!
//! This crate fronts an expensive, synchronous value-producing function with
//! an in-process cache:
//!
//! - Bounded size with least-recently-used eviction
//! - Expiry after access and after write, applied lazily on lookup
//! - Refresh-ahead: entries past their refresh age keep being served while a
//!   reload is arranged, in the background or on one caller's thread
//! - One loader invocation at a time across all keys, so a thundering herd
//!   of misses cannot stampede the backend
//! - An optional periodic capacity pass that re-targets the cache size
//!
//! Time and background work are read through injected [`Clock`] and
//! [`Scheduler`] abstractions, so every time-dependent behavior can be
//! driven deterministically in tests (see [`ClockControl`] and
//! [`testing::ManualScheduler`]).
//!
//! # Examples
//!
//! ## Basic loading cache
//!
//! ```
//! use larder::LoadingCache;
//! use std::convert::Infallible;
//! use std::time::Duration;
//!
//! let cache = LoadingCache::<String, String>::builder()
//!     .initial_capacity(128)
//!     .expire_after_write(Duration::from_secs(600))
//!     .build(|key: &String| Ok::<_, Infallible>(key.to_uppercase()));
//!
//! // Miss: the loader runs. Hit: the cached value is returned.
//! assert_eq!(cache.get(&"config".to_string())?, "CONFIG");
//! assert_eq!(cache.get_if_present(&"config".to_string()), Some("CONFIG".to_string()));
//! # Ok::<(), larder::Error>(())
//! ```
//!
//! ## Refresh-ahead
//!
//! ```
//! use larder::testing::ManualScheduler;
//! use larder::{ClockControl, LoadingCache};
//! use std::convert::Infallible;
//! use std::time::Duration;
//!
//! let control = ClockControl::new();
//! let scheduler = ManualScheduler::new();
//! let cache = LoadingCache::<String, u64>::builder()
//!     .refresh_after_write(Duration::from_secs(30))
//!     .auto_refresh(true)
//!     .clock(control.to_clock())
//!     .scheduler(scheduler.clone())
//!     .build(|_key: &String| Ok::<_, Infallible>(2));
//!
//! cache.insert(&"metric".to_string(), 1);
//! control.advance(Duration::from_secs(31));
//!
//! // Past the refresh age: the old value is served immediately and a
//! // reload is queued on the scheduler.
//! assert_eq!(cache.get(&"metric".to_string())?, 1);
//! assert_eq!(scheduler.run_pending(), 1);
//! assert_eq!(cache.get(&"metric".to_string())?, 2);
//! # Ok::<(), larder::Error>(())
//! ```

mod builder;
mod cache;
mod clock;
mod error;
mod freshness;
mod governor;
mod runtime;

pub mod testing;

pub use builder::CacheBuilder;
pub use cache::LoadingCache;
pub use clock::{Clock, ClockControl};
pub use error::{Error, Result};
pub use runtime::{RepeatingTask, Scheduler, Task, ThreadScheduler};
