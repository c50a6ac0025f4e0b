// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! An abstraction for reading the current time.
//!
//! Timestamp-driven behavior is hard to exercise against the wall clock, so
//! the cache never calls [`Instant::now`] directly. It reads time from a
//! [`Clock`], which in production forwards to the system clock and in tests
//! can be a manually advanced source created through [`ClockControl`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Provides the current instant to the cache.
///
/// Cloning a clock is inexpensive (an `Arc` clone) and every clone shares
/// the same underlying state: advancing a controlled clock through its
/// [`ClockControl`] is visible to every clone.
///
/// # Examples
///
/// ```
/// use larder::Clock;
///
/// let clock = Clock::new();
/// let earlier = clock.instant();
/// assert!(clock.instant() >= earlier);
/// ```
#[derive(Debug, Clone)]
pub struct Clock(Arc<ClockState>);

#[derive(Debug)]
enum ClockState {
    System,
    Manual(Mutex<Instant>),
}

impl Clock {
    /// Creates a clock that reads the system's monotonic time.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(ClockState::System))
    }

    /// Creates a clock frozen at the moment of creation.
    ///
    /// Convenience for `ClockControl::new().to_clock()` when the test never
    /// needs to advance time.
    ///
    /// # Examples
    ///
    /// ```
    /// use larder::Clock;
    ///
    /// let clock = Clock::new_frozen();
    /// assert_eq!(clock.instant(), clock.instant());
    /// ```
    #[must_use]
    pub fn new_frozen() -> Self {
        ClockControl::new().to_clock()
    }

    /// Returns the current instant according to this clock.
    #[must_use]
    pub fn instant(&self) -> Instant {
        match &*self.0 {
            ClockState::System => Instant::now(),
            ClockState::Manual(now) => *now.lock(),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Controls the passage of time for clocks it creates.
///
/// Time observed through the derived clocks stands still until
/// [`advance`](Self::advance) is called, which makes timestamp-dependent
/// tests instantaneous and deterministic.
///
/// # Examples
///
/// ```
/// use larder::ClockControl;
/// use std::time::Duration;
///
/// let control = ClockControl::new();
/// let clock = control.to_clock();
///
/// let before = clock.instant();
/// control.advance(Duration::from_secs(60));
/// assert_eq!(clock.instant() - before, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct ClockControl(Arc<ClockState>);

impl ClockControl {
    /// Creates a control whose clocks start at the current instant and only
    /// move when told to.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(ClockState::Manual(Mutex::new(Instant::now()))))
    }

    /// Returns a clock driven by this control.
    #[must_use]
    pub fn to_clock(&self) -> Clock {
        Clock(Arc::clone(&self.0))
    }

    /// Moves the controlled time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        if let ClockState::Manual(now) = &*self.0 {
            let mut now = now.lock();
            *now += delta;
        }
    }
}

impl Default for ClockControl {
    fn default() -> Self {
        Self::new()
    }
}
