// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles for the cache's background-task plumbing.
//!
//! [`ManualScheduler`] queues work instead of running it, so tests decide
//! exactly when, and whether, background refreshes and capacity passes
//! happen. Pair it with [`ClockControl`](crate::ClockControl) to step
//! through time-dependent scenarios deterministically.

use std::fmt::Debug;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::runtime::{RepeatingTask, Scheduler, Task};

/// A [`Scheduler`] that queues tasks for explicit draining.
///
/// One-shot tasks accumulate until [`run_pending`](Self::run_pending) is
/// called; repeating tasks fire once per [`tick`](Self::tick) and are
/// dropped when they cancel. Clones share the same queues.
///
/// # Examples
///
/// ```
/// use larder::testing::ManualScheduler;
/// use larder::Scheduler;
///
/// let scheduler = ManualScheduler::new();
/// scheduler.spawn(Box::new(|| println!("deferred")));
///
/// assert_eq!(scheduler.pending_count(), 1);
/// assert_eq!(scheduler.run_pending(), 1);
/// assert_eq!(scheduler.pending_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    pending: Vec<Task>,
    repeating: Vec<(Duration, RepeatingTask)>,
}

impl ManualScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every queued one-shot task, in spawn order, and returns how
    /// many ran. Tasks spawned while draining are queued for the next call.
    pub fn run_pending(&self) -> usize {
        // Drain under the lock, run outside it: a task may spawn more work.
        let tasks: Vec<Task> = mem::take(&mut self.inner.lock().pending);
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }

    /// Fires every registered repeating task once, dropping those that
    /// cancel themselves.
    pub fn tick(&self) {
        let repeating = mem::take(&mut self.inner.lock().repeating);
        let mut keep = Vec::new();
        for (period, task) in repeating {
            if task() {
                keep.push((period, task));
            }
        }
        // Registrations made during the tick land behind the survivors.
        let mut inner = self.inner.lock();
        keep.append(&mut inner.repeating);
        inner.repeating = keep;
    }

    /// Returns how many one-shot tasks are waiting.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Returns how many repeating tasks are registered.
    #[must_use]
    pub fn repeating_count(&self) -> usize {
        self.inner.lock().repeating.len()
    }
}

impl Scheduler for ManualScheduler {
    fn spawn(&self, task: Task) {
        self.inner.lock().pending.push(task);
    }

    fn spawn_repeating(&self, period: Duration, task: RepeatingTask) {
        self.inner.lock().repeating.push((period, task));
    }
}

impl Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ManualScheduler")
            .field("pending", &inner.pending.len())
            .field("repeating", &inner.repeating.len())
            .finish_non_exhaustive()
    }
}
