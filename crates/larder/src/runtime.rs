// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Runtime abstraction for background tasks.
//!
//! The cache hands its background work (refresh-ahead reloads and the
//! periodic capacity pass) to a [`Scheduler`] instead of spawning threads
//! itself. Production callers use [`ThreadScheduler`]; tests inject the
//! deterministic queue in [`testing`](crate::testing) and drain it by hand.

use std::thread;
use std::time::Duration;

/// A unit of background work.
pub type Task = Box<dyn FnOnce() + Send>;

/// A repeating unit of background work. Returning `false` cancels the
/// schedule.
pub type RepeatingTask = Box<dyn Fn() -> bool + Send>;

/// Runs closures in the background without blocking the caller.
pub trait Scheduler: Send + Sync {
    /// Runs `task` once, sometime soon, off the caller's thread.
    fn spawn(&self, task: Task);

    /// Runs `task` every `period` until it returns `false`.
    fn spawn_repeating(&self, period: Duration, task: RepeatingTask);
}

/// A [`Scheduler`] backed by plain OS threads.
///
/// One-shot tasks each get a short-lived thread; repeating tasks get a
/// thread that sleeps between invocations and exits once the task cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadScheduler;

impl ThreadScheduler {
    /// Creates a thread-backed scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for ThreadScheduler {
    fn spawn(&self, task: Task) {
        thread::spawn(task);
    }

    fn spawn_repeating(&self, period: Duration, task: RepeatingTask) {
        thread::spawn(move || {
            loop {
                thread::sleep(period);
                if !task() {
                    break;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn spawn_runs_task_off_thread() {
        let (tx, rx) = mpsc::channel();
        let scheduler = ThreadScheduler::new();

        scheduler.spawn(Box::new(move || {
            tx.send(42).expect("receiver should be alive");
        }));

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).expect("task should run"),
            42
        );
    }

    #[test]
    fn spawn_repeating_stops_after_cancel() {
        let (tx, rx) = mpsc::channel();
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = ThreadScheduler::new();

        let counter = Arc::clone(&runs);
        scheduler.spawn_repeating(
            Duration::from_millis(1),
            Box::new(move || {
                let run = counter.fetch_add(1, Ordering::SeqCst);
                if run >= 2 {
                    tx.send(()).expect("receiver should be alive");
                    return false;
                }
                true
            }),
        );

        rx.recv_timeout(Duration::from_secs(5)).expect("task should cancel itself");
        let settled = runs.load(Ordering::SeqCst);
        assert!(settled >= 3);

        // The loop has exited; no further runs accumulate.
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(runs.load(Ordering::SeqCst), settled);
    }

    #[test]
    fn spawn_does_not_block_caller() {
        let gate = Arc::new(AtomicBool::new(false));
        let scheduler = ThreadScheduler::new();

        let opened = Arc::clone(&gate);
        scheduler.spawn(Box::new(move || {
            while !opened.load(Ordering::SeqCst) {
                std::hint::spin_loop();
            }
        }));

        // Reaching this line proves spawn returned while the task still waits.
        gate.store(true, Ordering::SeqCst);
    }
}
