// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The periodic capacity pass.
//!
//! When a cache is built with auto-resize, a repeating task recomputes the
//! capacity target through the configured policy and applies it to the
//! store, evicting from the least recently used end if the store shrank.
//! The pass runs entirely on the injected scheduler and never blocks
//! callers or the load section.

use std::hash::Hash;
use std::sync::Arc;

use crate::cache::CacheInner;

impl<K, V> CacheInner<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Registers the repeating capacity pass for this cache.
    ///
    /// The task holds only a weak reference; once the last cache handle is
    /// dropped the schedule cancels itself on its next firing.
    pub(crate) fn start_governor(inner: &Arc<Self>) {
        if !inner.config.auto_resize {
            return;
        }

        let weak = Arc::downgrade(inner);
        inner.scheduler.spawn_repeating(
            inner.config.resize_period,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return false;
                };
                inner.apply_capacity_target();
                true
            }),
        );
    }

    fn apply_capacity_target(&self) {
        let target = (self.capacity_policy)();
        let target = match self.config.max_capacity {
            Some(max) => target.min(usize::try_from(max).unwrap_or(usize::MAX)),
            None => target,
        };

        let mut store = self.store.write();
        if target != store.capacity() {
            tracing::debug!(capacity = target, "applying capacity target");
            store.set_capacity(target);
        }
    }
}
