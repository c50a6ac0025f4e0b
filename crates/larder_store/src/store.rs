// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The bounded entry store: a hash index and a recency order over one set of
//! entries.
//!
//! Entries live in an arena of slots and are threaded onto a doubly linked
//! list by slot index, most recently used first. The index maps each key to
//! its slot, so lookup is O(1) and eviction pops from the back of the list.
//! Both views always cover exactly the same keys; every mutation maintains
//! them together.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use ahash::RandomState;

use crate::CacheEntry;

/// An entry slot threaded onto the recency list by arena index.
struct Node<K, V> {
    key: K,
    value: V,
    last_access: Instant,
    last_write: Instant,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A capacity-bounded store of keyed entries in recency order.
///
/// The store owns its entries outright: [`lookup`](Self::lookup) returns
/// copies, never references into the arena. It performs no locking and no
/// time arithmetic of its own: callers supply the current instant and are
/// responsible for serializing structural mutation.
///
/// Exceeding the capacity evicts from the least recently used end until the
/// store is compliant again.
///
/// # Examples
///
/// ```
/// use larder_store::EntryStore;
/// use std::time::Instant;
///
/// let mut store = EntryStore::new(2);
/// let now = Instant::now();
///
/// store.insert_or_update("a".to_string(), 1, now);
/// store.insert_or_update("b".to_string(), 2, now);
/// store.insert_or_update("c".to_string(), 3, now);
///
/// // "a" was least recently used and fell off the back.
/// assert!(store.lookup(&"a".to_string()).is_none());
/// assert_eq!(store.len(), 2);
/// ```
pub struct EntryStore<K, V> {
    index: HashMap<K, usize, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
}

impl<K, V> EntryStore<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Creates a store that holds at most `capacity` entries.
    ///
    /// A capacity of zero is treated as one; the store always admits at
    /// least a single entry.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            capacity,
        }
    }

    /// Looks up an entry, returning a copy of its value and timestamps.
    ///
    /// This does not alter the recency order; callers that treat a lookup
    /// as a use follow up with [`touch`](Self::touch).
    #[must_use]
    pub fn lookup(&self, key: &K) -> Option<CacheEntry<V>> {
        let idx = *self.index.get(key)?;
        self.nodes[idx]
            .as_ref()
            .map(|node| CacheEntry::with_timestamps(node.value.clone(), node.last_access, node.last_write))
    }

    /// Moves an entry to the front of the recency order and stamps its
    /// access time. Does nothing when the key is absent.
    pub fn touch(&mut self, key: &K, now: Instant) {
        if let Some(&idx) = self.index.get(key) {
            self.move_to_front(idx);
            if let Some(node) = &mut self.nodes[idx] {
                node.last_access = now;
            }
        }
    }

    /// Inserts a new entry or replaces the value of an existing one.
    ///
    /// Either way the entry ends up at the front of the recency order with
    /// its write time stamped to `now`. When the insert pushes the store
    /// over capacity, entries are evicted from the back until the count is
    /// compliant again.
    pub fn insert_or_update(&mut self, key: K, value: V, now: Instant) {
        if let Some(&idx) = self.index.get(&key) {
            if let Some(node) = &mut self.nodes[idx] {
                node.value = value;
                node.last_access = now;
                node.last_write = now;
            }
            self.move_to_front(idx);
        } else {
            let idx = self.alloc_slot();
            self.nodes[idx] = Some(Node {
                key: key.clone(),
                value,
                last_access: now,
                last_write: now,
                prev: None,
                next: self.head,
            });
            if let Some(head_idx) = self.head {
                if let Some(head) = &mut self.nodes[head_idx] {
                    head.prev = Some(idx);
                }
            }
            self.head = Some(idx);
            if self.tail.is_none() {
                self.tail = Some(idx);
            }
            self.index.insert(key, idx);
        }

        self.evict_to_capacity();
    }

    /// Removes an entry from both the index and the recency order.
    ///
    /// Returns whether an entry was actually removed.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(idx) = self.index.remove(key) else {
            return false;
        };
        self.unlink(idx);
        self.nodes[idx] = None;
        self.free.push(idx);
        true
    }

    /// Updates the capacity, evicting from the least recently used end if
    /// the store currently holds more entries than the new bound allows.
    ///
    /// Requests for a zero capacity are ignored.
    pub fn set_capacity(&mut self, capacity: usize) {
        if capacity == 0 || capacity == self.capacity {
            return;
        }
        self.capacity = capacity;
        self.evict_to_capacity();
    }

    /// Returns a snapshot of the live keys, most recently used first.
    ///
    /// The snapshot reflects the store at call time and does not update as
    /// entries come and go.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let Some(node) = &self.nodes[idx] else { break };
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }

    /// Returns whether an entry exists for the key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the current capacity bound.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_to_capacity(&mut self) {
        while self.index.len() > self.capacity {
            let Some(tail_idx) = self.tail else { break };
            let Some(node) = &self.nodes[tail_idx] else { break };
            let key = node.key.clone();
            self.remove(&key);
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }

        self.unlink(idx);

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }
        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn alloc_slot(&mut self) -> usize {
        if let Some(idx) = self.free.pop() {
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            idx
        }
    }
}

impl<K, V> std::fmt::Debug for EntryStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
