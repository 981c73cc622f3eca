//! A FIFO queue of unique keys with replaceable payloads.
//!
//! Re-enqueuing a key that is already pending only updates its payload; the
//! key keeps its original place in the queue. This is the deduplication
//! primitive behind the light engine's pending-update queues.

use std::collections::VecDeque;
use std::hash::Hash;

use rustc_hash::FxHashMap;

/// A deduplicating FIFO: at most one entry per key.
#[derive(Debug)]
pub struct QueueSet<K, V> {
    order: VecDeque<K>,
    entries: FxHashMap<K, V>,
}

impl<K: Eq + Hash + Clone, V> QueueSet<K, V> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
            entries: FxHashMap::default(),
        }
    }

    /// Enqueues a key, or replaces the payload of an already-pending key.
    ///
    /// Returns `true` if the key was newly enqueued.
    pub fn push(&mut self, key: K, value: V) -> bool {
        let fresh = self.entries.insert(key.clone(), value).is_none();
        if fresh {
            self.order.push_back(key);
        }
        fresh
    }

    /// Dequeues the oldest pending key and its payload.
    pub fn pop(&mut self) -> Option<(K, V)> {
        let key = self.order.pop_front()?;
        // The entry is always present; push keeps order and entries in sync.
        let value = self.entries.remove(&key)?;
        Some((key, value))
    }

    /// Returns the pending payload for a key, if any.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Checks whether a key is pending.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of pending keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Checks if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drops all pending entries.
    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

impl<K: Eq + Hash + Clone, V> Default for QueueSet<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = QueueSet::new();
        queue.push("a", 1);
        queue.push("b", 2);
        queue.push("c", 3);

        assert_eq!(queue.pop(), Some(("a", 1)));
        assert_eq!(queue.pop(), Some(("b", 2)));
        assert_eq!(queue.pop(), Some(("c", 3)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_reenqueue_replaces_payload() {
        let mut queue = QueueSet::new();
        assert!(queue.push("a", 1));
        assert!(queue.push("b", 2));
        // Same key again: payload changes, queue position does not.
        assert!(!queue.push("a", 9));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(("a", 9)));
        assert_eq!(queue.pop(), Some(("b", 2)));
    }

    #[test]
    fn test_contains_and_get() {
        let mut queue = QueueSet::new();
        queue.push(7u32, "seven");

        assert!(queue.contains(&7));
        assert_eq!(queue.get(&7), Some(&"seven"));
        assert!(!queue.contains(&8));

        queue.clear();
        assert!(queue.is_empty());
    }
}
