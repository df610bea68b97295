//! Bounded newest-first event history.

use std::collections::VecDeque;

/// Default capacity of display logs and hardware rolling buffers.
pub const DEFAULT_LOG_CAPACITY: usize = 64;

/// Ordered history bounded to a fixed capacity, newest entry first.
///
/// Pushing past capacity discards the oldest entries. Display only: nothing
/// in the audio path reads it.
#[derive(Debug, Clone)]
pub struct EventLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> EventLog<T> {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepends `entry`, dropping the oldest entry if full.
    pub fn push(&mut self, entry: T) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Most recent entry.
    pub fn head(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Iterates newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }
}

impl<T: Clone> EventLog<T> {
    /// Copies the entries out, newest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
