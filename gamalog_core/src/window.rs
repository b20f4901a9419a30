//! Bounded FIFO of the most recent log lines.

use std::collections::VecDeque;

/// Lines the tailer compares per cycle.
pub const WINDOW_LEN: usize = 3;

/// Keeps at most `capacity` items; pushing into a full window evicts the oldest.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push `item`, returning the evicted oldest item when the window was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.buf.len() == self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(item);
        evicted
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest item still held.
    pub fn oldest(&self) -> Option<&T> {
        self.buf.front()
    }

    /// Most recently pushed item.
    pub fn newest(&self) -> Option<&T> {
        self.buf.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }
}

impl<T> Default for SlidingWindow<T> {
    fn default() -> Self {
        Self::new(WINDOW_LEN)
    }
}
