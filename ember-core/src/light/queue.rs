//! FIFO frontier queue for light propagation passes.
//!
//! A simple array-based ring buffer with head/tail pointers. Flood fills
//! enqueue and dequeue in tight loops, so the buffer is pre-allocated and
//! kept at a power-of-two capacity for cheap index wrapping.

use ember_utils::TilePos;

/// A FIFO of `(position, intensity)` frontier entries.
#[derive(Debug)]
pub struct LightQueue {
    buffer: Vec<(TilePos, f32)>,
    head: usize,
    tail: usize,
    size: usize,
}

impl LightQueue {
    /// Creates an empty queue with a capacity suited to typical flood-fill
    /// workloads.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    /// Creates an empty queue with at least the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two();
        Self {
            buffer: Vec::with_capacity(capacity),
            head: 0,
            tail: 0,
            size: 0,
        }
    }

    /// Enqueues a frontier entry.
    #[inline]
    pub fn enqueue(&mut self, pos: TilePos, level: f32) {
        if self.size == self.buffer.capacity() {
            self.grow();
        }

        if self.tail < self.buffer.len() {
            self.buffer[self.tail] = (pos, level);
        } else {
            self.buffer.push((pos, level));
        }

        self.tail = (self.tail + 1) & (self.buffer.capacity() - 1);
        self.size += 1;
    }

    /// Dequeues the oldest frontier entry.
    #[inline]
    pub fn dequeue(&mut self) -> Option<(TilePos, f32)> {
        if self.size == 0 {
            return None;
        }

        let item = self.buffer[self.head];
        self.head = (self.head + 1) & (self.buffer.capacity() - 1);
        self.size -= 1;

        Some(item)
    }

    /// Checks if the queue is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the number of queued entries.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Drops all queued entries.
    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.size = 0;
    }

    fn grow(&mut self) {
        let old_capacity = self.buffer.capacity();
        let new_capacity = (old_capacity * 2).max(16);

        let mut new_buffer = Vec::with_capacity(new_capacity);
        for _ in 0..self.size {
            new_buffer.push(self.buffer[self.head]);
            self.head = (self.head + 1) & (old_capacity - 1);
        }

        self.buffer = new_buffer;
        self.head = 0;
        self.tail = self.size;
    }
}

impl Default for LightQueue {
    fn default() -> Self {
        Self::new()
    }
}
