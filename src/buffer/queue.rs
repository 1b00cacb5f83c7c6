//! Fixed-capacity circular queue with a remaining-work counter.
//!
//! `BoundedQueue` performs no synchronization of its own. Every method takes
//! `&self` or `&mut self` and callers are expected to serialize access behind
//! whichever lock their coordination protocol uses.

use std::{thread, time::Duration};

use bytemuck::Pod;

use crate::{buffer::snapshot::QueueSnapshot, RegionError};

/// A circular FIFO buffer of `Pod` items.
#[derive(Debug, Clone)]
pub struct BoundedQueue<T: Pod> {
    /// Slot storage, circularly indexed.
    slots: Box<[T]>,
    /// Index of the slot *before* the oldest unread item.
    head: usize,
    /// Index of the most recently written item.
    tail: usize,
    /// Number of items currently held.
    count: usize,
    /// Items still expected to be produced and consumed.
    remaining: usize,
}

impl<T: Pod> BoundedQueue<T> {
    /// Creates an empty queue with `capacity` zeroed slots.
    ///
    /// `head` and `tail` both start at the last slot, so the first item lands in slot 0.
    pub fn new(capacity: usize) -> Result<Self, RegionError> {
        if capacity == 0 {
            return Err(RegionError::InvalidCapacity);
        }
        Ok(Self {
            slots: vec![T::zeroed(); capacity].into_boxed_slice(),
            head: capacity - 1,
            tail: capacity - 1,
            count: 0,
            remaining: 0,
        })
    }

    fn next(&self, idx: usize) -> usize {
        (idx + 1) % self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn slots(&self) -> &[T] {
        &self.slots
    }

    pub fn remaining_work(&self) -> usize {
        self.remaining
    }

    /// Writes `value` after the current tail.
    ///
    /// On a full queue nothing is written and `BufferFull` is returned.
    pub fn enqueue(&mut self, value: T) -> Result<(), RegionError> {
        if self.is_full() {
            return Err(RegionError::BufferFull);
        }
        let pos = self.next(self.tail);
        self.slots[pos] = value;
        self.tail = pos;
        self.count += 1;
        Ok(())
    }

    /// Enqueues and then blocks the calling thread for `latency`, modelling production cost.
    pub fn enqueue_for(&mut self, value: T, latency: Option<Duration>) -> Result<(), RegionError> {
        self.enqueue(value)?;
        simulate(latency);
        Ok(())
    }

    /// Removes and returns the oldest item, zeroing the vacated slot.
    pub fn dequeue(&mut self) -> Result<T, RegionError> {
        if self.is_empty() {
            return Err(RegionError::BufferEmpty);
        }
        self.head = self.next(self.head);
        let value = std::mem::replace(&mut self.slots[self.head], T::zeroed());
        self.count -= 1;
        Ok(value)
    }

    /// Dequeues and then blocks the calling thread for `latency`, modelling consumption cost.
    pub fn dequeue_for(&mut self, latency: Option<Duration>) -> Result<T, RegionError> {
        let value = self.dequeue()?;
        simulate(latency);
        Ok(value)
    }

    /// Adds `delta` to the remaining-work counter, clamping at zero.
    pub fn adjust_remaining_work(&mut self, delta: isize) {
        self.remaining = self.remaining.saturating_add_signed(delta);
    }

    pub fn snapshot(&self) -> QueueSnapshot<T> {
        QueueSnapshot::new(
            self.slots.to_vec(),
            self.head,
            self.tail,
            self.count,
            self.remaining,
        )
    }
}

pub(crate) fn simulate(latency: Option<Duration>) {
    if let Some(dur) = latency.filter(|d| !d.is_zero()) {
        thread::sleep(dur);
    }
}
