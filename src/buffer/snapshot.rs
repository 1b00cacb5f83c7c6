use std::fmt::{self, Display};

/// A point-in-time copy of a `BoundedQueue`, taken under the owning lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot<T> {
    pub slots: Vec<T>,
    pub head: usize,
    pub tail: usize,
    pub len: usize,
    pub remaining: usize,
}

impl<T> QueueSnapshot<T> {
    pub fn new(slots: Vec<T>, head: usize, tail: usize, len: usize, remaining: usize) -> Self {
        Self {
            slots,
            head,
            tail,
            len,
            remaining,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether slot `idx` currently holds an unread item.
    pub fn is_occupied(&self, idx: usize) -> bool {
        if self.len == 0 || idx >= self.slots.len() {
            return false;
        }
        if self.len == self.slots.len() {
            return true;
        }
        // occupied slots run from head+1 through tail, circularly
        let offset = (idx + self.slots.len() - self.head - 1) % self.slots.len();
        offset < self.len
    }

    /// Occupied values in FIFO order.
    pub fn items(&self) -> Vec<&T> {
        (0..self.len)
            .map(|i| &self.slots[(self.head + 1 + i) % self.slots.len()])
            .collect()
    }
}

impl<T: Display> Display for QueueSnapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.slots.len();
        for i in 0..n {
            let edge = match (i == 0, i == n - 1) {
                (true, true) => "┌─┐",
                (true, false) => "┌─",
                (false, true) => "┬─┐",
                _ => "┬─",
            };
            f.write_str(edge)?;
        }
        writeln!(f)?;
        for (i, value) in self.slots.iter().enumerate() {
            if self.is_occupied(i) {
                write!(f, "│{value}")?;
            } else {
                f.write_str("│ ")?;
            }
        }
        writeln!(f, "│")?;
        for i in 0..n {
            let edge = match (i == 0, i == n - 1) {
                (true, true) => "├─┘",
                (true, false) => "├─",
                (false, true) => "┴─┘",
                _ => "┴─",
            };
            f.write_str(edge)?;
        }
        writeln!(f)?;
        write!(
            f,
            "└─> capacity: {} | head: {} | tail: {} | remaining: {}",
            n, self.head, self.tail, self.remaining
        )
    }
}
