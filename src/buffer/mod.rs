//! The bounded circular buffer shared by producers and consumers.
//!
//! `queue` holds the buffer itself, `snapshot` a copyable view of it for observers.
pub mod queue;
pub mod snapshot;

pub use queue::BoundedQueue;
pub use snapshot::QueueSnapshot;
