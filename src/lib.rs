use std::fmt::Display;

use thiserror::Error;

use crate::{sync::Region, workers::Role};

pub mod buffer;
pub mod logging;
pub mod sync;
pub mod workers;

pub use buffer::{BoundedQueue, QueueSnapshot};
pub use logging::{Event, LogObserver, NoopObserver, RunObserver};
pub use sync::{CoordinationProtocol, SplitRegion, Strategy, UnifiedRegion};
pub use workers::{
    lifecycle::{Pipeline, RunConfig},
    Consumer, Delay, Item, Producer,
};

/// Wrapper type for `std::io::Error`
#[derive(Debug, Error)]
pub struct IoError(std::io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl Eq for IoError {}
impl Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        Self(err)
    }
}

/// Error type for the queue, the coordination protocols and the worker lifecycle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("Queue capacity must be greater than 0")]
    InvalidCapacity,
    #[error("At least one {role} is required")]
    NoWorkers { role: Role },
    #[error("Buffer full, cannot enqueue until an item is dequeued")]
    BufferFull,
    #[error("Buffer empty, nothing to dequeue")]
    BufferEmpty,
    #[error("Lock guarding the {region} region was poisoned by a panicking worker")]
    Poisoned { region: Region },
    #[error("{role} {id} panicked before finishing")]
    WorkerPanicked { role: Role, id: usize },
    #[error("I/O error while spawning workers {:?}", err)]
    Io {
        #[from]
        err: IoError,
    },
}

impl From<std::io::Error> for RegionError {
    fn from(err: std::io::Error) -> Self {
        RegionError::Io { err: err.into() }
    }
}
