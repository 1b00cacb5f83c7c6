//! Coordination protocols wrapping `BoundedQueue` with blocking and wakeups.
//!
//! Both strategies implement the same producer/consumer contract and differ only
//! in how wide their critical regions are. `Strategy` selects one at configuration
//! time and `Strategy::build` hands back a shared trait object.
use std::{
    fmt::Display,
    sync::{Arc, Condvar, Mutex, MutexGuard},
};

use crate::{
    buffer::QueueSnapshot,
    logging::{Event, RunObserver},
    workers::{Consumer, Item, Producer, WorkerId},
    RegionError,
};

pub mod split;
pub mod unified;

pub use split::SplitRegion;
pub use unified::UnifiedRegion;

/// Locking strategy for the shared queue.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// One lock around the whole queue, separate conditions for space and items.
    #[default]
    UnifiedRegion,
    /// Per-role locks plus a narrow shared lock for the full/empty checks.
    SplitRegion,
}

impl Strategy {
    pub fn build(
        self,
        capacity: usize,
        observer: Arc<dyn RunObserver>,
    ) -> Result<Arc<dyn CoordinationProtocol>, RegionError> {
        let protocol: Arc<dyn CoordinationProtocol> = match self {
            Strategy::UnifiedRegion => Arc::new(UnifiedRegion::new(capacity, observer)?),
            Strategy::SplitRegion => Arc::new(SplitRegion::new(capacity, observer)?),
        };
        Ok(protocol)
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::UnifiedRegion => write!(f, "Unified critical region"),
            Strategy::SplitRegion => write!(f, "Split critical regions"),
        }
    }
}

/// Named critical regions, used in events and poisoning errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Region {
    /// The single region of the unified strategy.
    Queue,
    Producers,
    Consumers,
    /// The shared full/empty check region of the split strategy.
    Wake,
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Queue => write!(f, "queue"),
            Region::Producers => write!(f, "producer"),
            Region::Consumers => write!(f, "consumer"),
            Region::Wake => write!(f, "wake"),
        }
    }
}

/// Outcome of one successful dequeue.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Consumption {
    pub item: Item,
    /// Remaining work right after this dequeue was accounted for.
    pub remaining: usize,
}

/// The producer/consumer contract shared by every strategy.
pub trait CoordinationProtocol: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// Adds `items` to the remaining-work counter. Must run before any worker starts.
    fn plan_work(&self, items: usize) -> Result<(), RegionError>;

    /// Blocks until there is space, then enqueues `item`.
    fn produce(&self, producer: &Producer, item: Item) -> Result<(), RegionError>;

    /// Blocks until an item is available and dequeues it, or returns `None`
    /// once no more work will ever arrive.
    fn consume(&self, consumer: &Consumer) -> Result<Option<Consumption>, RegionError>;

    fn snapshot(&self) -> Result<QueueSnapshot<Item>, RegionError>;
}

/// Locks `mutex`, reporting the attempt to `observer` first.
pub(crate) fn enter<'a, T>(
    mutex: &'a Mutex<T>,
    region: Region,
    worker: WorkerId,
    observer: &dyn RunObserver,
) -> Result<MutexGuard<'a, T>, RegionError> {
    observer.on_event(&Event::Attempting { worker, region });
    mutex.lock().map_err(|_| RegionError::Poisoned { region })
}

/// Drops `guard`, then reports the release.
pub(crate) fn leave<T>(
    guard: MutexGuard<'_, T>,
    region: Region,
    worker: WorkerId,
    observer: &dyn RunObserver,
) {
    drop(guard);
    observer.on_event(&Event::Released { worker, region });
}

/// Parks on `cond`, releasing the lock behind `guard` until woken.
pub(crate) fn park<'a, T>(
    cond: &Condvar,
    guard: MutexGuard<'a, T>,
    region: Region,
    worker: WorkerId,
    observer: &dyn RunObserver,
) -> Result<MutexGuard<'a, T>, RegionError> {
    let guard = cond
        .wait(guard)
        .map_err(|_| RegionError::Poisoned { region })?;
    observer.on_event(&Event::Woken { worker });
    Ok(guard)
}
