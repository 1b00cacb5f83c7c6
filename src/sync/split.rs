//! Split-region protocol: producers and consumers serialize only among themselves.
//!
//! Three locks are involved:
//! - `producers` admits one producer at a time and holds the enqueue tally,
//! - `consumers` admits one consumer at a time and holds the dequeue tally,
//! - `queue` guards the buffer itself, its full/empty predicates and the shared `wake` condition.
//!
//! The queue lock is held only for the predicate wait, the slot move and the wakeup check.
//! Simulated latency runs with just the role lock held, so a slow producer never
//! keeps consumers out and vice versa.
//!
//! At most one worker per role can be parked on `wake` (the others queue on their
//! role lock), and a full queue is never empty, so a single `notify_one` always
//! reaches the intended side. The transition of remaining work to zero is still
//! broadcast.
use std::sync::{Arc, Condvar, Mutex};

use crate::{
    buffer::{queue::simulate, BoundedQueue, QueueSnapshot},
    logging::{Event, RunObserver, WaitReason},
    sync::{enter, leave, park, Consumption, CoordinationProtocol, Region, Strategy},
    workers::{Consumer, Item, Producer, Role},
    RegionError,
};

pub struct SplitRegion {
    producers: Mutex<usize>,
    consumers: Mutex<usize>,
    queue: Mutex<BoundedQueue<Item>>,
    wake: Condvar,
    observer: Arc<dyn RunObserver>,
}

impl SplitRegion {
    pub fn new(capacity: usize, observer: Arc<dyn RunObserver>) -> Result<Self, RegionError> {
        Ok(Self {
            producers: Mutex::new(0),
            consumers: Mutex::new(0),
            queue: Mutex::new(BoundedQueue::new(capacity)?),
            wake: Condvar::new(),
            observer,
        })
    }

    /// Total items enqueued so far.
    pub fn enqueued(&self) -> Result<usize, RegionError> {
        self.producers
            .lock()
            .map(|tally| *tally)
            .map_err(|_| RegionError::Poisoned {
                region: Region::Producers,
            })
    }

    /// Total items dequeued so far.
    pub fn dequeued(&self) -> Result<usize, RegionError> {
        self.consumers
            .lock()
            .map(|tally| *tally)
            .map_err(|_| RegionError::Poisoned {
                region: Region::Consumers,
            })
    }
}

impl CoordinationProtocol for SplitRegion {
    fn strategy(&self) -> Strategy {
        Strategy::SplitRegion
    }

    fn plan_work(&self, items: usize) -> Result<(), RegionError> {
        let mut queue = self.queue.lock().map_err(|_| RegionError::Poisoned {
            region: Region::Wake,
        })?;
        queue.adjust_remaining_work(items as isize);
        Ok(())
    }

    fn produce(&self, producer: &Producer, item: Item) -> Result<(), RegionError> {
        let worker = producer.worker();
        let observer = self.observer.as_ref();

        let mut tally = enter(&self.producers, Region::Producers, worker, observer)?;

        let mut queue = enter(&self.queue, Region::Wake, worker, observer)?;
        while queue.is_full() {
            observer.on_event(&Event::Waiting {
                worker,
                reason: WaitReason::QueueFull,
            });
            queue = park(&self.wake, queue, Region::Wake, worker, observer)?;
        }
        queue.enqueue(item)?;
        observer.on_event(&Event::Snapshot {
            worker,
            snapshot: queue.snapshot(),
        });
        leave(queue, Region::Wake, worker, observer);

        simulate(producer.latency());
        *tally += 1;

        let queue = enter(&self.queue, Region::Wake, worker, observer)?;
        if queue.len() == 1 {
            self.wake.notify_one();
            observer.on_event(&Event::Signalled {
                worker,
                target: Role::Consumer,
                broadcast: false,
            });
        }
        leave(queue, Region::Wake, worker, observer);

        leave(tally, Region::Producers, worker, observer);
        Ok(())
    }

    fn consume(&self, consumer: &Consumer) -> Result<Option<Consumption>, RegionError> {
        let worker = consumer.worker();
        let observer = self.observer.as_ref();

        let mut tally = enter(&self.consumers, Region::Consumers, worker, observer)?;

        let mut queue = enter(&self.queue, Region::Wake, worker, observer)?;
        if queue.remaining_work() == 0 {
            leave(queue, Region::Wake, worker, observer);
            leave(tally, Region::Consumers, worker, observer);
            return Ok(None);
        }
        while queue.is_empty() {
            observer.on_event(&Event::Waiting {
                worker,
                reason: WaitReason::QueueEmpty,
            });
            queue = park(&self.wake, queue, Region::Wake, worker, observer)?;
            if queue.remaining_work() == 0 {
                leave(queue, Region::Wake, worker, observer);
                leave(tally, Region::Consumers, worker, observer);
                return Ok(None);
            }
        }
        let item = queue.dequeue()?;
        queue.adjust_remaining_work(-1);
        let remaining = queue.remaining_work();
        observer.on_event(&Event::Snapshot {
            worker,
            snapshot: queue.snapshot(),
        });
        leave(queue, Region::Wake, worker, observer);

        simulate(consumer.latency());
        *tally += 1;

        let queue = enter(&self.queue, Region::Wake, worker, observer)?;
        if remaining == 0 {
            self.wake.notify_all();
            observer.on_event(&Event::Signalled {
                worker,
                target: Role::Consumer,
                broadcast: true,
            });
        } else if queue.len() == queue.capacity() - 1 {
            self.wake.notify_one();
            observer.on_event(&Event::Signalled {
                worker,
                target: Role::Producer,
                broadcast: false,
            });
        }
        leave(queue, Region::Wake, worker, observer);

        leave(tally, Region::Consumers, worker, observer);
        Ok(Some(Consumption { item, remaining }))
    }

    fn snapshot(&self) -> Result<QueueSnapshot<Item>, RegionError> {
        let queue = self.queue.lock().map_err(|_| RegionError::Poisoned {
            region: Region::Wake,
        })?;
        Ok(queue.snapshot())
    }
}
