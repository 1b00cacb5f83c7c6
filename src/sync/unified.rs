//! Unified-region protocol: one lock guards the whole queue.
//!
//! Producers park on `space_available`, consumers on `item_available`, both tied to the
//! single queue lock. Simulated production and consumption latency is applied while
//! the lock is still held, so every operation fully serializes the pipeline.
use std::sync::{Arc, Condvar, Mutex};

use crate::{
    buffer::{BoundedQueue, QueueSnapshot},
    logging::{Event, RunObserver, WaitReason},
    sync::{enter, leave, park, Consumption, CoordinationProtocol, Region, Strategy},
    workers::{Consumer, Item, Producer, Role},
    RegionError,
};

pub struct UnifiedRegion {
    queue: Mutex<BoundedQueue<Item>>,
    space_available: Condvar,
    item_available: Condvar,
    observer: Arc<dyn RunObserver>,
}

impl UnifiedRegion {
    pub fn new(capacity: usize, observer: Arc<dyn RunObserver>) -> Result<Self, RegionError> {
        Ok(Self {
            queue: Mutex::new(BoundedQueue::new(capacity)?),
            space_available: Condvar::new(),
            item_available: Condvar::new(),
            observer,
        })
    }
}

impl CoordinationProtocol for UnifiedRegion {
    fn strategy(&self) -> Strategy {
        Strategy::UnifiedRegion
    }

    fn plan_work(&self, items: usize) -> Result<(), RegionError> {
        let mut queue = self.queue.lock().map_err(|_| RegionError::Poisoned {
            region: Region::Queue,
        })?;
        queue.adjust_remaining_work(items as isize);
        Ok(())
    }

    fn produce(&self, producer: &Producer, item: Item) -> Result<(), RegionError> {
        let worker = producer.worker();
        let observer = self.observer.as_ref();

        let mut queue = enter(&self.queue, Region::Queue, worker, observer)?;
        while queue.is_full() {
            observer.on_event(&Event::Waiting {
                worker,
                reason: WaitReason::QueueFull,
            });
            queue = park(&self.space_available, queue, Region::Queue, worker, observer)?;
        }

        queue.enqueue_for(item, producer.latency())?;
        observer.on_event(&Event::Snapshot {
            worker,
            snapshot: queue.snapshot(),
        });

        // one new item, one consumer to wake
        self.item_available.notify_one();
        observer.on_event(&Event::Signalled {
            worker,
            target: Role::Consumer,
            broadcast: false,
        });

        leave(queue, Region::Queue, worker, observer);
        Ok(())
    }

    fn consume(&self, consumer: &Consumer) -> Result<Option<Consumption>, RegionError> {
        let worker = consumer.worker();
        let observer = self.observer.as_ref();

        let mut queue = enter(&self.queue, Region::Queue, worker, observer)?;
        if queue.remaining_work() == 0 {
            // release every consumer still parked on an empty queue
            self.item_available.notify_all();
            observer.on_event(&Event::Signalled {
                worker,
                target: Role::Consumer,
                broadcast: true,
            });
            leave(queue, Region::Queue, worker, observer);
            return Ok(None);
        }

        while queue.is_empty() {
            observer.on_event(&Event::Waiting {
                worker,
                reason: WaitReason::QueueEmpty,
            });
            queue = park(&self.item_available, queue, Region::Queue, worker, observer)?;
            if queue.remaining_work() == 0 {
                leave(queue, Region::Queue, worker, observer);
                return Ok(None);
            }
        }

        let item = queue.dequeue_for(consumer.latency())?;
        queue.adjust_remaining_work(-1);
        let remaining = queue.remaining_work();
        observer.on_event(&Event::Snapshot {
            worker,
            snapshot: queue.snapshot(),
        });

        self.space_available.notify_one();
        observer.on_event(&Event::Signalled {
            worker,
            target: Role::Producer,
            broadcast: false,
        });

        leave(queue, Region::Queue, worker, observer);
        Ok(Some(Consumption { item, remaining }))
    }

    fn snapshot(&self) -> Result<QueueSnapshot<Item>, RegionError> {
        let queue = self.queue.lock().map_err(|_| RegionError::Poisoned {
            region: Region::Queue,
        })?;
        Ok(queue.snapshot())
    }
}
