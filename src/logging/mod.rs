//! Observability hooks for pipeline runs.
//!
//! The protocols and worker loops report what they are doing through a
//! `RunObserver`. Observers are called synchronously, sometimes while a region
//! lock is held, so implementations must not block or call back into the pipeline.
use std::time::Duration;

use crate::{
    buffer::QueueSnapshot,
    sync::Region,
    workers::{Item, Role, WorkerId},
};

/// Why a worker parked on a condition variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WaitReason {
    QueueFull,
    QueueEmpty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A worker thread began running.
    Started { worker: WorkerId },
    /// About to block on the lock of `region`.
    Attempting { worker: WorkerId, region: Region },
    Released { worker: WorkerId, region: Region },
    Waiting { worker: WorkerId, reason: WaitReason },
    Woken { worker: WorkerId },
    /// Wakeup sent towards `target`. `broadcast` is set when every waiter was woken.
    Signalled {
        worker: WorkerId,
        target: Role,
        broadcast: bool,
    },
    Produced {
        worker: WorkerId,
        seq: usize,
        planned: usize,
        item: Item,
    },
    Consumed {
        worker: WorkerId,
        ordinal: usize,
        item: Item,
        remaining: usize,
    },
    /// Queue state right after an enqueue or dequeue, taken under the lock.
    Snapshot {
        worker: WorkerId,
        snapshot: QueueSnapshot<Item>,
    },
    Pausing { worker: WorkerId, pause: Duration },
    /// The worker left its loop after handling `items` items.
    Finished { worker: WorkerId, items: usize },
    /// Every worker joined; `snapshot` is the final queue state.
    RunFinished { snapshot: QueueSnapshot<Item> },
}

/// Receiver for pipeline events.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {
    fn on_event(&self, _event: &Event) {}
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl RunObserver for LogObserver {
    fn on_event(&self, event: &Event) {
        match event {
            Event::Started { worker } => log::info!("{worker} │ started"),
            Event::Attempting { worker, region } => {
                log::trace!("{worker} │ trying to enter the {region} region")
            }
            Event::Released { worker, region } => {
                log::trace!("{worker} │ left the {region} region")
            }
            Event::Waiting { worker, reason } => match reason {
                WaitReason::QueueFull => log::debug!("{worker} │ queue is full, sleeping"),
                WaitReason::QueueEmpty => log::debug!("{worker} │ queue is empty, sleeping"),
            },
            Event::Woken { worker } => log::debug!("{worker} │ woken up"),
            Event::Signalled {
                worker,
                target,
                broadcast,
            } => {
                if *broadcast {
                    log::debug!("{worker} │ waking every waiting {target}")
                } else {
                    log::debug!("{worker} │ waking a {target}")
                }
            }
            Event::Produced {
                worker,
                seq,
                planned,
                item,
            } => log::info!("{worker} │ [{seq} / {planned}] produced {item}"),
            Event::Consumed {
                worker,
                ordinal,
                item,
                remaining,
            } => log::info!("{worker} │ [#{ordinal}] consumed {item}, {remaining} still to consume"),
            Event::Snapshot { worker, snapshot } => log::trace!("{worker} │ queue\n{snapshot}"),
            Event::Pausing { worker, pause } => {
                log::debug!("{worker} │ pausing for {pause:?}")
            }
            Event::Finished { worker, items } => {
                log::info!("{worker} │ finished after {items} items")
            }
            Event::RunFinished { snapshot } => {
                log::info!("run finished, {} items left unconsumed", snapshot.remaining)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Collects every event it sees.
    #[derive(Default)]
    pub(crate) struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        pub(crate) fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl RunObserver for Recorder {
        fn on_event(&self, event: &Event) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn log_observer_handles_every_event() {
        let worker = WorkerId {
            role: Role::Producer,
            id: 0,
        };
        let snapshot = QueueSnapshot::new(vec![1, 0], 1, 0, 1, 1);
        let events = [
            Event::Started { worker },
            Event::Attempting {
                worker,
                region: Region::Queue,
            },
            Event::Waiting {
                worker,
                reason: WaitReason::QueueFull,
            },
            Event::Woken { worker },
            Event::Signalled {
                worker,
                target: Role::Consumer,
                broadcast: true,
            },
            Event::Produced {
                worker,
                seq: 1,
                planned: 1,
                item: 1,
            },
            Event::Snapshot {
                worker,
                snapshot: snapshot.clone(),
            },
            Event::Pausing {
                worker,
                pause: Duration::ZERO,
            },
            Event::Released {
                worker,
                region: Region::Queue,
            },
            Event::Finished { worker, items: 1 },
            Event::RunFinished { snapshot },
        ];
        let recorder = Recorder::default();
        for event in &events {
            LogObserver.on_event(event);
            NoopObserver.on_event(event);
            recorder.on_event(event);
        }
        assert_eq!(recorder.events(), events.to_vec());
    }
}
