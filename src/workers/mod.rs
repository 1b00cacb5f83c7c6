//! Producer and consumer workers.
//!
//! Descriptors are immutable per-worker configuration. Each worker thread owns
//! its descriptor and shares the coordination protocol through an `Arc`.
use std::{fmt::Display, sync::Arc, thread, time::Duration};

use rand::Rng;

use crate::{
    logging::{Event, RunObserver},
    sync::CoordinationProtocol,
    RegionError,
};

pub mod lifecycle;

/// Value type moved through the queue.
pub type Item = i32;

/// Upper bound, in time units, of a `Delay::Random` draw.
pub const MAX_RANDOM_UNITS: u32 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Producer,
    Consumer,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Producer => write!(f, "producer"),
            Role::Consumer => write!(f, "consumer"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkerId {
    pub role: Role,
    pub id: usize,
}

impl Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.role {
            Role::Producer => write!(f, "{{P: {}}}", self.id),
            Role::Consumer => write!(f, "{{C: {}}}", self.id),
        }
    }
}

/// A simulated duration, counted in configurable time units.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Delay {
    Fixed(u32),
    /// Drawn uniformly from `0..=MAX_RANDOM_UNITS` at every use.
    Random,
}

impl Delay {
    pub fn resolve(self, unit: Duration) -> Duration {
        let units = match self {
            Delay::Fixed(units) => units,
            Delay::Random => rand::thread_rng().gen_range(0..=MAX_RANDOM_UNITS),
        };
        unit * units
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Producer {
    pub id: usize,
    /// Number of items this producer will enqueue before finishing.
    pub planned: usize,
    pub production: Delay,
    pub pause: Delay,
    pub unit: Duration,
}

impl Producer {
    /// A producer with no simulated delays.
    pub fn new(id: usize, planned: usize) -> Self {
        Self {
            id,
            planned,
            production: Delay::Fixed(0),
            pause: Delay::Fixed(0),
            unit: Duration::ZERO,
        }
    }

    pub fn with_delays(mut self, production: Delay, pause: Delay, unit: Duration) -> Self {
        self.production = production;
        self.pause = pause;
        self.unit = unit;
        self
    }

    pub fn worker(&self) -> WorkerId {
        WorkerId {
            role: Role::Producer,
            id: self.id,
        }
    }

    pub fn latency(&self) -> Option<Duration> {
        Some(self.production.resolve(self.unit))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Consumer {
    pub id: usize,
    pub consumption: Delay,
    pub pause: Delay,
    pub unit: Duration,
}

impl Consumer {
    /// A consumer with no simulated delays.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            consumption: Delay::Fixed(0),
            pause: Delay::Fixed(0),
            unit: Duration::ZERO,
        }
    }

    pub fn with_delays(mut self, consumption: Delay, pause: Delay, unit: Duration) -> Self {
        self.consumption = consumption;
        self.pause = pause;
        self.unit = unit;
        self
    }

    pub fn worker(&self) -> WorkerId {
        WorkerId {
            role: Role::Consumer,
            id: self.id,
        }
    }

    pub fn latency(&self) -> Option<Duration> {
        Some(self.consumption.resolve(self.unit))
    }
}

/// Generates the next item: a random integer in `0..10`.
pub fn produce_item() -> Item {
    rand::thread_rng().gen_range(0..10)
}

fn pause(worker: WorkerId, delay: Delay, unit: Duration, observer: &dyn RunObserver) {
    let pause = delay.resolve(unit);
    observer.on_event(&Event::Pausing { worker, pause });
    if !pause.is_zero() {
        thread::sleep(pause);
    }
}

/// Producer loop: enqueues `planned` items, pausing after each one.
pub fn run_producer(
    producer: Producer,
    protocol: Arc<dyn CoordinationProtocol>,
    observer: Arc<dyn RunObserver>,
) -> Result<usize, RegionError> {
    let worker = producer.worker();
    observer.on_event(&Event::Started { worker });
    for seq in 1..=producer.planned {
        let item = produce_item();
        protocol.produce(&producer, item)?;
        observer.on_event(&Event::Produced {
            worker,
            seq,
            planned: producer.planned,
            item,
        });
        pause(worker, producer.pause, producer.unit, observer.as_ref());
    }
    observer.on_event(&Event::Finished {
        worker,
        items: producer.planned,
    });
    Ok(producer.planned)
}

/// Consumer loop: dequeues until the protocol reports that no work remains.
pub fn run_consumer(
    consumer: Consumer,
    protocol: Arc<dyn CoordinationProtocol>,
    observer: Arc<dyn RunObserver>,
) -> Result<usize, RegionError> {
    let worker = consumer.worker();
    observer.on_event(&Event::Started { worker });
    let mut consumed = 0;
    while let Some(taken) = protocol.consume(&consumer)? {
        consumed += 1;
        observer.on_event(&Event::Consumed {
            worker,
            ordinal: consumed,
            item: taken.item,
            remaining: taken.remaining,
        });
        pause(worker, consumer.pause, consumer.unit, observer.as_ref());
    }
    observer.on_event(&Event::Finished {
        worker,
        items: consumed,
    });
    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_scales_with_unit() {
        let unit = Duration::from_millis(10);
        assert_eq!(Delay::Fixed(3).resolve(unit), Duration::from_millis(30));
        assert_eq!(Delay::Fixed(0).resolve(unit), Duration::ZERO);
    }

    #[test]
    fn random_delay_stays_in_range() {
        let unit = Duration::from_millis(1);
        for _ in 0..200 {
            let d = Delay::Random.resolve(unit);
            assert!(d <= unit * MAX_RANDOM_UNITS);
        }
    }

    #[test]
    fn items_are_single_digits() {
        for _ in 0..200 {
            assert!((0..10).contains(&produce_item()));
        }
    }

    #[test]
    fn worker_headers() {
        let p = WorkerId {
            role: Role::Producer,
            id: 3,
        };
        let c = WorkerId {
            role: Role::Consumer,
            id: 0,
        };
        assert_eq!(p.to_string(), "{P: 3}");
        assert_eq!(c.to_string(), "{C: 0}");
    }
}
