//! Run configuration and the worker lifecycle.
//!
//! `Pipeline::run_to_completion` owns one queue per run: it plans the total work
//! before any thread starts, spawns every producer and consumer, then joins
//! producers first and consumers second.
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    logging::{Event, NoopObserver, RunObserver},
    sync::{CoordinationProtocol, Strategy},
    workers::{run_consumer, run_producer, Consumer, Delay, Producer, Role},
    RegionError,
};

/// Parameters of a single run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub producers: usize,
    pub consumers: usize,
    pub capacity: usize,
    pub items_per_producer: usize,
    pub production: Delay,
    pub consumption: Delay,
    pub post_production: Delay,
    pub post_consumption: Delay,
    /// Length of one delay unit.
    pub unit: Duration,
    pub strategy: Strategy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            producers: 1,
            consumers: 1,
            capacity: 10,
            items_per_producer: 10,
            production: Delay::Fixed(2),
            consumption: Delay::Fixed(1),
            post_production: Delay::Random,
            post_consumption: Delay::Random,
            unit: Duration::from_secs(1),
            strategy: Strategy::default(),
        }
    }
}

impl RunConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        producers: usize,
        consumers: usize,
        capacity: usize,
        items_per_producer: usize,
        production: Delay,
        consumption: Delay,
        post_production: Delay,
        post_consumption: Delay,
    ) -> Self {
        Self {
            producers,
            consumers,
            capacity,
            items_per_producer,
            production,
            consumption,
            post_production,
            post_consumption,
            ..Self::default()
        }
    }

    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn validate(&self) -> Result<(), RegionError> {
        if self.capacity == 0 {
            return Err(RegionError::InvalidCapacity);
        }
        if self.producers == 0 {
            return Err(RegionError::NoWorkers {
                role: Role::Producer,
            });
        }
        if self.consumers == 0 {
            return Err(RegionError::NoWorkers {
                role: Role::Consumer,
            });
        }
        Ok(())
    }

    /// Total items the run will move through the queue.
    pub fn planned_items(&self) -> usize {
        self.producers * self.items_per_producer
    }

    pub fn producer_descriptors(&self) -> Vec<Producer> {
        (0..self.producers)
            .map(|id| {
                Producer::new(id, self.items_per_producer).with_delays(
                    self.production,
                    self.post_production,
                    self.unit,
                )
            })
            .collect()
    }

    pub fn consumer_descriptors(&self) -> Vec<Consumer> {
        (0..self.consumers)
            .map(|id| {
                Consumer::new(id).with_delays(self.consumption, self.post_consumption, self.unit)
            })
            .collect()
    }
}

/// A configured producer/consumer run.
pub struct Pipeline {
    config: RunConfig,
    observer: Arc<dyn RunObserver>,
}

impl Pipeline {
    pub fn configure(config: RunConfig) -> Result<Self, RegionError> {
        config.validate()?;
        Ok(Self {
            config,
            observer: Arc::new(NoopObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs every worker to completion, blocking the caller until all have joined.
    ///
    /// The first worker failure is returned, but only after every thread has been joined.
    pub fn run_to_completion(&self) -> Result<(), RegionError> {
        let protocol: Arc<dyn CoordinationProtocol> = self
            .config
            .strategy
            .build(self.config.capacity, Arc::clone(&self.observer))?;

        // consumers must never see zero remaining work while producers are still spawning
        let producers = self.config.producer_descriptors();
        for producer in &producers {
            protocol.plan_work(producer.planned)?;
        }

        let mut producer_handles = Vec::with_capacity(producers.len());
        for producer in producers {
            let id = producer.id;
            let protocol = Arc::clone(&protocol);
            let observer = Arc::clone(&self.observer);
            let handle = thread::Builder::new()
                .name(format!("producer-{id}"))
                .spawn(move || run_producer(producer, protocol, observer))?;
            producer_handles.push((id, handle));
        }

        let mut consumer_handles = Vec::with_capacity(self.config.consumers);
        for consumer in self.config.consumer_descriptors() {
            let id = consumer.id;
            let protocol = Arc::clone(&protocol);
            let observer = Arc::clone(&self.observer);
            let handle = thread::Builder::new()
                .name(format!("consumer-{id}"))
                .spawn(move || run_consumer(consumer, protocol, observer))?;
            consumer_handles.push((id, handle));
        }

        let mut outcome = Ok(());
        for (id, handle) in producer_handles {
            record(&mut outcome, join(Role::Producer, id, handle));
        }
        for (id, handle) in consumer_handles {
            record(&mut outcome, join(Role::Consumer, id, handle));
        }

        self.observer.on_event(&Event::RunFinished {
            snapshot: protocol.snapshot()?,
        });
        outcome
    }
}

fn join(
    role: Role,
    id: usize,
    handle: JoinHandle<Result<usize, RegionError>>,
) -> Result<usize, RegionError> {
    handle
        .join()
        .map_err(|_| RegionError::WorkerPanicked { role, id })?
}

fn record(outcome: &mut Result<(), RegionError>, result: Result<usize, RegionError>) {
    if let Err(err) = result {
        if outcome.is_ok() {
            *outcome = Err(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{logging::tests::Recorder, workers::WorkerId};

    fn quick(
        producers: usize,
        consumers: usize,
        capacity: usize,
        items: usize,
        strategy: Strategy,
    ) -> RunConfig {
        RunConfig::new(
            producers,
            consumers,
            capacity,
            items,
            Delay::Fixed(0),
            Delay::Fixed(0),
            Delay::Fixed(0),
            Delay::Fixed(0),
        )
        .with_unit(Duration::ZERO)
        .with_strategy(strategy)
    }

    fn run(config: RunConfig) -> Vec<Event> {
        let recorder = Arc::new(Recorder::default());
        Pipeline::configure(config)
            .unwrap()
            .with_observer(recorder.clone())
            .run_to_completion()
            .unwrap();
        recorder.events()
    }

    fn consumed(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, Event::Consumed { .. }))
            .count()
    }

    fn max_len(events: &[Event]) -> usize {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Snapshot { snapshot, .. } => Some(snapshot.len),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    fn final_snapshot(events: &[Event]) -> (usize, usize) {
        match events.last() {
            Some(Event::RunFinished { snapshot }) => (snapshot.len, snapshot.remaining),
            other => panic!("run should end with RunFinished, got {other:?}"),
        }
    }

    #[test]
    fn defaults_match_interactive_program() {
        let config = RunConfig::default();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.items_per_producer, 10);
        assert_eq!(config.production, Delay::Fixed(2));
        assert_eq!(config.consumption, Delay::Fixed(1));
        assert_eq!(config.post_production, Delay::Random);
        assert_eq!(config.strategy, Strategy::UnifiedRegion);
        assert_eq!(config.planned_items(), 10);
    }

    #[test]
    fn configuration_is_validated() {
        let base = quick(1, 1, 1, 1, Strategy::UnifiedRegion);
        assert_eq!(
            Pipeline::configure(RunConfig {
                capacity: 0,
                ..base.clone()
            })
            .err(),
            Some(RegionError::InvalidCapacity)
        );
        assert_eq!(
            Pipeline::configure(RunConfig {
                producers: 0,
                ..base.clone()
            })
            .err(),
            Some(RegionError::NoWorkers {
                role: Role::Producer
            })
        );
        assert_eq!(
            Pipeline::configure(RunConfig {
                consumers: 0,
                ..base
            })
            .err(),
            Some(RegionError::NoWorkers {
                role: Role::Consumer
            })
        );
    }

    #[test]
    fn descriptors_carry_the_run_parameters() {
        let config = RunConfig::new(
            2,
            3,
            4,
            5,
            Delay::Fixed(1),
            Delay::Fixed(2),
            Delay::Random,
            Delay::Fixed(3),
        )
        .with_unit(Duration::from_millis(1));
        let producers = config.producer_descriptors();
        assert_eq!(producers.len(), 2);
        assert_eq!(producers[1].id, 1);
        assert_eq!(producers[1].planned, 5);
        assert_eq!(producers[0].pause, Delay::Random);

        let consumers = config.consumer_descriptors();
        assert_eq!(consumers.len(), 3);
        assert_eq!(consumers[2].consumption, Delay::Fixed(2));
        assert_eq!(consumers[2].unit, Duration::from_millis(1));
    }

    #[test]
    fn capacity_two_single_producer_three_items() {
        for strategy in [Strategy::UnifiedRegion, Strategy::SplitRegion] {
            let events = run(quick(1, 1, 2, 3, strategy));
            assert_eq!(consumed(&events), 3, "{strategy}");
            assert!(max_len(&events) <= 2);
            assert_eq!(final_snapshot(&events), (0, 0));

            // the very first item always lands in slot 0
            let first = events.iter().find_map(|e| match e {
                Event::Snapshot { snapshot, .. } => Some(snapshot.tail),
                _ => None,
            });
            assert_eq!(first, Some(0));

            let consumer = WorkerId {
                role: Role::Consumer,
                id: 0,
            };
            assert!(events.contains(&Event::Finished {
                worker: consumer,
                items: 3
            }));
        }
    }

    #[test]
    fn capacity_one_two_producers_one_item_each() {
        for strategy in [Strategy::UnifiedRegion, Strategy::SplitRegion] {
            let events = run(quick(2, 1, 1, 1, strategy));
            assert_eq!(consumed(&events), 2, "{strategy}");
            assert_eq!(max_len(&events), 1);
            assert_eq!(final_snapshot(&events), (0, 0));
        }
    }

    #[test]
    fn every_worker_finishes_under_load() {
        for strategy in [Strategy::UnifiedRegion, Strategy::SplitRegion] {
            let events = run(quick(4, 3, 3, 500, strategy));
            assert_eq!(consumed(&events), 2_000, "{strategy}");
            let finished = events
                .iter()
                .filter(|e| matches!(e, Event::Finished { .. }))
                .count();
            assert_eq!(finished, 7);

            let per_consumer: usize = events
                .iter()
                .filter_map(|e| match e {
                    Event::Finished { worker, items } if worker.role == Role::Consumer => {
                        Some(*items)
                    }
                    _ => None,
                })
                .sum();
            assert_eq!(per_consumer, 2_000);
        }
    }

    #[test]
    fn more_consumers_than_items_still_terminates() {
        for strategy in [Strategy::UnifiedRegion, Strategy::SplitRegion] {
            let events = run(quick(1, 8, 2, 3, strategy));
            assert_eq!(consumed(&events), 3, "{strategy}");
            assert_eq!(final_snapshot(&events), (0, 0));
        }
    }

    #[test]
    fn random_delays_with_small_unit() {
        let config = RunConfig::new(
            2,
            2,
            2,
            5,
            Delay::Random,
            Delay::Random,
            Delay::Random,
            Delay::Random,
        )
        .with_unit(Duration::from_micros(200))
        .with_strategy(Strategy::SplitRegion);
        let events = run(config);
        assert_eq!(consumed(&events), 10);
        assert!(events.iter().any(|e| matches!(e, Event::Pausing { .. })));
    }

    #[test]
    fn pipeline_can_run_more_than_once() {
        let pipeline = Pipeline::configure(quick(2, 2, 2, 10, Strategy::UnifiedRegion)).unwrap();
        pipeline.run_to_completion().unwrap();
        pipeline.run_to_completion().unwrap();
        assert_eq!(pipeline.config().planned_items(), 20);
    }
}
