//! # Event Environment
//!
//! Generates sensing events and decides which nodes perceive them. The
//! environment only produces events; the runner records and dispatches
//! them.
//!
//! Per generated event the sampling order is fixed: ground truth, then x,
//! then y, then the next inter-arrival interval.

use std::fmt;
use std::time::Duration;

use palisade_config::EnvironmentConfig;
use palisade_core::SamplingService;
use palisade_detection::{EventId, NodeId, PerimeterNode, Position, SensorReading};

/// Inter-arrival time between generated events.
pub trait ArrivalModel: fmt::Debug + Send + Sync {
    /// Seconds until the next event. The scheduler rejects negative and
    /// non-finite values, which ends generation.
    fn interval(&self, mean_secs: f64, sampler: &mut SamplingService) -> f64;
}

/// Poisson arrivals: exponential intervals with the configured mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExponentialArrivals;

impl ArrivalModel for ExponentialArrivals {
    #[inline]
    fn interval(&self, mean_secs: f64, sampler: &mut SamplingService) -> f64 {
        sampler.exponential(mean_secs)
    }
}

/// Constant interval, ignoring the configured mean. Consumes no randomness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedArrivals(pub f64);

impl ArrivalModel for FixedArrivals {
    #[inline]
    fn interval(&self, _mean_secs: f64, _sampler: &mut SamplingService) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensingEvent {
    pub id: EventId,
    pub is_intruder: bool,
    pub position: Position,
    pub created_at: Duration,
}

impl SensingEvent {
    pub fn reading(&self) -> SensorReading {
        SensorReading {
            event_id: self.id,
            is_intruder: self.is_intruder,
            event_time: self.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventEnvironment {
    config: EnvironmentConfig,
    generated: u64,
    next_id: u64,
}

impl EventEnvironment {
    pub fn new(config: EnvironmentConfig) -> Self {
        Self {
            config,
            generated: 0,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn generated(&self) -> u64 {
        self.generated
    }

    pub fn remaining(&self) -> u64 {
        self.config.total_events.saturating_sub(self.generated)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Draws the next event, or `None` once the configured count is reached.
    pub fn generate(
        &mut self,
        now: Duration,
        sampler: &mut SamplingService,
    ) -> Option<SensingEvent> {
        if self.is_exhausted() {
            return None;
        }
        let is_intruder = sampler.bernoulli(self.config.intruder_probability);
        let extent = self.config.area_half_extent;
        let x = sampler.uniform(-extent, extent);
        let y = sampler.uniform(-extent, extent);
        self.generated += 1;
        Some(self.next_event(is_intruder, Position::new(x, y), now))
    }

    /// Builds an event outside the generated sequence. It gets a fresh id
    /// but does not count against `total_events`.
    pub fn inject(
        &mut self,
        is_intruder: bool,
        position: Position,
        now: Duration,
    ) -> SensingEvent {
        self.next_event(is_intruder, position, now)
    }

    fn next_event(
        &mut self,
        is_intruder: bool,
        position: Position,
        now: Duration,
    ) -> SensingEvent {
        let id = EventId(self.next_id);
        self.next_id += 1;
        SensingEvent {
            id,
            is_intruder,
            position,
            created_at: now,
        }
    }

    /// Seconds until the next generation step, while events remain.
    pub fn next_interval(
        &self,
        arrivals: &dyn ArrivalModel,
        sampler: &mut SamplingService,
    ) -> Option<f64> {
        if self.is_exhausted() {
            return None;
        }
        Some(arrivals.interval(self.config.mean_interval_secs, sampler))
    }

    /// Nodes whose distance to the event is within sensor range.
    pub fn perceiving_nodes<'a>(
        &self,
        event: &'a SensingEvent,
        nodes: &'a [PerimeterNode],
    ) -> impl Iterator<Item = NodeId> + 'a {
        let range = self.config.sensor_range;
        nodes
            .iter()
            .filter(move |node| node.position().distance(&event.position) <= range)
            .map(PerimeterNode::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_config::DetectionConfig;

    fn environment(total_events: u64) -> EventEnvironment {
        EventEnvironment::new(EnvironmentConfig {
            total_events,
            ..Default::default()
        })
    }

    #[test]
    fn stops_after_total_events() {
        let mut env = environment(3);
        let mut sampler = SamplingService::new(42);
        let ids: Vec<u64> = std::iter::from_fn(|| env.generate(Duration::ZERO, &mut sampler))
            .map(|e| e.id.0)
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(env.is_exhausted());
        assert_eq!(env.next_interval(&ExponentialArrivals, &mut sampler), None);
    }

    #[test]
    fn arrival_models_shape_intervals() {
        let env = environment(2);
        let mut sampler = SamplingService::new(42);
        assert_eq!(env.next_interval(&FixedArrivals(2.5), &mut sampler), Some(2.5));
        let drawn = env.next_interval(&ExponentialArrivals, &mut sampler);
        assert!(drawn.is_some_and(|secs| secs > 0.0));
    }

    #[test]
    fn positions_stay_in_area() {
        let mut env = environment(500);
        let mut sampler = SamplingService::new(7);
        while let Some(event) = env.generate(Duration::ZERO, &mut sampler) {
            assert!(event.position.x.abs() <= 25.0);
            assert!(event.position.y.abs() <= 25.0);
        }
    }

    #[test]
    fn injected_events_do_not_consume_event_count() {
        let mut env = environment(1);
        let injected = env.inject(true, Position::default(), Duration::from_secs(2));
        assert_eq!(injected.id, EventId(0));
        assert_eq!(injected.reading().event_time, Duration::from_secs(2));
        assert_eq!(env.remaining(), 1);

        let mut sampler = SamplingService::new(1);
        let generated = env.generate(Duration::ZERO, &mut sampler).unwrap();
        assert_eq!(generated.id, EventId(1));
    }

    #[test]
    fn perceiving_nodes_uses_sensor_range() {
        let env = environment(1);
        let policy = DetectionConfig::default();
        let nodes: Vec<PerimeterNode> = [0.0, 15.0, 16.0]
            .into_iter()
            .enumerate()
            .map(|(i, x)| {
                let id = NodeId(i as u32);
                PerimeterNode::new(id, Position::new(x, 0.0), std::iter::empty(), policy.clone())
            })
            .collect();
        let event = SensingEvent {
            id: EventId(0),
            is_intruder: false,
            position: Position::new(0.0, 0.0),
            created_at: Duration::ZERO,
        };
        let ids: Vec<NodeId> = env.perceiving_nodes(&event, &nodes).collect();
        assert_eq!(ids, vec![NodeId(0), NodeId(1)]);
    }
}
