// palisade-simulator/src/lib.rs

/*!
# Palisade Simulator

Deterministic discrete-event simulation of the perimeter protocol. One
[`Simulation`] owns its whole world: the scheduler, every node state machine,
the sampling stream, the event environment and the statistics. Nothing is
shared between runs, so independent seeds can run on separate threads.

## Key Components:
- **Topology:** dual-ring placement and the symmetric neighbour relation.
- **Transport:** per-message delivery delay for verification traffic.
- **Environment:** sensing-event generation and sensor-range dispatch.
- **Gateway:** up/down availability; uplinks during an outage are tagged.
- **Baseline:** single-threshold comparison detector over the same events.
- **Runner:** routes scheduled actions into nodes and node actions back into
  the scheduler, the transport and the statistics.
*/

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use validator::Validate;

use palisade_config::{ConfigError, PalisadeConfig};
use palisade_core::{SamplingService, Scheduler, SchedulerStats};
use palisade_detection::{
    ConfidenceModel, GaussianConfidence, NodeAction, NodeId, PeerMessage, PerimeterNode, Position,
    SensorReading,
};
use palisade_telemetry::SimulationStatistics;

pub mod baseline;
pub mod environment;
pub mod gateway;
pub mod topology;
pub mod transport;

pub use baseline::BaselineDetector;
pub use environment::{
    ArrivalModel, EventEnvironment, ExponentialArrivals, FixedArrivals, SensingEvent,
};
pub use gateway::Gateway;
pub use topology::{NodePlacement, Topology};
pub use transport::{FixedTransport, TransportModel, UniformJitterTransport};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Payload of every scheduled action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimAction {
    /// Environment generation step.
    GenerateEvent,
    /// A sensing event reaches a node after the processing delay.
    Deliver { node: NodeId, reading: SensorReading },
    /// A verification message reaches `to`.
    Message {
        from: NodeId,
        to: NodeId,
        message: PeerMessage,
    },
    /// A node's verification window closes.
    Timeout { node: NodeId },
}

/// Assembles a [`Simulation`], with defaults derived from the configuration.
#[derive(Debug)]
pub struct SimulationBuilder {
    config: PalisadeConfig,
    topology: Option<Topology>,
    confidence: Option<Box<dyn ConfidenceModel>>,
    transport: Option<Box<dyn TransportModel>>,
    arrivals: Option<Box<dyn ArrivalModel>>,
}

impl SimulationBuilder {
    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = Some(topology);
        self
    }

    pub fn confidence_model(mut self, model: impl ConfidenceModel + 'static) -> Self {
        self.confidence = Some(Box::new(model));
        self
    }

    pub fn transport(mut self, transport: impl TransportModel + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn arrivals(mut self, arrivals: impl ArrivalModel + 'static) -> Self {
        self.arrivals = Some(Box::new(arrivals));
        self
    }

    pub fn build(self) -> Result<Simulation, SimulationError> {
        let config = self.config;
        config.validate().map_err(ConfigError::from)?;

        let topology = self
            .topology
            .unwrap_or_else(|| Topology::dual_ring(&config.topology));
        let confidence = self
            .confidence
            .unwrap_or_else(|| Box::new(GaussianConfidence::new(&config.confidence)));
        let transport = self
            .transport
            .unwrap_or_else(|| Box::new(UniformJitterTransport::new(&config.transport)));
        let arrivals = self
            .arrivals
            .unwrap_or_else(|| Box::new(ExponentialArrivals));
        let seed = config.simulation.seed;
        let baseline = config
            .baseline
            .enabled
            .then(|| BaselineDetector::new(&config.baseline, &config.confidence, seed));

        let mut scheduler = Scheduler::new();
        let environment = EventEnvironment::new(config.environment.clone());
        if !environment.is_exhausted() {
            scheduler.schedule(config.environment.start_delay(), SimAction::GenerateEvent);
        }

        Ok(Simulation {
            scheduler,
            stop_time: config.simulation.stop_time(),
            world: World {
                nodes: topology.build_nodes(&config.detection),
                processing_delay: config.environment.processing_delay(),
                environment,
                transport,
                confidence,
                arrivals,
                gateway: Gateway::new(&config.gateway, seed),
                baseline,
                sampler: SamplingService::new(seed),
                stats: SimulationStatistics::new(),
            },
        })
    }
}

#[derive(Debug)]
pub struct Simulation {
    scheduler: Scheduler<SimAction>,
    stop_time: Duration,
    world: World,
}

/// Everything a scheduled action may touch, kept apart from the scheduler
/// so both can be borrowed mutably inside the run loop.
#[derive(Debug)]
struct World {
    nodes: Vec<PerimeterNode>,
    processing_delay: Duration,
    environment: EventEnvironment,
    transport: Box<dyn TransportModel>,
    confidence: Box<dyn ConfidenceModel>,
    arrivals: Box<dyn ArrivalModel>,
    gateway: Gateway,
    baseline: Option<BaselineDetector>,
    sampler: SamplingService,
    stats: SimulationStatistics,
}

impl Simulation {
    pub fn builder(config: PalisadeConfig) -> SimulationBuilder {
        SimulationBuilder {
            config,
            topology: None,
            confidence: None,
            transport: None,
            arrivals: None,
        }
    }

    /// Dual-ring topology, Gaussian confidence and uniform jitter.
    pub fn new(config: PalisadeConfig) -> Result<Self, SimulationError> {
        Self::builder(config).build()
    }

    pub fn seed(&self) -> u64 {
        self.world.sampler.seed()
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn stop_time(&self) -> Duration {
        self.stop_time
    }

    pub fn nodes(&self) -> &[PerimeterNode] {
        &self.world.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&PerimeterNode> {
        self.world.nodes.get(id.index())
    }

    pub fn statistics(&self) -> &SimulationStatistics {
        &self.world.stats
    }

    pub fn into_statistics(self) -> SimulationStatistics {
        self.world.stats
    }

    /// Gateway down phases entered up to the last uplink.
    pub fn gateway_outages(&self) -> u64 {
        self.world.gateway.outages()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn pending_actions(&self) -> usize {
        self.scheduler.pending()
    }

    /// Dispatches a hand-built event at the current logical time.
    /// It is counted like a generated event.
    pub fn inject_event(&mut self, is_intruder: bool, position: Position) -> SensingEvent {
        let now = self.scheduler.now();
        let event = self.world.environment.inject(is_intruder, position, now);
        self.world.record_and_dispatch(&mut self.scheduler, &event);
        event
    }

    /// Runs until the queue drains or the configured stop time.
    pub fn run(&mut self) -> u64 {
        info!(
            seed = self.seed(),
            nodes = self.world.nodes.len(),
            total_events = self.world.environment.config().total_events,
            "Simulation started"
        );
        let executed = self.run_until(self.stop_time);
        info!(
            executed,
            now = self.scheduler.now_secs(),
            events = self.world.stats.total_events,
            uplinks = self.world.stats.uplinks(),
            "Simulation finished"
        );
        executed
    }

    /// Runs every action due no later than `until` (capped at the stop time).
    pub fn run_until(&mut self, until: Duration) -> u64 {
        let world = &mut self.world;
        self.scheduler.run(until.min(self.stop_time), |scheduler, action| {
            world.handle(scheduler, action)
        })
    }
}

impl World {
    fn handle(&mut self, scheduler: &mut Scheduler<SimAction>, action: SimAction) {
        let now = scheduler.now();
        match action {
            SimAction::GenerateEvent => self.generate(scheduler),
            SimAction::Deliver { node, reading } => {
                let Some(target) = self.nodes.get_mut(node.index()) else {
                    warn!(node = node.0, "Delivery to unknown node dropped");
                    return;
                };
                let confidence = self
                    .confidence
                    .score(node, reading.is_intruder, &mut self.sampler);
                let actions = target.on_sensor_event(reading, confidence, now);
                self.apply(scheduler, node, actions);
            }
            SimAction::Message { from, to, message } => {
                let Some(target) = self.nodes.get_mut(to.index()) else {
                    warn!(node = to.0, kind = message.kind(), "Message to unknown node dropped");
                    return;
                };
                let actions = match message {
                    PeerMessage::VerifyRequest { reading } => {
                        let confidence = self
                            .confidence
                            .score(to, reading.is_intruder, &mut self.sampler);
                        target.on_verify_request(from, reading, confidence)
                    }
                    PeerMessage::VerifyResponse { event_id } => {
                        target.on_verify_response(from, event_id, now)
                    }
                };
                self.apply(scheduler, to, actions);
            }
            SimAction::Timeout { node } => {
                let Some(target) = self.nodes.get_mut(node.index()) else {
                    return;
                };
                let actions = target.on_timeout(now);
                self.apply(scheduler, node, actions);
            }
        }
    }

    fn generate(&mut self, scheduler: &mut Scheduler<SimAction>) {
        let now = scheduler.now();
        let Some(event) = self.environment.generate(now, &mut self.sampler) else {
            return;
        };
        self.record_and_dispatch(scheduler, &event);

        let interval = self
            .environment
            .next_interval(self.arrivals.as_ref(), &mut self.sampler);
        if let Some(interval) = interval {
            if let Err(err) = scheduler.schedule_secs(interval, SimAction::GenerateEvent) {
                self.stats.record_rejected_schedule();
                warn!(
                    %err,
                    remaining = self.environment.remaining(),
                    "Event generation stopped"
                );
            }
        }
    }

    fn record_and_dispatch(
        &mut self,
        scheduler: &mut Scheduler<SimAction>,
        event: &SensingEvent,
    ) {
        self.stats.record_event(event.is_intruder);
        if let Some(baseline) = self.baseline.as_mut() {
            let alerted = baseline.alerts(event.is_intruder);
            self.stats.record_baseline(event.is_intruder, alerted);
        }
        let reading = event.reading();
        let mut perceived = 0;
        for node in self.environment.perceiving_nodes(event, &self.nodes) {
            scheduler.schedule(self.processing_delay, SimAction::Deliver { node, reading });
            perceived += 1;
        }
        debug!(
            event = event.id.0,
            intruder = event.is_intruder,
            x = event.position.x,
            y = event.position.y,
            perceived,
            "Sensing event generated"
        );
    }

    fn apply(
        &mut self,
        scheduler: &mut Scheduler<SimAction>,
        node: NodeId,
        actions: Vec<NodeAction>,
    ) {
        let now = scheduler.now();
        for action in actions {
            match action {
                NodeAction::Uplink {
                    reading,
                    used_peer_verification,
                } => {
                    let gateway_up = self.gateway.is_up(now);
                    let latency = self.stats.record_uplink(
                        &reading,
                        used_peer_verification,
                        gateway_up,
                        now,
                    );
                    debug!(
                        node = node.0,
                        event = reading.event_id.0,
                        intruder = reading.is_intruder,
                        latency,
                        used_peer_verification,
                        gateway_up,
                        "Uplink"
                    );
                }
                NodeAction::Send { to, message } => {
                    self.stats.record_peer_message();
                    self.transmit(scheduler, node, to, message);
                }
                NodeAction::Broadcast { message } => {
                    self.stats.record_peer_message();
                    let Some(sender) = self.nodes.get(node.index()) else {
                        continue;
                    };
                    let recipients: Vec<NodeId> = sender.neighbours().collect();
                    for to in recipients {
                        self.transmit(scheduler, node, to, message);
                    }
                }
                NodeAction::StartTimeout { delay } => {
                    self.stats.record_verification_cycle();
                    let token = scheduler.schedule(delay, SimAction::Timeout { node });
                    if let Some(target) = self.nodes.get_mut(node.index()) {
                        target.arm_timeout(token);
                    }
                }
                NodeAction::CancelTimeout { token } => {
                    scheduler.cancel(token);
                }
                NodeAction::Discard(reason) => {
                    self.stats.record_discard(reason);
                    debug!(node = node.0, %reason, "Node input discarded");
                }
            }
        }
    }

    /// One delivery to one recipient after a transport delay.
    fn transmit(
        &mut self,
        scheduler: &mut Scheduler<SimAction>,
        from: NodeId,
        to: NodeId,
        message: PeerMessage,
    ) {
        self.stats.record_peer_transmission();
        let delay = self.transport.delay(&message, &mut self.sampler);
        scheduler.schedule(delay, SimAction::Message { from, to, message });
    }
}
