//! ## palisade-telemetry::metrics
//! **Prometheus exposition of run statistics**
//!
//! The simulation itself never touches these. A finished run's
//! [`SimulationStatistics`] is folded in with [`MetricsRecorder::record_run`],
//! so one recorder can aggregate a whole seed sweep.

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

use crate::statistics::SimulationStatistics;

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub runs: IntCounter,
    pub sensing_events: IntCounterVec,
    pub uplinks: IntCounterVec,
    pub peer_messages: IntCounter,
    pub outage_uplinks: IntCounter,
    pub discarded_inputs: IntCounterVec,
    pub uplink_latency: Histogram,
    pub detection_rate: Gauge,
    pub false_positive_rate: Gauge,
    pub baseline_detection_rate: Gauge,
    pub baseline_false_positive_rate: Gauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let runs = IntCounter::new("palisade_runs_total", "Completed simulation runs")?;
        let sensing_events = IntCounterVec::new(
            Opts::new("palisade_sensing_events_total", "Generated sensing events"),
            &["truth"],
        )?;
        let uplinks = IntCounterVec::new(
            Opts::new("palisade_uplinks_total", "Uplink reports by outcome"),
            &["outcome"],
        )?;
        let peer_messages = IntCounter::new(
            "palisade_peer_messages_total",
            "Verify-request broadcasts and verify-responses sent",
        )?;
        let outage_uplinks = IntCounter::new(
            "palisade_outage_uplinks_total",
            "Uplinks sent while the gateway was down",
        )?;
        let discarded_inputs = IntCounterVec::new(
            Opts::new("palisade_discarded_inputs_total", "Benign inputs ignored by nodes"),
            &["reason"],
        )?;
        let uplink_latency = Histogram::with_opts(
            HistogramOpts::new(
                "palisade_uplink_latency_seconds",
                "Time from sensing event to uplink",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 3.0, 3.5, 5.0]),
        )?;
        let detection_rate = Gauge::new(
            "palisade_detection_rate_percent",
            "Detection rate of the last recorded run",
        )?;
        let false_positive_rate = Gauge::new(
            "palisade_false_positive_rate_percent",
            "False positive rate of the last recorded run",
        )?;
        let baseline_detection_rate = Gauge::new(
            "palisade_baseline_detection_rate_percent",
            "Single-threshold baseline detection rate of the last recorded run",
        )?;
        let baseline_false_positive_rate = Gauge::new(
            "palisade_baseline_false_positive_rate_percent",
            "Single-threshold baseline false positive rate of the last recorded run",
        )?;

        registry.register(Box::new(runs.clone()))?;
        registry.register(Box::new(sensing_events.clone()))?;
        registry.register(Box::new(uplinks.clone()))?;
        registry.register(Box::new(peer_messages.clone()))?;
        registry.register(Box::new(outage_uplinks.clone()))?;
        registry.register(Box::new(discarded_inputs.clone()))?;
        registry.register(Box::new(uplink_latency.clone()))?;
        registry.register(Box::new(detection_rate.clone()))?;
        registry.register(Box::new(false_positive_rate.clone()))?;
        registry.register(Box::new(baseline_detection_rate.clone()))?;
        registry.register(Box::new(baseline_false_positive_rate.clone()))?;

        Ok(Self {
            registry,
            runs,
            sensing_events,
            uplinks,
            peer_messages,
            outage_uplinks,
            discarded_inputs,
            uplink_latency,
            detection_rate,
            false_positive_rate,
            baseline_detection_rate,
            baseline_false_positive_rate,
        })
    }

    pub fn record_run(&self, stats: &SimulationStatistics) {
        self.runs.inc();
        self.sensing_events
            .with_label_values(&["intruder"])
            .inc_by(stats.intruder_events);
        self.sensing_events
            .with_label_values(&["noise"])
            .inc_by(stats.noise_events);
        self.uplinks
            .with_label_values(&["true_positive"])
            .inc_by(stats.true_positives);
        self.uplinks
            .with_label_values(&["false_positive"])
            .inc_by(stats.false_positives);
        self.peer_messages.inc_by(stats.peer_messages_sent);
        self.outage_uplinks.inc_by(stats.uplinks_during_outage);
        for (reason, count) in &stats.discards {
            self.discarded_inputs
                .with_label_values(&[reason.as_str()])
                .inc_by(*count);
        }
        for latency in &stats.latencies {
            self.uplink_latency.observe(*latency);
        }

        let summary = stats.summary();
        self.detection_rate.set(summary.detection_rate);
        self.false_positive_rate.set(summary.false_positive_rate);
        if let Some(baseline) = &summary.baseline {
            self.baseline_detection_rate.set(baseline.detection_rate);
            self.baseline_false_positive_rate
                .set(baseline.false_positive_rate);
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
