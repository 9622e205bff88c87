//! ## palisade-telemetry::statistics
//! **Run accumulator and end-of-run summary**
//!
//! Counters only grow during a run. Derived metrics are computed once by
//! [`SimulationStatistics::summary`]; every ratio guards its divisor and
//! reports `0` instead of NaN.
//!
//! `peer_messages_sent` counts transmissions as a radio sees them: one per
//! verify-request broadcast and one per verify-response. `peer_transmissions`
//! counts per-recipient deliveries.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use blake3::Hasher;
use serde::Serialize;

use palisade_detection::{DiscardReason, EventId, SensorReading};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStatistics {
    pub total_events: u64,
    pub intruder_events: u64,
    pub noise_events: u64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub peer_messages_sent: u64,
    /// One sample per uplink, in emission order (seconds).
    pub latencies: Vec<f64>,

    pub peer_transmissions: u64,
    pub peer_verified_uplinks: u64,
    pub verification_cycles: u64,
    pub rejected_schedules: u64,
    pub discards: BTreeMap<DiscardReason, u64>,
    /// Uplinks sent while the gateway was down.
    pub uplinks_during_outage: u64,

    pub baseline_evaluations: u64,
    pub baseline_true_positives: u64,
    pub baseline_false_positives: u64,

    detected_events: BTreeSet<EventId>,
    unique_true_positives: u64,
    unique_false_positives: u64,
    unique_during_outage: u64,
}

impl SimulationStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self, is_intruder: bool) {
        self.total_events += 1;
        if is_intruder {
            self.intruder_events += 1;
        } else {
            self.noise_events += 1;
        }
    }

    /// Classifies by ground truth and returns the latency sample (seconds).
    /// An uplink during a gateway outage still counts as a detection.
    pub fn record_uplink(
        &mut self,
        reading: &SensorReading,
        used_peer_verification: bool,
        gateway_up: bool,
        now: Duration,
    ) -> f64 {
        let latency = now.saturating_sub(reading.event_time).as_secs_f64();
        self.latencies.push(latency);

        if reading.is_intruder {
            self.true_positives += 1;
        } else {
            self.false_positives += 1;
        }
        if used_peer_verification {
            self.peer_verified_uplinks += 1;
        }
        if !gateway_up {
            self.uplinks_during_outage += 1;
        }

        if self.detected_events.insert(reading.event_id) {
            if reading.is_intruder {
                self.unique_true_positives += 1;
            } else {
                self.unique_false_positives += 1;
            }
            if !gateway_up {
                self.unique_during_outage += 1;
            }
        }
        latency
    }

    /// One radio transmission: a request broadcast or a response.
    #[inline]
    pub fn record_peer_message(&mut self) {
        self.peer_messages_sent += 1;
    }

    /// One delivery to one recipient.
    #[inline]
    pub fn record_peer_transmission(&mut self) {
        self.peer_transmissions += 1;
    }

    /// Outcome of the single-threshold baseline for one event.
    pub fn record_baseline(&mut self, is_intruder: bool, alerted: bool) {
        self.baseline_evaluations += 1;
        match (alerted, is_intruder) {
            (true, true) => self.baseline_true_positives += 1,
            (true, false) => self.baseline_false_positives += 1,
            (false, _) => {}
        }
    }

    #[inline]
    pub fn record_verification_cycle(&mut self) {
        self.verification_cycles += 1;
    }

    pub fn record_discard(&mut self, reason: DiscardReason) {
        *self.discards.entry(reason).or_default() += 1;
    }

    #[inline]
    pub fn record_rejected_schedule(&mut self) {
        self.rejected_schedules += 1;
    }

    pub fn discard_count(&self, reason: DiscardReason) -> u64 {
        self.discards.get(&reason).copied().unwrap_or(0)
    }

    pub fn uplinks(&self) -> u64 {
        self.true_positives + self.false_positives
    }

    /// Events that produced at least one uplink.
    pub fn unique_detections(&self) -> u64 {
        self.detected_events.len() as u64
    }

    /// Events whose first uplink went out while the gateway was down.
    pub fn detections_during_outage(&self) -> u64 {
        self.unique_during_outage
    }

    /// BLAKE3 over every raw counter and the exact latency bit patterns.
    pub fn digest(&self) -> String {
        let mut hasher = Hasher::new();
        for counter in [
            self.total_events,
            self.intruder_events,
            self.noise_events,
            self.true_positives,
            self.false_positives,
            self.peer_messages_sent,
            self.peer_transmissions,
            self.peer_verified_uplinks,
            self.verification_cycles,
            self.rejected_schedules,
            self.uplinks_during_outage,
            self.baseline_evaluations,
            self.baseline_true_positives,
            self.baseline_false_positives,
            self.unique_true_positives,
            self.unique_false_positives,
            self.unique_during_outage,
        ] {
            hasher.update(&counter.to_le_bytes());
        }
        for (reason, count) in &self.discards {
            hasher.update(reason.as_str().as_bytes());
            hasher.update(&count.to_le_bytes());
        }
        hasher.update(&(self.latencies.len() as u64).to_le_bytes());
        for latency in &self.latencies {
            hasher.update(&latency.to_bits().to_le_bytes());
        }
        hex::encode(hasher.finalize().as_bytes())
    }

    pub fn summary(&self) -> StatisticsSummary {
        let mut sorted = self.latencies.clone();
        sorted.sort_by(f64::total_cmp);

        StatisticsSummary {
            total_events: self.total_events,
            intruder_events: self.intruder_events,
            noise_events: self.noise_events,
            true_positives: self.true_positives,
            false_positives: self.false_positives,
            peer_messages_sent: self.peer_messages_sent,
            peer_transmissions: self.peer_transmissions,
            peer_verified_uplinks: self.peer_verified_uplinks,
            verification_cycles: self.verification_cycles,
            discarded_inputs: self.discards.values().sum(),
            rejected_schedules: self.rejected_schedules,
            mean_latency_secs: mean(&sorted),
            max_latency_secs: sorted.last().copied().unwrap_or(0.0),
            p95_latency_secs: percentile(&sorted, 95.0),
            detection_rate: percent(self.true_positives, self.intruder_events),
            false_positive_rate: percent(self.false_positives, self.noise_events),
            unique_detections: self.unique_detections(),
            unique_detection_rate: percent(self.unique_true_positives, self.intruder_events),
            unique_false_positive_rate: percent(self.unique_false_positives, self.noise_events),
            uplinks_during_outage: self.uplinks_during_outage,
            detections_during_outage: self.unique_during_outage,
            outage_detection_rate: percent(self.unique_during_outage, self.unique_detections()),
            baseline: (self.baseline_evaluations > 0).then(|| BaselineSummary {
                alerts: self.baseline_true_positives + self.baseline_false_positives,
                detection_rate: percent(self.baseline_true_positives, self.intruder_events),
                false_positive_rate: percent(self.baseline_false_positives, self.noise_events),
            }),
            digest: self.digest(),
        }
    }
}

/// Derived end-of-run report. Rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub total_events: u64,
    pub intruder_events: u64,
    pub noise_events: u64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub peer_messages_sent: u64,
    pub peer_transmissions: u64,
    pub peer_verified_uplinks: u64,
    pub verification_cycles: u64,
    pub discarded_inputs: u64,
    pub rejected_schedules: u64,
    pub mean_latency_secs: f64,
    pub max_latency_secs: f64,
    pub p95_latency_secs: f64,
    pub detection_rate: f64,
    pub false_positive_rate: f64,
    pub unique_detections: u64,
    pub unique_detection_rate: f64,
    pub unique_false_positive_rate: f64,
    pub uplinks_during_outage: u64,
    pub detections_during_outage: u64,
    /// Share of unique detections first reported during an outage.
    pub outage_detection_rate: f64,
    /// Absent when the baseline comparison is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BaselineSummary>,
    pub digest: String,
}

/// Single-threshold comparison over the same events. Rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineSummary {
    pub alerts: u64,
    pub detection_rate: f64,
    pub false_positive_rate: f64,
}

impl fmt::Display for StatisticsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== SIMULATION RESULTS ===")?;
        writeln!(f, "Total Events: {}", self.total_events)?;
        writeln!(f, "  Intruders: {}", self.intruder_events)?;
        writeln!(f, "  Noise: {}", self.noise_events)?;
        writeln!(f, "True Positives: {}", self.true_positives)?;
        writeln!(f, "False Positives: {}", self.false_positives)?;
        writeln!(
            f,
            "Peer Messages: {} ({} deliveries)",
            self.peer_messages_sent, self.peer_transmissions
        )?;
        writeln!(f, "Peer-Verified Uplinks: {}", self.peer_verified_uplinks)?;
        writeln!(f, "Mean Latency: {:.4} s", self.mean_latency_secs)?;
        writeln!(f, "P95 Latency: {:.4} s", self.p95_latency_secs)?;
        writeln!(f, "Max Latency: {:.4} s", self.max_latency_secs)?;
        writeln!(f, "Detection Rate: {:.2}%", self.detection_rate)?;
        writeln!(f, "False Positive Rate: {:.2}%", self.false_positive_rate)?;
        writeln!(
            f,
            "Unique Detections: {} ({:.2}% of intruders, {:.2}% of noise)",
            self.unique_detections, self.unique_detection_rate, self.unique_false_positive_rate
        )?;
        writeln!(
            f,
            "Detections During Gateway Outage: {} ({:.2}%)",
            self.detections_during_outage, self.outage_detection_rate
        )?;
        if let Some(baseline) = &self.baseline {
            writeln!(
                f,
                "Baseline: {} alerts, Detection Rate {:.2}%, False Positive Rate {:.2}%",
                baseline.alerts, baseline.detection_rate, baseline.false_positive_rate
            )?;
        }
        write!(f, "Digest: {}", self.digest)
    }
}

fn percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

/// Linear interpolation between closest ranks. `sorted` must be ascending.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = pct / 100.0 * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}
