// palisade-engine/src/runtime.rs

/*!
# Runtime Engine

Frontend-agnostic entry points: a single simulation run, a parallel seed
sweep and a topology dump. Simulations are CPU-bound and synchronous, so
each one runs on tokio's blocking pool and owns its entire world.
*/

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use opentelemetry::KeyValue;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use palisade_config::PalisadeConfig;
use palisade_simulator::{Simulation, SimulationError, Topology};
use palisade_telemetry::{
    BaselineSummary, EventLogger, MetricsRecorder, SimulationStatistics, StatisticsSummary,
};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Yaml,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "yaml" | "yml" => Ok(ReportFormat::Yaml),
            other => Err(format!("unknown report format '{other}' (expected text or yaml)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Expected statistics digest; a mismatch fails the run.
    pub validate_hash: Option<String>,
    /// Where mismatch reports are written.
    pub bug_report_dir: PathBuf,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            validate_hash: None,
            bug_report_dir: PathBuf::from("."),
        }
    }
}

/// Runs one simulation to completion and returns its summary.
#[instrument(
    level = "info",
    name = "run_simulation_mode",
    skip(config, options, metrics),
    fields(seed = config.simulation.seed)
)]
pub async fn run_simulation_mode(
    config: PalisadeConfig,
    options: &SimulationOptions,
    metrics: &MetricsRecorder,
) -> Result<StatisticsSummary, EngineError> {
    let seed = config.simulation.seed;
    let total_events = config.environment.total_events;
    let policy = config.detection.resolution_policy;

    let stats = tokio::task::spawn_blocking(move || simulate(config)).await??;
    metrics.record_run(&stats);
    let summary = stats.summary();
    info!(digest = %summary.digest, "Simulation complete");

    if let Some(expected) = options.validate_hash.as_deref() {
        if summary.digest != expected {
            let report = format!(
                "Simulation error: state hash mismatch!\nSeed: {}\nExpected: {}\nGot: {}\n\n{}\n",
                seed, expected, summary.digest, summary
            );
            match generate_bug_report(&options.bug_report_dir, &report) {
                Ok(path) => warn!(path = %path.display(), "Bug report written"),
                Err(e) => error!("Failed to write bug report: {:?}", e),
            }
            return Err(EngineError::HashMismatch {
                expected: expected.to_string(),
                actual: summary.digest,
            });
        }
    }

    EventLogger::log_event(
        "simulation_complete",
        vec![
            KeyValue::new("seed", seed.to_string()),
            KeyValue::new("event_count", total_events.to_string()),
            KeyValue::new("resolution_policy", policy.to_string()),
            KeyValue::new("final_hash", summary.digest.clone()),
        ],
    )
    .await;
    Ok(summary)
}

/// One row of a seed sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRun {
    pub seed: u64,
    pub summary: StatisticsSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub runs: Vec<SweepRun>,
    pub mean_detection_rate: f64,
    pub mean_false_positive_rate: f64,
    pub mean_latency_secs: f64,
    pub mean_outage_detection_rate: f64,
    /// Absent when no run had the baseline comparison enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_baseline: Option<BaselineSummary>,
}

impl SweepReport {
    fn new(runs: Vec<SweepRun>) -> Self {
        let average = |field: fn(&StatisticsSummary) -> f64| {
            if runs.is_empty() {
                0.0
            } else {
                runs.iter().map(|r| field(&r.summary)).sum::<f64>() / runs.len() as f64
            }
        };
        let baselines: Vec<&BaselineSummary> =
            runs.iter().filter_map(|r| r.summary.baseline.as_ref()).collect();
        let mean_baseline = (!baselines.is_empty()).then(|| {
            let n = baselines.len() as f64;
            BaselineSummary {
                alerts: baselines.iter().map(|b| b.alerts).sum(),
                detection_rate: baselines.iter().map(|b| b.detection_rate).sum::<f64>() / n,
                false_positive_rate: baselines.iter().map(|b| b.false_positive_rate).sum::<f64>()
                    / n,
            }
        });
        Self {
            mean_detection_rate: average(|s| s.detection_rate),
            mean_false_positive_rate: average(|s| s.false_positive_rate),
            mean_latency_secs: average(|s| s.mean_latency_secs),
            mean_outage_detection_rate: average(|s| s.outage_detection_rate),
            mean_baseline,
            runs,
        }
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>10}  {:>9}  {:>8}  {:>11}  digest",
            "seed", "detection", "fp rate", "latency (s)"
        )?;
        for run in &self.runs {
            writeln!(
                f,
                "{:>10}  {:>8.2}%  {:>7.2}%  {:>11.4}  {}",
                run.seed,
                run.summary.detection_rate,
                run.summary.false_positive_rate,
                run.summary.mean_latency_secs,
                &run.summary.digest[..16.min(run.summary.digest.len())]
            )?;
        }
        write!(
            f,
            "{:>10}  {:>8.2}%  {:>7.2}%  {:>11.4}",
            "mean",
            self.mean_detection_rate,
            self.mean_false_positive_rate,
            self.mean_latency_secs
        )?;
        write!(
            f,
            "\nmean outage detection rate: {:.2}%",
            self.mean_outage_detection_rate
        )?;
        if let Some(baseline) = &self.mean_baseline {
            write!(
                f,
                "\nbaseline: detection {:.2}%, fp rate {:.2}% ({} alerts)",
                baseline.detection_rate, baseline.false_positive_rate, baseline.alerts
            )?;
        }
        Ok(())
    }
}

/// Runs `runs` simulations with consecutive seeds starting at `base_seed`,
/// at most one per CPU at a time. Rows come back in seed order.
#[instrument(level = "info", name = "run_sweep_mode", skip(config, metrics))]
pub async fn run_sweep_mode(
    config: PalisadeConfig,
    base_seed: u64,
    runs: u32,
    metrics: &MetricsRecorder,
) -> Result<SweepReport, EngineError> {
    let seeds: Vec<u64> = (0..runs)
        .map(|offset| base_seed.wrapping_add(u64::from(offset)))
        .collect();
    let workers = num_cpus::get().max(1);
    info!(runs, workers, "Starting seed sweep");

    let mut results = Vec::with_capacity(seeds.len());
    for batch in seeds.chunks(workers) {
        let handles: Vec<_> = batch
            .iter()
            .map(|&seed| {
                let mut run_config = config.clone();
                run_config.simulation.seed = seed;
                (seed, tokio::task::spawn_blocking(move || simulate(run_config)))
            })
            .collect();

        for (seed, handle) in handles {
            let stats = handle.await??;
            metrics.record_run(&stats);
            results.push(SweepRun {
                seed,
                summary: stats.summary(),
            });
        }
    }

    let report = SweepReport::new(results);
    EventLogger::log_event(
        "sweep_complete",
        vec![
            KeyValue::new("base_seed", base_seed.to_string()),
            KeyValue::new("runs", i64::from(runs)),
            KeyValue::new("mean_detection_rate", report.mean_detection_rate),
        ],
    )
    .await;
    Ok(report)
}

/// Renders node placements and neighbour sets of the configured rings.
pub fn run_topology_mode(
    config: &PalisadeConfig,
    format: ReportFormat,
) -> Result<String, EngineError> {
    let topology = Topology::dual_ring(&config.topology);
    match format {
        ReportFormat::Yaml => Ok(serde_yaml::to_string(&topology)?),
        ReportFormat::Text => {
            let mut lines = vec![format!(
                "{} nodes, peer range {:.1} m",
                topology.len(),
                topology.peer_range()
            )];
            for placement in topology.placements() {
                let neighbours: Vec<String> =
                    placement.neighbours.iter().map(|n| n.to_string()).collect();
                lines.push(format!(
                    "{} {} neighbours: [{}]",
                    placement.id,
                    placement.position,
                    neighbours.join(", ")
                ));
            }
            Ok(lines.join("\n"))
        }
    }
}

pub fn render_summary(
    summary: &StatisticsSummary,
    format: ReportFormat,
) -> Result<String, EngineError> {
    match format {
        ReportFormat::Text => Ok(summary.to_string()),
        ReportFormat::Yaml => Ok(serde_yaml::to_string(summary)?),
    }
}

/// Writes `report` to a timestamped file in `dir` and returns its path.
pub fn generate_bug_report(dir: &Path, report: &str) -> Result<PathBuf, std::io::Error> {
    fs::create_dir_all(dir)?;
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let path = dir.join(format!("bug_report_{stamp}.txt"));
    fs::write(&path, report)?;
    Ok(path)
}

fn simulate(config: PalisadeConfig) -> Result<SimulationStatistics, SimulationError> {
    let mut simulation = Simulation::new(config)?;
    simulation.run();
    Ok(simulation.into_statistics())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> PalisadeConfig {
        let mut config = PalisadeConfig::default();
        config.environment.total_events = 50;
        config
    }

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("palisade-{}-{}", name, std::process::id()))
    }

    #[tokio::test]
    async fn simulation_is_reproducible_and_validates() {
        let metrics = MetricsRecorder::new().unwrap();
        let options = SimulationOptions::default();
        let first = run_simulation_mode(small_config(), &options, &metrics)
            .await
            .unwrap();
        assert_eq!(first.total_events, 50);

        let options = SimulationOptions {
            validate_hash: Some(first.digest.clone()),
            ..Default::default()
        };
        let second = run_simulation_mode(small_config(), &options, &metrics)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(metrics.runs.get(), 2);
    }

    #[tokio::test]
    async fn hash_mismatch_fails_and_writes_bug_report() {
        let dir = scratch_dir("mismatch");
        let metrics = MetricsRecorder::new().unwrap();
        let options = SimulationOptions {
            validate_hash: Some("not-a-digest".into()),
            bug_report_dir: dir.clone(),
        };
        let err = run_simulation_mode(small_config(), &options, &metrics)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::HashMismatch { .. }));

        let reports: Vec<_> = fs::read_dir(&dir).unwrap().collect();
        assert!(!reports.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn invalid_config_surfaces_as_simulation_error() {
        let mut config = small_config();
        config.detection.confirm_threshold = 0.5;
        let metrics = MetricsRecorder::new().unwrap();
        let err = run_simulation_mode(config, &SimulationOptions::default(), &metrics)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Simulation(_)));
    }

    #[tokio::test]
    async fn sweep_returns_rows_in_seed_order() {
        let metrics = MetricsRecorder::new().unwrap();
        let report = run_sweep_mode(small_config(), 100, 5, &metrics).await.unwrap();
        let seeds: Vec<u64> = report.runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![100, 101, 102, 103, 104]);
        assert_ne!(report.runs[0].summary.digest, report.runs[1].summary.digest);
        assert_eq!(metrics.runs.get(), 5);
        assert!(report.to_string().contains("mean"));
    }

    #[tokio::test]
    async fn empty_sweep_averages_to_zero() {
        let metrics = MetricsRecorder::new().unwrap();
        let report = run_sweep_mode(small_config(), 1, 0, &metrics).await.unwrap();
        assert!(report.runs.is_empty());
        assert_eq!(report.mean_detection_rate, 0.0);
        assert_eq!(report.mean_baseline, None);
    }

    #[tokio::test]
    async fn sweep_reports_baseline_and_outage_means() {
        let metrics = MetricsRecorder::new().unwrap();
        let report = run_sweep_mode(small_config(), 7, 3, &metrics).await.unwrap();
        let baseline = report.mean_baseline.clone().unwrap();
        let alerts: u64 = report
            .runs
            .iter()
            .map(|r| r.summary.baseline.as_ref().unwrap().alerts)
            .sum();
        assert_eq!(baseline.alerts, alerts);
        assert!(report.mean_outage_detection_rate >= 0.0);
        let text = report.to_string();
        assert!(text.contains("mean outage detection rate"));
        assert!(text.contains("baseline: detection"));

        let mut config = small_config();
        config.baseline.enabled = false;
        let report = run_sweep_mode(config, 7, 2, &metrics).await.unwrap();
        assert_eq!(report.mean_baseline, None);
        assert!(!report.to_string().contains("baseline"));
    }

    #[tokio::test]
    async fn yaml_summary_carries_comparison_fields() {
        let metrics = MetricsRecorder::new().unwrap();
        let summary = run_simulation_mode(small_config(), &SimulationOptions::default(), &metrics)
            .await
            .unwrap();
        let yaml = render_summary(&summary, ReportFormat::Yaml).unwrap();
        assert!(yaml.contains("outage_detection_rate:"));
        assert!(yaml.contains("peer_transmissions:"));
        assert!(yaml.contains("baseline:"));
    }

    #[test]
    fn topology_renders_both_formats() {
        let config = PalisadeConfig::default();
        let text = run_topology_mode(&config, ReportFormat::Text).unwrap();
        assert!(text.starts_with("16 nodes"));
        assert!(text.contains("node-0 (23.00, 0.00)"));
        let yaml = run_topology_mode(&config, ReportFormat::Yaml).unwrap();
        assert!(yaml.contains("peer_range: 30.0"));
    }

    #[test]
    fn report_format_parses() {
        assert_eq!("YAML".parse::<ReportFormat>().unwrap(), ReportFormat::Yaml);
        assert_eq!("text".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert!("json".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn bug_report_is_written() {
        let dir = scratch_dir("report");
        let path = generate_bug_report(&dir, "details").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "details");
        let _ = fs::remove_dir_all(&dir);
    }
}
