pub mod error;
pub mod runtime;

// Re-export the runtime functions so frontends can simply do:
pub use error::EngineError;
pub use runtime::{
    generate_bug_report, render_summary, run_simulation_mode, run_sweep_mode, run_topology_mode,
    ReportFormat, SimulationOptions, SweepReport, SweepRun,
};
