//! Runner, configuration, readiness probe and run summary.

mod config;
pub mod probe;
mod runner;
mod summary;

pub use config::{format_duration, parse_duration, RunnerConfig};
pub use runner::Runner;
pub use summary::{CheckSummary, MetricSummary, RunSummary, THRESHOLDS_FAILED_EXIT_CODE};
