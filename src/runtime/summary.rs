//! End-of-run summary.

use crate::checks::CheckTally;
use crate::metrics::{MetricsSnapshot, TrendSummary};
use crate::scenario::LoadError;
use crate::thresholds::{Outcome, ThresholdResult};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Exit code when any threshold fails.
pub const THRESHOLDS_FAILED_EXIT_CODE: u8 = 99;

#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
    pub pass_rate: f64,
}

impl From<&CheckTally> for CheckSummary {
    fn from(tally: &CheckTally) -> Self {
        let total = tally.total();
        Self {
            name: tally.name.clone(),
            passes: tally.passes,
            fails: tally.fails,
            pass_rate: if total == 0 {
                0.0
            } else {
                tally.passes as f64 / total as f64
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricSummary {
    pub checks_rate: Option<f64>,
    pub http_reqs: u64,
    pub http_reqs_per_second: Option<f64>,
    pub http_req_failed_rate: Option<f64>,
    pub http_req_duration: TrendSummary,
    pub iterations: u64,
    pub iteration_errors: u64,
    pub iteration_duration: TrendSummary,
}

/// Result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub vus: u64,
    pub elapsed_ms: f64,
    pub checks: Vec<CheckSummary>,
    pub metrics: MetricSummary,
    pub thresholds: Vec<ThresholdResult>,
}

impl RunSummary {
    pub fn new(
        scenario: impl Into<String>,
        vus: u64,
        snapshot: &MetricsSnapshot,
        thresholds: Vec<ThresholdResult>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            vus,
            elapsed_ms: snapshot.elapsed.as_nanos() as f64 / 1_000_000.0,
            checks: snapshot.check_tallies.iter().map(CheckSummary::from).collect(),
            metrics: MetricSummary {
                checks_rate: snapshot.checks.rate(),
                http_reqs: snapshot.http_reqs,
                http_reqs_per_second: snapshot.per_second(snapshot.http_reqs),
                http_req_failed_rate: snapshot.http_req_failed.rate(),
                http_req_duration: snapshot.http_req_duration.summary(),
                iterations: snapshot.iterations,
                iteration_errors: snapshot.iteration_errors,
                iteration_duration: snapshot.iteration_duration.summary(),
            },
            thresholds,
        }
    }

    /// True unless a threshold failed.
    pub fn passed(&self) -> bool {
        !self.thresholds.iter().any(ThresholdResult::failed)
    }

    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            0
        } else {
            THRESHOLDS_FAILED_EXIT_CODE
        }
    }

    /// Write the summary as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn ms(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}ms", v))
        .unwrap_or_else(|| "-".to_string())
}

fn trend_line(f: &mut fmt::Formatter<'_>, name: &str, t: &TrendSummary) -> fmt::Result {
    writeln!(
        f,
        "     {:.<24} avg={} min={} med={} max={} p(90)={} p(95)={}",
        name,
        ms(t.avg),
        ms(t.min),
        ms(t.med),
        ms(t.max),
        ms(t.p90),
        ms(t.p95)
    )
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  scenario: {} ({} VUs, {:.1}s)", self.scenario, self.vus, self.elapsed_ms / 1000.0)?;
        writeln!(f)?;

        for check in &self.checks {
            let mark = if check.fails == 0 { "✓" } else { "✗" };
            writeln!(f, "     {} {}", mark, check.name)?;
            if check.fails > 0 {
                writeln!(
                    f,
                    "      ↳  {:.0}% - ✓ {} / ✗ {}",
                    check.pass_rate * 100.0,
                    check.passes,
                    check.fails
                )?;
            }
        }
        writeln!(f)?;

        let m = &self.metrics;
        writeln!(
            f,
            "     {:.<24} {}",
            "checks",
            m.checks_rate
                .map(|r| format!("{:.2}%", r * 100.0))
                .unwrap_or_else(|| "-".to_string())
        )?;
        trend_line(f, "http_req_duration", &m.http_req_duration)?;
        writeln!(
            f,
            "     {:.<24} {}",
            "http_req_failed",
            m.http_req_failed_rate
                .map(|r| format!("{:.2}%", r * 100.0))
                .unwrap_or_else(|| "-".to_string())
        )?;
        writeln!(
            f,
            "     {:.<24} {} {}",
            "http_reqs",
            m.http_reqs,
            m.http_reqs_per_second
                .map(|r| format!("{:.2}/s", r))
                .unwrap_or_default()
        )?;
        trend_line(f, "iteration_duration", &m.iteration_duration)?;
        writeln!(
            f,
            "     {:.<24} {} ({} errored)",
            "iterations", m.iterations, m.iteration_errors
        )?;

        if !self.thresholds.is_empty() {
            writeln!(f)?;
            for t in &self.thresholds {
                let mark = match t.outcome {
                    Outcome::Passed => "✓",
                    Outcome::Failed => "✗",
                    Outcome::Skipped => "-",
                };
                writeln!(f, "     {} {}: {}", mark, t.metric, t.source)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use crate::thresholds::Thresholds;

    fn summary_with(passes: usize, fails: usize) -> RunSummary {
        let metrics = Metrics::new();
        for _ in 0..passes {
            metrics.checks().record("status was 200", true);
        }
        for _ in 0..fails {
            metrics.checks().record("status was 200", false);
        }
        let snapshot = metrics.snapshot();
        let results = Thresholds::default().evaluate(&snapshot);
        RunSummary::new("tag", 1, &snapshot, results)
    }

    #[test]
    fn test_passing_summary() {
        let summary = summary_with(3, 0);
        assert!(summary.passed());
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.checks[0].pass_rate, 1.0);
        assert!(summary.to_string().contains("✓ status was 200"));
    }

    #[test]
    fn test_failing_summary() {
        let summary = summary_with(3, 1);
        assert!(!summary.passed());
        assert_eq!(summary.exit_code(), THRESHOLDS_FAILED_EXIT_CODE);
        assert_eq!(summary.checks[0].pass_rate, 0.75);
        assert!(summary.to_string().contains("✗ status was 200"));
    }

    #[test]
    fn test_summary_serializes() {
        let json = serde_json::to_value(summary_with(1, 0)).unwrap();
        assert_eq!(json["scenario"], "tag");
        assert_eq!(json["thresholds"][0]["outcome"], "passed");
        assert_eq!(json["checks"][0]["passes"], 1);
    }
}
