//! Load-test runner.

use crate::http::HttpClient;
use crate::metrics::Metrics;
use crate::runtime::{probe, RunSummary, RunnerConfig};
use crate::scenario::{IterationContext, LoadError, ScenarioRegistry, VirtualUser};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs registered scenarios with a pool of virtual users.
///
/// Each virtual user is a tokio task that invokes the scenario's iteration
/// back to back. Iterations are shared across users when an iteration
/// budget is set; with a duration, users stop starting iterations once it
/// elapses and finish the one in flight.
pub struct Runner {
    config: RunnerConfig,
    registry: Arc<ScenarioRegistry>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(ScenarioRegistry::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RunnerConfig::default())
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<ScenarioRegistry> {
        self.registry.clone()
    }

    /// Register a scenario with the runner.
    pub async fn register_scenario(
        &self,
        name: impl Into<String>,
        scenario: Box<dyn VirtualUser>,
    ) -> Result<(), LoadError> {
        self.registry.register(name, scenario).await
    }

    /// Run `scenario` to completion and evaluate thresholds.
    pub async fn run(&self, scenario: &str) -> Result<RunSummary, LoadError> {
        let thresholds = self.config.validate()?;
        let user = self.registry.get(scenario).await?;

        if let (Some(timeout), Some(url)) = (self.config.wait_ready, &self.config.probe_url) {
            probe::wait_for_ready(url, timeout).await?;
        }

        let metrics = Arc::new(Metrics::new());
        let ctx = IterationContext::new(scenario)
            .with_env_map(self.config.env.clone())
            .with_client(HttpClient::new(self.config.request_timeout))
            .with_metrics(metrics.clone());

        let data = Arc::new(self.registry.setup(scenario, &ctx).await?);

        let budget = self
            .config
            .iteration_budget()
            .map(|n| Arc::new(AtomicU64::new(n)));
        let deadline = self
            .config
            .duration
            .map(|d| {
                Instant::now()
                    .checked_add(d)
                    .ok_or_else(|| LoadError::config(format!("duration {:?} is too long", d)))
            })
            .transpose()?;

        info!(
            "Running scenario '{}' with {} VUs ({})",
            scenario,
            self.config.vus,
            match self.config.iteration_budget() {
                Some(n) => format!("{} iterations", n),
                None => format!("for {:?}", self.config.duration.unwrap_or_default()),
            }
        );

        let mut handles = Vec::with_capacity(self.config.vus as usize);
        for vu in 1..=self.config.vus {
            let user = user.clone();
            let ctx = ctx.clone();
            let data = data.clone();
            let budget = budget.clone();
            let metrics = metrics.clone();

            handles.push(tokio::spawn(async move {
                let mut iteration = 0u64;
                loop {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        break;
                    }
                    if let Some(budget) = &budget {
                        let claimed = budget
                            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                            .is_ok();
                        if !claimed {
                            break;
                        }
                    }

                    let iter_ctx = ctx.for_iteration(vu, iteration);
                    let started = Instant::now();
                    let result = user.iteration(&iter_ctx, &data).await;
                    metrics.record_iteration(started.elapsed(), result.is_err());

                    if let Err(e) = result {
                        warn!("VU {} iteration {} failed: {}", vu, iteration, e);
                    }
                    iteration += 1;
                }
                debug!("VU {} stopped after {} iterations", vu, iteration);
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Virtual user task failed: {}", e);
            }
        }

        self.registry.teardown(scenario, &ctx, &data).await?;

        let snapshot = metrics.snapshot();
        let results = thresholds.evaluate(&snapshot);
        for result in results.iter().filter(|r| r.failed()) {
            warn!(
                "Threshold crossed: {} {} (observed {:?})",
                result.metric, result.source, result.observed
            );
        }

        let summary = RunSummary::new(scenario, self.config.vus, &snapshot, results);
        info!(
            "Scenario '{}' done: {} iterations, {} requests, {}",
            scenario,
            snapshot.iterations,
            snapshot.http_reqs,
            if summary.passed() { "thresholds passed" } else { "thresholds failed" }
        );
        Ok(summary)
    }
}
