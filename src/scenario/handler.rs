//! Virtual user trait, iteration context and error type.

use crate::checks::Check;
use crate::http::HttpClient;
use crate::metrics::Metrics;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Opaque value produced by `setup` and handed to every iteration.
pub type SetupData = serde_json::Value;

/// Context passed to every lifecycle call of a virtual user.
///
/// Setup and teardown see `vu == 0`; iterations see 1-based VU ids and a
/// 0-based per-VU iteration counter.
#[derive(Clone)]
pub struct IterationContext {
    /// Virtual user id.
    pub vu: u64,
    /// Iteration number within this virtual user.
    pub iteration: u64,
    /// Scenario name.
    pub scenario: String,
    env: Arc<HashMap<String, String>>,
    http: HttpClient,
    metrics: Arc<Metrics>,
}

impl IterationContext {
    /// Create a context with a default client and fresh metrics.
    pub fn new(scenario: impl Into<String>) -> Self {
        let metrics = Arc::new(Metrics::new());
        Self {
            vu: 0,
            iteration: 0,
            scenario: scenario.into(),
            env: Arc::new(HashMap::new()),
            http: HttpClient::default().with_metrics(metrics.clone()),
            metrics,
        }
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.env).insert(key.into(), value.into());
        self
    }

    /// Replace the environment.
    pub fn with_env_map(mut self, env: HashMap<String, String>) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Use `client` for requests, bound to this context's metrics.
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.http = client.with_metrics(self.metrics.clone());
        self
    }

    /// Record into `metrics` instead of the context's own.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.http = self.http.clone().with_metrics(metrics.clone());
        self.metrics = metrics;
        self
    }

    /// Copy of this context for one iteration of one virtual user.
    pub fn for_iteration(&self, vu: u64, iteration: u64) -> Self {
        Self {
            vu,
            iteration,
            ..self.clone()
        }
    }

    /// Get an environment variable.
    pub fn get_env(&self, key: &str) -> Option<&String> {
        self.env.get(key)
    }

    pub fn env_or(&self, key: &str, default: &str) -> String {
        self.get_env(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// HTTP client bound to the run's metrics.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Evaluate named checks against `target`.
    pub fn check<'a, T>(&'a self, target: &'a T) -> Check<'a, T> {
        self.metrics.checks().check(target)
    }

    /// Pause this virtual user.
    pub async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl std::fmt::Debug for IterationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterationContext")
            .field("vu", &self.vu)
            .field("iteration", &self.iteration)
            .field("scenario", &self.scenario)
            .field("env", &self.env)
            .finish()
    }
}

/// A scenario executed repeatedly by every virtual user.
///
/// Lifecycle: `setup` runs once before any iteration, `iteration` runs
/// until the run's iteration budget or duration is exhausted, `teardown`
/// runs once after all virtual users stop.
#[async_trait]
pub trait VirtualUser: Send + Sync {
    /// Called once before the first iteration.
    async fn setup(&self, ctx: &IterationContext) -> Result<SetupData, LoadError> {
        let _ = ctx;
        Ok(SetupData::Null)
    }

    /// One virtual user iteration.
    async fn iteration(&self, ctx: &IterationContext, data: &SetupData) -> Result<(), LoadError>;

    /// Called once after the last iteration.
    async fn teardown(&self, ctx: &IterationContext, data: &SetupData) -> Result<(), LoadError> {
        let _ = (ctx, data);
        Ok(())
    }

    /// Scenario name.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }
}

/// Errors raised by scenarios and the runner.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("setup failed: {0}")]
    Setup(String),

    #[error("iteration failed: {0}")]
    Iteration(String),

    #[error("scenario '{0}' not found")]
    ScenarioNotFound(String),

    #[error("scenario '{0}' is already registered")]
    DuplicateScenario(String),

    #[error("{addr} not ready after {waited:?}")]
    NotReady { addr: String, waited: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoadError {
    pub fn iteration(message: impl Into<String>) -> Self {
        Self::Iteration(message.into())
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
