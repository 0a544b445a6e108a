//! Registry of scenarios and their run lifecycle.

use crate::scenario::handler::{IterationContext, LoadError, SetupData, VirtualUser};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Lifecycle state of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    /// Registered, never run.
    Registered,
    /// `setup` in progress.
    SettingUp,
    /// Virtual users are iterating.
    Running,
    /// `teardown` in progress.
    TearingDown,
    /// Run completed.
    Finished,
}

struct ScenarioEntry {
    scenario: Arc<dyn VirtualUser>,
    state: ScenarioState,
}

/// Scenarios available to the runner, keyed by name.
pub struct ScenarioRegistry {
    scenarios: RwLock<HashMap<String, ScenarioEntry>>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self {
            scenarios: RwLock::new(HashMap::new()),
        }
    }

    /// Register a scenario. Names must be unique.
    pub async fn register(
        &self,
        name: impl Into<String>,
        scenario: Box<dyn VirtualUser>,
    ) -> Result<(), LoadError> {
        let name = name.into();
        let mut scenarios = self.scenarios.write().await;

        if scenarios.contains_key(&name) {
            return Err(LoadError::DuplicateScenario(name));
        }

        scenarios.insert(
            name.clone(),
            ScenarioEntry {
                scenario: Arc::from(scenario),
                state: ScenarioState::Registered,
            },
        );
        info!("Registered scenario: {}", name);
        Ok(())
    }

    /// Look up a scenario.
    pub async fn get(&self, name: &str) -> Result<Arc<dyn VirtualUser>, LoadError> {
        let scenarios = self.scenarios.read().await;
        scenarios
            .get(name)
            .map(|e| e.scenario.clone())
            .ok_or_else(|| LoadError::ScenarioNotFound(name.to_string()))
    }

    async fn set_state(&self, name: &str, state: ScenarioState) -> Result<(), LoadError> {
        let mut scenarios = self.scenarios.write().await;
        let entry = scenarios
            .get_mut(name)
            .ok_or_else(|| LoadError::ScenarioNotFound(name.to_string()))?;
        entry.state = state;
        Ok(())
    }

    /// Run `setup` and mark the scenario as running.
    pub async fn setup(&self, name: &str, ctx: &IterationContext) -> Result<SetupData, LoadError> {
        let scenario = self.get(name).await?;
        self.set_state(name, ScenarioState::SettingUp).await?;

        // Lock is not held across the scenario's own await points.
        match scenario.setup(ctx).await {
            Ok(data) => {
                self.set_state(name, ScenarioState::Running).await?;
                info!("Scenario '{}' set up", name);
                Ok(data)
            }
            Err(e) => {
                error!("Setup of scenario '{}' failed: {}", name, e);
                self.set_state(name, ScenarioState::Finished).await?;
                Err(e)
            }
        }
    }

    /// Run `teardown` and mark the scenario as finished. Teardown errors
    /// are logged, not returned.
    pub async fn teardown(
        &self,
        name: &str,
        ctx: &IterationContext,
        data: &SetupData,
    ) -> Result<(), LoadError> {
        let scenario = self.get(name).await?;
        self.set_state(name, ScenarioState::TearingDown).await?;

        if let Err(e) = scenario.teardown(ctx, data).await {
            error!("Error during teardown of scenario '{}': {}", name, e);
        }

        self.set_state(name, ScenarioState::Finished).await?;
        info!("Scenario '{}' finished", name);
        Ok(())
    }

    pub async fn get_state(&self, name: &str) -> Option<ScenarioState> {
        let scenarios = self.scenarios.read().await;
        scenarios.get(name).map(|e| e.state)
    }

    /// Registered scenarios as `(name, description, state)`, sorted by name.
    pub async fn list(&self) -> Vec<(String, String, ScenarioState)> {
        let scenarios = self.scenarios.read().await;
        let mut list: Vec<_> = scenarios
            .iter()
            .map(|(name, entry)| {
                (
                    name.clone(),
                    entry.scenario.description().to_string(),
                    entry.state,
                )
            })
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }

    pub async fn remove(&self, name: &str) -> Result<(), LoadError> {
        let mut scenarios = self.scenarios.write().await;
        scenarios
            .remove(name)
            .ok_or_else(|| LoadError::ScenarioNotFound(name.to_string()))?;
        info!("Removed scenario: {}", name);
        Ok(())
    }
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        Self::new()
    }
}
