//! Scenarios: the virtual user iteration and its lifecycle.

pub mod handler;
pub mod manifest;
pub mod registry;

pub use handler::{IterationContext, LoadError, SetupData, VirtualUser};
pub use manifest::ScenarioManifest;
pub use registry::{ScenarioRegistry, ScenarioState};
