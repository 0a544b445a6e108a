//! Scenarios against the part-of-speech tagger service.

pub mod live;
pub mod tag;

use crate::scenario::{IterationContext, LoadError, ScenarioRegistry};

/// Environment variable holding the tagger base URL.
pub const TARGET_URL_ENV: &str = "TAGGER_URL";

pub const DEFAULT_BASE_URL: &str = "http://host.docker.internal:8092";

/// Base URL from the run environment, or the default.
pub fn base_url(ctx: &IterationContext) -> String {
    ctx.env_or(TARGET_URL_ENV, DEFAULT_BASE_URL)
}

/// Register every built-in scenario.
pub async fn register_all(registry: &ScenarioRegistry) -> Result<(), LoadError> {
    registry
        .register(tag::TAG_MANIFEST.id, Box::new(tag::TagVirtualUser::new()))
        .await?;
    registry
        .register(live::LIVE_MANIFEST.id, Box::new(live::LiveVirtualUser::new()))
        .await?;
    Ok(())
}
