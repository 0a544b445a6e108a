//! Scenario manifest for compile-time metadata.

use serde::Serialize;

/// Metadata for a scenario generated by `#[virtual_user]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScenarioManifest {
    /// Unique scenario identifier.
    pub id: &'static str,
    /// Human readable description.
    pub description: &'static str,
    /// Pause after every successful iteration, in milliseconds.
    pub think_time_ms: u64,
}

impl ScenarioManifest {
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            description: "",
            think_time_ms: 0,
        }
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_think_time_ms(mut self, think_time_ms: u64) -> Self {
        self.think_time_ms = think_time_ms;
        self
    }

    pub fn think_time(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.think_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_builder() {
        const MANIFEST: ScenarioManifest = ScenarioManifest::new("tag")
            .with_description("POST to /tag")
            .with_think_time_ms(100);

        assert_eq!(MANIFEST.id, "tag");
        assert_eq!(MANIFEST.description, "POST to /tag");
        assert_eq!(MANIFEST.think_time(), std::time::Duration::from_millis(100));
    }

    #[test]
    fn test_manifest_serialization() {
        let json = serde_json::to_string(&ScenarioManifest::new("live")).unwrap();
        assert!(json.contains("\"id\":\"live\""));
    }
}
