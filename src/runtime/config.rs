//! Runner configuration.
//!
//! Mirrors the subset of k6 options the runner understands. A JSON options
//! file such as
//!
//! ```json
//! { "vus": 2, "duration": "10s", "thresholds": { "checks": ["rate==1"] } }
//! ```
//!
//! deserializes straight into [`RunnerConfig`].

use crate::scenario::LoadError;
use crate::thresholds::{default_threshold_map, Thresholds};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::{Duration, Instant};

/// Configuration for a load-test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Number of concurrent virtual users.
    pub vus: u64,
    /// Total iterations shared by all virtual users.
    pub iterations: Option<u64>,
    /// Wall-clock limit for starting new iterations.
    #[serde(with = "duration_str::option")]
    pub duration: Option<Duration>,
    /// Metric name to threshold expressions.
    pub thresholds: BTreeMap<String, Vec<String>>,
    /// Variables visible to scenarios.
    pub env: HashMap<String, String>,
    /// Per-request timeout.
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,
    /// Wait up to this long for `probe_url` to accept TCP connections.
    #[serde(with = "duration_str::option")]
    pub wait_ready: Option<Duration>,
    /// URL whose host and port the readiness probe dials.
    pub probe_url: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            vus: 1,
            iterations: None,
            duration: None,
            thresholds: default_threshold_map(),
            env: HashMap::new(),
            request_timeout: Duration::from_secs(60),
            wait_ready: None,
            probe_url: None,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON options file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn vus(mut self, vus: u64) -> Self {
        self.vus = vus;
        self
    }

    pub fn iterations(mut self, iterations: u64) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Add a threshold expression for `metric`.
    pub fn threshold(mut self, metric: impl Into<String>, expression: impl Into<String>) -> Self {
        self.thresholds
            .entry(metric.into())
            .or_default()
            .push(expression.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Probe `url` for up to `timeout` before setup.
    pub fn wait_ready(mut self, url: impl Into<String>, timeout: Duration) -> Self {
        self.probe_url = Some(url.into());
        self.wait_ready = Some(timeout);
        self
    }

    /// Iterations to run in total; `None` means run until `duration` ends.
    /// With neither set a single iteration runs.
    pub fn iteration_budget(&self) -> Option<u64> {
        match (self.iterations, self.duration) {
            (Some(n), _) => Some(n),
            (None, Some(_)) => None,
            (None, None) => Some(1),
        }
    }

    /// Validate and parse thresholds.
    pub fn validate(&self) -> Result<Thresholds, LoadError> {
        if self.vus == 0 {
            return Err(LoadError::config("vus must be at least 1"));
        }
        if self.iterations == Some(0) {
            return Err(LoadError::config("iterations must be at least 1"));
        }
        if self.wait_ready.is_some() && self.probe_url.is_none() {
            return Err(LoadError::config("wait_ready requires a probe URL"));
        }
        for (name, value) in [("duration", self.duration), ("wait_ready", self.wait_ready)] {
            if let Some(d) = value {
                if Instant::now().checked_add(d).is_none() {
                    return Err(LoadError::config(format!("{} {:?} is too long", name, d)));
                }
            }
        }
        Thresholds::from_map(&self.thresholds)
    }
}

/// Parse durations such as `500ms`, `10s`, `2m`, `1h` or `1m30s`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string cannot be empty".to_string());
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("missing unit in duration '{}'", s))?;
        if digits == 0 {
            return Err(format!("invalid duration '{}'", s));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid number in duration '{}'", s))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let too_long = || format!("duration '{}' is too long", s);
        let unit = match &rest[..unit_len] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.checked_mul(60).ok_or_else(too_long)?),
            "h" => Duration::from_secs(value.checked_mul(3600).ok_or_else(too_long)?),
            other => return Err(format!("unknown duration unit '{}' in '{}'", other, s)),
        };
        total = total.checked_add(unit).ok_or_else(too_long)?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}

/// Format a duration the way [`parse_duration`] reads it.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

mod duration_str {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::{format_duration, parse_duration};
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(
            d: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match d {
                Some(d) => serializer.serialize_some(&format_duration(*d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("3d").is_err());
    }

    #[test]
    fn test_parse_duration_overflow_is_an_error() {
        assert!(parse_duration("6000000000000000h").is_err());
        assert!(parse_duration("400000000000000000m").is_err());
        assert!(parse_duration("18446744073709551615s1s").is_err());
        assert!(parse_duration("99999999999999999999s").is_err());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_duration() {
        let huge = parse_duration("4000000000000000h").unwrap();

        let err = RunnerConfig::new().duration(huge).validate().unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));

        let err = RunnerConfig::new()
            .wait_ready("http://localhost:8092", huge)
            .validate()
            .unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let err = RunnerConfig::new().iterations(0).validate().unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = std::env::temp_dir().join(format!("tagload-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("options.json");
        std::fs::write(
            &good,
            r#"{ "vus": 3, "iterations": 9, "env": { "TAGGER_URL": "http://x:8092" } }"#,
        )
        .unwrap();
        let config = RunnerConfig::from_file(&good).unwrap();
        assert_eq!(config.vus, 3);
        assert_eq!(config.iterations, Some(9));
        assert_eq!(config.env["TAGGER_URL"], "http://x:8092");
        assert_eq!(config.thresholds, default_threshold_map());

        let bad = dir.join("broken.json");
        std::fs::write(&bad, "{ \"vus\": ").unwrap();
        assert!(matches!(
            RunnerConfig::from_file(&bad),
            Err(LoadError::Json(_))
        ));

        assert!(matches!(
            RunnerConfig::from_file(dir.join("missing.json")),
            Err(LoadError::Io(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.vus, 1);
        assert_eq!(config.iteration_budget(), Some(1));
        assert_eq!(config.thresholds, default_threshold_map());
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_iteration_budget() {
        let config = RunnerConfig::new().duration(Duration::from_secs(5));
        assert_eq!(config.iteration_budget(), None);

        let config = config.iterations(20);
        assert_eq!(config.iteration_budget(), Some(20));
    }

    #[test]
    fn test_options_json() {
        let config: RunnerConfig = serde_json::from_str(
            r#"{
                "vus": 4,
                "duration": "30s",
                "requestTimeout": "2s",
                "thresholds": { "checks": ["rate==1"], "http_req_duration": ["p(95)<500"] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.vus, 4);
        assert_eq!(config.duration, Some(Duration::from_secs(30)));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.thresholds.len(), 2);
        assert_eq!(config.validate().unwrap().len(), 2);
    }

    #[test]
    fn test_validate_rejects_zero_vus() {
        let err = RunnerConfig::new().vus(0).validate().unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));
    }

    #[test]
    fn test_builder_threshold_appends() {
        let config = RunnerConfig::new().threshold("checks", "rate>0.9");
        assert_eq!(config.thresholds["checks"], vec!["rate==1", "rate>0.9"]);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(10)), "10s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
    }
}
