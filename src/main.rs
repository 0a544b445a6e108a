//! tagload CLI.
//!
//! Usage:
//!   tagload run                         # one iteration of the tag scenario
//!   tagload run tag --vus 10 -d 30s     # 10 VUs for 30 seconds
//!   tagload run live --wait-ready 20s   # wait for the service, then smoke test
//!   tagload list                        # registered scenarios

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tagload::prelude::*;
use tagload::runtime::parse_duration;
use tagload::scenarios::{self, DEFAULT_BASE_URL, TARGET_URL_ENV};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tagload")]
#[command(about = "Load tests for the part-of-speech tagger HTTP API", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario
    Run(RunArgs),

    /// List registered scenarios
    List,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Scenario to run
    #[arg(default_value = "tag")]
    scenario: String,

    /// JSON options file (vus, iterations, duration, thresholds, ...)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Number of virtual users
    #[arg(short = 'u', long)]
    vus: Option<u64>,

    /// Total iterations shared by all virtual users
    #[arg(short, long)]
    iterations: Option<u64>,

    /// Run duration, e.g. 30s or 2m
    #[arg(short, long, value_parser = parse_duration)]
    duration: Option<Duration>,

    /// Tagger base URL [default: http://host.docker.internal:8092]
    #[arg(long, env = TARGET_URL_ENV)]
    target: Option<String>,

    /// Extra variables for scenarios, KEY=VALUE
    #[arg(short = 'e', long = "env", value_parser = parse_key_val)]
    env: Vec<(String, String)>,

    /// Wait for the target to accept connections, e.g. 20s
    #[arg(long, value_parser = parse_duration)]
    wait_ready: Option<Duration>,

    /// Write the run summary as JSON
    #[arg(long)]
    summary_export: Option<PathBuf>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    Ok((key.to_string(), value.to_string()))
}

fn build_config(args: &RunArgs) -> Result<RunnerConfig, LoadError> {
    let mut config = match &args.options {
        Some(path) => RunnerConfig::from_file(path)?,
        None => RunnerConfig::new(),
    };

    if let Some(vus) = args.vus {
        config = config.vus(vus);
    }
    if let Some(iterations) = args.iterations {
        config = config.iterations(iterations);
    }
    if let Some(duration) = args.duration {
        config = config.duration(duration);
    }
    if let Some(target) = &args.target {
        config = config.env(TARGET_URL_ENV, target.clone());
    }
    for (key, value) in &args.env {
        config = config.env(key.clone(), value.clone());
    }
    if let Some(timeout) = args.wait_ready {
        let target = config
            .env
            .get(TARGET_URL_ENV)
            .cloned()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        config = config.wait_ready(target, timeout);
    }
    Ok(config)
}

async fn run(args: RunArgs) -> Result<u8, LoadError> {
    let config = build_config(&args)?;
    let runner = Runner::new(config);
    scenarios::register_all(&runner.registry()).await?;

    let summary = runner.run(&args.scenario).await?;
    println!("{}", summary);

    if let Some(path) = &args.summary_export {
        summary.write_json(path)?;
        tracing::info!("Summary written to {}", path.display());
    }
    Ok(summary.exit_code())
}

async fn list() -> Result<u8, LoadError> {
    let registry = ScenarioRegistry::new();
    scenarios::register_all(&registry).await?;
    for (name, description, _) in registry.list().await {
        println!("{:<8} {}", name, description);
    }
    Ok(0)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::List => list().await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args() -> RunArgs {
        RunArgs {
            scenario: "tag".to_string(),
            options: None,
            vus: None,
            iterations: None,
            duration: None,
            target: None,
            env: Vec::new(),
            wait_ready: None,
            summary_export: None,
        }
    }

    fn options_file(name: &str, json: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tagload-{}-{}.json", name, std::process::id()));
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_options_file_target_is_kept() {
        let path = options_file("keep", r#"{ "env": { "TAGGER_URL": "http://from-file:9000" } }"#);
        let args = RunArgs {
            options: Some(path.clone()),
            wait_ready: Some(Duration::from_secs(5)),
            ..run_args()
        };

        let config = build_config(&args).unwrap();
        assert_eq!(config.env[TARGET_URL_ENV], "http://from-file:9000");
        assert_eq!(config.probe_url.as_deref(), Some("http://from-file:9000"));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_target_flag_overrides_options_file() {
        let path = options_file("override", r#"{ "env": { "TAGGER_URL": "http://from-file:9000" } }"#);
        let args = RunArgs {
            options: Some(path.clone()),
            target: Some("http://from-flag:8092".to_string()),
            wait_ready: Some(Duration::from_secs(5)),
            ..run_args()
        };

        let config = build_config(&args).unwrap();
        assert_eq!(config.env[TARGET_URL_ENV], "http://from-flag:8092");
        assert_eq!(config.probe_url.as_deref(), Some("http://from-flag:8092"));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_env_pair_sets_wait_ready_target() {
        let args = RunArgs {
            env: vec![(TARGET_URL_ENV.to_string(), "http://from-env-flag:1".to_string())],
            wait_ready: Some(Duration::from_secs(5)),
            ..run_args()
        };

        let config = build_config(&args).unwrap();
        assert_eq!(config.probe_url.as_deref(), Some("http://from-env-flag:1"));
    }

    #[test]
    fn test_default_target() {
        let args = RunArgs {
            wait_ready: Some(Duration::from_secs(5)),
            ..run_args()
        };

        let config = build_config(&args).unwrap();
        assert!(!config.env.contains_key(TARGET_URL_ENV));
        assert_eq!(config.probe_url.as_deref(), Some(DEFAULT_BASE_URL));
    }
}
