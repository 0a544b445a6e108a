//! # tagload - load tests for the part-of-speech tagger
//!
//! tagload runs scenarios written as plain async iteration functions
//! against the tagger's HTTP API, evaluates named checks on every response
//! and decides overall success from k6-style thresholds.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Runner                             │
//! │   ┌──────┐ ┌──────┐ ┌──────┐        ┌───────────────────┐    │
//! │   │ VU 1 │ │ VU 2 │ │ ...  │ ─────▶ │ ScenarioRegistry  │    │
//! │   └──┬───┘ └──┬───┘ └──┬───┘        └───────────────────┘    │
//! │      └────────┼────────┘                                     │
//! │               ▼                                              │
//! │     HttpClient ──▶ Metrics / CheckSet ──▶ Thresholds         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tagload::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LoadError> {
//!     let runner = Runner::new(
//!         RunnerConfig::new()
//!             .vus(2)
//!             .iterations(20)
//!             .env("TAGGER_URL", "http://localhost:8092"),
//!     );
//!     tagload::scenarios::register_all(&runner.registry()).await?;
//!
//!     let summary = runner.run("tag").await?;
//!     println!("{}", summary);
//!     std::process::exit(summary.exit_code() as i32);
//! }
//! ```
//!
//! ## Iteration lifecycle
//!
//! 1. **Setup** (`setup`): once per run, may return data for iterations
//! 2. **Iteration** (`iteration`): called repeatedly by every virtual user
//! 3. **Teardown** (`teardown`): once after all virtual users stop

extern crate self as tagload;

pub mod checks;
pub mod http;
pub mod metrics;
pub mod runtime;
pub mod scenario;
pub mod scenarios;
pub mod thresholds;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::checks::{Check, CheckSet};
    pub use crate::http::{join_url, HttpClient, LoadRequest, LoadResponse, Method, StatusCode};
    pub use crate::runtime::{RunSummary, Runner, RunnerConfig};
    pub use crate::scenario::{
        IterationContext, LoadError, ScenarioRegistry, SetupData, VirtualUser,
    };
    pub use async_trait::async_trait;
    pub use tagload_macro::virtual_user;
}

pub use http::{HttpClient, LoadRequest, LoadResponse};
pub use runtime::{RunSummary, Runner, RunnerConfig};
pub use scenario::{IterationContext, LoadError, VirtualUser};
