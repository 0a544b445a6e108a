//! HTTP types and the timed client used by virtual users.

mod client;
mod request;
mod response;

pub use client::HttpClient;
pub use request::{join_url, LoadRequest, Method};
pub use response::{LoadResponse, StatusCode, Timings};
