//! TCP readiness probe for the target service.

use crate::scenario::LoadError;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info};

const DIAL_TIMEOUT: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// `host:port` of an absolute URL, with the scheme's default port.
pub fn host_port(url: &str) -> Result<String, LoadError> {
    let uri: hyper::Uri = url
        .parse()
        .map_err(|e| LoadError::config(format!("can't parse {}: {}", url, e)))?;
    let host = uri
        .host()
        .ok_or_else(|| LoadError::config(format!("no host in {}", url)))?;
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("https") => 443,
        _ => 80,
    });
    Ok(format!("{}:{}", host, port))
}

/// Dial `url` until a TCP connection succeeds or `timeout` elapses.
///
/// A timeout too long to be represented as an instant never expires.
pub async fn wait_for_ready(url: &str, timeout: Duration) -> Result<(), LoadError> {
    let addr = host_port(url)?;
    let started = Instant::now();
    let deadline = started.checked_add(timeout);

    loop {
        // A single dial never outlives the overall deadline.
        let dial = match deadline {
            Some(d) => DIAL_TIMEOUT.min(d.saturating_duration_since(Instant::now())),
            None => DIAL_TIMEOUT,
        };
        debug!("dial {}", addr);
        match tokio::time::timeout(dial, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => {
                info!("{} is ready", addr);
                return Ok(());
            }
            Ok(Err(e)) => info!("waiting for {} ... ({})", addr, e),
            Err(_) => info!("waiting for {} ... (dial timeout)", addr),
        }

        if deadline.is_some_and(|d| Instant::now() + POLL_INTERVAL > d) {
            return Err(LoadError::NotReady {
                addr,
                waited: started.elapsed(),
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
