//! Timed HTTP client shared by all virtual users.

use crate::http::{LoadRequest, LoadResponse, Method, StatusCode, Timings};
use crate::metrics::Metrics;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Pooled HTTP/1 client that measures every request.
///
/// Cloning is cheap; clones share the connection pool and the metrics sink.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl HttpClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        let inner = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            inner,
            timeout,
            metrics: None,
        }
    }

    /// Record every request into the given metrics.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue a POST with the given body and headers.
    pub async fn post(
        &self,
        url: impl Into<String>,
        body: impl Into<Bytes>,
        headers: &[(&str, &str)],
    ) -> LoadResponse {
        let request = headers
            .iter()
            .fold(LoadRequest::new(Method::Post, url).body(body), |req, (k, v)| {
                req.header(*k, *v)
            });
        self.send(request).await
    }

    /// Issue a GET.
    pub async fn get(&self, url: impl Into<String>) -> LoadResponse {
        self.send(LoadRequest::new(Method::Get, url)).await
    }

    /// Send a request. Transport errors and timeouts come back as a
    /// response with status 0.
    pub async fn send(&self, request: LoadRequest) -> LoadResponse {
        let method = request.method;
        let url = request.url.clone();
        let start = Instant::now();

        let response = match tokio::time::timeout(self.timeout, self.execute(request, start)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => LoadResponse::transport_error(e.to_string(), start.elapsed()),
            Err(_) => LoadResponse::transport_error(
                format!("request timeout after {:?}", self.timeout),
                start.elapsed(),
            ),
        };

        debug!(
            "{} {} -> {} in {:.2}ms{}",
            method,
            url,
            response.status,
            response.timings.duration_ms(),
            response
                .error
                .as_deref()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default()
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_request(&response);
        }
        response
    }

    async fn execute(&self, request: LoadRequest, start: Instant) -> Result<LoadResponse, BoxError> {
        let mut builder = hyper::Request::builder()
            .method(hyper::Method::from(request.method))
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let req = builder.body(Full::new(request.body.unwrap_or_default()))?;

        let res = self.inner.request(req).await?;
        let status = StatusCode(res.status().as_u16());

        let mut headers = HashMap::new();
        for (name, value) in res.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_string(), v.to_string());
            }
        }

        let body_bytes = res.into_body().collect().await?.to_bytes();
        let duration = start.elapsed();

        Ok(LoadResponse {
            status,
            headers,
            body: if body_bytes.is_empty() {
                None
            } else {
                Some(body_bytes)
            },
            timings: Timings { duration },
            error: None,
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_target_yields_status_zero() {
        let metrics = Arc::new(Metrics::new());
        let client = HttpClient::new(Duration::from_secs(2)).with_metrics(metrics.clone());

        // Port 1 on loopback is reserved and closed.
        let response = client.get("http://127.0.0.1:1/live").await;

        assert_eq!(response.status, StatusCode::NONE);
        assert!(response.error.is_some());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.http_reqs, 1);
        assert_eq!(snapshot.http_req_failed.rate(), Some(1.0));
    }

    #[tokio::test]
    async fn test_invalid_url_is_a_transport_error() {
        let client = HttpClient::default();
        let response = client.get("not a url").await;
        assert_eq!(response.status, StatusCode::NONE);
        assert!(response.failed());
    }
}
