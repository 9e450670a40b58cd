//! HTTP transport over `reqwest`.
//!
//! Connection operations are blocking, so the transport owns a
//! current-thread tokio runtime and drives each request to completion on the
//! calling thread. Do not call it from inside another async runtime.

use std::time::Duration;

use super::{Method, Transport, TransportRequest, TransportResponse};
use crate::error::{ConnectionError, Result};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub struct HttpTransport {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    timeout_ms: u64,
}

impl HttpTransport {
    /// Transport with the default 30s request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            client,
            runtime,
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl Transport for HttpTransport {
    fn request(&self, request: TransportRequest) -> Result<TransportResponse> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
        } = request;

        log::debug!("{} {}", method, url);

        let mut builder = self.client.request(method.into(), &url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        self.runtime.block_on(async move {
            let response = builder
                .send()
                .await
                .map_err(|e| ConnectionError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| ConnectionError::Transport(e.to_string()))?;

            if !(200..300).contains(&status) {
                log::warn!("{} {} returned HTTP {}", method, url, status);
            }

            Ok(TransportResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_timeout() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(transport.timeout_ms(), 5000);
    }

    #[test]
    fn test_unreachable_host_is_transport_error() {
        let transport = HttpTransport::with_timeout(Duration::from_millis(500)).unwrap();
        let err = transport
            .request(TransportRequest::get("http://127.0.0.1:9/unreachable"))
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Transport(_)));
    }
}
