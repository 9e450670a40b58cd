//! # Platform transport
//!
//! The narrow interface every connection uses to reach its platform:
//! `request(method, url, headers, body) -> (status, body)`.
//!
//! ```text
//! Connection operation
//!   │ TransportRequest::post(url).header(..).json(body)
//!   ▼
//! Transport (trait)
//!   ├── HttpTransport    (reqwest, blocking facade over an owned runtime)
//!   └── MockTransport    (canned responses, records requests)
//! ```
//!
//! Network failures are `ConnectionError::Transport`. A response with a
//! non-success status becomes `ConnectionError::PlatformApi` once the caller
//! asks for its JSON body.

pub mod http;
pub mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use std::fmt;

use serde_json::Value;

use crate::error::{ConnectionError, Result};

/// HTTP method of a platform request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

/// One outbound platform request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw platform response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON, turning a non-success status into a
    /// `PlatformApi` error. An empty body decodes to `null`.
    pub fn json(self) -> Result<Value> {
        if !self.is_success() {
            return Err(ConnectionError::PlatformApi {
                status: self.status,
                message: self.body,
            });
        }
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// A capability to send requests to a platform.
pub trait Transport: Send + Sync {
    fn request(&self, request: TransportRequest) -> Result<TransportResponse>;
}
