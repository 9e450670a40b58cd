//! Canned-response transport for tests.
//!
//! Routes match on method plus the URL path suffix (query string ignored);
//! the first matching route answers. Unmatched requests get a 404. Every
//! request is recorded for later assertions.

use parking_lot::Mutex;

use super::{Method, Transport, TransportRequest, TransportResponse};
use crate::error::{ConnectionError, Result};

#[derive(Debug, Clone)]
enum Reply {
    Response(TransportResponse),
    NetworkError(String),
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    path_suffix: String,
    reply: Reply,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` requests whose path ends with `path_suffix`.
    pub fn respond(self, method: Method, path_suffix: &str, status: u16, body: &str) -> Self {
        self.routes.lock().push(Route {
            method,
            path_suffix: path_suffix.to_string(),
            reply: Reply::Response(TransportResponse::new(status, body)),
        });
        self
    }

    /// Fail matching requests as if the network were down.
    pub fn fail(self, method: Method, path_suffix: &str, message: &str) -> Self {
        self.routes.lock().push(Route {
            method,
            path_suffix: path_suffix.to_string(),
            reply: Reply::NetworkError(message.to_string()),
        });
        self
    }

    /// All requests seen so far, in order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().last().cloned()
    }
}

impl Transport for MockTransport {
    fn request(&self, request: TransportRequest) -> Result<TransportResponse> {
        let path = request.url.split('?').next().unwrap_or_default().to_string();
        let method = request.method;
        self.requests.lock().push(request);

        let routes = self.routes.lock();
        let route = routes
            .iter()
            .find(|r| r.method == method && path.ends_with(&r.path_suffix));

        match route.map(|r| &r.reply) {
            Some(Reply::Response(response)) => Ok(response.clone()),
            Some(Reply::NetworkError(message)) => Err(ConnectionError::Transport(message.clone())),
            None => Ok(TransportResponse::new(404, "{\"message\": \"Not Found\"}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_and_records() {
        let transport = MockTransport::new()
            .respond(Method::Get, "/users/@me", 200, "{\"username\": \"bot\"}")
            .fail(Method::Get, "/gateway", "connection reset");

        let ok = transport
            .request(TransportRequest::get("https://d/api/users/@me?x=1"))
            .unwrap();
        assert_eq!(ok.status, 200);

        assert!(transport
            .request(TransportRequest::get("https://d/api/gateway"))
            .is_err());

        let missing = transport
            .request(TransportRequest::post("https://d/api/users/@me"))
            .unwrap();
        assert_eq!(missing.status, 404);

        assert_eq!(transport.request_count(), 3);
        assert_eq!(transport.last_request().unwrap().method, Method::Post);
    }
}
