//! Scripted transport for tests.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{HttpRequest, HttpResponse, Transport, TransportError};

#[derive(Debug, Clone)]
struct Route {
    prefix: String,
    outcome: Result<HttpResponse, TransportError>,
}

/// Transport that answers from a table of URL-prefix routes.
///
/// The longest matching prefix wins. Requests with no matching route fail
/// with [`TransportError::Connect`]. Every request is recorded so tests can
/// assert on what an adapter sent.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose full URL starts with `prefix`
    pub fn respond(&self, prefix: impl Into<String>, response: HttpResponse) -> &Self {
        self.add_route(prefix.into(), Ok(response));
        self
    }

    /// Answer with a JSON document and the given status
    pub fn respond_json(
        &self,
        prefix: impl Into<String>,
        status: u16,
        body: serde_json::Value,
    ) -> &Self {
        let response = HttpResponse::new(status, body.to_string())
            .with_header("content-type", "application/json");
        self.respond(prefix, response)
    }

    /// Fail requests whose full URL starts with `prefix`
    pub fn fail(&self, prefix: impl Into<String>, error: TransportError) -> &Self {
        self.add_route(prefix.into(), Err(error));
        self
    }

    /// Requests executed so far, oldest first
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The most recent request, if any
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests().pop()
    }

    fn add_route(&self, prefix: String, outcome: Result<HttpResponse, TransportError>) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.retain(|r| r.prefix != prefix);
        routes.push(Route { prefix, outcome });
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
    }

    fn answer(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let url = request.full_url();
        let routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        match routes.iter().find(|r| url.starts_with(&r.prefix)) {
            Some(route) => route.outcome.clone().map(|response| {
                if response.url.is_empty() {
                    response.with_url(url.clone())
                } else {
                    response
                }
            }),
            None => Err(TransportError::Connect(format!("no mock route for {}", url))),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.answer(request)
    }

    fn execute_blocking(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.answer(request)
    }
}
