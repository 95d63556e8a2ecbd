//! `reqwest`-backed transport.

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use crate::sources::ClientError;

/// User agent sent when neither the caller nor the adapter picks one
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP executor with sensible defaults
///
/// Holds one client that follows redirects and one that does not, so the
/// redirect behaviour can be chosen per request. The blocking clients are
/// only built on first use.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Arc<Client>,
    no_redirect: Arc<Client>,
    blocking: Arc<OnceLock<reqwest::blocking::Client>>,
    blocking_no_redirect: Arc<OnceLock<reqwest::blocking::Client>>,
    user_agent: String,
}

impl ReqwestTransport {
    /// Create a transport with the crate's default user agent
    pub fn new() -> Result<Self, ClientError> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Create a transport with a custom user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self, ClientError> {
        let build = |policy: Policy| {
            Client::builder()
                .user_agent(user_agent)
                .connect_timeout(Duration::from_secs(10))
                .pool_idle_timeout(Duration::from_secs(90))
                .redirect(policy)
                .build()
                .map_err(|e| ClientError::Configuration(format!("Failed to create HTTP client: {}", e)))
        };

        Ok(Self {
            client: Arc::new(build(Policy::default())?),
            no_redirect: Arc::new(build(Policy::none())?),
            blocking: Arc::new(OnceLock::new()),
            blocking_no_redirect: Arc::new(OnceLock::new()),
            user_agent: user_agent.to_string(),
        })
    }

    /// Create from an existing reqwest Client (used for both redirect modes)
    pub fn from_client(client: Arc<Client>) -> Self {
        Self {
            no_redirect: Arc::clone(&client),
            client,
            blocking: Arc::new(OnceLock::new()),
            blocking_no_redirect: Arc::new(OnceLock::new()),
            user_agent: crate::transport::DEFAULT_USER_AGENT.to_string(),
        }
    }

    fn blocking_client(&self, follow: bool) -> Result<&reqwest::blocking::Client, TransportError> {
        let cell = if follow {
            &self.blocking
        } else {
            &self.blocking_no_redirect
        };

        if let Some(client) = cell.get() {
            return Ok(client);
        }

        let policy = if follow { Policy::default() } else { Policy::none() };
        let client = reqwest::blocking::Client::builder()
            .user_agent(self.user_agent.as_str())
            .connect_timeout(Duration::from_secs(10))
            .redirect(policy)
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to create blocking client: {}", e)))?;

        // A concurrent caller may have won the race; either client is fine.
        let _ = cell.set(client);
        cell.get()
            .ok_or_else(|| TransportError::Network("blocking client unavailable".to_string()))
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Head => reqwest::Method::HEAD,
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect
        };

        let mut builder = client
            .request(reqwest_method(request.method), &request.url)
            .timeout(request.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.json_body {
            builder = builder.json(body);
        }
        if let Some(fields) = &request.form_body {
            builder = builder.form(fields);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
            url,
        })
    }

    fn execute_blocking(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.blocking_client(request.follow_redirects)?;

        let mut builder = client
            .request(reqwest_method(request.method), &request.url)
            .timeout(request.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.json_body {
            builder = builder.json(body);
        }
        if let Some(fields) = &request.form_body {
            builder = builder.form(fields);
        }

        let response = builder
            .send()
            .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let body = response
            .text()
            .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
            url,
        })
    }
}
