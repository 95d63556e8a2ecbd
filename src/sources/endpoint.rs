//! Shared request-building helper and adapter construction options.

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::ClientError;
use crate::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};

/// Options accepted by every adapter constructor.
///
/// All fields are optional; adapters ignore settings they have no use for.
/// The factory fills unset fields from the resolved [`Config`](crate::config::Config).
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub api_key: Option<String>,
    /// Override the provider's base URL (used by tests and self-hosted mirrors)
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
    /// Language code for localized providers (Wikipedia)
    pub language: Option<String>,
    /// Contact address sent to providers that ask for one
    pub email: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub use_cache: Option<bool>,
    pub transport: Option<Arc<dyn Transport>>,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("language", &self.language)
            .field("email", &self.email)
            .field("cache_dir", &self.cache_dir)
            .field("use_cache", &self.use_cache)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn use_cache(mut self, enabled: bool) -> Self {
        self.use_cache = Some(enabled);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// The API key, ignoring blank values
    pub fn key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// The API key, or a configuration error naming the variable to set
    pub fn required_key(&self, provider: &str, variable: &str) -> Result<String, ClientError> {
        self.key().map(str::to_string).ok_or_else(|| {
            ClientError::Configuration(format!(
                "{} API key required. Set {} or pass api_key.",
                provider, variable
            ))
        })
    }

    /// Build the endpoint an adapter talks through
    pub fn endpoint(&self, default_base: &str, default_timeout: Duration) -> Result<Endpoint, ClientError> {
        let transport: Arc<dyn Transport> = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => match &self.user_agent {
                Some(agent) => Arc::new(ReqwestTransport::with_user_agent(agent)?),
                None => Arc::new(ReqwestTransport::new()?),
            },
        };

        Endpoint::new(
            transport,
            self.base_url.as_deref().unwrap_or(default_base),
            self.timeout.unwrap_or(default_timeout),
        )
    }
}

/// A provider base URL plus the transport and defaults used to reach it.
///
/// Adapters compose an `Endpoint` rather than inheriting request logic.
#[derive(Debug, Clone)]
pub struct Endpoint {
    transport: Arc<dyn Transport>,
    base_url: String,
    timeout: Duration,
    headers: Vec<(String, String)>,
}

impl Endpoint {
    /// Create an endpoint; the base URL must be absolute
    pub fn new(transport: Arc<dyn Transport>, base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        url::Url::parse(base_url)
            .map_err(|e| ClientError::Configuration(format!("Invalid base URL '{}': {}", base_url, e)))?;

        Ok(Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            headers: Vec::new(),
        })
    }

    /// Add a header sent with every request built by this endpoint
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Join a path onto the base URL
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Build a request for an absolute URL with this endpoint's defaults
    pub fn request(&self, method: Method, url: impl Into<String>) -> HttpRequest {
        self.headers.iter().fold(
            HttpRequest::new(method, url).timeout(self.timeout),
            |request, (name, value)| request.header(name.clone(), value.clone()),
        )
    }

    pub fn get(&self, path: &str) -> HttpRequest {
        self.request(Method::Get, self.url(path))
    }

    pub fn post(&self, path: &str) -> HttpRequest {
        self.request(Method::Post, self.url(path))
    }

    pub fn head(&self, path: &str) -> HttpRequest {
        self.request(Method::Head, self.url(path))
    }

    /// Execute without inspecting the status
    pub async fn send_raw(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        tracing::debug!("{} {}", request.method, request.url);
        let response = self.transport.execute(request).await?;
        tracing::debug!("{} {} -> {}", request.method, request.url, response.status);
        Ok(response)
    }

    /// Execute and surface non-2xx statuses as transport errors
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        Ok(self.send_raw(request).await?.error_for_status()?)
    }

    /// Blocking counterpart of [`send`](Self::send)
    pub fn send_blocking(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        tracing::debug!("{} {} (blocking)", request.method, request.url);
        Ok(self.transport.execute_blocking(request)?.error_for_status()?)
    }

    /// Execute and decode the body as a JSON document
    pub async fn fetch_json(&self, request: &HttpRequest) -> Result<Value, ClientError> {
        self.send(request).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn endpoint(base: &str) -> Result<Endpoint, ClientError> {
        Endpoint::new(Arc::new(MockTransport::new()), base, Duration::from_secs(5))
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let err = endpoint("not a url").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_url_joining() {
        let endpoint = endpoint("https://api.example.com/v1/").unwrap();
        assert_eq!(endpoint.url("items"), "https://api.example.com/v1/items");
        assert_eq!(endpoint.url("/items"), "https://api.example.com/v1/items");
        assert_eq!(endpoint.url(""), "https://api.example.com/v1");
    }

    #[test]
    fn test_default_headers_and_timeout() {
        let endpoint = endpoint("https://api.example.com")
            .unwrap()
            .with_header("Accept", "application/json");

        let request = endpoint.get("x");
        assert_eq!(request.header_value("accept"), Some("application/json"));
        assert_eq!(request.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_required_key() {
        let options = ClientOptions::new().api_key("  ");
        let err = options.required_key("NewsAPI", "NEWS_API_KEY").unwrap_err();
        assert!(err.to_string().contains("NEWS_API_KEY"));

        let options = ClientOptions::new().api_key("abc");
        assert_eq!(options.required_key("NewsAPI", "NEWS_API_KEY").unwrap(), "abc");
    }

    #[test]
    fn test_debug_redacts_key() {
        let options = ClientOptions::new().api_key("secret-value");
        assert!(!format!("{:?}", options).contains("secret-value"));
    }

    #[tokio::test]
    async fn test_send_surfaces_status() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("https://api.example.com/missing", HttpResponse::new(404, "nope"));
        let endpoint =
            Endpoint::new(mock.clone(), "https://api.example.com", Duration::from_secs(5)).unwrap();

        let request = endpoint.get("missing");
        let raw = endpoint.send_raw(&request).await.unwrap();
        assert_eq!(raw.status, 404);

        let err = endpoint.send(&request).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
