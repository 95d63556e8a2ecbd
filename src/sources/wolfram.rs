//! Wolfram|Alpha computational knowledge source.

use serde_json::Value;
use std::time::Duration;

use crate::models::{Pod, ResultType, Subpod, WolframResult};
use crate::sources::{Adapter, ClientError, ClientOptions, Endpoint, ErrorMode, SourceCapabilities};

const WOLFRAM_API_BASE: &str = "https://api.wolframalpha.com";

/// Status the short-answer APIs use for input they cannot interpret
const NOT_UNDERSTOOD: u16 = 501;

/// Wolfram|Alpha client
///
/// An App ID is mandatory and checked at construction. Queries the engine
/// cannot interpret come back as an unsuccessful [`WolframResult`]; network
/// and server failures are returned as errors.
#[derive(Debug, Clone)]
pub struct WolframClient {
    endpoint: Endpoint,
    app_id: String,
}

impl WolframClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let app_id = options.required_key("Wolfram Alpha", "WOLFRAMALPHA_APP_ID")?;
        let endpoint = options.endpoint(WOLFRAM_API_BASE, Duration::from_secs(30))?;
        Ok(Self { endpoint, app_id })
    }

    async fn short_answer(
        &self,
        path: &str,
        query: &str,
        result_type: ResultType,
    ) -> Result<WolframResult, ClientError> {
        let mut request = self
            .endpoint
            .get(path)
            .query("i", query)
            .query("appid", &self.app_id);
        if result_type == ResultType::Text {
            request = request.query("format", "plaintext");
        }

        let response = self.endpoint.send_raw(&request).await?;
        if response.status == NOT_UNDERSTOOD {
            tracing::info!("Wolfram Alpha did not understand: {}", query);
            return Ok(WolframResult::unanswered(
                query,
                "Wolfram Alpha couldn't understand the query",
            ));
        }

        let response = response.error_for_status()?;
        Ok(WolframResult::answered(query, response.body, result_type))
    }

    /// Short plain-text answer
    pub async fn query(&self, query: &str) -> Result<WolframResult, ClientError> {
        tracing::info!("Wolfram Alpha query: {}", query);
        self.short_answer("/v1/result", query, ResultType::Text).await
    }

    /// Answer phrased as a spoken sentence
    pub async fn query_spoken(&self, query: &str) -> Result<WolframResult, ClientError> {
        tracing::info!("Wolfram Alpha spoken query: {}", query);
        self.short_answer("/v1/spoken", query, ResultType::Spoken)
            .await
    }

    /// URL of the rendered image answer; performs no request
    pub fn query_image_url(&self, query: &str) -> Result<WolframResult, ClientError> {
        let url = url::Url::parse_with_params(
            &self.endpoint.url("/v1/simple"),
            &[("i", query), ("appid", self.app_id.as_str())],
        )?;
        Ok(WolframResult::answered(query, url.as_str(), ResultType::Image))
    }

    /// Every pod of the full results API
    pub async fn query_full(&self, query: &str) -> Result<WolframResult, ClientError> {
        tracing::info!("Wolfram Alpha full query: {}", query);

        let request = self
            .endpoint
            .get("/v2/query")
            .query("input", query)
            .query("appid", &self.app_id)
            .query("output", "json")
            .query("format", "plaintext");

        let data = self.endpoint.fetch_json(&request).await?;
        let query_result = data
            .get("queryresult")
            .ok_or_else(|| ClientError::Parse("response has no queryresult".to_string()))?;

        if query_result.get("success").and_then(Value::as_bool) != Some(true) {
            let message = query_result
                .pointer("/error/msg")
                .and_then(Value::as_str)
                .unwrap_or("Query failed");
            return Ok(WolframResult::unanswered(query, message));
        }

        let pods: Vec<Pod> = query_result
            .get("pods")
            .and_then(Value::as_array)
            .map(|pods| pods.iter().map(parse_pod).collect())
            .unwrap_or_default();

        let primary = pods
            .iter()
            .find(|pod| pod.id.as_deref() == Some("Result") || pod.title.as_deref() == Some("Result"))
            .and_then(|pod| pod.subpods.first())
            .map(|subpod| subpod.plaintext.clone());

        tracing::info!("Wolfram Alpha returned {} pods", pods.len());

        Ok(WolframResult {
            success: true,
            query: query.to_string(),
            result: primary,
            result_type: ResultType::Full,
            pods: Some(pods),
            error: None,
        })
    }

    /// Evaluate a mathematical expression
    pub async fn calculate(&self, expression: &str) -> Result<WolframResult, ClientError> {
        self.query(expression).await
    }

    /// Convert a value between units
    pub async fn convert(&self, value: &str, from_unit: &str, to_unit: &str) -> Result<WolframResult, ClientError> {
        self.query(&format!("convert {} {} to {}", value, from_unit, to_unit))
            .await
    }

    pub async fn define(&self, word: &str) -> Result<WolframResult, ClientError> {
        self.query(&format!("define {}", word)).await
    }
}

fn parse_pod(pod: &Value) -> Pod {
    let text = |value: &Value, key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

    Pod {
        title: text(pod, "title"),
        id: text(pod, "id"),
        position: pod.get("position").and_then(Value::as_i64),
        subpods: pod
            .get("subpods")
            .and_then(Value::as_array)
            .map(|subpods| {
                subpods
                    .iter()
                    .map(|subpod| Subpod {
                        title: text(subpod, "title").unwrap_or_default(),
                        plaintext: text(subpod, "plaintext").unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

impl Adapter for WolframClient {
    fn id(&self) -> &'static str {
        "wolfram"
    }

    fn name(&self) -> &'static str {
        "Wolfram|Alpha"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Raise
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::COMPUTE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpResponse, MockTransport, TransportError};
    use serde_json::json;
    use std::sync::Arc;

    fn client(mock: Arc<MockTransport>) -> WolframClient {
        WolframClient::new(ClientOptions::new().transport(mock).api_key("APP-123")).unwrap()
    }

    #[test]
    fn test_missing_app_id_fails_at_construction() {
        let err = WolframClient::new(ClientOptions::new().transport(Arc::new(MockTransport::new())))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("WOLFRAMALPHA_APP_ID"));
    }

    #[tokio::test]
    async fn test_short_answer() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(
            "https://api.wolframalpha.com/v1/result",
            HttpResponse::new(200, "4"),
        );

        let result = client(mock.clone()).calculate("2+2").await.unwrap();
        assert!(result.success);
        assert_eq!(result.result.as_deref(), Some("4"));
        assert_eq!(result.result_type, ResultType::Text);

        let request = mock.last_request().unwrap();
        assert_eq!(request.query_value("i"), Some("2+2"));
        assert_eq!(request.query_value("appid"), Some("APP-123"));
        assert_eq!(request.query_value("format"), Some("plaintext"));
    }

    #[tokio::test]
    async fn test_not_understood_is_unsuccessful_result() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(
            "https://api.wolframalpha.com/v1/",
            HttpResponse::new(501, "Wolfram|Alpha did not understand your input"),
        );

        let result = client(mock).query("colorless green ideas").await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("couldn't understand"));
    }

    #[tokio::test]
    async fn test_server_error_raises() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(
            "https://api.wolframalpha.com/v1/spoken",
            HttpResponse::new(403, "Invalid appid"),
        );

        let err = client(mock).query_spoken("weather").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::Status { status: 403, .. })
        ));
    }

    #[test]
    fn test_image_url_is_built_locally() {
        let mock = Arc::new(MockTransport::new());
        let result = client(mock.clone()).query_image_url("pi to 10 digits").unwrap();

        assert_eq!(result.result_type, ResultType::Image);
        assert_eq!(
            result.result.as_deref(),
            Some("https://api.wolframalpha.com/v1/simple?i=pi+to+10+digits&appid=APP-123")
        );
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_full_query_pods() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://api.wolframalpha.com/v2/query",
            200,
            json!({
                "queryresult": {
                    "success": true,
                    "error": false,
                    "pods": [
                        {
                            "title": "Input",
                            "id": "Input",
                            "position": 100,
                            "subpods": [{ "title": "", "plaintext": "integral x^2 dx" }]
                        },
                        {
                            "title": "Indefinite integral",
                            "id": "IndefiniteIntegral",
                            "position": 200,
                            "subpods": [{ "title": "", "plaintext": "x^3/3 + constant" }]
                        },
                        {
                            "title": "Result",
                            "id": "Result",
                            "position": 300,
                            "subpods": [{ "title": "", "plaintext": null }]
                        }
                    ]
                }
            }),
        );

        let result = client(mock).query_full("integrate x^2").await.unwrap();
        assert!(result.success);
        assert_eq!(result.result_type, ResultType::Full);
        assert_eq!(result.pods.as_ref().unwrap().len(), 3);
        assert_eq!(result.pods.as_ref().unwrap()[1].position, Some(200));
        assert_eq!(result.result.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_full_query_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://api.wolframalpha.com/v2/query",
            200,
            json!({ "queryresult": { "success": false, "error": { "code": "1", "msg": "Invalid appid" } } }),
        );

        let result = client(mock).query_full("x").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Invalid appid"));
    }

    #[tokio::test]
    async fn test_convert_and_define_phrasing() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("https://api.wolframalpha.com/v1/result", HttpResponse::new(200, "ok"));
        let wolfram = client(mock.clone());

        wolfram.convert("10", "miles", "km").await.unwrap();
        assert_eq!(
            mock.last_request().unwrap().query_value("i"),
            Some("convert 10 miles to km")
        );

        wolfram.define("serendipity").await.unwrap();
        assert_eq!(
            mock.last_request().unwrap().query_value("i"),
            Some("define serendipity")
        );
    }
}
