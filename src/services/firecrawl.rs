//! Client for a Firecrawl-compatible scrape endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::ApiConfig;
use crate::utils::http::create_async_client;

/// Schema-constrained extraction request.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractSpec {
    pub prompt: String,
    pub schema: Value,
}

/// Body of a scrape call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: String,
    pub formats: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<u64>,
    pub timeout: u64,
    #[serde(rename = "parsePDF", skip_serializing_if = "Option::is_none")]
    pub parse_pdf: Option<bool>,
}

impl ScrapeRequest {
    /// Page scrape returning the given formats plus structured extraction.
    pub fn page(
        url: impl Into<String>,
        formats: Vec<&'static str>,
        extract: ExtractSpec,
        wait_for_ms: u64,
        timeout_ms: u64,
    ) -> Self {
        Self {
            url: url.into(),
            formats,
            extract: Some(extract),
            wait_for: Some(wait_for_ms),
            timeout: timeout_ms,
            parse_pdf: None,
        }
    }

    /// Raw document fetch: the backend returns the bytes base64-encoded in
    /// `markdown` instead of parsing them.
    pub fn raw_pdf(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            url: url.into(),
            formats: vec!["markdown"],
            extract: None,
            wait_for: None,
            timeout: timeout_ms,
            parse_pdf: Some(false),
        }
    }
}

/// The `data` object of a successful scrape response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeData {
    pub markdown: Option<String>,
    pub html: Option<String>,
    /// Structured extraction, untouched (object, string or absent)
    pub extract: Option<Value>,
}

impl ScrapeData {
    /// Pick the known fields out of a response body; missing or mistyped
    /// fields are treated as absent.
    pub fn from_response(body: &Value) -> Self {
        let Some(data) = body.get("data").filter(|d| d.is_object()) else {
            return Self::default();
        };
        let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            markdown: text("markdown"),
            html: text("html"),
            extract: data.get("extract").filter(|v| !v.is_null()).cloned(),
        }
    }
}

/// Seam between per-item workers and the scrape backend.
#[async_trait]
pub trait ScrapeApi: Send + Sync {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeData>;
}

/// HTTP implementation of [`ScrapeApi`].
#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl FirecrawlClient {
    /// Build a client for the configured endpoint.
    ///
    /// `timeout` bounds each HTTP call end to end. Fails if no API key is set.
    pub fn new(api: &ApiConfig, user_agent: &str, timeout: Duration) -> Result<Self> {
        let api_key = api.require_key()?.to_string();
        Ok(Self {
            client: create_async_client(user_agent, timeout)?,
            endpoint: api.endpoint(),
            api_key,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ScrapeApi for FirecrawlClient {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeData> {
        log::debug!("POST {} url={}", self.endpoint, request.url);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            return Err(AppError::scrape(error_message(&raw).unwrap_or_else(|| {
                format!("HTTP {}", status.as_u16())
            })));
        }

        let body: Value = serde_json::from_str(&raw)?;
        if body.get("success") == Some(&Value::Bool(false)) {
            return Err(AppError::scrape(
                error_message(&raw).unwrap_or_else(|| "Unknown Firecrawl error".to_string()),
            ));
        }

        Ok(ScrapeData::from_response(&body))
    }
}

/// The `error` (or `message`) string of a JSON error body.
fn error_message(raw: &str) -> Option<String> {
    let body: Value = serde_json::from_str(raw).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn api(server: &MockServer) -> ApiConfig {
        ApiConfig {
            api_key: Some("test-key".into()),
            api_url: server.uri(),
            scrape_path: "/v1/scrape".into(),
        }
    }

    fn client(server: &MockServer) -> FirecrawlClient {
        FirecrawlClient::new(&api(server), "firebatch-test", Duration::from_secs(5)).unwrap()
    }

    fn request() -> ScrapeRequest {
        ScrapeRequest::page(
            "https://instantdomainsearch.com/?q=example.com",
            vec!["extract", "markdown"],
            ExtractSpec {
                prompt: "p".into(),
                schema: json!({"type": "object"}),
            },
            5_000,
            60_000,
        )
    }

    #[test]
    fn test_request_wire_names() {
        let body = serde_json::to_value(request()).unwrap();
        assert_eq!(body["waitFor"], json!(5_000));
        assert_eq!(body["timeout"], json!(60_000));
        assert!(body.get("parsePDF").is_none());

        let raw = serde_json::to_value(ScrapeRequest::raw_pdf("https://x/y.pdf", 90_000)).unwrap();
        assert_eq!(raw["parsePDF"], json!(false));
        assert_eq!(raw["formats"], json!(["markdown"]));
        assert!(raw.get("extract").is_none());
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let api = ApiConfig::default();
        let err = FirecrawlClient::new(&api, "ua", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_scrape_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"url": "https://instantdomainsearch.com/?q=example.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"markdown": "# hi", "extract": {"availability": "taken"}}
            })))
            .mount(&server)
            .await;

        let data = client(&server).scrape(&request()).await.unwrap();
        assert_eq!(data.markdown.as_deref(), Some("# hi"));
        assert_eq!(data.html, None);
        assert_eq!(data.extract, Some(json!({"availability": "taken"})));
    }

    #[tokio::test]
    async fn test_http_error_uses_body_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({"error": "Rate limit exceeded"})))
            .mount(&server)
            .await;

        let err = client(&server).scrape(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Rate limit exceeded");
    }

    #[tokio::test]
    async fn test_http_error_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server).scrape(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_logical_failure_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
            .mount(&server)
            .await;

        let err = client(&server).scrape(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown Firecrawl error");
    }
}
