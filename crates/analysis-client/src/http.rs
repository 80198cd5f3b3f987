//! HTTP implementation of [`AnalysisBackend`]
//!
//! Talks JSON to the backend's REST routes under `/api`. Reads are retried
//! according to the configured [`RetryPolicy`]; starting and cancelling a job
//! are sent once.

use crate::backend::{AnalysisBackend, AnalysisType, CancelResponse, HealthStatus, StartResponse};
use crate::error::{ClientError, Result};
use crate::retry::RetryPolicy;
use analysis_core::{AnalysisRequest, Job, JobId};
use analysis_utils::ClientConfig;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

/// Analysis backend reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base: Url,
    http_client: reqwest::Client,
    retry_policy: RetryPolicy,
}

impl HttpBackend {
    /// Create a backend client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base = config.base_url()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base,
            http_client,
            retry_policy: RetryPolicy::from_config(config),
        })
    }

    /// Replace the retry policy used for reads
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// URL for `segments` below the base, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::Config(format!("base URL '{}' cannot carry a path", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        self.retry_policy
            .execute(operation, || send_json(self.http_client.get(url.clone())))
            .await
    }
}

/// Send a request and decode a JSON body, surfacing the backend's `detail`
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| ClientError::ConnectionFailed(format!("HTTP request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            detail: error_detail(&body),
        });
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

/// Extract a readable message from an error body
///
/// The backend wraps failures as `{"detail": ...}`; anything else is passed
/// through as text.
fn error_detail(body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => trimmed.to_string(),
        },
        _ if trimmed.is_empty() => "no details".to_string(),
        _ => trimmed.to_string(),
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn start_analysis(&self, request: &AnalysisRequest) -> Result<JobId> {
        let url = self.endpoint(&["api", "analysis", "start"])?;
        debug!(%url, subject = %request.subject, workflow = %request.workflow, "starting analysis");

        let response: StartResponse = send_json(self.http_client.post(url).json(request)).await?;
        info!(job_id = %response.analysis_id, "backend accepted analysis");
        Ok(response.analysis_id)
    }

    async fn fetch_job(&self, id: &JobId) -> Result<Job> {
        self.get_json("fetch_job", &["api", "analysis", id.as_str()])
            .await
    }

    async fn cancel(&self, id: &JobId) -> Result<bool> {
        let url = self.endpoint(&["api", "analysis", id.as_str(), "cancel"])?;
        debug!(%url, "cancelling analysis");

        let response: CancelResponse = send_json(self.http_client.post(url)).await?;
        Ok(response.success)
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.get_json("health", &["api", "health"]).await
    }

    async fn analysis_types(&self) -> Result<Vec<AnalysisType>> {
        self.get_json("analysis_types", &["api", "analysis-types"])
            .await
    }

    async fn history(&self) -> Result<Vec<Job>> {
        self.get_json("history", &["api", "analysis", "history"])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::assert_err;

    fn backend(base: &str) -> HttpBackend {
        let config = ClientConfig::builder().api_base(base).build().unwrap();
        HttpBackend::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let backend = backend("http://localhost:8000");
        let url = backend
            .endpoint(&["api", "analysis", "abc-123", "cancel"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/analysis/abc-123/cancel");
    }

    #[test]
    fn test_endpoint_keeps_prefix_and_escapes_ids() {
        let backend = backend("https://example.com/trading/");
        let url = backend.endpoint(&["api", "analysis", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/trading/api/analysis/a%2Fb%20c");
    }

    #[test]
    fn test_error_detail_extraction() {
        assert_eq!(error_detail(r#"{"detail":"Analysis not found"}"#), "Analysis not found");
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["body"],"msg":"field required"}]}"#),
            r#"[{"loc":["body"],"msg":"field required"}]"#
        );
        assert_eq!(error_detail("Internal Server Error"), "Internal Server Error");
        assert_eq!(error_detail("   "), "no details");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_connection_failure() {
        let config = ClientConfig::builder()
            .api_base("http://127.0.0.1:1")
            .request_timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let backend = HttpBackend::new(&config)
            .unwrap()
            .with_retry_policy(RetryPolicy::no_retry());

        let err = assert_err!(backend.health().await);
        assert!(matches!(err, ClientError::ConnectionFailed(_)), "got {err:?}");
    }
}
