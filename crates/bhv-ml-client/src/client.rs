//! ML service HTTP client.

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::error::{MlError, MlResult};
use crate::types::{ClassifyRequest, ClassifyResponse, HealthResponse};

/// Configuration for ML client.
#[derive(Debug, Clone)]
pub struct MlClientConfig {
    /// Base URL of ML service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout: Duration::from_secs(60), // one clip window per request
            max_retries: 2,
        }
    }
}

impl MlClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ML_SERVICE_URL").unwrap_or(defaults.base_url),
            timeout: std::env::var("ML_SERVICE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: std::env::var("ML_SERVICE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Client for Python ML service.
pub struct MlClient {
    http: Client,
    config: MlClientConfig,
}

impl MlClient {
    /// Create a new ML client.
    pub fn new(config: MlClientConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(MlClientConfig::from_env())
    }

    pub fn config(&self) -> &MlClientConfig {
        &self.config
    }

    /// Check if ML service is healthy.
    pub async fn health_check(&self) -> MlResult<bool> {
        let url = format!("{}/health", self.config.base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("ML service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("ML service health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// Classify one clip and return the full class distribution.
    pub async fn classify(&self, request: &ClassifyRequest) -> MlResult<ClassifyResponse> {
        let url = format!("{}/classify", self.config.base_url);

        debug!(
            model = %request.model,
            frames = request.frames.len(),
            "Sending classify request to {}",
            url
        );

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| self.map_send_error(e))?;
                check_status(response).await
            })
            .await?;

        let body: ClassifyResponse = response.json().await?;
        if body.labels.is_empty() || body.labels.len() != body.probs.len() {
            return Err(MlError::InvalidResponse(format!(
                "{} labels for {} probabilities",
                body.labels.len(),
                body.probs.len()
            )));
        }
        Ok(body)
    }

    fn map_send_error(&self, error: reqwest::Error) -> MlError {
        if error.is_timeout() {
            MlError::Timeout(self.config.timeout.as_secs())
        } else {
            MlError::Network(error)
        }
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> MlResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = MlResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "ML request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(MlError::RequestFailed("Unknown error".to_string())))
    }
}

/// Server errors are retryable, client errors are not.
async fn check_status(response: Response) -> MlResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = format!("ML service returned {}: {}", status, body);
    if status.is_server_error() {
        Err(MlError::ServiceUnavailable(message))
    } else {
        Err(MlError::RequestFailed(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, retries: u32) -> MlClient {
        MlClient::new(
            MlClientConfig::default()
                .with_base_url(server.uri())
                .with_max_retries(retries),
        )
        .unwrap()
    }

    fn request() -> ClassifyRequest {
        ClassifyRequest {
            model: "videomae-kinetics".to_string(),
            frames: vec!["AAAA".to_string(); 2],
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = MlClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8001");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = MlClientConfig::default().with_base_url("http://ml:8001/");
        assert_eq!(config.base_url, "http://ml:8001");
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
            .mount(&server)
            .await;

        assert!(client_for(&server, 0).health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_unhealthy_status_is_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(!client_for(&server, 0).health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_classify_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .and(body_partial_json(json!({"model": "videomae-kinetics"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "labels": ["jogging", "sitting"],
                "probs": [0.7, 0.3]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server, 0).classify(&request()).await.unwrap();
        assert_eq!(response.labels, vec!["jogging", "sitting"]);
        assert_eq!(response.probs, vec![0.7, 0.3]);
    }

    #[tokio::test]
    async fn test_classify_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "labels": ["a"],
                "probs": [1.0]
            })))
            .mount(&server)
            .await;

        let response = client_for(&server, 1).classify(&request()).await.unwrap();
        assert_eq!(response.labels, vec!["a"]);
    }

    #[tokio::test]
    async fn test_classify_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .respond_with(ResponseTemplate::new(422).set_body_string("unknown model"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, 2).classify(&request()).await.unwrap_err();
        assert!(matches!(err, MlError::RequestFailed(ref m) if m.contains("unknown model")));
    }

    #[tokio::test]
    async fn test_classify_rejects_mismatched_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "labels": ["a", "b"],
                "probs": [1.0]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, 0).classify(&request()).await.unwrap_err();
        assert!(matches!(err, MlError::InvalidResponse(_)));
    }
}
