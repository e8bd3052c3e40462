//! Content classification
//!
//! Payment routing only needs a SafeSearch verdict for a content URL, so the
//! classifier is a trait. `HttpClassifier` posts `{"url": ...}` to a
//! configured endpoint and expects SafeSearch JSON back.

use async_trait::async_trait;
use ftw_common::payments::SafeSearch;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("ftw-server/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("No content classifier configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Classifier returned HTTP {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait ContentClassifier: Send + Sync {
    async fn classify(&self, content_url: &str) -> Result<SafeSearch, ClassifierError>;
}

/// JSON-over-HTTP classifier
pub struct HttpClassifier {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ContentClassifier for HttpClassifier {
    async fn classify(&self, content_url: &str) -> Result<SafeSearch, ClassifierError> {
        tracing::debug!(url = %content_url, endpoint = %self.endpoint, "Classifying content");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&json!({ "url": content_url }))
            .send()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(status.as_u16(), error_text));
        }

        response
            .json::<SafeSearch>()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))
    }
}

/// Classifier used when no endpoint is configured; every call fails
pub struct UnavailableClassifier;

#[async_trait]
impl ContentClassifier for UnavailableClassifier {
    async fn classify(&self, _content_url: &str) -> Result<SafeSearch, ClassifierError> {
        Err(ClassifierError::NotConfigured)
    }
}

/// Classifier that returns a fixed outcome
///
/// Useful for local runs and tests that must not reach the network.
pub struct StaticClassifier {
    outcome: Result<SafeSearch, ClassifierError>,
}

impl StaticClassifier {
    pub fn returning(safe_search: SafeSearch) -> Self {
        Self {
            outcome: Ok(safe_search),
        }
    }

    pub fn failing(error: ClassifierError) -> Self {
        Self { outcome: Err(error) }
    }
}

#[async_trait]
impl ContentClassifier for StaticClassifier {
    async fn classify(&self, _content_url: &str) -> Result<SafeSearch, ClassifierError> {
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use ftw_common::payments::Likelihood;
    use serde_json::Value;
    use tokio::net::TcpListener;

    /// Serve a stand-in classifier on an ephemeral port, returning its base URL
    async fn spawn_classifier() -> String {
        let app = Router::new()
            .route(
                "/classify",
                post(|Json(body): Json<Value>| async move {
                    let url = body["url"].as_str().unwrap_or_default();
                    let adult = if url.contains("adult") {
                        "VERY_LIKELY"
                    } else {
                        "UNLIKELY"
                    };
                    Json(json!({"adult": adult, "racy": "POSSIBLE", "violence": "UNLIKELY"}))
                }),
            )
            .route(
                "/busy",
                post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "classifier busy") }),
            )
            .route("/garbage", post(|| async { "<html>not json</html>" }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_unavailable_always_errors() {
        let err = UnavailableClassifier.classify("https://x/y.png").await.unwrap_err();
        assert_eq!(err, ClassifierError::NotConfigured);
    }

    #[tokio::test]
    async fn test_static_classifier() {
        let ss = SafeSearch {
            adult: Likelihood::Likely,
            ..Default::default()
        };
        let got = StaticClassifier::returning(ss).classify("u").await.unwrap();
        assert_eq!(got, ss);

        let failing = StaticClassifier::failing(ClassifierError::Api(503, "busy".into()));
        assert!(failing.classify("u").await.is_err());
    }

    #[tokio::test]
    async fn test_http_classifier_unreachable_endpoint() {
        // Port 9 (discard) is closed on test hosts
        let client = HttpClassifier::new("http://127.0.0.1:9/classify").unwrap();
        let err = client.classify("https://x/y.png").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Network(_)));
    }

    #[tokio::test]
    async fn test_http_classifier_parses_safe_search() {
        let base = spawn_classifier().await;
        let client = HttpClassifier::new(format!("{}/classify", base)).unwrap();

        let adult = client.classify("https://cdn/adult/1.png").await.unwrap();
        assert_eq!(adult.adult, Likelihood::VeryLikely);
        assert_eq!(adult.racy, Likelihood::Possible);
        assert_eq!(adult.violence, Likelihood::Unlikely);

        let plain = client.classify("https://cdn/cat.png").await.unwrap();
        assert_eq!(plain.adult, Likelihood::Unlikely);
    }

    #[tokio::test]
    async fn test_http_classifier_maps_error_status() {
        let base = spawn_classifier().await;
        let client = HttpClassifier::new(format!("{}/busy", base)).unwrap();

        let err = client.classify("https://cdn/cat.png").await.unwrap_err();
        assert_eq!(err, ClassifierError::Api(503, "classifier busy".into()));
    }

    #[tokio::test]
    async fn test_http_classifier_rejects_unparseable_body() {
        let base = spawn_classifier().await;
        let client = HttpClassifier::new(format!("{}/garbage", base)).unwrap();

        let err = client.classify("https://cdn/cat.png").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Parse(_)));
    }
}
