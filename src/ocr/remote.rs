//! Remote OCR engine: delegate recognition to a docTR-compatible HTTP service.
//!
//! The service receives the raw PDF as the request body and answers with the
//! docTR export JSON (`{"pages": [{"blocks": [{"lines": [{"words": [{"value": …}]}]}]}]}`),
//! which decodes straight into a [`RecognizedDocument`].

use crate::error::ExtractionError;
use crate::ocr::{OcrEngine, RecognizedDocument};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for [`RemoteOcrEngine`].
#[derive(Debug, Clone)]
pub struct RemoteOcrConfig {
    /// Full URL of the recognition endpoint.
    pub url: String,
    /// Sent as a bearer token when set.
    pub api_key: Option<String>,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

pub struct RemoteOcrEngine {
    client: Client,
    config: RemoteOcrConfig,
}

impl RemoteOcrEngine {
    pub fn new(config: RemoteOcrConfig) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::EngineInit(e.to_string()))?;

        info!("Remote OCR engine ready ({})", config.url);
        Ok(Self { client, config })
    }
}

#[async_trait]
impl OcrEngine for RemoteOcrEngine {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn recognize(&self, pdf: &[u8]) -> Result<RecognizedDocument, ExtractionError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/pdf")
            .body(pdf.to_vec());
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Remote(format!(
                    "timed out after {}s calling {}",
                    self.config.timeout_secs, self.config.url
                ))
            } else {
                ExtractionError::Remote(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Remote(format!(
                "HTTP {} from {}: {}",
                status,
                self.config.url,
                body.trim()
            )));
        }

        let doc: RecognizedDocument = response
            .json()
            .await
            .map_err(|e| ExtractionError::Remote(format!("undecodable OCR response: {e}")))?;
        debug!(
            "Remote OCR: {} pages, {} lines",
            doc.pages.len(),
            doc.line_count()
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_timeout() {
        let engine = RemoteOcrEngine::new(RemoteOcrConfig {
            url: "http://127.0.0.1:9/ocr".into(),
            api_key: Some("secret".into()),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(engine.name(), "remote");
    }

    async fn spawn_service(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/ocr")
    }

    #[tokio::test]
    async fn decodes_export_json_from_service() {
        use axum::{body::Bytes, http::HeaderMap, routing::post, Json};

        let app = axum::Router::new().route(
            "/ocr",
            post(|headers: HeaderMap, body: Bytes| async move {
                let authorised = headers
                    .get("authorization")
                    .map(|v| v == "Bearer secret")
                    .unwrap_or(false);
                let value = if authorised && body.starts_with(b"%PDF") {
                    "AIR"
                } else {
                    "REJECTED"
                };
                Json(serde_json::json!({
                    "pages": [{"blocks": [{"lines": [
                        {"words": [{"value": value}, {"value": "IMPORT"}]}
                    ]}]}]
                }))
            }),
        );
        let url = spawn_service(app).await;

        let engine = RemoteOcrEngine::new(RemoteOcrConfig {
            url,
            api_key: Some("secret".into()),
            timeout_secs: 5,
        })
        .unwrap();
        let doc = engine.recognize(b"%PDF-1.4 fake").await.unwrap();
        assert_eq!(
            crate::ocr::Transcript::from_document(&doc).as_str(),
            "AIR IMPORT\n"
        );
    }

    #[tokio::test]
    async fn non_success_status_is_a_remote_error() {
        use axum::{http::StatusCode, routing::post};

        let app = axum::Router::new().route(
            "/ocr",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "cannot read page 2") }),
        );
        let url = spawn_service(app).await;

        let engine = RemoteOcrEngine::new(RemoteOcrConfig {
            url,
            api_key: None,
            timeout_secs: 5,
        })
        .unwrap();
        let err = engine.recognize(b"%PDF-1.4").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("422"), "got: {msg}");
        assert!(msg.contains("cannot read page 2"), "got: {msg}");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_remote_error() {
        // Port 9 (discard) is closed on any sane test host.
        let engine = RemoteOcrEngine::new(RemoteOcrConfig {
            url: "http://127.0.0.1:9/ocr".into(),
            api_key: None,
            timeout_secs: 2,
        })
        .unwrap();
        let err = engine.recognize(b"%PDF-1.4").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Remote(_)), "got: {err:?}");
    }
}
