//! Webhook notifier - delivers notices to an error tracking endpoint over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use faultline_core::NotifierError;
use faultline_core::domain::{ErrorNotice, ReportId};
use faultline_core::ports::Notifier;

/// Header carrying the project API key.
pub static API_KEY_HEADER: &str = "X-API-Key";

/// Webhook notifier configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Notice ingestion URL.
    pub endpoint: String,
    pub api_key: String,
    /// Request timeout (default: 5 seconds).
    pub timeout: Duration,
}

impl WebhookConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NoticeAccepted {
    id: Option<String>,
}

/// Notifier that POSTs each notice as JSON.
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notice: ErrorNotice) -> Result<Option<ReportId>, NotifierError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&notice)
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Rejected(status.as_u16()));
        }

        // Endpoints are not required to echo an id back.
        let accepted = response.json::<NoticeAccepted>().await.ok();
        let id = accepted
            .and_then(|body| body.id)
            .map(ReportId::new)
            .unwrap_or_else(ReportId::generate);

        tracing::debug!(report_id = %id, "Notice delivered");
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::domain::ReportableError;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notice() -> ErrorNotice {
        ErrorNotice::new(
            ReportableError::new("RuntimeError", "boom"),
            serde_json::json!({ "raw_request": { "path": "/checkout" } }),
        )
    }

    fn notifier(server: &MockServer) -> WebhookNotifier {
        WebhookNotifier::new(WebhookConfig::new(
            format!("{}/v1/notices", server.uri()),
            "secret",
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_notice_and_reads_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/notices"))
            .and(header("X-API-Key", "secret"))
            .and(body_partial_json(serde_json::json!({
                "error": { "class": "RuntimeError", "message": "boom" }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "abc-123" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = notifier(&server).notify(notice()).await.unwrap();
        assert_eq!(id, Some(ReportId::new("abc-123")));
    }

    #[tokio::test]
    async fn test_generates_id_when_body_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let id = notifier(&server).notify(notice()).await.unwrap();
        assert!(id.is_some());
    }

    #[tokio::test]
    async fn test_rejected_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let result = notifier(&server).notify(notice()).await;
        assert!(matches!(result, Err(NotifierError::Rejected(403))));
    }
}
