//! Mock email provider for testing
//!
//! Simulates the Resend-compatible `POST /emails` endpoint with wiremock and
//! exposes what the dispatcher actually sent.

use serde_json::json;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use EventHub::services::notification::EmailMessage;

pub const TEST_EMAIL_API_KEY: &str = "re_test_key";

pub struct EmailMockServer {
    pub server: MockServer,
}

impl EmailMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn api_url(&self) -> String {
        self.server.uri()
    }

    /// Accept every email with a provider id
    pub async fn mock_accept_all(&self) {
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", format!("Bearer {}", TEST_EMAIL_API_KEY).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_123" })))
            .mount(&self.server)
            .await;
    }

    /// Reject every email the way the provider reports validation failures
    pub async fn mock_failure(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "statusCode": status,
                "name": "application_error",
                "message": "Something went wrong on the provider side"
            })))
            .mount(&self.server)
            .await;
    }

    /// Every request body received so far, in arrival order
    pub async fn sent_emails(&self) -> Vec<EmailMessage> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| request.body_json::<EmailMessage>().ok())
            .collect()
    }

    pub async fn request_count(&self) -> usize {
        self.server.received_requests().await.map_or(0, |r| r.len())
    }

    pub async fn reset(&self) {
        self.server.reset().await;
    }
}
