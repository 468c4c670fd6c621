//! HTTP push sender.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::notify::MessageSender;

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// Posts each notification as one JSON push request.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    client: Client,
    url: Url,
    token: Option<String>,
}

impl WebhookSender {
    pub fn new(url: &str, token: Option<String>) -> Result<Self> {
        Ok(Self::with_client(Client::new(), Url::parse(url)?, token))
    }

    /// Create a sender that reuses an existing client.
    pub fn with_client(client: Client, url: Url, token: Option<String>) -> Self {
        Self { client, url, token }
    }
}

#[async_trait]
impl MessageSender for WebhookSender {
    async fn send(&self, user_id: &str, messages: &[String]) -> Result<()> {
        let body = PushRequest {
            to: user_id,
            messages: messages
                .iter()
                .map(|text| TextMessage { kind: "text", text })
                .collect(),
        };

        let mut request = self.client.post(self.url.clone()).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::notify(format!(
                "push to {} for {} returned {}",
                self.url, user_id, status
            )));
        }

        log::debug!("Pushed {} message(s) to {}", messages.len(), user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_posts_push_shape_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/push"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({
                "to": "alice",
                "messages": [
                    {"type": "text", "text": "https://a.example has been updated"},
                    {"type": "text", "text": "+new\n"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sender =
            WebhookSender::new(&format!("{}/push", server.uri()), Some("secret".into())).unwrap();
        let parts = vec![
            "https://a.example has been updated".to_string(),
            "+new\n".to_string(),
        ];
        sender.send("alice", &parts).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_is_notify_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let sender = WebhookSender::new(&server.uri(), None).unwrap();
        let err = sender
            .send("alice", &["hi".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Notify(_)));
    }
}
