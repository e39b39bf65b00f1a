//! Wechat push-channel notification client

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::NotifySettings;
use crate::io::HttpClient;
use crate::notifier::{Notification, Notifier};

/// Sends notifications through a wechat push relay
pub struct WechatNotifier {
    api_url: String,
    api_token: String,
    topic_id: i64,
    timeout: Duration,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for WechatNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatNotifier")
            .field("api_url", &self.api_url)
            .field("topic_id", &self.topic_id)
            .finish()
    }
}

impl WechatNotifier {
    pub fn new(settings: &NotifySettings, timeout: Duration, http: Arc<dyn HttpClient>) -> Self {
        Self {
            api_url: settings.api_url.clone(),
            api_token: settings.api_token.clone(),
            topic_id: settings.topic_id,
            timeout,
            http,
        }
    }
}

#[async_trait]
impl Notifier for WechatNotifier {
    fn type_name(&self) -> &str {
        "wechat"
    }

    async fn notify(&self, notification: &Notification) -> crate::Result<()> {
        let body = json!({
            "platform": "wechat",
            "summary": notification.summary,
            "content": notification.content,
            "extra": { "topic_id": self.topic_id },
        })
        .to_string();

        tracing::debug!("Sending wechat notification: '{}'", notification.summary);

        let response = self
            .http
            .post_json(
                &self.api_url,
                &[("X-API-Token", self.api_token.as_str())],
                &body,
                self.timeout,
            )
            .await?;

        if !response.is_success() {
            return Err(crate::WardenError::Notification(format!(
                "Notification API returned status {}: {}",
                response.status, response.body
            )));
        }

        tracing::debug!("Wechat notification sent successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};

    fn test_settings() -> NotifySettings {
        NotifySettings {
            api_url: "https://push.example.com/send".to_string(),
            api_token: "push-token".to_string(),
            topic_id: 42,
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn sends_notification_with_correct_payload() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .withf(|url, headers, body, timeout| {
                let parsed: serde_json::Value = serde_json::from_str(body).unwrap();
                url == "https://push.example.com/send"
                    && headers.contains(&("X-API-Token", "push-token"))
                    && parsed["platform"] == "wechat"
                    && parsed["summary"] == "Service down"
                    && parsed["content"] == "details"
                    && parsed["extra"]["topic_id"] == 42
                    && *timeout == TIMEOUT
            })
            .returning(|_, _, _, _| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: String::new(),
                    })
                })
            });

        let notifier = WechatNotifier::new(&test_settings(), TIMEOUT, Arc::new(mock));
        notifier
            .notify(&Notification::new("Service down", "details"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn returns_error_on_non_2xx() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _, _, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 403,
                    body: "forbidden".to_string(),
                })
            })
        });

        let notifier = WechatNotifier::new(&test_settings(), TIMEOUT, Arc::new(mock));
        let err = notifier
            .notify(&Notification::new("s", "c"))
            .await
            .unwrap_err();
        match err {
            crate::WardenError::Notification(msg) => assert!(msg.contains("403"), "{msg}"),
            other => panic!("expected WardenError::Notification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn propagates_transport_failure() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _, _, _| {
            Box::pin(async { Err(crate::WardenError::Transport("timeout".to_string())) })
        });

        let notifier = WechatNotifier::new(&test_settings(), TIMEOUT, Arc::new(mock));
        let err = notifier
            .notify(&Notification::new("s", "c"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[tokio::test]
    async fn type_name_is_wechat() {
        let notifier = WechatNotifier::new(&test_settings(), TIMEOUT, Arc::new(MockHttpClient::new()));
        assert_eq!(notifier.type_name(), "wechat");
    }
}
