//! Notifier trait for sending alerts

use async_trait::async_trait;

/// A notification to be sent
#[derive(Debug, Clone)]
pub struct Notification {
    pub summary: String,
    pub content: String,
}

impl Notification {
    pub fn new(summary: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            content: content.into(),
        }
    }
}

/// Trait for sending notifications
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Get the notifier type name (e.g. "wechat")
    fn type_name(&self) -> &str;

    /// Send a notification
    async fn notify(&self, notification: &Notification) -> crate::Result<()>;
}
