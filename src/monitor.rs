//! Health check state machine: probe, threshold remediation, notifications

use std::sync::Arc;
use std::time::Duration;

use crate::config::MonitorSettings;
use crate::io::HttpClient;
use crate::notifier::{Notification, Notifier};
use crate::tuya::TuyaClient;
use crate::wechat::WechatNotifier;

/// Monitors one target endpoint across check cycles.
///
/// Conceptually a machine over Healthy / Degrading / Down, represented by
/// `(fail_count, has_notified_down)`:
/// - Healthy: `fail_count == 0`, not notified
/// - Degrading: `0 < fail_count < retry_times`, not notified
/// - Down: `fail_count >= retry_times`, notified
///
/// Cycles are serialized by the run loop; nothing here defends against
/// overlapping checks.
pub struct HealthMonitor {
    target_url: String,
    target_token: String,
    retry_times: u32,
    timeout: Duration,
    notifier: Arc<dyn Notifier>,
    device: TuyaClient,
    http: Arc<dyn HttpClient>,
    fail_count: u32,
    has_notified_down: bool,
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("target_url", &self.target_url)
            .field("retry_times", &self.retry_times)
            .field("fail_count", &self.fail_count)
            .field("has_notified_down", &self.has_notified_down)
            .finish()
    }
}

impl HealthMonitor {
    pub fn new(settings: &MonitorSettings, http: Arc<dyn HttpClient>) -> Self {
        let timeout = settings.timeout();
        Self {
            target_url: settings.target_url.clone(),
            target_token: settings.target_token.clone(),
            retry_times: settings.retry_times,
            timeout,
            notifier: Arc::new(WechatNotifier::new(
                &settings.notify,
                timeout,
                Arc::clone(&http),
            )),
            device: TuyaClient::new(&settings.device, timeout, Arc::clone(&http)),
            http,
            fail_count: 0,
            has_notified_down: false,
        }
    }

    /// Run one check cycle.
    ///
    /// Returns the probe error on failing cycles. The one cycle-fatal path is
    /// a failed down notification, whose error replaces the probe error.
    pub async fn check(&mut self) -> crate::Result<()> {
        let bearer = format!("Bearer {}", self.target_token);
        let headers = [("Authorization", bearer.as_str())];

        match self.http.get(&self.target_url, &headers, self.timeout).await {
            Ok(response) if response.is_success() => {
                self.on_probe_success(response.status).await;
                Ok(())
            }
            Ok(response) => {
                tracing::warn!("Probe returned status {}", response.status);
                self.on_probe_failure().await?;
                Err(crate::WardenError::UnexpectedStatus(response.status))
            }
            Err(e) => {
                tracing::warn!("Probe failed: {}", e);
                self.on_probe_failure().await?;
                Err(e)
            }
        }
    }

    async fn on_probe_failure(&mut self) -> crate::Result<()> {
        self.fail_count += 1;
        tracing::debug!(
            "Consecutive failures: {}/{}",
            self.fail_count,
            self.retry_times
        );

        if self.fail_count >= self.retry_times && !self.has_notified_down {
            if let Err(e) = self.device.restart_device().await {
                tracing::error!("Failed to restart device: {}", e);
            }

            let notification = Notification::new(
                "HomeAssistant服务异常",
                format!(
                    "HomeAssistant service is down after {} retries",
                    self.retry_times
                ),
            );
            // Notified-down is only set once the notification went out, so a
            // failed attempt is retried on the next failing cycle
            if let Err(e) = self.notifier.notify(&notification).await {
                return Err(match e {
                    crate::WardenError::Notification(_) => e,
                    other => crate::WardenError::Notification(other.to_string()),
                });
            }
            self.has_notified_down = true;
        }
        Ok(())
    }

    async fn on_probe_success(&mut self, status: u16) {
        if self.has_notified_down {
            let notification = Notification::new(
                "HomeAssistant服务已恢复",
                "HomeAssistant service has recovered",
            );
            if let Err(e) = self.notifier.notify(&notification).await {
                tracing::warn!("Failed to send recovery notification: {}", e);
            }
            self.has_notified_down = false;
            // fail_count resets only on the down -> healthy transition
            self.fail_count = 0;
        }
        tracing::info!("Target is healthy, status code: {}", status);
    }

    /// Apply a fresh settings snapshot at a cycle boundary.
    ///
    /// Rebuilds the notifier and the device client (discarding cached
    /// tokens). In-progress degradation state survives the reload.
    pub fn update_config(&mut self, settings: &MonitorSettings) {
        self.target_url = settings.target_url.clone();
        self.target_token = settings.target_token.clone();
        self.retry_times = settings.retry_times;
        self.timeout = settings.timeout();
        self.notifier = Arc::new(WechatNotifier::new(
            &settings.notify,
            self.timeout,
            Arc::clone(&self.http),
        ));
        self.device = TuyaClient::new(&settings.device, self.timeout, Arc::clone(&self.http));
        tracing::debug!("Monitor configuration updated");
    }

    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    pub fn has_notified_down(&self) -> bool {
        self.has_notified_down
    }
}
