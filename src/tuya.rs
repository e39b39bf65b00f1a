//! Tuya cloud client: token lifecycle and smart plug switch control

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::DeviceSettings;
use crate::io::HttpClient;
use crate::sign::{self, RequestSigner};
use crate::token::{TokenCache, TokenRecord, TokenSource};

const SIGN_METHOD: &str = "HMAC-SHA256";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    success: bool,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    result: Option<TokenResult>,
}

#[derive(Debug, Deserialize)]
struct TokenResult {
    access_token: String,
    expire_time: u64,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    success: bool,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Client for the Tuya open API controlling one smart plug.
///
/// Owns its token cache; rebuilding the client (e.g. on a config reload)
/// discards any cached tokens.
pub struct TuyaClient {
    settings: DeviceSettings,
    signer: RequestSigner,
    tokens: TokenCache,
    timeout: Duration,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for TuyaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TuyaClient")
            .field("device_id", &self.settings.device_id)
            .field("region", &self.settings.region)
            .field("enabled", &self.settings.enabled)
            .finish()
    }
}

impl TuyaClient {
    pub fn new(settings: &DeviceSettings, timeout: Duration, http: Arc<dyn HttpClient>) -> Self {
        let signer = RequestSigner::new(&*settings.access_id, &*settings.access_key);
        Self {
            settings: settings.clone(),
            signer,
            tokens: TokenCache::new(),
            timeout,
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("https://openapi.tuya{}.com{}", self.settings.region, path)
    }

    /// Power-cycle the device: switch off, wait, switch on.
    ///
    /// A no-op when the device integration is disabled. If the off toggle
    /// fails the on toggle is never attempted; if the on toggle fails the
    /// device may remain powered off.
    pub async fn restart_device(&self) -> crate::Result<()> {
        if !self.settings.enabled {
            tracing::debug!("Device control disabled, skipping restart");
            return Ok(());
        }

        tracing::info!(
            "Power cycling device '{}' (off, wait {}s, on)",
            self.settings.device_id,
            self.settings.wait_seconds
        );

        self.control_switch(false).await?;
        tokio::time::sleep(Duration::from_secs(self.settings.wait_seconds)).await;
        self.control_switch(true).await?;
        Ok(())
    }

    async fn control_switch(&self, on: bool) -> crate::Result<()> {
        let token = self.tokens.access_token(self).await?;

        let path = format!("/v1.0/iot-03/devices/{}/commands", self.settings.device_id);
        let body = json!({
            "commands": [{ "code": "switch_1", "value": on }],
        })
        .to_string();

        let timestamp = epoch_ms();
        let string_to_sign = sign::post_string_to_sign(&path, body.as_bytes());
        let signature = self.signer.sign(&string_to_sign, timestamp);
        let ts = timestamp.to_string();

        let headers = [
            ("client_id", self.signer.access_id()),
            ("access_token", token.as_str()),
            ("sign", signature.as_str()),
            ("sign_method", SIGN_METHOD),
            ("t", ts.as_str()),
        ];

        let response = self
            .http
            .post_json(&self.url(&path), &headers, &body, self.timeout)
            .await?;

        let parsed: CommandResponse = serde_json::from_str(&response.body)?;
        if !parsed.success {
            return Err(crate::WardenError::RemoteApi {
                code: parsed.code,
                message: parsed.msg,
            });
        }

        tracing::debug!("Switch set to {}", on);
        Ok(())
    }

    async fn token_request(
        &self,
        path: &str,
        signature: String,
        timestamp: u64,
    ) -> crate::Result<TokenRecord> {
        let ts = timestamp.to_string();
        let headers = [
            ("client_id", self.signer.access_id()),
            ("sign", signature.as_str()),
            ("sign_method", SIGN_METHOD),
            ("t", ts.as_str()),
        ];

        let response = self.http.get(&self.url(path), &headers, self.timeout).await?;

        let parsed: TokenResponse = serde_json::from_str(&response.body)?;
        if !parsed.success {
            return Err(crate::WardenError::RemoteApi {
                code: parsed.code,
                message: parsed.msg,
            });
        }
        let result = parsed.result.ok_or_else(|| crate::WardenError::RemoteApi {
            code: parsed.code,
            message: "token response missing result".to_string(),
        })?;

        Ok(TokenRecord::new(
            result.access_token,
            result.refresh_token,
            Duration::from_secs(result.expire_time),
        ))
    }
}

#[async_trait]
impl TokenSource for TuyaClient {
    async fn acquire(&self) -> crate::Result<TokenRecord> {
        let timestamp = epoch_ms();
        // Token acquisition has its own signature variant (no string-to-sign)
        let signature = self.signer.sign_token_request(timestamp);
        self.token_request("/v1.0/token?grant_type=1", signature, timestamp)
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> crate::Result<TokenRecord> {
        let path = format!("/v1.0/token/{}", refresh_token);
        let timestamp = epoch_ms();
        let signature = self
            .signer
            .sign(&sign::get_string_to_sign(&path), timestamp);
        self.token_request(&path, signature, timestamp).await
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
