//! HTTP client abstraction for testability

use std::time::Duration;

use async_trait::async_trait;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Whether the status code is in the 2xx success range
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request with the given headers
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> crate::Result<HttpResponse>;

    /// Send a POST request with a JSON body and the given headers
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        timeout: Duration,
    ) -> crate::Result<HttpResponse>;
}

/// Production HTTP client using reqwest
///
/// Timeouts are applied per request so a changed configuration reaches the
/// transport without rebuilding the client.
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| crate::WardenError::Transport(format!("GET {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| crate::WardenError::Transport(format!("Reading response body: {}", e)))?;

        tracing::debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        timeout: Duration,
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("POST {}", url);
        let mut request = self
            .client
            .post(url)
            .timeout(timeout)
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| crate::WardenError::Transport(format!("POST {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| crate::WardenError::Transport(format!("Reading response body: {}", e)))?;

        tracing::debug!("POST {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A URL that will always refuse connections (port 1 is reserved and unbound)
    const UNREACHABLE_URL: &str = "http://127.0.0.1:1/test";

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn get_connection_refused_returns_transport_error() {
        let client = ReqwestHttpClient::default();
        let err = client.get(UNREACHABLE_URL, &[], TIMEOUT).await.unwrap_err();

        match &err {
            crate::WardenError::Transport(msg) => {
                assert!(
                    msg.starts_with("GET http://127.0.0.1:1/test failed:"),
                    "{msg}"
                );
            }
            other => panic!("expected WardenError::Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_json_connection_refused_returns_transport_error() {
        let client = ReqwestHttpClient::default();
        let err = client
            .post_json(UNREACHABLE_URL, &[("X-Test", "1")], "{}", TIMEOUT)
            .await
            .unwrap_err();

        match &err {
            crate::WardenError::Transport(msg) => {
                assert!(
                    msg.starts_with("POST http://127.0.0.1:1/test failed:"),
                    "{msg}"
                );
            }
            other => panic!("expected WardenError::Transport, got {other:?}"),
        }
    }

    #[test]
    fn is_success_covers_the_2xx_range() {
        for status in [200u16, 201, 204, 250, 299] {
            let response = HttpResponse {
                status,
                body: String::new(),
            };
            assert!(response.is_success(), "{status}");
        }
        for status in [199u16, 300, 301, 404, 500] {
            let response = HttpResponse {
                status,
                body: String::new(),
            };
            assert!(!response.is_success(), "{status}");
        }
    }
}
