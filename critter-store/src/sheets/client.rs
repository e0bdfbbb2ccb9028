//! Sheets HTTP client with timeout and bounded retry.

use super::types::{ApiError, UpdateValuesResponse, ValueRange};
use crate::auth::TokenProvider;
use crate::tabular::{TabularStore, ValueInputMode};
use async_trait::async_trait;
use critter_core::StoreError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Bounded exponential backoff for transient store faults.
///
/// Only connect/timeout errors and 429/5xx responses are retried; auth and
/// other client errors surface immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    /// The backoff that follows `current`.
    fn next_backoff(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

/// `TabularStore` backed by the Sheets values API.
pub struct SheetsStore {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    token: Arc<dyn TokenProvider>,
    retry: RetryPolicy,
}

impl SheetsStore {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        token: Arc<dyn TokenProvider>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::unavailable(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: SHEETS_BASE_URL.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            token,
            retry,
        })
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn values_url(&self, subsheet: &str, range: &str) -> String {
        let qualified = format!("{}!{}", subsheet, range);
        format!(
            "{}/{}/values/{}",
            self.base_url,
            self.spreadsheet_id,
            urlencoding::encode(&qualified)
        )
    }

    /// Send a request, retrying transient faults per the policy. The bearer
    /// token is fetched per attempt so an expired token can recover
    /// mid-sequence.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 0;
        loop {
            let prepared = request
                .try_clone()
                .ok_or_else(|| StoreError::unavailable("request body not replayable"))?;
            let token = self
                .token
                .bearer_token()
                .await
                .map_err(|e| StoreError::unavailable(format!("credential: {}", e)))?;

            let result = prepared.bearer_auth(token).send().await;
            let transient = match &result {
                Ok(response) => {
                    let status = response.status();
                    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
                }
                Err(error) => error.is_timeout() || error.is_connect(),
            };

            if transient && attempt < self.retry.max_retries {
                attempt += 1;
                tracing::warn!(attempt, backoff_ms = backoff.as_millis() as u64, "transient store fault, retrying");
                tokio::time::sleep(backoff).await;
                backoff = self.retry.next_backoff(backoff);
                continue;
            }

            return result.map_err(|e| StoreError::unavailable(format!("request failed: {}", e)));
        }
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| StoreError::unavailable(format!("malformed response: {}", e)));
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        let message = serde_json::from_str::<ApiError>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        Err(StoreError::unavailable(format!(
            "HTTP {}: {}",
            status.as_u16(),
            message
        )))
    }
}

#[async_trait]
impl TabularStore for SheetsStore {
    async fn read(&self, subsheet: &str, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.values_url(subsheet, range);
        let response = self.send(self.client.get(&url)).await?;
        let body: ValueRange = Self::parse(response).await?;
        Ok(body.values)
    }

    async fn update(
        &self,
        subsheet: &str,
        range: &str,
        values: &[Vec<String>],
        mode: ValueInputMode,
    ) -> Result<u32, StoreError> {
        let url = self.values_url(subsheet, range);
        let request = self
            .client
            .put(&url)
            .query(&[("valueInputOption", mode.as_str())])
            .json(&ValueRange::body(values));
        let response = self.send(request).await?;
        let body: UpdateValuesResponse = Self::parse(response).await?;
        Ok(body.updated_cells)
    }
}

impl std::fmt::Debug for SheetsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsStore")
            .field("base_url", &self.base_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        )
    }

    /// Read a whole request: first chunk blocks, the rest drains with a
    /// short timeout so split header/body writes are captured too.
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        let n = socket.read(&mut buf).await.unwrap();
        data.extend_from_slice(&buf[..n]);
        while let Ok(Ok(n)) =
            tokio::time::timeout(Duration::from_millis(50), socket.read(&mut buf)).await
        {
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&data).to_string()
    }

    /// One-connection-per-response stub; returns the raw requests it saw.
    async fn stub_server(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                seen.push(read_request(&mut socket).await);
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            seen
        });
        (format!("http://{}", addr), handle)
    }

    fn store(base_url: &str, retry: RetryPolicy) -> SheetsStore {
        SheetsStore::new(
            "sheet-id",
            Arc::new(StaticToken::new("test-token")),
            Duration::from_secs(2),
            retry,
        )
        .unwrap()
        .with_base_url(base_url)
    }

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_values_url_encodes_the_range() {
        let store = store("http://localhost", RetryPolicy::default());
        assert_eq!(
            store.values_url("Pax Orian", "B3"),
            "http://localhost/sheet-id/values/Pax%20Orian%21B3"
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(300),
            multiplier: 2.0,
        };
        let second = policy.next_backoff(policy.initial_backoff);
        let third = policy.next_backoff(second);
        assert_eq!(second, Duration::from_millis(200));
        assert_eq!(third, Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_read_sends_bearer_token_and_parses_values() {
        let body = r#"{"range":"Paxorian!B3","majorDimension":"ROWS","values":[["5"]]}"#;
        let (base_url, handle) = stub_server(vec![http_response("200 OK", body)]).await;

        let rows = store(&base_url, quick_retry())
            .read("Paxorian", "B3")
            .await
            .unwrap();

        assert_eq!(rows, vec![vec!["5".to_string()]]);
        let seen = handle.await.unwrap();
        let request = seen[0].to_lowercase();
        assert!(request.starts_with("get /sheet-id/values/paxorian%21b3"));
        assert!(request.contains("authorization: bearer test-token"));
    }

    #[tokio::test]
    async fn test_update_puts_with_value_input_option() {
        let body = r#"{"spreadsheetId":"sheet-id","updatedCells":1}"#;
        let (base_url, handle) = stub_server(vec![http_response("200 OK", body)]).await;

        let updated = store(&base_url, quick_retry())
            .update(
                "Paxorian",
                "B3",
                &[vec!["6".to_string()]],
                ValueInputMode::UserEntered,
            )
            .await
            .unwrap();

        assert_eq!(updated, 1);
        let seen = handle.await.unwrap();
        assert!(seen[0].contains("valueInputOption=USER_ENTERED"));
        assert!(seen[0].contains(r#"{"values":[["6"]]}"#));
    }

    #[tokio::test]
    async fn test_transient_fault_is_retried() {
        let error = r#"{"error":{"code":503,"message":"backend error","status":"UNAVAILABLE"}}"#;
        let body = r#"{"range":"Paxorian!B3","values":[["5"]]}"#;
        let (base_url, handle) = stub_server(vec![
            http_response("503 Service Unavailable", error),
            http_response("200 OK", body),
        ])
        .await;

        let rows = store(&base_url, quick_retry())
            .read("Paxorian", "B3")
            .await
            .unwrap();

        assert_eq!(rows, vec![vec!["5".to_string()]]);
        assert_eq!(handle.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let error = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        let (base_url, handle) = stub_server(vec![http_response("403 Forbidden", error)]).await;

        let err = store(&base_url, quick_retry())
            .read("Paxorian", "B3")
            .await
            .unwrap_err();

        match err {
            StoreError::Unavailable { reason } => {
                assert!(reason.contains("403"));
                assert!(reason.contains("does not have permission"));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
        assert_eq!(handle.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_last_error() {
        let error = r#"{"error":{"code":503,"message":"backend error","status":"UNAVAILABLE"}}"#;
        let responses = vec![
            http_response("503 Service Unavailable", error),
            http_response("503 Service Unavailable", error),
            http_response("503 Service Unavailable", error),
        ];
        let (base_url, handle) = stub_server(responses).await;

        let err = store(&base_url, quick_retry())
            .read("Paxorian", "B3")
            .await
            .unwrap_err();

        match err {
            StoreError::Unavailable { reason } => assert!(reason.contains("503")),
            other => panic!("expected Unavailable, got {:?}", other),
        }
        // max_retries = 2 means three attempts in total.
        assert_eq!(handle.await.unwrap().len(), 3);
    }
}
