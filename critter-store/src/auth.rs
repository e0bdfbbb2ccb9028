//! Bearer-token credentials for the backing store.
//!
//! The interactive consent flow that originally produces the credential
//! file is an external concern; this module only loads the file, refreshes
//! the access token when it nears expiry, and persists the refreshed state.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use critter_core::CredentialError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this many seconds before the recorded expiry, so a token handed
/// out is still valid by the time the request carrying it goes out.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Source of bearer tokens for store requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A token expected to be valid for at least the next request.
    async fn bearer_token(&self) -> Result<String, CredentialError>;
}

/// Fixed token, for tests and environments that manage tokens externally.
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String, CredentialError> {
        Ok(self.token.clone())
    }
}

/// On-disk shape of an authorized-user credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthorizedUserFile {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Authorized-user credential with in-place refresh.
///
/// All state sits behind one async mutex: concurrent callers that both see
/// an expired token serialize, and the second one finds a fresh token
/// instead of refreshing again. Refreshed state is written back to the
/// credential file before the new token is handed out.
pub struct AuthorizedUserToken {
    path: PathBuf,
    token_url: String,
    client: reqwest::Client,
    state: Mutex<AuthorizedUserFile>,
}

impl AuthorizedUserToken {
    /// Load a credential file, failing on absence or malformed content.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CredentialError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                CredentialError::Malformed {
                    reason: format!("read {}: {}", path.display(), e),
                }
            }
        })?;
        let file: AuthorizedUserFile =
            serde_json::from_str(&contents).map_err(|e| CredentialError::Malformed {
                reason: e.to_string(),
            })?;
        for (field, value) in [
            ("client_id", &file.client_id),
            ("client_secret", &file.client_secret),
            ("refresh_token", &file.refresh_token),
        ] {
            if value.trim().is_empty() {
                return Err(CredentialError::Malformed {
                    reason: format!("{} must not be empty", field),
                });
            }
        }
        Ok(Self {
            path,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client: reqwest::Client::new(),
            state: Mutex::new(file),
        })
    }

    /// Point refreshes at a different token endpoint (tests).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    fn is_fresh(state: &AuthorizedUserFile) -> bool {
        match (&state.access_token, state.expiry) {
            (Some(_), Some(expiry)) => {
                expiry - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) > Utc::now()
            }
            _ => false,
        }
    }

    async fn refresh(&self, state: &mut AuthorizedUserFile) -> Result<(), CredentialError> {
        let params = [
            ("client_id", state.client_id.as_str()),
            ("client_secret", state.client_secret.as_str()),
            ("refresh_token", state.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| CredentialError::RefreshFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(CredentialError::RefreshFailed {
                reason: format!("HTTP {}: {}", status.as_u16(), text),
            });
        }

        let refreshed: RefreshResponse =
            response
                .json()
                .await
                .map_err(|e| CredentialError::RefreshFailed {
                    reason: format!("malformed token response: {}", e),
                })?;

        state.access_token = Some(refreshed.access_token);
        state.expiry = Some(Utc::now() + ChronoDuration::seconds(refreshed.expires_in));
        self.persist(state)?;
        tracing::info!("access token refreshed");
        Ok(())
    }

    fn persist(&self, state: &AuthorizedUserFile) -> Result<(), CredentialError> {
        let contents =
            serde_json::to_string_pretty(state).map_err(|e| CredentialError::RefreshFailed {
                reason: format!("serialize credential: {}", e),
            })?;
        std::fs::write(&self.path, contents).map_err(|e| CredentialError::RefreshFailed {
            reason: format!("persist {}: {}", self.path.display(), e),
        })
    }
}

#[async_trait]
impl TokenProvider for AuthorizedUserToken {
    async fn bearer_token(&self) -> Result<String, CredentialError> {
        let mut state = self.state.lock().await;
        if !Self::is_fresh(&state) {
            self.refresh(&mut state).await?;
        }
        state
            .access_token
            .clone()
            .ok_or_else(|| CredentialError::RefreshFailed {
                reason: "refresh produced no access token".to_string(),
            })
    }
}

impl std::fmt::Debug for AuthorizedUserToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUserToken")
            .field("path", &self.path)
            .field("token_url", &self.token_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn credential_file(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("token.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn base_file() -> String {
        serde_json::json!({
            "client_id": "id",
            "client_secret": "secret",
            "refresh_token": "refresh"
        })
        .to_string()
    }

    fn fresh_file() -> String {
        serde_json::json!({
            "client_id": "id",
            "client_secret": "secret",
            "refresh_token": "refresh",
            "access_token": "cached-token",
            "expiry": Utc::now() + ChronoDuration::hours(1)
        })
        .to_string()
    }

    /// Token endpoint stub that counts how many refreshes it served.
    async fn token_endpoint(max_requests: usize) -> (String, tokio::task::JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let body = r#"{"access_token":"fresh-token","expires_in":3600,"token_type":"Bearer"}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let mut served = 0;
            while served < max_requests {
                match tokio::time::timeout(std::time::Duration::from_millis(500), listener.accept())
                    .await
                {
                    Ok(Ok((mut socket, _))) => {
                        let mut buf = vec![0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        socket.write_all(response.as_bytes()).await.unwrap();
                        socket.shutdown().await.ok();
                        served += 1;
                    }
                    _ => break,
                }
            }
            served
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = AuthorizedUserToken::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CredentialError::NotFound { .. }));
    }

    #[test]
    fn test_load_malformed_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = credential_file(&dir, "{not json");
        let err = AuthorizedUserToken::load(path).unwrap_err();
        assert!(matches!(err, CredentialError::Malformed { .. }));
    }

    #[test]
    fn test_load_empty_refresh_token_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = credential_file(
            &dir,
            r#"{"client_id":"id","client_secret":"secret","refresh_token":"  "}"#,
        );
        let err = AuthorizedUserToken::load(path).unwrap_err();
        assert!(matches!(err, CredentialError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_fresh_cached_token_skips_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = credential_file(&dir, &fresh_file());
        // Unroutable endpoint: any refresh attempt would fail loudly.
        let provider = AuthorizedUserToken::load(path)
            .unwrap()
            .with_token_url("http://127.0.0.1:1");

        assert_eq!(provider.bearer_token().await.unwrap(), "cached-token");
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = credential_file(&dir, &base_file());
        let (url, handle) = token_endpoint(1).await;
        let provider = AuthorizedUserToken::load(&path)
            .unwrap()
            .with_token_url(url);

        assert_eq!(provider.bearer_token().await.unwrap(), "fresh-token");
        assert_eq!(handle.await.unwrap(), 1);

        let persisted = std::fs::read_to_string(&path).unwrap();
        assert!(persisted.contains("fresh-token"));
        assert!(persisted.contains("\"refresh_token\": \"refresh\""));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = credential_file(&dir, &base_file());
        let (url, handle) = token_endpoint(2).await;
        let provider = Arc::new(
            AuthorizedUserToken::load(&path)
                .unwrap()
                .with_token_url(url),
        );

        let (a, b) = tokio::join!(provider.bearer_token(), provider.bearer_token());
        assert_eq!(a.unwrap(), "fresh-token");
        assert_eq!(b.unwrap(), "fresh-token");

        // The stub waits briefly for a second request; only one arrives.
        assert_eq!(handle.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = credential_file(&dir, &base_file());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let body = r#"{"error":"invalid_grant"}"#;
            let response = format!(
                "HTTP/1.1 400 Bad Request\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let provider = AuthorizedUserToken::load(&path)
            .unwrap()
            .with_token_url(format!("http://{}", addr));

        let err = provider.bearer_token().await.unwrap_err();
        match err {
            CredentialError::RefreshFailed { reason } => {
                assert!(reason.contains("400"));
                assert!(reason.contains("invalid_grant"));
            }
            other => panic!("expected RefreshFailed, got {:?}", other),
        }
    }
}
