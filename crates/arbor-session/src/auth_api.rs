//! Outbound calls to the external auth service
//!
//! The session layer consumes exactly two remote operations: exchange a
//! refresh token for a new token pair, and invalidate a refresh token at
//! sign-out. Both are bounded by explicit timeouts and are never retried
//! within a request; a failed refresh is fatal for the session and the next
//! request retries naturally.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Access/refresh token pair as issued by the auth service. Replaced
/// wholesale on every refresh.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// Tokens must never reach logs, including through `{:?}` formatting.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair").finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Seam to the external auth service, mockable in tests.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange a refresh token for a fresh token pair. Any transport
    /// failure or non-2xx response is [`SessionError::RefreshFailed`].
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError>;

    /// Invalidate a refresh token server-side. Best-effort: callers log
    /// failures and proceed with the local clear.
    async fn invalidate(&self, refresh_token: &str) -> Result<(), SessionError>;
}

#[async_trait]
impl<T: AuthApi + ?Sized> AuthApi for std::sync::Arc<T> {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        (**self).refresh(refresh_token).await
    }

    async fn invalidate(&self, refresh_token: &str) -> Result<(), SessionError> {
        (**self).invalidate(refresh_token).await
    }
}

/// HTTP implementation of [`AuthApi`].
#[derive(Clone)]
pub struct HttpAuthApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpAuthApi {
    /// Build a client for the given auth service base URL.
    ///
    /// The HTTP client fails fast: 5s to connect, 10s per request, never
    /// left pending indefinitely.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(2)
            .tcp_nodelay(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_client(base_url, http)
    }

    /// Build with a caller-provided `reqwest` client, for custom proxy or
    /// TLS settings or to share a client across services.
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, http }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let url = format!("{}/auth/refresh", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| SessionError::RefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SessionError::RefreshFailed(format!(
                "auth service returned {}",
                response.status()
            )));
        }

        response
            .json::<TokenPair>()
            .await
            .map_err(|e| SessionError::RefreshFailed(format!("invalid response body: {e}")))
    }

    async fn invalidate(&self, refresh_token: &str) -> Result<(), SessionError> {
        let url = format!("{}/auth/invalidate", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| SessionError::InvalidationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SessionError::InvalidationFailed(format!(
                "auth service returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for HttpAuthApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuthApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
