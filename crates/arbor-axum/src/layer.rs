//! Tower middleware running the session gatekeeper per request.
//!
//! The [`SessionLayer`] reads the session cookie record, asks the
//! gatekeeper for a verdict, and either forwards the request with the
//! identity attached (applying any cookie rewrite to the response),
//! redirects to sign-in with the record cleared, or redirects to the
//! fallback page leaving the session untouched.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tower::{Layer, Service};

use arbor_session::auth_api::AuthApi;
use arbor_session::config::REFRESH_TOKEN_EXPIRY;
use arbor_session::gatekeeper::{CookieWrites, SessionGatekeeper, Verdict};

use crate::extractors::CurrentIdentity;
use crate::record::{self, SessionRecord, ACCESS_COOKIE, META_COOKIE, REFRESH_COOKIE};

/// Configuration for the session middleware.
#[derive(Debug, Clone)]
pub struct SessionLayerConfig {
    /// Redirect target when the session is cleared.
    pub sign_in_path: String,
    /// Redirect target on route authorization failure.
    pub fallback_path: String,
    /// Path prefixes the gatekeeper never runs on (health checks, the
    /// sign-in page itself).
    pub skip_prefixes: Vec<String>,
    /// `Secure` attribute on session cookies; disable only for local dev.
    pub secure_cookies: bool,
    /// Max-age of the refresh and metadata cookies.
    pub refresh_cookie_ttl: StdDuration,
}

impl Default for SessionLayerConfig {
    fn default() -> Self {
        Self {
            sign_in_path: "/signin".to_string(),
            fallback_path: "/".to_string(),
            skip_prefixes: vec![
                "/health".to_string(),
                "/ready".to_string(),
                "/signin".to_string(),
            ],
            secure_cookies: true,
            refresh_cookie_ttl: REFRESH_TOKEN_EXPIRY,
        }
    }
}

impl SessionLayerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sign-in redirect path.
    #[must_use]
    pub fn sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    /// Set the authorization-failure redirect path.
    #[must_use]
    pub fn fallback_path(mut self, path: impl Into<String>) -> Self {
        self.fallback_path = path.into();
        self
    }

    /// Set the unguarded path prefixes.
    #[must_use]
    pub fn skip_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.skip_prefixes = prefixes;
        self
    }

    /// Set whether session cookies carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    fn skips(&self, path: &str) -> bool {
        self.skip_prefixes
            .iter()
            .any(|p| path == p.as_str() || path.starts_with(&format!("{p}/")))
    }
}

/// Tower layer installing the session gatekeeper.
pub struct SessionLayer<A: AuthApi> {
    gatekeeper: Arc<SessionGatekeeper<A>>,
    config: SessionLayerConfig,
}

impl<A: AuthApi> SessionLayer<A> {
    #[must_use]
    pub fn new(gatekeeper: Arc<SessionGatekeeper<A>>) -> Self {
        Self {
            gatekeeper,
            config: SessionLayerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(gatekeeper: Arc<SessionGatekeeper<A>>, config: SessionLayerConfig) -> Self {
        Self { gatekeeper, config }
    }
}

impl<A: AuthApi> Clone for SessionLayer<A> {
    fn clone(&self) -> Self {
        Self {
            gatekeeper: self.gatekeeper.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, A: AuthApi> Layer<S> for SessionLayer<A> {
    type Service = SessionService<S, A>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            gatekeeper: self.gatekeeper.clone(),
            config: self.config.clone(),
        }
    }
}

/// The session middleware service.
pub struct SessionService<S, A: AuthApi> {
    inner: S,
    gatekeeper: Arc<SessionGatekeeper<A>>,
    config: SessionLayerConfig,
}

impl<S: Clone, A: AuthApi> Clone for SessionService<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gatekeeper: self.gatekeeper.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, A> Service<Request<Body>> for SessionService<S, A>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    A: AuthApi + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Swap in the clone so the ready-polled instance handles this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gatekeeper = self.gatekeeper.clone();
        let config = self.config.clone();

        ResponseFuture {
            inner: Box::pin(async move {
                let path = req.uri().path().to_string();
                if config.skips(&path) {
                    return inner.call(req).await;
                }

                let jar = CookieJar::from_headers(req.headers());
                let record = SessionRecord::from_jar(&jar);
                let session_request = record.to_session_request(path);

                match gatekeeper.check(&session_request).await {
                    Verdict::Proceed { identity, writes } => {
                        let mut req = req;
                        req.extensions_mut().insert(CurrentIdentity(identity));
                        let mut response = inner.call(req).await?;
                        if let Some(writes) = writes {
                            apply_writes(&mut response, &record, &writes, &config);
                        }
                        Ok(response)
                    }
                    Verdict::SignIn { reason } => {
                        tracing::debug!(reason, "redirecting to sign-in");
                        let mut response = Redirect::to(&config.sign_in_path).into_response();
                        for cookie in record::clear_cookies() {
                            append_cookie(&mut response, &cookie);
                        }
                        Ok(response)
                    }
                    Verdict::Fallback => {
                        Ok(Redirect::to(&config.fallback_path).into_response())
                    }
                }
            }),
        }
    }
}

/// Response future of [`SessionService`].
pub struct ResponseFuture<E> {
    inner: Pin<Box<dyn Future<Output = Result<Response, E>> + Send>>,
}

impl<E> Future for ResponseFuture<E> {
    type Output = Result<Response, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

/// Rewrite the whole cookie record on the response. Token values fall back
/// to the inbound ones when the pair was not rotated.
fn apply_writes(
    response: &mut Response,
    record: &SessionRecord,
    writes: &CookieWrites,
    config: &SessionLayerConfig,
) {
    let (access_value, refresh_value) = match &writes.tokens {
        Some(pair) => (
            Some(pair.access_token.clone()),
            Some(pair.refresh_token.clone()),
        ),
        None => (record.access_token.clone(), record.refresh_token.clone()),
    };

    let metadata_value = match writes.metadata.to_cookie_value() {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "skipping session cookie rewrite");
            return;
        }
    };

    let refresh_ttl = time::Duration::seconds(config.refresh_cookie_ttl.as_secs() as i64);
    let access_ttl = time::Duration::seconds(writes.access_max_age.as_secs() as i64);

    if let Some(value) = access_value {
        let cookie = record::session_cookie(ACCESS_COOKIE, value, access_ttl, config.secure_cookies);
        append_cookie(response, &cookie);
    }
    if let Some(value) = refresh_value {
        let cookie =
            record::session_cookie(REFRESH_COOKIE, value, refresh_ttl, config.secure_cookies);
        append_cookie(response, &cookie);
    }
    let cookie =
        record::session_cookie(META_COOKIE, metadata_value, refresh_ttl, config.secure_cookies);
    append_cookie(response, &cookie);
}

fn append_cookie(response: &mut Response, cookie: &Cookie<'static>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => {
            tracing::error!(cookie = cookie.name(), error = %e, "invalid cookie value");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = SessionLayerConfig::new()
            .sign_in_path("/login")
            .fallback_path("/dashboard")
            .secure_cookies(false);
        assert_eq!(config.sign_in_path, "/login");
        assert_eq!(config.fallback_path, "/dashboard");
        assert!(!config.secure_cookies);
    }

    #[test]
    fn skip_prefixes_match_on_segment_boundaries() {
        let config = SessionLayerConfig::default();
        assert!(config.skips("/health"));
        assert!(config.skips("/signin"));
        assert!(config.skips("/signin/callback"));
        assert!(!config.skips("/signin-help"));
        assert!(!config.skips("/admin"));
    }
}
