//! Shared test helpers: a mock auth service and a token mint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;

use arbor_session::{AuthApi, SessionError, TokenPair};

#[derive(Serialize)]
struct TestClaims<'a> {
    exp: i64,
    sub: i64,
    roles: Vec<&'a str>,
}

/// Mint an access token with the given claims. The gatekeeper never checks
/// signatures, so the signing key is irrelevant.
pub fn mint_token(exp: i64, sub: i64, roles: Vec<&str>) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &TestClaims { exp, sub, roles },
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("test token encodes")
}

/// What the mock returns from `refresh`.
pub enum RefreshOutcome {
    Succeed(TokenPair),
    Fail,
}

/// In-memory [`AuthApi`] with scripted outcomes and call counters.
pub struct MockAuthApi {
    refresh_outcome: Mutex<RefreshOutcome>,
    invalidate_fails: bool,
    pub refresh_calls: AtomicUsize,
    pub invalidate_calls: AtomicUsize,
}

impl MockAuthApi {
    pub fn refusing() -> Self {
        Self::new(RefreshOutcome::Fail, false)
    }

    pub fn issuing(pair: TokenPair) -> Self {
        Self::new(RefreshOutcome::Succeed(pair), false)
    }

    pub fn new(refresh_outcome: RefreshOutcome, invalidate_fails: bool) -> Self {
        Self {
            refresh_outcome: Mutex::new(refresh_outcome),
            invalidate_fails,
            refresh_calls: AtomicUsize::new(0),
            invalidate_calls: AtomicUsize::new(0),
        }
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn invalidate_count(&self) -> usize {
        self.invalidate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, SessionError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.refresh_outcome.lock().unwrap() {
            RefreshOutcome::Succeed(pair) => Ok(pair.clone()),
            RefreshOutcome::Fail => Err(SessionError::RefreshFailed("mock refusal".into())),
        }
    }

    async fn invalidate(&self, _refresh_token: &str) -> Result<(), SessionError> {
        self.invalidate_calls.fetch_add(1, Ordering::SeqCst);
        if self.invalidate_fails {
            Err(SessionError::InvalidationFailed("mock outage".into()))
        } else {
            Ok(())
        }
    }
}
