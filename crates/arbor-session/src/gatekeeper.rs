//! Session gatekeeper
//!
//! The per-request entry point. Reads the raw cookie values, decides
//! whether the session is valid, expired, or refreshable, and returns a
//! verdict the HTTP layer turns into a pass-through, a cookie rewrite, or a
//! redirect. State machine per request:
//!
//! `NO_SESSION -> sign-in` | `VALID -> (REFRESHING) -> VALID | EXPIRED`
//!
//! All decode, parse, and refresh failures fail closed into `EXPIRED`.
//! Two concurrent requests for the same user may both decide to refresh;
//! that race is accepted (the auth service tolerates double refresh) rather
//! than serialized with cross-request locking.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::auth_api::{AuthApi, TokenPair};
use crate::cache::{ExpiringCache, Sweepable, Sweeper};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::metadata::{ExpiryReason, SessionMetadata};
use crate::routes::{Access, ProtectedRoutes, Role};
use crate::throttle::should_persist_activity_with;
use crate::token::{decode_claims, AccessClaims};

/// Raw session state read from the request's cookies.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// The metadata cookie value, unparsed.
    pub raw_metadata: Option<String>,
    /// Request path, for the route authorization gate.
    pub path: String,
}

/// Who the request is authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: i64,
    pub roles: Vec<Role>,
}

/// Cookie rewrite the HTTP layer must apply when admitting the request.
///
/// The three session cookies are always rewritten together as one record;
/// `tokens` is `None` when the current pair is unchanged and only metadata
/// and max-ages move.
#[derive(Debug, Clone)]
pub struct CookieWrites {
    pub tokens: Option<TokenPair>,
    pub metadata: SessionMetadata,
    /// Remaining access-token lifetime, for the access cookie's max-age.
    pub access_max_age: Duration,
}

/// Gatekeeper outcome for one request.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Admit the request. `writes` is `None` on the throttled fast path
    /// where no cookie changes, which must not be read as "invalid".
    Proceed {
        identity: Identity,
        writes: Option<CookieWrites>,
    },
    /// Session over: clear all session cookies and redirect to sign-in.
    /// The reason is diagnostic only.
    SignIn { reason: &'static str },
    /// Authorization (not authentication) failure: redirect to the
    /// fallback page, session cookies untouched.
    Fallback,
}

/// Orchestrates the validate -> refresh -> authorize -> persist pipeline.
///
/// Explicitly constructed at process init; owns its two caches and hands
/// them to a [`Sweeper`] via [`start_sweeper`](Self::start_sweeper). Safe
/// to share across concurrent requests via `Arc`.
pub struct SessionGatekeeper<A: AuthApi> {
    config: SessionConfig,
    auth: Arc<A>,
    routes: ProtectedRoutes,
    claims_cache: ExpiringCache<String, AccessClaims>,
    metadata_cache: ExpiringCache<String, SessionMetadata>,
}

impl<A: AuthApi + 'static> SessionGatekeeper<A> {
    pub fn new(config: SessionConfig, auth: A, routes: ProtectedRoutes) -> Self {
        Self {
            config,
            auth: Arc::new(auth),
            routes,
            claims_cache: ExpiringCache::new("claims"),
            metadata_cache: ExpiringCache::new("metadata"),
        }
    }

    /// Spawn the periodic sweep over both caches. Call once at startup;
    /// abort the handle on shutdown.
    pub fn start_sweeper(&self) -> tokio::task::JoinHandle<()> {
        Sweeper::spawn(
            vec![
                Arc::new(self.claims_cache.clone()) as Arc<dyn Sweepable>,
                Arc::new(self.metadata_cache.clone()) as Arc<dyn Sweepable>,
            ],
            self.config.sweep_interval,
        )
    }

    /// Cache entry counts, for introspection endpoints and tests.
    pub fn cache_stats(&self) -> (usize, usize) {
        (
            self.claims_cache.entry_count(),
            self.metadata_cache.entry_count(),
        )
    }

    /// Run the full pipeline for one request.
    pub async fn check(&self, request: &SessionRequest) -> Verdict {
        self.check_at(request, Utc::now().timestamp()).await
    }

    /// Pipeline with an explicit clock, for deterministic tests.
    pub async fn check_at(&self, request: &SessionRequest, now: i64) -> Verdict {
        // NO_SESSION: nothing to validate, nothing to invalidate.
        if request.access_token.is_none() && request.refresh_token.is_none() {
            return Verdict::SignIn { reason: "no-session" };
        }

        // Parse metadata (cache-assisted). A corrupt cookie fails closed.
        let metadata = match &request.raw_metadata {
            None => None,
            Some(raw) => match self.parse_metadata(raw) {
                Ok(meta) => Some(meta),
                Err(_) => return self.expire(request, "metadata-parse").await,
            },
        };

        // Metadata-driven idle/absolute expiry wins over raw token
        // validity; a token reason falls through to the refresh path.
        if let Some(meta) = &metadata {
            match meta.expiry_reason_with(
                now,
                self.config.idle_timeout.as_secs() as i64,
                self.config.absolute_timeout.as_secs() as i64,
            ) {
                Some(ExpiryReason::Idle) => return self.expire(request, "idle-timeout").await,
                Some(ExpiryReason::Absolute) => {
                    return self.expire(request, "absolute-timeout").await
                }
                Some(ExpiryReason::Token) | None => {}
            }
        }

        // Decode the access token (cache-assisted).
        let claims = match &request.access_token {
            None => None,
            Some(token) => match self.decode_cached(token) {
                Ok(claims) => Some(claims),
                Err(_) => return self.expire(request, "malformed-token").await,
            },
        };

        let token_expired = claims.as_ref().map_or(true, |c| c.is_expired(now));

        if token_expired {
            return self.refresh(request, metadata, now).await;
        }

        // Access token valid. claims is necessarily Some here.
        let Some(claims) = claims else {
            return self.expire(request, "no-access-token").await;
        };

        let writes = if should_persist_activity_with(
            metadata.as_ref(),
            now,
            self.config.activity_throttle.as_secs() as i64,
        ) {
            let metadata = match metadata {
                Some(meta) => meta.with_activity(now),
                // Valid token but no metadata cookie yet: synthesize a
                // fresh record rather than failing the request.
                None => SessionMetadata::new(
                    claims.exp,
                    now + self.config.refresh_token_ttl.as_secs() as i64,
                    now,
                ),
            };
            Some(CookieWrites {
                tokens: None,
                metadata,
                access_max_age: remaining(claims.exp, now),
            })
        } else {
            None
        };

        self.admit(request, claims, writes)
    }

    /// Best-effort server-side invalidation of the refresh token. The
    /// local cookie clear proceeds regardless of the outcome, and calling
    /// this for an already-cleared session is a no-op.
    pub async fn clear(&self, refresh_token: Option<&str>) {
        let Some(refresh_token) = refresh_token else {
            return;
        };
        // Detached so a client disconnect mid-pipeline cannot abandon the
        // call halfway.
        let auth = self.auth.clone();
        let token = refresh_token.to_string();
        let outcome = tokio::spawn(async move { auth.invalidate(&token).await }).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "refresh token invalidation failed; clearing session anyway");
            }
            Err(e) => {
                tracing::warn!(error = %e, "invalidation task failed; clearing session anyway");
            }
        }
    }

    /// REFRESHING: exchange the refresh token for a new pair and rebuild
    /// the session record around it.
    async fn refresh(
        &self,
        request: &SessionRequest,
        metadata: Option<SessionMetadata>,
        now: i64,
    ) -> Verdict {
        let Some(refresh_token) = &request.refresh_token else {
            return self.expire(request, "token-expired-no-refresh").await;
        };

        // The exchange runs on a detached task: if the client disconnects
        // and this future is dropped, the rotation still completes instead
        // of leaving the refresh token in an ambiguous state.
        let auth = self.auth.clone();
        let token = refresh_token.clone();
        let outcome = tokio::spawn(async move { auth.refresh(&token).await }).await;

        let pair = match outcome {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                tracing::info!(error = %e, "access token refresh failed");
                return self.expire(request, "refresh-failed").await;
            }
            Err(e) => {
                tracing::error!(error = %e, "refresh task failed");
                return self.expire(request, "refresh-failed").await;
            }
        };

        // The new token is guaranteed fresh; decode it directly instead of
        // going through the cache.
        let claims = match decode_claims(&pair.access_token) {
            Ok(claims) => claims,
            Err(_) => return self.expire(request, "refreshed-token-malformed").await,
        };

        let metadata = match metadata {
            // Keep the original refresh-token window; only the access
            // expiry and activity move.
            Some(meta) => meta.with_access_exp(claims.exp).with_activity(now),
            None => SessionMetadata::new(
                claims.exp,
                now + self.config.refresh_token_ttl.as_secs() as i64,
                now,
            ),
        };

        let writes = Some(CookieWrites {
            tokens: Some(pair),
            metadata,
            access_max_age: remaining(claims.exp, now),
        });

        self.admit(request, claims, writes)
    }

    /// VALID: run the route authorization gate, then admit.
    fn admit(
        &self,
        request: &SessionRequest,
        claims: AccessClaims,
        writes: Option<CookieWrites>,
    ) -> Verdict {
        match self.routes.authorize(&request.path, &claims.roles) {
            Access::Granted => Verdict::Proceed {
                identity: Identity {
                    subject_id: claims.sub,
                    roles: claims.roles,
                },
                writes,
            },
            Access::Denied => {
                tracing::debug!(path = %request.path, "route authorization denied");
                Verdict::Fallback
            }
        }
    }

    /// EXPIRED: invalidate server-side (best effort) and hand the clear
    /// back to the HTTP layer.
    async fn expire(&self, request: &SessionRequest, reason: &'static str) -> Verdict {
        tracing::debug!(reason, "session expired");
        self.clear(request.refresh_token.as_deref()).await;
        Verdict::SignIn { reason }
    }

    fn decode_cached(&self, token: &str) -> Result<AccessClaims, SessionError> {
        if let Some(claims) = self.claims_cache.get(&token.to_string()) {
            return Ok(claims);
        }
        let claims = decode_claims(token)?;
        self.claims_cache
            .put(token.to_string(), claims.clone(), self.config.claims_cache_ttl);
        Ok(claims)
    }

    fn parse_metadata(&self, raw: &str) -> Result<SessionMetadata, SessionError> {
        if let Some(meta) = self.metadata_cache.get(&raw.to_string()) {
            return Ok(meta);
        }
        let meta = SessionMetadata::parse(raw)?;
        self.metadata_cache
            .put(raw.to_string(), meta, self.config.metadata_cache_ttl);
        Ok(meta)
    }
}

impl<A: AuthApi> std::fmt::Debug for SessionGatekeeper<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGatekeeper")
            .field("config", &self.config)
            .field("claims_cache", &self.claims_cache)
            .field("metadata_cache", &self.metadata_cache)
            .finish_non_exhaustive()
    }
}

fn remaining(exp: i64, now: i64) -> Duration {
    Duration::from_secs(exp.saturating_sub(now).max(0) as u64)
}
