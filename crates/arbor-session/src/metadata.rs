//! Session metadata model
//!
//! The metadata cookie is the source of truth for idle and absolute timeout
//! decisions; it supersedes the raw token's own expiry for those two checks.
//! All timestamps are unix seconds. Everything here is pure: construction
//! and mutation return new values.

use serde::{Deserialize, Serialize};

use crate::config::{ABSOLUTE_TIMEOUT, IDLE_TIMEOUT};
use crate::error::SessionError;

/// Why a session is considered expired. Diagnostic only; every reason leads
/// to the same clear-and-redirect outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// Access token past its claimed expiry.
    Token,
    /// No activity for longer than the idle timeout.
    Idle,
    /// Session older than the absolute timeout.
    Absolute,
}

impl ExpiryReason {
    /// Stable string for log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Idle => "idle",
            Self::Absolute => "absolute",
        }
    }
}

/// Bookkeeping record persisted as the `sessionMetadata` cookie.
///
/// Invariant: `created_at <= last_activity <= refresh_token_exp`, maintained
/// by the constructors below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    /// When the session was created (sign-in time).
    pub created_at: i64,
    /// Last request that persisted an activity bump.
    pub last_activity: i64,
    /// Expiry claim of the current access token.
    pub access_token_exp: i64,
    /// End of the refresh token's 30-day window, fixed at sign-in.
    pub refresh_token_exp: i64,
}

impl SessionMetadata {
    /// Fresh metadata for a new session: `created_at = last_activity = now`.
    pub fn new(access_token_exp: i64, refresh_token_exp: i64, now: i64) -> Self {
        Self {
            created_at: now,
            last_activity: now,
            access_token_exp,
            refresh_token_exp,
        }
    }

    /// Copy with `last_activity` bumped to `now`; all other fields unchanged.
    #[must_use]
    pub fn with_activity(self, now: i64) -> Self {
        Self {
            last_activity: now,
            ..self
        }
    }

    /// Copy with the access-token expiry replaced after a refresh.
    #[must_use]
    pub fn with_access_exp(self, access_token_exp: i64) -> Self {
        Self {
            access_token_exp,
            ..self
        }
    }

    /// Evaluate expiry against the production timeouts.
    pub fn expiry_reason(&self, now: i64) -> Option<ExpiryReason> {
        self.expiry_reason_with(
            now,
            IDLE_TIMEOUT.as_secs() as i64,
            ABSOLUTE_TIMEOUT.as_secs() as i64,
        )
    }

    /// Evaluate expiry with explicit timeouts.
    ///
    /// Checks run in fixed priority order and the first match wins:
    /// token expiry, then idle, then absolute. The order only affects which
    /// reason is surfaced for diagnostics, never whether the session dies.
    pub fn expiry_reason_with(
        &self,
        now: i64,
        idle_timeout_secs: i64,
        absolute_timeout_secs: i64,
    ) -> Option<ExpiryReason> {
        if now >= self.access_token_exp {
            Some(ExpiryReason::Token)
        } else if now - self.last_activity > idle_timeout_secs {
            Some(ExpiryReason::Idle)
        } else if now - self.created_at > absolute_timeout_secs {
            Some(ExpiryReason::Absolute)
        } else {
            None
        }
    }

    /// Parse the JSON cookie value. Fails closed: any corrupt cookie is a
    /// `MetadataParse` error, treated upstream as an expired session.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        serde_json::from_str(raw).map_err(|e| {
            tracing::debug!(error = %e, "failed to parse session metadata cookie");
            SessionError::MetadataParse
        })
    }

    /// Serialize for the cookie value.
    pub fn to_cookie_value(&self) -> Result<String, SessionError> {
        serde_json::to_string(self)
            .map_err(|e| SessionError::Internal(format!("metadata serialization: {e}")))
    }
}
