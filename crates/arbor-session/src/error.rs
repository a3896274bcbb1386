//! Session errors

use thiserror::Error;

/// Errors raised on the session lifecycle path.
///
/// Every authentication-path error converges on "clear the session and
/// redirect to sign-in"; the variants exist for diagnostics, not for
/// branching recovery logic.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Access token could not be decoded (bad structure, bad base64, bad
    /// JSON). Expiry is a claim value and never produces this error.
    #[error("malformed access token")]
    MalformedToken,

    /// Session metadata cookie could not be parsed.
    #[error("session metadata could not be parsed")]
    MetadataParse,

    /// The outbound refresh call failed (transport error or non-2xx).
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// The outbound invalidation call failed. Non-fatal: the local cookie
    /// clear proceeds regardless.
    #[error("refresh token invalidation failed: {0}")]
    InvalidationFailed(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}
