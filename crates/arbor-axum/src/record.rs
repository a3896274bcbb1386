//! Session cookie record
//!
//! The access token, refresh token, and metadata cookies form one logical
//! session record. They are read together and always written or cleared
//! together, so a rewrite can never update the metadata while leaving a
//! stale token cookie behind.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use arbor_session::gatekeeper::SessionRequest;

/// Cookie holding the opaque access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie holding the opaque refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";
/// Cookie holding the JSON session metadata.
pub const META_COOKIE: &str = "sessionMetadata";

/// The three session cookies as read from a request.
#[derive(Clone, Default)]
pub struct SessionRecord {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub raw_metadata: Option<String>,
}

impl SessionRecord {
    /// Read the record from a request's cookie jar.
    pub fn from_jar(jar: &CookieJar) -> Self {
        Self {
            access_token: jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()),
            refresh_token: jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()),
            raw_metadata: jar.get(META_COOKIE).map(|c| c.value().to_string()),
        }
    }

    /// Build the gatekeeper request for this record and path.
    pub fn to_session_request(&self, path: impl Into<String>) -> SessionRequest {
        SessionRequest {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            raw_metadata: self.raw_metadata.clone(),
            path: path.into(),
        }
    }
}

// The record carries both tokens; never let it leak through Debug.
impl std::fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecord")
            .field("access_token", &self.access_token.is_some())
            .field("refresh_token", &self.refresh_token.is_some())
            .field("raw_metadata", &self.raw_metadata.is_some())
            .finish()
    }
}

/// Build one session cookie with the standard attributes.
pub(crate) fn session_cookie(
    name: &'static str,
    value: String,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Removal cookies for the whole record: empty value, zero max-age.
pub(crate) fn clear_cookies() -> [Cookie<'static>; 3] {
    [
        clear_cookie(ACCESS_COOKIE),
        clear_cookie(REFRESH_COOKIE),
        clear_cookie(META_COOKIE),
    ]
}

fn clear_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
