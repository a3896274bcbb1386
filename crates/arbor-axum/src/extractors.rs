//! Axum extractors for the admitted session identity.

use std::ops::Deref;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use arbor_session::gatekeeper::Identity;

use crate::error::GateError;

/// Extension the session layer inserts into admitted requests.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

/// Extractor yielding the authenticated identity.
///
/// Returns 401 when the request never passed the session layer. Routes
/// behind [`SessionLayer`](crate::SessionLayer) always carry an identity,
/// so in practice this only rejects misconfigured route mounts.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl Deref for CurrentUser {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentIdentity>()
            .cloned()
            .map(|ext| Self(ext.0))
            .ok_or(GateError::Unauthenticated)
    }
}
