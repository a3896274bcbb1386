//! Arbor Session - session and token lifecycle management
//!
//! Runs on every inbound dashboard request: validates the current token
//! pair, refreshes the access token when it has expired, enforces idle and
//! absolute session timeouts, throttles activity writes, and evaluates the
//! protected-route table. Short-lived in-memory caches avoid re-decoding
//! the same token or re-parsing the same metadata cookie on every request.

pub mod auth_api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gatekeeper;
pub mod metadata;
pub mod routes;
pub mod throttle;
pub mod token;

pub use auth_api::{AuthApi, HttpAuthApi, TokenPair};
pub use cache::{ExpiringCache, Sweeper};
pub use config::SessionConfig;
pub use error::SessionError;
pub use gatekeeper::{CookieWrites, Identity, SessionGatekeeper, SessionRequest, Verdict};
pub use metadata::{ExpiryReason, SessionMetadata};
pub use routes::{Access, DefaultPolicy, PathPattern, ProtectedRoutes, Role, RouteRule};
