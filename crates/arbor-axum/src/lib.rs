//! Arbor Axum - HTTP binding for the session gatekeeper
//!
//! Provides the [`SessionLayer`] tower middleware that runs the gatekeeper
//! on every request, the typed [`SessionRecord`] codec treating the three
//! session cookies as one atomic record, and the [`CurrentUser`] extractor
//! for handlers.

pub mod error;
pub mod extractors;
pub mod layer;
pub mod record;

pub use error::GateError;
pub use extractors::{CurrentIdentity, CurrentUser};
pub use layer::{SessionLayer, SessionLayerConfig, SessionService};
pub use record::SessionRecord;
