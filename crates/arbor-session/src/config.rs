//! Session lifecycle configuration

use std::time::Duration;

/// Access token lifetime issued by the auth service.
pub const ACCESS_TOKEN_EXPIRY: Duration = Duration::from_secs(3600);

/// Refresh token lifetime (30 days). Also the max-age of the refresh and
/// metadata cookies.
pub const REFRESH_TOKEN_EXPIRY: Duration = Duration::from_secs(2_592_000);

/// Session invalidated after this long with no requests.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(7200);

/// Session invalidated this long after creation regardless of activity.
pub const ABSOLUTE_TIMEOUT: Duration = Duration::from_secs(86_400);

/// TTL for cached decoded access-token claims.
pub const CLAIMS_CACHE_TTL: Duration = Duration::from_secs(30);

/// TTL for cached parsed metadata cookies.
pub const METADATA_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum gap between persisted `last_activity` bumps.
pub const ACTIVITY_UPDATE_THROTTLE: Duration = Duration::from_secs(300);

/// Interval of the background cache sweep.
pub const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Session lifecycle configuration.
///
/// The defaults are the production constants; the `with_*` overrides exist
/// for tests and non-standard deployments.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the external auth service (e.g. `https://auth.internal`).
    pub auth_base_url: String,
    /// Idle timeout for the session metadata model.
    pub idle_timeout: Duration,
    /// Absolute timeout for the session metadata model.
    pub absolute_timeout: Duration,
    /// Refresh token lifetime; basis for the refresh/metadata cookie window.
    pub refresh_token_ttl: Duration,
    /// TTL of decoded-claims cache entries.
    pub claims_cache_ttl: Duration,
    /// TTL of parsed-metadata cache entries.
    pub metadata_cache_ttl: Duration,
    /// Activity write throttle.
    pub activity_throttle: Duration,
    /// Background sweep interval.
    pub sweep_interval: Duration,
}

impl SessionConfig {
    /// Create a config for the given auth service base URL with production
    /// defaults for every timeout and TTL.
    pub fn new(auth_base_url: impl Into<String>) -> Self {
        Self {
            auth_base_url: auth_base_url.into(),
            idle_timeout: IDLE_TIMEOUT,
            absolute_timeout: ABSOLUTE_TIMEOUT,
            refresh_token_ttl: REFRESH_TOKEN_EXPIRY,
            claims_cache_ttl: CLAIMS_CACHE_TTL,
            metadata_cache_ttl: METADATA_CACHE_TTL,
            activity_throttle: ACTIVITY_UPDATE_THROTTLE,
            sweep_interval: CACHE_SWEEP_INTERVAL,
        }
    }

    /// Set the idle timeout.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the absolute timeout.
    #[must_use]
    pub fn with_absolute_timeout(mut self, timeout: Duration) -> Self {
        self.absolute_timeout = timeout;
        self
    }

    /// Set the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Set the decoded-claims cache TTL.
    #[must_use]
    pub fn with_claims_cache_ttl(mut self, ttl: Duration) -> Self {
        self.claims_cache_ttl = ttl;
        self
    }

    /// Set the parsed-metadata cache TTL.
    #[must_use]
    pub fn with_metadata_cache_ttl(mut self, ttl: Duration) -> Self {
        self.metadata_cache_ttl = ttl;
        self
    }

    /// Set the activity write throttle.
    #[must_use]
    pub fn with_activity_throttle(mut self, throttle: Duration) -> Self {
        self.activity_throttle = throttle;
        self
    }

    /// Set the background sweep interval.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_constants() {
        let config = SessionConfig::new("https://auth.example.com");
        assert_eq!(config.idle_timeout, Duration::from_secs(7200));
        assert_eq!(config.absolute_timeout, Duration::from_secs(86_400));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(2_592_000));
        assert_eq!(config.claims_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.metadata_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.activity_throttle, Duration::from_secs(300));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn builder_overrides() {
        let config = SessionConfig::new("http://localhost:9000")
            .with_idle_timeout(Duration::from_secs(60))
            .with_claims_cache_ttl(Duration::from_secs(1));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.claims_cache_ttl, Duration::from_secs(1));
        // untouched fields keep their defaults
        assert_eq!(config.absolute_timeout, ABSOLUTE_TIMEOUT);
    }
}
