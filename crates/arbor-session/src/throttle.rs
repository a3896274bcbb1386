//! Activity write throttling
//!
//! Persisting the metadata cookie on every request would rewrite session
//! state constantly for no benefit. The throttle bounds that write
//! amplification to one bump per five minutes while keeping idle-timeout
//! accuracy within the same five-minute error bound.

use crate::config::ACTIVITY_UPDATE_THROTTLE;
use crate::metadata::SessionMetadata;

/// Decide whether this request should persist an activity bump.
///
/// Always true when no metadata exists yet (the record must be created);
/// otherwise true once the last persisted bump is older than the throttle.
pub fn should_persist_activity(meta: Option<&SessionMetadata>, now: i64) -> bool {
    should_persist_activity_with(meta, now, ACTIVITY_UPDATE_THROTTLE.as_secs() as i64)
}

/// Throttle with an explicit window, for non-default configs.
pub fn should_persist_activity_with(
    meta: Option<&SessionMetadata>,
    now: i64,
    throttle_secs: i64,
) -> bool {
    match meta {
        None => true,
        Some(m) => now - m.last_activity > throttle_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_with_activity(last_activity: i64) -> SessionMetadata {
        SessionMetadata {
            created_at: 0,
            last_activity,
            access_token_exp: 100_000,
            refresh_token_exp: 2_592_000,
        }
    }

    #[test]
    fn missing_metadata_always_persists() {
        assert!(should_persist_activity(None, 0));
    }

    #[test]
    fn requests_inside_window_are_suppressed() {
        // two requests 100s apart: the second must not persist
        let m = meta_with_activity(1_000);
        assert!(!should_persist_activity(Some(&m), 1_100));
    }

    #[test]
    fn requests_outside_window_persist() {
        // two requests 400s apart: both persist
        let m = meta_with_activity(1_000);
        assert!(should_persist_activity(Some(&m), 1_400));
    }

    #[test]
    fn boundary_is_exclusive() {
        let m = meta_with_activity(0);
        assert!(!should_persist_activity(Some(&m), 300));
        assert!(should_persist_activity(Some(&m), 301));
    }
}
