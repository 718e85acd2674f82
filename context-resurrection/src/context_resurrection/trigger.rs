//! Decides whether to offer the resurrection card after an absence.
//!
//! Pure logic: callers pass the already-decoded lookup result, the last
//! observed activity, and the current time.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

use super::models::ContextSnapshotV1;
use crate::daemon::config::{Config, DEFAULT_CARD_THRESHOLD};

/// Tunables for the card trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerConfig {
    /// Minimum time since the last capture/activity before the card is offered
    pub threshold: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CARD_THRESHOLD,
        }
    }
}

impl From<&Config> for TriggerConfig {
    fn from(config: &Config) -> Self {
        Self {
            threshold: config.card_threshold,
        }
    }
}

/// Should the resurrection card be shown?
///
/// `lookup` is the result of a latest-snapshot request (`None` when no
/// lookup happened). `last_activity_ms` is epoch milliseconds of the most
/// recent observed activity; non-finite values are ignored.
///
/// Any failure, missing snapshot, unsupported schema version or
/// unparseable `captured_at` yields `false`.
pub fn should_show_card<E>(
    lookup: Option<&Result<Option<ContextSnapshotV1>, E>>,
    last_activity_ms: Option<f64>,
    now: DateTime<Utc>,
    config: &TriggerConfig,
) -> bool {
    let snapshot = match lookup {
        Some(Ok(Some(snapshot))) => snapshot,
        _ => return false,
    };

    if !snapshot.is_supported_version() {
        return false;
    }

    let Some(captured_at) = snapshot.captured_at_utc() else {
        return false;
    };

    let reference = match last_activity_ms.and_then(activity_instant) {
        Some(activity) => captured_at.max(activity),
        None => captured_at,
    };

    let Ok(threshold) = chrono::Duration::from_std(config.threshold) else {
        return false;
    };

    now.signed_duration_since(reference) > threshold
}

/// Finite hints outside chrono's range are pinned to its nearest end.
fn activity_instant(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    let min = DateTime::<Utc>::MIN_UTC.timestamp_millis();
    let max = DateTime::<Utc>::MAX_UTC.timestamp_millis();
    // `as` truncates toward zero and saturates at the i64 bounds
    let ms = (ms as i64).clamp(min, max);
    Utc.timestamp_millis_opt(ms).single()
}
