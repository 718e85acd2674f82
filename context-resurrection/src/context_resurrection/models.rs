//! Context Resurrection snapshot models (v1 schema)
//!
//! These types mirror the JSON the daemon persists and returns over the
//! socket. Field names are the shared wire vocabulary and must not change.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Highest snapshot schema version this client understands
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Unique identifier for a snapshot
/// Format: "2026-02-06T13:12:33Z_qdz.fix-api-timeout-bug"
pub type SnapshotId = String;

/// Build a snapshot id from its capture timestamp and task id.
///
/// Zero-padded ISO8601 timestamps keep ids sortable by capture time.
pub fn snapshot_id(captured_at: &str, task_id: &str) -> SnapshotId {
    format!("{}_{}", captured_at, task_id)
}

/// Parse an ISO8601 timestamp into an absolute instant.
///
/// Accepts RFC 3339 (with offset or `Z`). Timestamps without an offset are
/// read as UTC. Returns `None` for anything else.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Reason why a snapshot was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureReason {
    /// Session transitioned to Stopped state
    SessionStopped,
    /// Session transitioned to Waiting state
    SessionWaiting,
    /// Session transitioned to Running state
    SessionRunning,
    /// Periodic idle timeout triggered capture
    IdleTimeout,
    /// User manually triggered capture (e.g., adding a note)
    Manual,
}

impl std::fmt::Display for CaptureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureReason::SessionStopped => write!(f, "Session stopped"),
            CaptureReason::SessionWaiting => write!(f, "Session waiting"),
            CaptureReason::SessionRunning => write!(f, "Session running"),
            CaptureReason::IdleTimeout => write!(f, "Idle timeout"),
            CaptureReason::Manual => write!(f, "Manual"),
        }
    }
}

/// Session status at snapshot time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Running,
    Waiting,
    Stopped,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "Running"),
            SessionStatus::Waiting => write!(f, "Waiting"),
            SessionStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Attention state summary captured from session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionSummary {
    /// Type of attention trigger
    pub attention_type: AttentionType,
    /// Preview text/snippet
    pub preview: String,
    /// ISO8601 timestamp when attention was triggered
    pub triggered_at: String,
}

/// Type of attention state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionType {
    InputRequired,
    DecisionPoint,
    Completed,
    Error,
}

/// Terminal context captured from a session
///
/// `session_id` and `status` are always present together; a snapshot
/// without a terminal has no `TerminalContext` at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalContext {
    /// Session ID
    pub session_id: u64,
    /// Session status at capture time
    pub status: SessionStatus,
    /// Exit code (if session stopped)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Last attention state (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attention: Option<AttentionSummary>,
    /// Terminal tail inline (sanitized, for small tails)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail_inline: Option<String>,
    /// Path to terminal tail file (sanitized, for large tails)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail_path: Option<String>,
}

/// Context snapshot (v1 schema)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshotV1 {
    /// Snapshot identifier
    pub id: SnapshotId,
    /// Schema version (1 for v1)
    pub version: u32,

    /// Absolute path to project TODO.md
    pub project_path: String,
    /// Task ID (stable identifier)
    pub task_id: String,
    /// Task title text at time of capture
    pub task_title_at_capture: String,

    /// ISO8601 timestamp when snapshot was captured
    pub captured_at: String,
    /// Reason for capture
    pub capture_reason: CaptureReason,

    /// Terminal context (best effort)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalContext>,

    /// User note to future self
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_note: Option<String>,

    /// Editor context (reserved, carried through untouched).
    ///
    /// Absent stays absent; an explicit `null` is kept as `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub editor: Option<serde_json::Value>,
}

impl ContextSnapshotV1 {
    /// Create a new snapshot with minimal required fields
    pub fn new(
        id: SnapshotId,
        project_path: String,
        task_id: String,
        task_title_at_capture: String,
        captured_at: String,
        capture_reason: CaptureReason,
    ) -> Self {
        Self {
            id,
            version: SNAPSHOT_SCHEMA_VERSION,
            project_path,
            task_id,
            task_title_at_capture,
            captured_at,
            capture_reason,
            terminal: None,
            user_note: None,
            editor: None,
        }
    }

    /// Capture instant, or None when `captured_at` does not parse
    pub fn captured_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.captured_at)
    }

    /// Whether this client understands the snapshot's schema version.
    ///
    /// Newer snapshots still decode (unknown fields are ignored) but callers
    /// should not offer them for resurrection.
    pub fn is_supported_version(&self) -> bool {
        (1..=SNAPSHOT_SCHEMA_VERSION).contains(&self.version)
    }
}

/// Any present value, `null` included, becomes `Some`
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}
