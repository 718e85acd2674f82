// Daemon protocol - shared structs for client <-> daemon communication
// Uses framed JSON messages (one per line) over Unix sockets

use crate::context_resurrection::models::ContextSnapshotV1;
use serde::{Deserialize, Serialize};

/// Protocol version declared by the client during the handshake
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum size of a single request frame accepted by the daemon (1MB)
pub const MAX_REQUEST_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum size of a single response frame accepted by the client (10MB)
pub const MAX_RESPONSE_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Daemon-side cap applied to `cr_list` when no limit is given
pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// Largest `cr_list` limit the daemon honors; larger values are clamped
pub const MAX_LIST_LIMIT: u32 = 500;

// ============================================================================
// Client -> Daemon requests
// ============================================================================

/// Request message from CLI/UI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonRequest {
    /// Declare the client's protocol version (first frame on every connection)
    Handshake { client_version: u32 },
    /// Ping to check if daemon is alive
    Ping,
    /// Latest snapshot for a task (or across tasks when task_id is absent)
    CrLatest {
        project_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
    },
    /// Snapshots for a task, newest first
    CrList {
        project_path: String,
        task_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },
    /// One snapshot by id
    CrGet {
        project_path: String,
        task_id: String,
        snapshot_id: String,
    },
    /// Force an immediate capture tagged `manual`
    CrCaptureNow {
        project_path: String,
        task_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_note: Option<String>,
    },
    /// Delete all snapshots for one task
    CrDeleteTask {
        project_path: String,
        task_id: String,
    },
    /// Delete all snapshots for every task under a project
    CrDeleteProject { project_path: String },
}

/// Discriminant of a successful response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Handshake,
    Pong,
    CrSnapshot,
    CrSnapshots,
    CrDeleted,
    Error,
}

impl ResponseKind {
    /// Wire value of the `type` field
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Handshake => "handshake",
            ResponseKind::Pong => "pong",
            ResponseKind::CrSnapshot => "cr_snapshot",
            ResponseKind::CrSnapshots => "cr_snapshots",
            ResponseKind::CrDeleted => "cr_deleted",
            ResponseKind::Error => "error",
        }
    }
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DaemonRequest {
    /// Wire value of the `type` field
    pub fn type_name(&self) -> &'static str {
        match self {
            DaemonRequest::Handshake { .. } => "handshake",
            DaemonRequest::Ping => "ping",
            DaemonRequest::CrLatest { .. } => "cr_latest",
            DaemonRequest::CrList { .. } => "cr_list",
            DaemonRequest::CrGet { .. } => "cr_get",
            DaemonRequest::CrCaptureNow { .. } => "cr_capture_now",
            DaemonRequest::CrDeleteTask { .. } => "cr_delete_task",
            DaemonRequest::CrDeleteProject { .. } => "cr_delete_project",
        }
    }

    /// The only success response this request may receive (besides `error`)
    pub fn expected_response(&self) -> ResponseKind {
        match self {
            DaemonRequest::Handshake { .. } => ResponseKind::Handshake,
            DaemonRequest::Ping => ResponseKind::Pong,
            DaemonRequest::CrLatest { .. }
            | DaemonRequest::CrGet { .. }
            | DaemonRequest::CrCaptureNow { .. } => ResponseKind::CrSnapshot,
            DaemonRequest::CrList { .. } => ResponseKind::CrSnapshots,
            DaemonRequest::CrDeleteTask { .. } | DaemonRequest::CrDeleteProject { .. } => {
                ResponseKind::CrDeleted
            }
        }
    }

    /// Whether sending this request twice has the same effect as sending it once.
    ///
    /// `cr_capture_now` may produce a duplicate manual snapshot when repeated.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, DaemonRequest::CrCaptureNow { .. })
    }
}

// ============================================================================
// Daemon -> Client responses
// ============================================================================

/// Error codes carried by `error` responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonErrorCode {
    /// Requested snapshot/task has no matching record
    NotFound,
    /// Daemon declined to act (dedup, rate limit, policy)
    Skipped,
    /// Malformed request (client bug)
    InvalidRequest,
    /// Daemon persistence layer is down
    StoreUnavailable,
    /// Unexpected daemon fault
    Internal,
    /// Daemon process/socket not reachable (no response was produced)
    DaemonUnavailable,
    /// No response within the bounded wait
    Timeout,
    /// Client and daemon speak different protocol versions
    VersionMismatch,
    /// A code this client does not know yet
    #[serde(other)]
    Unknown,
}

/// How a failed operation should surface to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// No card, no toast
    Silent,
    /// Log it, keep the rest of the UI working
    Logged,
    /// Programming defect; fail loudly in development
    Loud,
    /// Show the dedicated "please update" affordance
    UpdatePrompt,
}

impl DaemonErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DaemonErrorCode::NotFound => "not_found",
            DaemonErrorCode::Skipped => "skipped",
            DaemonErrorCode::InvalidRequest => "invalid_request",
            DaemonErrorCode::StoreUnavailable => "store_unavailable",
            DaemonErrorCode::Internal => "internal",
            DaemonErrorCode::DaemonUnavailable => "daemon_unavailable",
            DaemonErrorCode::Timeout => "timeout",
            DaemonErrorCode::VersionMismatch => "version_mismatch",
            DaemonErrorCode::Unknown => "unknown",
        }
    }

    pub fn disposition(self) -> ErrorDisposition {
        match self {
            DaemonErrorCode::NotFound | DaemonErrorCode::Skipped => ErrorDisposition::Silent,
            DaemonErrorCode::InvalidRequest => ErrorDisposition::Loud,
            DaemonErrorCode::VersionMismatch => ErrorDisposition::UpdatePrompt,
            DaemonErrorCode::StoreUnavailable
            | DaemonErrorCode::Internal
            | DaemonErrorCode::DaemonUnavailable
            | DaemonErrorCode::Timeout
            | DaemonErrorCode::Unknown => ErrorDisposition::Logged,
        }
    }

    /// Whether retrying later (after a delay) can succeed.
    ///
    /// A timed-out request may already have taken effect; only retry it when
    /// the request is idempotent.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            DaemonErrorCode::StoreUnavailable
                | DaemonErrorCode::Internal
                | DaemonErrorCode::DaemonUnavailable
                | DaemonErrorCode::Timeout
        )
    }
}

impl std::fmt::Display for DaemonErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response message from daemon to CLI/UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonResponse {
    /// Handshake accepted
    Handshake { protocol_version: u32 },
    /// Pong response
    Pong,
    /// Single snapshot; `null` means none was found
    CrSnapshot {
        snapshot: Option<ContextSnapshotV1>,
    },
    /// Snapshots ordered by captured_at, newest first
    CrSnapshots { snapshots: Vec<ContextSnapshotV1> },
    /// Number of snapshots removed (0 is valid)
    CrDeleted { deleted_count: u64 },
    /// Error response
    Error {
        code: DaemonErrorCode,
        message: String,
    },
}

impl DaemonResponse {
    pub fn kind(&self) -> ResponseKind {
        match self {
            DaemonResponse::Handshake { .. } => ResponseKind::Handshake,
            DaemonResponse::Pong => ResponseKind::Pong,
            DaemonResponse::CrSnapshot { .. } => ResponseKind::CrSnapshot,
            DaemonResponse::CrSnapshots { .. } => ResponseKind::CrSnapshots,
            DaemonResponse::CrDeleted { .. } => ResponseKind::CrDeleted,
            DaemonResponse::Error { .. } => ResponseKind::Error,
        }
    }
}

// ============================================================================
// Helpers for message framing
// ============================================================================

/// Serialize a message to JSON bytes with newline delimiter
pub fn serialize_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(msg)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Deserialize a message from JSON bytes (strips trailing newline)
pub fn deserialize_message<T: for<'de> Deserialize<'de>>(
    bytes: &[u8],
) -> Result<T, serde_json::Error> {
    let trimmed = if bytes.last() == Some(&b'\n') {
        &bytes[..bytes.len() - 1]
    } else {
        bytes
    };
    serde_json::from_slice(trimmed)
}
