//! Display-ready projection of a snapshot for the resurrection card.
//!
//! The projection never fails: a malformed `captured_at` only clears
//! `captured_at_ms`.

use serde::Serialize;

use super::models::{AttentionSummary, CaptureReason, ContextSnapshotV1, SessionStatus};

/// Most lines of terminal output kept in a card excerpt
pub const TAIL_EXCERPT_MAX_LINES: usize = 20;

/// Terminal portion of a card; absent when no terminal was attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardTerminal {
    pub session_id: u64,
    pub status: SessionStatus,
    pub exit_code: Option<i32>,
    pub last_attention: Option<AttentionSummary>,
    pub tail_excerpt: Option<String>,
    pub tail_path: Option<String>,
}

/// Presentation-ready data for one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardDisplayData {
    pub snapshot_id: String,
    pub project_path: String,
    pub task_id: String,
    pub task_title: String,
    pub captured_at: String,
    /// Epoch milliseconds, `null` when `captured_at` does not parse
    pub captured_at_ms: Option<i64>,
    pub capture_reason: CaptureReason,
    pub user_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<CardTerminal>,
}

impl CardDisplayData {
    pub fn from_snapshot(snapshot: &ContextSnapshotV1) -> Self {
        let terminal = snapshot.terminal.as_ref().map(|t| CardTerminal {
            session_id: t.session_id,
            status: t.status,
            exit_code: t.exit_code,
            last_attention: t.last_attention.clone(),
            tail_excerpt: t.tail_inline.as_deref().map(tail_to_excerpt),
            tail_path: t.tail_path.clone(),
        });

        Self {
            snapshot_id: snapshot.id.clone(),
            project_path: snapshot.project_path.clone(),
            task_id: snapshot.task_id.clone(),
            task_title: snapshot.task_title_at_capture.clone(),
            captured_at: snapshot.captured_at.clone(),
            captured_at_ms: snapshot.captured_at_utc().map(|t| t.timestamp_millis()),
            capture_reason: snapshot.capture_reason,
            user_note: snapshot.user_note.clone(),
            terminal,
        }
    }

    /// Deep link that opens the captured session (`todos://session/<id>`)
    pub fn deep_link(&self) -> Option<String> {
        self.terminal
            .as_ref()
            .map(|t| format!("todos://session/{}", t.session_id))
    }
}

impl From<&ContextSnapshotV1> for CardDisplayData {
    fn from(snapshot: &ContextSnapshotV1) -> Self {
        Self::from_snapshot(snapshot)
    }
}

/// Last `TAIL_EXCERPT_MAX_LINES` lines of `text`, trimmed
pub fn tail_to_excerpt(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(TAIL_EXCERPT_MAX_LINES);
    lines[start..].join("\n").trim().to_string()
}
