//! In-process stand-in for right-now-daemon's Context Resurrection surface.
//!
//! Listens on a Unix socket inside a temp dir and keeps snapshots in memory.
//! Speaks the same framing as the real daemon: handshake first, then one
//! newline-terminated JSON response per request.

use chrono::{SecondsFormat, Utc};
use rn_cr_lib::context_resurrection::models::{snapshot_id, CaptureReason, ContextSnapshotV1};
use rn_cr_lib::daemon::protocol::{
    deserialize_message, serialize_message, DaemonErrorCode, DaemonRequest, DaemonResponse,
    DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT, MAX_REQUEST_FRAME_SIZE, PROTOCOL_VERSION,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

/// How the fake daemon misbehaves, if at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Normal,
    /// Reject every handshake as if the daemon were newer than the client
    NewerDaemon,
    /// Accept the handshake, then never answer the request
    Unresponsive,
    /// Answer every request with a response type this client does not know
    UnknownResponseType,
    /// Answer every request with a frame larger than the client accepts
    OversizedResponse,
    /// Close the connection right after the handshake
    HangUp,
}

pub struct FakeDaemon {
    socket_path: PathBuf,
    snapshots: Arc<Mutex<Vec<ContextSnapshotV1>>>,
    requests: Arc<Mutex<Vec<DaemonRequest>>>,
    accept_loop: JoinHandle<()>,
    _dir: TempDir,
}

impl FakeDaemon {
    pub async fn start() -> Self {
        Self::with_behavior(Behavior::Normal).await
    }

    pub async fn with_behavior(behavior: Behavior) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let socket_path = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&socket_path).expect("bind fake daemon socket");

        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = State {
            behavior,
            snapshots: snapshots.clone(),
            requests: requests.clone(),
        };

        let accept_loop = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = state.clone();
                tokio::spawn(async move {
                    let _ = serve(state, stream).await;
                });
            }
        });

        Self {
            socket_path,
            snapshots,
            requests,
            accept_loop,
            _dir: dir,
        }
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Store a snapshot as if the daemon had captured it
    pub fn seed(&self, snapshot: ContextSnapshotV1) {
        self.snapshots.lock().unwrap().push(snapshot);
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    /// Every non-handshake request received so far, in arrival order
    pub fn requests(&self) -> Vec<DaemonRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

#[derive(Clone)]
struct State {
    behavior: Behavior,
    snapshots: Arc<Mutex<Vec<ContextSnapshotV1>>>,
    requests: Arc<Mutex<Vec<DaemonRequest>>>,
}

async fn serve(state: State, stream: UnixStream) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }

        let request = if line.len() > MAX_REQUEST_FRAME_SIZE {
            Err(DaemonResponse::Error {
                code: DaemonErrorCode::InvalidRequest,
                message: format!(
                    "Request frame too large: {} bytes (max {})",
                    line.len(),
                    MAX_REQUEST_FRAME_SIZE
                ),
            })
        } else {
            deserialize_message::<DaemonRequest>(line.as_bytes()).map_err(|e| {
                DaemonResponse::Error {
                    code: DaemonErrorCode::InvalidRequest,
                    message: format!("Failed to parse request: {}", e),
                }
            })
        };

        let bytes = match request {
            Ok(DaemonRequest::Handshake { client_version }) => {
                let response = handshake(state.behavior, client_version);
                let bytes = serialize_message(&response).expect("encode handshake");
                writer.write_all(&bytes).await?;
                writer.flush().await?;
                if state.behavior == Behavior::HangUp {
                    return Ok(());
                }
                continue;
            }
            Ok(request) => {
                state.requests.lock().unwrap().push(request.clone());
                match state.behavior {
                    // Hold the connection open without answering
                    Behavior::Unresponsive => std::future::pending::<Vec<u8>>().await,
                    Behavior::UnknownResponseType => {
                        b"{\"type\":\"cr_teleported\",\"count\":1}\n".to_vec()
                    }
                    Behavior::OversizedResponse => oversized_frame(),
                    _ => {
                        let response = handle(&state, request);
                        serialize_message(&response).expect("encode response")
                    }
                }
            }
            Err(error) => serialize_message(&error).expect("encode error"),
        };

        writer.write_all(&bytes).await?;
        writer.flush().await?;
    }
}

fn handshake(behavior: Behavior, client_version: u32) -> DaemonResponse {
    if behavior == Behavior::NewerDaemon || client_version < PROTOCOL_VERSION {
        return DaemonResponse::Error {
            code: DaemonErrorCode::VersionMismatch,
            message: "Daemon is newer than app—please update the app.".to_string(),
        };
    }
    if client_version > PROTOCOL_VERSION {
        return DaemonResponse::Error {
            code: DaemonErrorCode::VersionMismatch,
            message: "Daemon is outdated—please restart daemon.".to_string(),
        };
    }
    DaemonResponse::Handshake {
        protocol_version: PROTOCOL_VERSION,
    }
}

fn oversized_frame() -> Vec<u8> {
    let filler = "x".repeat(rn_cr_lib::daemon::protocol::MAX_RESPONSE_FRAME_SIZE + 1000);
    format!(
        "{{\"type\":\"error\",\"code\":\"internal\",\"message\":\"{}\"}}\n",
        filler
    )
    .into_bytes()
}

/// Newest first, by capture time then id
fn newest_first(mut snapshots: Vec<ContextSnapshotV1>) -> Vec<ContextSnapshotV1> {
    snapshots.sort_by(|a, b| {
        b.captured_at
            .cmp(&a.captured_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    snapshots
}

fn handle(state: &State, request: DaemonRequest) -> DaemonResponse {
    let mut snapshots = state.snapshots.lock().unwrap();

    match request {
        DaemonRequest::Handshake { .. } => unreachable!("handled by serve"),

        DaemonRequest::Ping => DaemonResponse::Pong,

        DaemonRequest::CrLatest {
            project_path,
            task_id,
        } => {
            let matching: Vec<_> = snapshots
                .iter()
                .filter(|s| s.project_path == project_path)
                .filter(|s| task_id.as_deref().map_or(true, |t| s.task_id == t))
                .cloned()
                .collect();
            DaemonResponse::CrSnapshot {
                snapshot: newest_first(matching).into_iter().next(),
            }
        }

        DaemonRequest::CrList {
            project_path,
            task_id,
            limit,
        } => {
            let limit = match limit {
                None => DEFAULT_LIST_LIMIT,
                Some(0) => {
                    return DaemonResponse::Error {
                        code: DaemonErrorCode::InvalidRequest,
                        message: "limit must be greater than 0".to_string(),
                    };
                }
                Some(n) => n.min(MAX_LIST_LIMIT),
            };
            let matching: Vec<_> = snapshots
                .iter()
                .filter(|s| s.project_path == project_path && s.task_id == task_id)
                .cloned()
                .collect();
            DaemonResponse::CrSnapshots {
                snapshots: newest_first(matching)
                    .into_iter()
                    .take(limit as usize)
                    .collect(),
            }
        }

        DaemonRequest::CrGet {
            project_path,
            task_id,
            snapshot_id,
        } => match snapshots.iter().find(|s| {
            s.project_path == project_path && s.task_id == task_id && s.id == snapshot_id
        }) {
            Some(snapshot) => DaemonResponse::CrSnapshot {
                snapshot: Some(snapshot.clone()),
            },
            None => DaemonResponse::Error {
                code: DaemonErrorCode::NotFound,
                message: "Snapshot not found".to_string(),
            },
        },

        DaemonRequest::CrCaptureNow {
            project_path,
            task_id,
            user_note,
        } => {
            let captured_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            let mut snapshot = ContextSnapshotV1::new(
                snapshot_id(&captured_at, &task_id),
                project_path,
                task_id.clone(),
                task_id,
                captured_at,
                CaptureReason::Manual,
            );
            snapshot.user_note = user_note;
            snapshots.push(snapshot.clone());
            DaemonResponse::CrSnapshot {
                snapshot: Some(snapshot),
            }
        }

        DaemonRequest::CrDeleteTask {
            project_path,
            task_id,
        } => {
            let before = snapshots.len();
            snapshots.retain(|s| !(s.project_path == project_path && s.task_id == task_id));
            DaemonResponse::CrDeleted {
                deleted_count: (before - snapshots.len()) as u64,
            }
        }

        DaemonRequest::CrDeleteProject { project_path } => {
            let before = snapshots.len();
            snapshots.retain(|s| s.project_path != project_path);
            DaemonResponse::CrDeleted {
                deleted_count: (before - snapshots.len()) as u64,
            }
        }
    }
}
