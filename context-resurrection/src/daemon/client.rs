// Daemon client for Context Resurrection requests
// One request per connection: handshake, request frame, exactly one response frame

use super::error::CrError;
use super::protocol::{
    DaemonErrorCode, DaemonRequest, DaemonResponse, ResponseKind, PROTOCOL_VERSION,
};
use crate::context_resurrection::models::ContextSnapshotV1;
use async_trait::async_trait;

/// Carries one request to the daemon and returns its single response.
///
/// Implementations return `Err` only for transport-level failures
/// (`DaemonUnavailable`, `Timeout`, `Protocol`); a daemon `error` response is
/// returned as `Ok(DaemonResponse::Error { .. })`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, request: &DaemonRequest) -> Result<DaemonResponse, CrError>;
}

/// Check a response against the request that produced it.
///
/// `error` responses become `CrError::Daemon` with the code passed through
/// unchanged; any other mismatch is a protocol violation.
pub fn expect_response(
    request: &DaemonRequest,
    response: DaemonResponse,
) -> Result<DaemonResponse, CrError> {
    if let DaemonResponse::Error { code, message } = response {
        return Err(CrError::Daemon { code, message });
    }

    let expected = request.expected_response();
    if response.kind() != expected {
        return Err(CrError::Protocol(format!(
            "expected {} in reply to {}, got {}",
            expected,
            request.type_name(),
            response.kind()
        )));
    }

    Ok(response)
}

/// Typed Context Resurrection operations over any transport
#[derive(Debug, Clone)]
pub struct CrClient<T> {
    transport: T,
}

impl<T: Transport> CrClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a request and validate the response discriminant
    pub async fn request(&self, request: DaemonRequest) -> Result<DaemonResponse, CrError> {
        tracing::debug!(request = request.type_name(), "sending daemon request");
        let response = self.transport.round_trip(&request).await?;
        expect_response(&request, response)
    }

    /// Latest snapshot for a task; `Ok(None)` means nothing to resume
    pub async fn latest(
        &self,
        project_path: &str,
        task_id: Option<&str>,
    ) -> Result<Option<ContextSnapshotV1>, CrError> {
        let request = DaemonRequest::CrLatest {
            project_path: project_path.to_string(),
            task_id: task_id.map(str::to_string),
        };
        match self.request(request).await? {
            DaemonResponse::CrSnapshot { snapshot } => Ok(snapshot),
            other => Err(unexpected(other)),
        }
    }

    /// Snapshots for a task, newest first. `limit` is passed to the daemon as-is.
    pub async fn list(
        &self,
        project_path: &str,
        task_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<ContextSnapshotV1>, CrError> {
        let request = DaemonRequest::CrList {
            project_path: project_path.to_string(),
            task_id: task_id.to_string(),
            limit,
        };
        match self.request(request).await? {
            DaemonResponse::CrSnapshots { snapshots } => Ok(snapshots),
            other => Err(unexpected(other)),
        }
    }

    /// One snapshot by id
    pub async fn get(
        &self,
        project_path: &str,
        task_id: &str,
        snapshot_id: &str,
    ) -> Result<Option<ContextSnapshotV1>, CrError> {
        let request = DaemonRequest::CrGet {
            project_path: project_path.to_string(),
            task_id: task_id.to_string(),
            snapshot_id: snapshot_id.to_string(),
        };
        match self.request(request).await? {
            DaemonResponse::CrSnapshot { snapshot } => Ok(snapshot),
            other => Err(unexpected(other)),
        }
    }

    /// Ask the daemon for an immediate `manual` capture.
    ///
    /// Not idempotent: a retry after a timeout may create a second snapshot.
    pub async fn capture_now(
        &self,
        project_path: &str,
        task_id: &str,
        user_note: Option<&str>,
    ) -> Result<Option<ContextSnapshotV1>, CrError> {
        let request = DaemonRequest::CrCaptureNow {
            project_path: project_path.to_string(),
            task_id: task_id.to_string(),
            user_note: user_note.map(str::to_string),
        };
        match self.request(request).await? {
            DaemonResponse::CrSnapshot { snapshot } => Ok(snapshot),
            other => Err(unexpected(other)),
        }
    }

    /// Delete every snapshot of one task; returns how many were removed
    pub async fn delete_task(&self, project_path: &str, task_id: &str) -> Result<u64, CrError> {
        let request = DaemonRequest::CrDeleteTask {
            project_path: project_path.to_string(),
            task_id: task_id.to_string(),
        };
        match self.request(request).await? {
            DaemonResponse::CrDeleted { deleted_count } => Ok(deleted_count),
            other => Err(unexpected(other)),
        }
    }

    /// Delete every snapshot under a project; returns how many were removed
    pub async fn delete_project(&self, project_path: &str) -> Result<u64, CrError> {
        let request = DaemonRequest::CrDeleteProject {
            project_path: project_path.to_string(),
        };
        match self.request(request).await? {
            DaemonResponse::CrDeleted { deleted_count } => Ok(deleted_count),
            other => Err(unexpected(other)),
        }
    }

    /// Liveness probe
    pub async fn ping(&self) -> Result<(), CrError> {
        self.request(DaemonRequest::Ping).await.map(|_| ())
    }
}

fn unexpected(response: DaemonResponse) -> CrError {
    CrError::Protocol(format!("unexpected response {}", response.kind()))
}

/// Interpret the daemon's answer to our handshake
fn check_handshake(response: DaemonResponse) -> Result<(), CrError> {
    match response {
        DaemonResponse::Handshake { protocol_version } if protocol_version == PROTOCOL_VERSION => {
            Ok(())
        }
        DaemonResponse::Handshake { protocol_version } => Err(CrError::Daemon {
            code: DaemonErrorCode::VersionMismatch,
            message: format!(
                "Daemon speaks protocol {} but this client speaks {}",
                protocol_version, PROTOCOL_VERSION
            ),
        }),
        DaemonResponse::Error { code, message } => Err(CrError::Daemon { code, message }),
        other => Err(CrError::Protocol(format!(
            "expected {} in reply to handshake, got {}",
            ResponseKind::Handshake,
            other.kind()
        ))),
    }
}

#[cfg(unix)]
pub use unix::UnixSocketTransport;

#[cfg(unix)]
mod unix {
    use super::*;
    use crate::daemon::config::Config;
    use crate::daemon::protocol::{deserialize_message, serialize_message, MAX_RESPONSE_FRAME_SIZE};
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixStream;

    /// Unix socket transport: a fresh connection per request, bounded by a timeout
    #[derive(Debug, Clone)]
    pub struct UnixSocketTransport {
        socket_path: PathBuf,
        timeout: Duration,
    }

    impl UnixSocketTransport {
        pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
            Self {
                socket_path: socket_path.into(),
                timeout,
            }
        }

        pub fn from_config(config: &Config) -> Self {
            Self::new(config.socket_path.clone(), config.request_timeout)
        }

        pub fn socket_path(&self) -> &PathBuf {
            &self.socket_path
        }

        async fn exchange(&self, request: &DaemonRequest) -> Result<DaemonResponse, CrError> {
            let request_bytes = serialize_message(request)?;

            let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
                CrError::DaemonUnavailable(format!(
                    "Failed to connect to daemon at {}: {}",
                    self.socket_path.display(),
                    e
                ))
            })?;
            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);

            // Perform protocol handshake first
            let handshake = serialize_message(&DaemonRequest::Handshake {
                client_version: PROTOCOL_VERSION,
            })?;
            write_frame(&mut writer, &handshake).await?;
            check_handshake(read_response(&mut reader).await?)?;

            write_frame(&mut writer, &request_bytes).await?;
            read_response(&mut reader).await
        }
    }

    #[async_trait]
    impl Transport for UnixSocketTransport {
        async fn round_trip(&self, request: &DaemonRequest) -> Result<DaemonResponse, CrError> {
            match tokio::time::timeout(self.timeout, self.exchange(request)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        request = request.type_name(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "daemon request timed out"
                    );
                    Err(CrError::Timeout(self.timeout))
                }
            }
        }
    }

    async fn write_frame(
        writer: &mut tokio::net::unix::OwnedWriteHalf,
        bytes: &[u8],
    ) -> Result<(), CrError> {
        writer
            .write_all(bytes)
            .await
            .map_err(|e| CrError::DaemonUnavailable(format!("Failed to send request: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| CrError::DaemonUnavailable(format!("Failed to flush stream: {}", e)))
    }

    /// Read one response frame, enforcing the response frame size limit
    async fn read_response(
        reader: &mut BufReader<tokio::net::unix::OwnedReadHalf>,
    ) -> Result<DaemonResponse, CrError> {
        let mut line = Vec::new();
        // One byte past the limit is enough to detect an oversized frame
        let mut limited = reader.take(MAX_RESPONSE_FRAME_SIZE as u64 + 1);

        let read = limited.read_until(b'\n', &mut line).await.map_err(|e| {
            CrError::DaemonUnavailable(format!("Failed to read response from daemon: {}", e))
        })?;

        if read == 0 {
            return Err(CrError::DaemonUnavailable(
                "Daemon closed connection unexpectedly".to_string(),
            ));
        }
        if line.len() > MAX_RESPONSE_FRAME_SIZE {
            return Err(CrError::Protocol(format!(
                "Response frame too large: more than {} bytes",
                MAX_RESPONSE_FRAME_SIZE
            )));
        }
        if line.last() != Some(&b'\n') {
            return Err(CrError::DaemonUnavailable(
                "Daemon closed connection mid-frame".to_string(),
            ));
        }

        deserialize_message::<DaemonResponse>(&line)
            .map_err(|e| CrError::Protocol(format!("Failed to parse daemon response: {}", e)))
    }
}
