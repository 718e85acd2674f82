// Environment configuration helpers for the daemon client
// Resolves the daemon socket path and the client-side CR tunables

use std::path::PathBuf;
use std::time::Duration;

/// Default bound on a single request/response exchange
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default absence after which the resurrection card is offered
pub const DEFAULT_CARD_THRESHOLD: Duration = Duration::from_secs(60 * 60);

/// Configuration for daemon paths and client settings
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for runtime files (socket, PID)
    pub runtime_dir: PathBuf,
    /// Path to the Unix socket (mac/Linux)
    pub socket_path: PathBuf,
    /// Bound on one request/response exchange
    pub request_timeout: Duration,
    /// How long the user must have been away before the card is shown
    pub card_threshold: Duration,
}

impl Config {
    /// Create configuration using default paths
    pub fn default_paths() -> Self {
        Self::with_runtime_dir(Self::default_runtime_dir())
    }

    /// Configuration rooted at an explicit runtime directory
    pub fn with_runtime_dir(runtime_dir: PathBuf) -> Self {
        Self {
            socket_path: runtime_dir.join("daemon.sock"),
            runtime_dir,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            card_threshold: DEFAULT_CARD_THRESHOLD,
        }
    }

    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        // RIGHT_NOW_DAEMON_DIR overrides the runtime dir (same as the daemon)
        let mut config = match std::env::var("RIGHT_NOW_DAEMON_DIR") {
            Ok(override_dir) => Self::with_runtime_dir(PathBuf::from(override_dir)),
            Err(_) => Self::default_paths(),
        };

        if let Some(ms) = read_env_u64("RIGHT_NOW_CR_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = read_env_minutes_as_secs("RIGHT_NOW_CR_THRESHOLD_MINS") {
            config.card_threshold = Duration::from_secs(secs);
        }

        config
    }

    /// Get the default runtime directory (socket + pid)
    fn default_runtime_dir() -> PathBuf {
        #[cfg(target_os = "linux")]
        {
            // Linux: prefer XDG_RUNTIME_DIR if set, else fall back to state_dir
            if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
                return PathBuf::from(runtime_dir).join("right-now");
            }
        }

        Self::default_state_dir()
    }

    /// Get the default state directory (~/.right-now, or /tmp/right-now if home unavailable)
    fn default_state_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".right-now"))
            .unwrap_or_else(|| PathBuf::from("/tmp/right-now"))
    }

    /// Check if the daemon socket exists (indicating daemon may be running)
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }
}

fn read_env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            tracing::warn!(variable = name, value = %raw, "ignoring invalid value, using default");
            None
        }
    }
}

/// Minutes from `name`, in seconds. Values too large to represent are invalid.
fn read_env_minutes_as_secs(name: &str) -> Option<u64> {
    let mins = read_env_u64(name)?;
    let secs = mins.checked_mul(60);
    if secs.is_none() {
        tracing::warn!(variable = name, value = mins, "value out of range, using default");
    }
    secs
}
