#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;

pub const REMOTE_CONNECT_TIMEOUT_MS_DEFAULT: u64 = 2_000;
pub const REMOTE_REQUEST_TIMEOUT_MS_DEFAULT: u64 = 10_000;
pub const DB_PATH_DEFAULT: &str = "global_state.redb";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOwnerConfig {
    /// Scheme, host and port of the owning instance, e.g. `http://10.0.0.5:17001`.
    pub base_url: String,
    pub shared_secret: String,
    pub connect_timeout_ms: u64,
    /// Applies to both writing the request and reading the response.
    pub request_timeout_ms: u64,
}

impl RemoteOwnerConfig {
    pub fn new(base_url: impl Into<String>, shared_secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            shared_secret: shared_secret.into(),
            connect_timeout_ms: REMOTE_CONNECT_TIMEOUT_MS_DEFAULT,
            request_timeout_ms: REMOTE_REQUEST_TIMEOUT_MS_DEFAULT,
        }
    }
}

/// Fixed at startup. `remote` decides, for the life of the process, whether this instance
/// owns global state or forwards every call to the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalStateConfig {
    pub remote: Option<RemoteOwnerConfig>,
    /// Only opened when `remote` is `None`.
    pub db_path: PathBuf,
}

impl GlobalStateConfig {
    pub fn local(db_path: impl Into<PathBuf>) -> Self {
        Self {
            remote: None,
            db_path: db_path.into(),
        }
    }

    pub fn from_env() -> Self {
        let remote = remote_node_from_env().map(|base_url| RemoteOwnerConfig {
            base_url,
            shared_secret: env::var("GSTATE_REMOTE_SHARED_SECRET").unwrap_or_default(),
            connect_timeout_ms: parse_ms_from_env(
                "GSTATE_REMOTE_CONNECT_TIMEOUT_MS",
                100..=60_000,
                REMOTE_CONNECT_TIMEOUT_MS_DEFAULT,
            ),
            request_timeout_ms: parse_ms_from_env(
                "GSTATE_REMOTE_REQUEST_TIMEOUT_MS",
                100..=300_000,
                REMOTE_REQUEST_TIMEOUT_MS_DEFAULT,
            ),
        });
        let db_path = env::var("GSTATE_DB_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DB_PATH_DEFAULT.to_string());
        Self {
            remote,
            db_path: PathBuf::from(db_path),
        }
    }
}

fn remote_node_from_env() -> Option<String> {
    env::var("GSTATE_REMOTE_NODE")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_ms_from_env(name: &str, range: std::ops::RangeInclusive<u64>, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| range.contains(v))
        .unwrap_or(default)
}
