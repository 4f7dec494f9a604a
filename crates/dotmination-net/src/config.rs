use dotmination_core::board::{DEFAULT_COLS, DEFAULT_ROWS};
use std::{env, path::PathBuf, time::Duration};

// Runtime/network constants (not gameplay tuning).

pub fn server_addr() -> String {
    env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

pub fn relay_url() -> String {
    env::var("DOTMINATION_RELAY_URL").unwrap_or_else(|_| "ws://127.0.0.1:8080".to_string())
}

pub fn session_file() -> PathBuf {
    env::var("DOTMINATION_SESSION_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("dotmination-session.json"))
}

/// Lobby slots searched per start type
pub const MAX_LOBBIES: u8 = 10;

/// How long a persisted session may be resumed
pub const SESSION_TTL: Duration = Duration::from_secs(5 * 60);

/// Peer redial attempts after an unexpected drop
pub const RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Everything a client needs to join a networked match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub relay_url: String,
    pub session_file: PathBuf,
    pub rows: usize,
    pub cols: usize,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            relay_url: relay_url(),
            session_file: session_file(),
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
        }
    }
}
