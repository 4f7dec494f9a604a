//! Multiplayer session state and persistence.
//!
//! A [`MultiplayerSession`] lives for one connection attempt: its role, slot,
//! start type, connection state and rematch flags. The small
//! [`SessionRecord`] is written to a [`SessionStore`] so a dropped client
//! can take the same seat again within [`SESSION_TTL`].

use crate::config::SESSION_TTL;
use crate::error::NetError;
use crate::lobby::{lobby_id, Role, SlotAssignment};
use dotmination_core::{Player, StartType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Transport state as seen by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// One side of a networked match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplayerSession {
    pub role: Role,
    pub connection_state: ConnectionState,
    pub slot: u8,
    pub start_type: StartType,
    pub match_starter: Player,
    pub rematch_ready_local: bool,
    pub rematch_ready_remote: bool,
    /// When the seat was first claimed, milliseconds since the Unix epoch
    pub created_at: u64,
}

impl MultiplayerSession {
    pub fn new(role: Role, slot: u8, start_type: StartType) -> Self {
        Self {
            role,
            connection_state: ConnectionState::Disconnected,
            slot,
            start_type,
            match_starter: Player::P1,
            rematch_ready_local: false,
            rematch_ready_remote: false,
            created_at: 0,
        }
    }

    /// A freshly found seat, claimed at `now_ms`
    pub fn from_assignment(assignment: SlotAssignment, start_type: StartType, now_ms: u64) -> Self {
        Self {
            created_at: now_ms,
            ..Self::new(assignment.role, assignment.slot, start_type)
        }
    }

    /// A resumed seat keeps the original claim time
    pub fn from_record(record: &SessionRecord) -> Self {
        Self {
            created_at: record.timestamp,
            ..Self::new(record.role, record.slot, record.start_type)
        }
    }

    /// The player this side controls
    pub fn local_player(&self) -> Player {
        match self.role {
            Role::Host => Player::P1,
            Role::Peer => Player::P2,
        }
    }

    /// Identifier this side registers with the broker
    pub fn local_id(&self) -> String {
        lobby_id(self.start_type, self.role, self.slot)
    }

    /// Identifier of the other side
    pub fn remote_id(&self) -> String {
        lobby_id(self.start_type, self.role.other(), self.slot)
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    /// Both sides asked for a rematch
    pub fn rematch_agreed(&self) -> bool {
        self.rematch_ready_local && self.rematch_ready_remote
    }

    pub fn reset_rematch(&mut self) {
        self.rematch_ready_local = false;
        self.rematch_ready_remote = false;
    }

    /// Persistable form. Saving it again never extends the TTL.
    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            slot: self.slot,
            role: self.role,
            start_type: self.start_type,
            timestamp: self.created_at,
        }
    }
}

/// What survives a dropped connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub slot: u8,
    pub role: Role,
    pub start_type: StartType,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl SessionRecord {
    /// Whether the record can still be resumed at `now_ms`
    pub fn is_valid(&self, now_ms: u64) -> bool {
        now_ms >= self.timestamp && now_ms - self.timestamp < SESSION_TTL.as_millis() as u64
    }
}

/// Storage for the single resumable session record
pub trait SessionStore {
    fn load(&self) -> Result<Option<SessionRecord>, NetError>;
    fn save(&self, record: &SessionRecord) -> Result<(), NetError>;
    fn clear(&self) -> Result<(), NetError>;

    /// The stored record if it is still within its TTL. Stale records are removed.
    fn load_valid(&self, now_ms: u64) -> Result<Option<SessionRecord>, NetError> {
        match self.load()? {
            Some(record) if record.is_valid(now_ms) => Ok(Some(record)),
            Some(_) => {
                self.clear()?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// Session store kept in memory, for tests and for clients without disk
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<SessionRecord>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionRecord>, NetError> {
        Ok(self.record.lock().map_err(|_| poisoned())?.clone())
    }

    fn save(&self, record: &SessionRecord) -> Result<(), NetError> {
        *self.record.lock().map_err(|_| poisoned())? = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), NetError> {
        *self.record.lock().map_err(|_| poisoned())? = None;
        Ok(())
    }
}

fn poisoned() -> NetError {
    NetError::Storage(std::io::Error::new(ErrorKind::Other, "session store lock poisoned"))
}

/// Session store backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionRecord>, NetError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Discarding unreadable session file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<(), NetError> {
        fs::write(&self.path, serde_json::to_string(record)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), NetError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
