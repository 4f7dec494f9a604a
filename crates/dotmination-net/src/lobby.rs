//! Lobby slots and role negotiation.
//!
//! Every (start type, slot) pair has one fixed host identifier and one fixed
//! peer identifier. A client checks the slots in order and takes the first
//! free seat, so two clients that pick the same start type find each other
//! without a matchmaking service.

use crate::config::MAX_LOBBIES;
use crate::error::NetError;
use dotmination_core::StartType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::debug;

/// Side of a networked match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Holds the authoritative game state, plays P1
    Host,
    /// Follows the host's snapshots, plays P2
    Peer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Peer => "peer",
        }
    }

    pub fn other(self) -> Role {
        match self {
            Role::Host => Role::Peer,
            Role::Peer => Role::Host,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic identifier for one seat of one lobby slot
pub fn lobby_id(start_type: StartType, role: Role, slot: u8) -> String {
    format!("dotmination-{}-{}-{}", start_type, role, slot)
}

/// A free seat found by probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub slot: u8,
    pub role: Role,
}

/// Presence lookups against the connection broker
pub trait Signaling {
    /// Whether some client currently holds `id`
    fn is_reachable(&mut self, id: &str) -> impl Future<Output = Result<bool, NetError>> + Send;
}

/// Check slots 1 through `MAX_LOBBIES` for the first free seat.
///
/// A slot without a host makes the caller its host; a slot with a host but
/// no peer makes the caller its peer; a full slot is skipped.
pub async fn find_available_slot<S>(signaling: &mut S, start_type: StartType) -> Result<SlotAssignment, NetError>
where
    S: Signaling + Send,
{
    for slot in 1..=MAX_LOBBIES {
        let host = lobby_id(start_type, Role::Host, slot);
        if !signaling.is_reachable(&host).await? {
            debug!("Slot {} has no host", slot);
            return Ok(SlotAssignment { slot, role: Role::Host });
        }

        let peer = lobby_id(start_type, Role::Peer, slot);
        if !signaling.is_reachable(&peer).await? {
            debug!("Slot {} has a host waiting", slot);
            return Ok(SlotAssignment { slot, role: Role::Peer });
        }
    }
    Err(NetError::SlotExhausted)
}
