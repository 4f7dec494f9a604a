//! Dotmination networking - host/peer synchronization over a relay
//!
//! Two players find each other through deterministic lobby identifiers on a
//! small WebSocket relay, then play with one side (the host) holding the
//! authoritative game state.
//!
//! # Modules
//!
//! - [`lobby`]: Slot probing and role negotiation
//! - [`session`]: Session state and resumable records
//! - [`sync`]: Host and peer state machines
//! - [`transport`]: Channel and relay transports
//! - [`client`]: Async driver and reconnect handling
//! - [`server`]: The relay itself

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod lobby;
pub mod protocol;
pub mod server;
pub mod session;
pub mod sync;
pub mod transport;

pub use client::{negotiate, play_online, run_session, LocalCommand, SessionEnd, SessionUpdate};
pub use config::ClientConfig;
pub use error::NetError;
pub use lobby::{find_available_slot, lobby_id, Role, Signaling, SlotAssignment};
pub use protocol::{RelayEvent, RelayRequest, WireMessage};
pub use server::{run_server, ServerState};
pub use session::{FileSessionStore, MemorySessionStore, MultiplayerSession, SessionRecord, SessionStore};
pub use sync::{HostSync, PeerSync, SyncRole, SyncStatus};
pub use transport::{ChannelTransport, RelayConnection, RelayTransport, Transport};
