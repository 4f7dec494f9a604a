//! Relay server and connection handling.
//!
//! Clients register lobby identifiers, look up each other's identifiers,
//! open a link to a registered client and then exchange opaque `data`
//! payloads over it. The relay never reads the payloads.

use crate::endpoint::{Endpoint, LinkError};
use crate::protocol::{RelayEvent, RelayRequest};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// All open connections
    pub endpoints: DashMap<Uuid, Endpoint>,
    /// Registered identifier to connection
    pub ids: DashMap<String, Uuid>,
    /// Outgoing event queue per connection
    pub senders: DashMap<Uuid, mpsc::UnboundedSender<RelayEvent>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
            ids: DashMap::new(),
            senders: DashMap::new(),
        }
    }

    /// Track a new connection and its outgoing queue.
    pub fn open(&self, conn: Uuid, sender: mpsc::UnboundedSender<RelayEvent>) {
        self.endpoints.insert(conn, Endpoint::new(conn));
        self.senders.insert(conn, sender);
    }

    /// Send an event to a specific connection.
    pub fn send_to(&self, conn: Uuid, event: RelayEvent) {
        if let Some(sender) = self.senders.get(&conn) {
            let _ = sender.send(event);
        }
    }

    pub fn register(&self, conn: Uuid, id: String) -> Result<(), LinkError> {
        self.endpoints
            .get(&conn)
            .ok_or(LinkError::NotLinked)?
            .can_register(&id)?;

        match self.ids.entry(id.clone()) {
            Entry::Occupied(entry) if *entry.get() != conn => return Err(LinkError::IdTaken(id)),
            Entry::Occupied(_) => {}
            Entry::Vacant(entry) => {
                entry.insert(conn);
            }
        }
        if let Some(mut endpoint) = self.endpoints.get_mut(&conn) {
            endpoint.id = Some(id.clone());
        }
        info!("{} registered as {}", conn, id);
        self.send_to(conn, RelayEvent::Registered { id });
        Ok(())
    }

    pub fn lookup(&self, conn: Uuid, id: String) {
        let exists = self.ids.contains_key(&id);
        debug!("{} looked up {}: {}", conn, id, exists);
        self.send_to(conn, RelayEvent::LookupResult { id, exists });
    }

    /// Link `conn` to the connection registered as `target`.
    pub fn connect(&self, conn: Uuid, target: String) -> Result<(), LinkError> {
        let caller_id = self
            .endpoints
            .get(&conn)
            .and_then(|e| e.id.clone())
            .ok_or(LinkError::NotRegistered)?;
        let target_conn = self
            .ids
            .get(&target)
            .map(|entry| *entry.value())
            .ok_or_else(|| LinkError::UnknownTarget(target.clone()))?;
        if target_conn == conn {
            return Err(LinkError::SelfLink);
        }

        // Claim the target first; a second dialer sees it busy
        self.endpoints
            .get_mut(&target_conn)
            .ok_or_else(|| LinkError::UnknownTarget(target.clone()))?
            .link(conn)?;

        let linked = match self.endpoints.get_mut(&conn) {
            Some(mut caller) => caller.link(target_conn),
            None => Err(LinkError::NotRegistered),
        };
        if let Err(e) = linked {
            if let Some(mut endpoint) = self.endpoints.get_mut(&target_conn) {
                endpoint.unlink();
            }
            return Err(e);
        }

        info!("Linked {} to {}", caller_id, target);
        self.send_to(conn, RelayEvent::Connected { remote: target });
        self.send_to(target_conn, RelayEvent::Connected { remote: caller_id });
        Ok(())
    }

    /// Pass a payload to the other end of the caller's link.
    pub fn forward(&self, conn: Uuid, payload: serde_json::Value) -> Result<(), LinkError> {
        let remote = self
            .endpoints
            .get(&conn)
            .ok_or(LinkError::NotLinked)?
            .data_target()?;
        self.send_to(remote, RelayEvent::Data { payload });
        Ok(())
    }

    /// Forget a closed connection and tell its remote, if any.
    pub fn disconnect(&self, conn: Uuid) {
        self.senders.remove(&conn);
        let Some((_, endpoint)) = self.endpoints.remove(&conn) else {
            return;
        };
        if let Some(id) = &endpoint.id {
            self.ids.remove_if(id, |_, owner| *owner == conn);
        }
        if let Some(remote) = endpoint.remote {
            if let Some(mut other) = self.endpoints.get_mut(&remote) {
                other.unlink();
            }
            self.send_to(remote, RelayEvent::PeerClosed);
        }
    }

    /// Apply one client request, answering failures with an error event.
    pub fn handle_request(&self, conn: Uuid, request: RelayRequest) {
        let result = match request {
            RelayRequest::Register { id } => self.register(conn, id),
            RelayRequest::Lookup { id } => {
                self.lookup(conn, id);
                Ok(())
            }
            RelayRequest::Connect { target } => self.connect(conn, target),
            RelayRequest::Data { payload } => self.forward(conn, payload),
        };
        if let Err(e) = result {
            debug!("Request from {} failed: {}", conn, e);
            self.send_to(
                conn,
                RelayEvent::Error {
                    message: e.to_string(),
                },
            );
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Accept relay connections until the listener fails.
pub async fn run_server(listener: TcpListener, state: Arc<ServerState>) -> anyhow::Result<()> {
    info!("Dotmination relay listening on {}", listener.local_addr()?);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let conn = Uuid::new_v4();
    info!("New relay connection {} from {}", conn, addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<RelayEvent>();
    state.open(conn, tx);

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&event) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<RelayRequest>(&text) {
                Ok(request) => state.handle_request(conn, request),
                Err(e) => {
                    warn!("Invalid request from {}: {}", conn, e);
                    state.send_to(
                        conn,
                        RelayEvent::Error {
                            message: "invalid request".into(),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                debug!("Client {} closing connection", conn);
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {}: {}", conn, e);
                break;
            }
            _ => {}
        }
    }

    state.disconnect(conn);
    send_task.abort();

    info!("Connection closed for {}", conn);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(state: &ServerState) -> (Uuid, mpsc::UnboundedReceiver<RelayEvent>) {
        let conn = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.open(conn, tx);
        (conn, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<RelayEvent>) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_register_and_lookup() {
        let state = ServerState::new();
        let (a, mut a_rx) = client(&state);
        let (b, mut b_rx) = client(&state);

        state.handle_request(a, RelayRequest::Register { id: "host-1".into() });
        assert_eq!(drain(&mut a_rx), vec![RelayEvent::Registered { id: "host-1".into() }]);

        state.handle_request(b, RelayRequest::Lookup { id: "host-1".into() });
        state.handle_request(b, RelayRequest::Lookup { id: "peer-1".into() });
        assert_eq!(
            drain(&mut b_rx),
            vec![
                RelayEvent::LookupResult {
                    id: "host-1".into(),
                    exists: true
                },
                RelayEvent::LookupResult {
                    id: "peer-1".into(),
                    exists: false
                },
            ]
        );
    }

    #[test]
    fn test_taken_id_is_rejected() {
        let state = ServerState::new();
        let (a, _a_rx) = client(&state);
        let (b, _b_rx) = client(&state);

        state.register(a, "host-1".into()).unwrap();
        assert_eq!(
            state.register(b, "host-1".into()),
            Err(LinkError::IdTaken("host-1".into()))
        );
        assert_eq!(
            state.register(a, "host-2".into()),
            Err(LinkError::AlreadyRegistered("host-1".into()))
        );
    }

    #[test]
    fn test_connect_and_forward() {
        let state = ServerState::new();
        let (host, mut host_rx) = client(&state);
        let (peer, mut peer_rx) = client(&state);
        state.register(host, "host-1".into()).unwrap();
        state.register(peer, "peer-1".into()).unwrap();
        drain(&mut host_rx);
        drain(&mut peer_rx);

        state.connect(peer, "host-1".into()).unwrap();
        assert_eq!(drain(&mut peer_rx), vec![RelayEvent::Connected { remote: "host-1".into() }]);
        assert_eq!(drain(&mut host_rx), vec![RelayEvent::Connected { remote: "peer-1".into() }]);

        state.forward(peer, json!({"type": "ready"})).unwrap();
        assert_eq!(
            drain(&mut host_rx),
            vec![RelayEvent::Data {
                payload: json!({"type": "ready"})
            }]
        );
    }

    #[test]
    fn test_connect_errors() {
        let state = ServerState::new();
        let (host, _host_rx) = client(&state);
        let (peer, _peer_rx) = client(&state);
        let (late, _late_rx) = client(&state);

        assert_eq!(state.connect(peer, "host-1".into()), Err(LinkError::NotRegistered));
        state.register(host, "host-1".into()).unwrap();
        state.register(peer, "peer-1".into()).unwrap();
        state.register(late, "peer-1b".into()).unwrap();

        assert_eq!(
            state.connect(peer, "host-9".into()),
            Err(LinkError::UnknownTarget("host-9".into()))
        );
        assert_eq!(state.connect(host, "host-1".into()), Err(LinkError::SelfLink));
        assert_eq!(state.forward(peer, json!(1)), Err(LinkError::NotLinked));

        state.connect(peer, "host-1".into()).unwrap();
        assert_eq!(state.connect(late, "host-1".into()), Err(LinkError::Busy));
        assert!(!state.endpoints.get(&late).unwrap().is_linked());
    }

    #[test]
    fn test_disconnect_notifies_remote() {
        let state = ServerState::new();
        let (host, mut host_rx) = client(&state);
        let (peer, _peer_rx) = client(&state);
        state.register(host, "host-1".into()).unwrap();
        state.register(peer, "peer-1".into()).unwrap();
        state.connect(peer, "host-1".into()).unwrap();
        drain(&mut host_rx);

        state.disconnect(peer);
        assert_eq!(drain(&mut host_rx), vec![RelayEvent::PeerClosed]);
        assert!(!state.ids.contains_key("peer-1"));
        assert!(!state.endpoints.get(&host).unwrap().is_linked());

        // The host can take a new peer
        let (again, _again_rx) = client(&state);
        state.register(again, "peer-1".into()).unwrap();
        state.connect(again, "host-1".into()).unwrap();
    }
}
