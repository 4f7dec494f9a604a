//! Message transports.
//!
//! A [`Transport`] is an ordered, reliable, point-to-point pipe of
//! [`WireMessage`]s. Two implementations ship here:
//! - [`ChannelTransport`]: an in-process pair over tokio channels
//! - [`RelayTransport`]: a link through the relay server, opened from a
//!   [`RelayConnection`]
//!
//! [`RelayConnection`] also answers presence lookups, so it doubles as the
//! [`Signaling`] used for slot probing.

use crate::error::NetError;
use crate::lobby::Signaling;
use crate::protocol::{RelayEvent, RelayRequest, WireMessage};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Ordered, reliable message pipe to the other side
pub trait Transport: Send {
    fn send(&mut self, msg: WireMessage) -> impl Future<Output = Result<(), NetError>> + Send;

    /// Next message, or `None` once the other side is gone
    fn recv(&mut self) -> impl Future<Output = Option<WireMessage>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// In-process transport over unbounded channels
#[derive(Debug)]
pub struct ChannelTransport {
    tx: Option<mpsc::UnboundedSender<WireMessage>>,
    rx: mpsc::UnboundedReceiver<WireMessage>,
}

impl ChannelTransport {
    /// Two connected ends
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(a_tx),
                rx: a_rx,
            },
            Self {
                tx: Some(b_tx),
                rx: b_rx,
            },
        )
    }
}

impl Transport for ChannelTransport {
    async fn send(&mut self, msg: WireMessage) -> Result<(), NetError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| NetError::Connection("transport closed".into()))?;
        tx.send(msg)
            .map_err(|_| NetError::Connection("other side is gone".into()))
    }

    async fn recv(&mut self) -> Option<WireMessage> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.tx = None;
        self.rx.close();
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A client connection to the relay server
pub struct RelayConnection {
    ws: WsStream,
    registered: Option<String>,
}

impl RelayConnection {
    pub async fn connect(url: &str) -> Result<Self, NetError> {
        let (ws, _) = connect_async(url).await?;
        debug!("Connected to relay at {}", url);
        Ok(Self { ws, registered: None })
    }

    /// Identifier this connection holds, if any
    pub fn registered_id(&self) -> Option<&str> {
        self.registered.as_deref()
    }

    async fn request(&mut self, request: &RelayRequest) -> Result<(), NetError> {
        let text = serde_json::to_string(request)?;
        self.ws.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Next relay event, or `None` when the relay closed the socket
    async fn next_event(&mut self) -> Result<Option<RelayEvent>, NetError> {
        while let Some(frame) = self.ws.next().await {
            match frame? {
                Message::Text(text) => match serde_json::from_str(&text) {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => warn!("Invalid relay frame: {}", e),
                },
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    async fn expect_event(&mut self) -> Result<RelayEvent, NetError> {
        match self.next_event().await? {
            Some(RelayEvent::Error { message }) => Err(NetError::Connection(message)),
            Some(event) => Ok(event),
            None => Err(NetError::Connection("relay closed the connection".into())),
        }
    }

    /// Claim `id` on the relay
    pub async fn register(&mut self, id: &str) -> Result<(), NetError> {
        self.request(&RelayRequest::Register { id: id.to_string() }).await?;
        match self.expect_event().await? {
            RelayEvent::Registered { id } => {
                info!("Registered as {}", id);
                self.registered = Some(id);
                Ok(())
            }
            other => Err(unexpected(&other)),
        }
    }

    /// Whether some client holds `id`
    pub async fn lookup(&mut self, id: &str) -> Result<bool, NetError> {
        self.request(&RelayRequest::Lookup { id: id.to_string() }).await?;
        match self.expect_event().await? {
            RelayEvent::LookupResult { exists, .. } => Ok(exists),
            other => Err(unexpected(&other)),
        }
    }

    /// Open a link to the client registered as `target`
    pub async fn dial(mut self, target: &str) -> Result<RelayTransport, NetError> {
        self.request(&RelayRequest::Connect {
            target: target.to_string(),
        })
        .await?;
        match self.expect_event().await? {
            RelayEvent::Connected { remote } => Ok(RelayTransport::new(self, remote)),
            other => Err(unexpected(&other)),
        }
    }

    /// Wait until another client dials this one
    pub async fn accept(mut self) -> Result<RelayTransport, NetError> {
        loop {
            match self.expect_event().await? {
                RelayEvent::Connected { remote } => return Ok(RelayTransport::new(self, remote)),
                other => debug!("Ignoring {:?} while waiting for a link", other),
            }
        }
    }
}

fn unexpected(event: &RelayEvent) -> NetError {
    NetError::Protocol(format!("unexpected relay event {:?}", event))
}

impl Signaling for RelayConnection {
    async fn is_reachable(&mut self, id: &str) -> Result<bool, NetError> {
        self.lookup(id).await
    }
}

/// An open link through the relay
pub struct RelayTransport {
    conn: RelayConnection,
    remote: String,
    /// The relay socket itself is gone, not just the other end
    relay_lost: bool,
}

impl RelayTransport {
    fn new(conn: RelayConnection, remote: String) -> Self {
        Self {
            conn,
            remote,
            relay_lost: false,
        }
    }

    /// Identifier of the other end
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// The relay connection, if it outlived the link
    pub fn into_connection(self) -> Option<RelayConnection> {
        (!self.relay_lost).then_some(self.conn)
    }
}

impl Transport for RelayTransport {
    async fn send(&mut self, msg: WireMessage) -> Result<(), NetError> {
        let payload = serde_json::to_value(&msg)?;
        self.conn.request(&RelayRequest::Data { payload }).await
    }

    async fn recv(&mut self) -> Option<WireMessage> {
        loop {
            match self.conn.next_event().await {
                Ok(Some(RelayEvent::Data { payload })) => match serde_json::from_value(payload) {
                    Ok(msg) => return Some(msg),
                    Err(e) => warn!("Dropping malformed message from {}: {}", self.remote, e),
                },
                Ok(Some(RelayEvent::PeerClosed)) => return None,
                Ok(Some(other)) => debug!("Ignoring {:?} on open link", other),
                Ok(None) => {
                    self.relay_lost = true;
                    return None;
                }
                Err(e) => {
                    warn!("Relay link to {} failed: {}", self.remote, e);
                    self.relay_lost = true;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.conn.ws.close(None).await;
        self.relay_lost = true;
    }
}
