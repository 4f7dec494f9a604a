//! Async session driver.
//!
//! [`run_session`] pumps one open link: messages from the transport go into
//! the [`SyncRole`], local commands come in on a channel, and every change is
//! published as a [`SessionUpdate`]. [`play_online`] wraps it with slot
//! negotiation on the relay and the reconnect rules for each role.

use crate::config::{ClientConfig, RECONNECT_ATTEMPTS, RECONNECT_DELAY};
use crate::error::NetError;
use crate::lobby::{find_available_slot, Role, Signaling};
use crate::protocol::WireMessage;
use crate::session::{now_millis, MultiplayerSession, SessionStore};
use crate::sync::{CloseReason, HostSync, PeerSync, SyncRole, SyncStatus};
use crate::transport::{RelayConnection, RelayTransport, Transport};
use dotmination_core::{Player, StartType};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Input from the local player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCommand {
    Click(usize),
    Rematch,
    /// Leave the session and tell the other side
    Abandon,
}

/// Output for whoever draws the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    State {
        status: SyncStatus,
        map_string: String,
        current_player: Player,
        move_count: u32,
    },
    /// Player-facing error text
    Error(&'static str),
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The other side left on purpose
    ModeSwitch,
    /// The local player left
    Abandoned,
    /// The link failed
    Dropped,
}

/// Pick a seat: resume a stored session for the same start type, otherwise
/// search the lobby slots. The chosen seat is saved to `store`.
pub async fn negotiate<S, St>(
    signaling: &mut S,
    store: &St,
    start_type: StartType,
    now_ms: u64,
) -> Result<MultiplayerSession, NetError>
where
    S: Signaling + Send,
    St: SessionStore,
{
    let session = match store.load_valid(now_ms)? {
        Some(record) if record.start_type == start_type => {
            info!("Resuming slot {} as {}", record.slot, record.role);
            MultiplayerSession::from_record(&record)
        }
        _ => {
            let assignment = find_available_slot(signaling, start_type).await?;
            info!("Took slot {} as {}", assignment.slot, assignment.role);
            MultiplayerSession::from_assignment(assignment, start_type, now_ms)
        }
    };
    store.save(&session.record())?;
    Ok(session)
}

/// What to do after the `attempt`-th failed redial
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconnect {
    /// Try the stored seat again after [`RECONNECT_DELAY`]
    Resume(MultiplayerSession),
    /// Give up and let the player retry by hand
    ManualRetry,
}

pub fn plan_reconnect<St: SessionStore>(
    store: &St,
    start_type: StartType,
    attempt: u32,
    now_ms: u64,
) -> Result<Reconnect, NetError> {
    if attempt >= RECONNECT_ATTEMPTS {
        return Ok(Reconnect::ManualRetry);
    }
    Ok(match store.load_valid(now_ms)? {
        Some(record) if record.start_type == start_type => {
            Reconnect::Resume(MultiplayerSession::from_record(&record))
        }
        _ => Reconnect::ManualRetry,
    })
}

fn publish<R: SyncRole>(sync: &R, updates: &mpsc::UnboundedSender<SessionUpdate>) {
    let game = sync.game();
    let _ = updates.send(SessionUpdate::State {
        status: sync.status(),
        map_string: game.board.encode(),
        current_player: game.current_player,
        move_count: game.move_count,
    });
}

async fn send_all<T: Transport>(transport: &mut T, msgs: Vec<WireMessage>) -> Result<(), NetError> {
    for msg in msgs {
        debug!("Sending {}", msg.kind());
        transport.send(msg).await?;
    }
    Ok(())
}

/// Drive one open link until it closes.
///
/// Bad messages and rejected clicks are reported as [`SessionUpdate::Error`]
/// and do not end the session.
pub async fn run_session<R, T>(
    sync: &mut R,
    transport: &mut T,
    commands: &mut mpsc::UnboundedReceiver<LocalCommand>,
    updates: &mpsc::UnboundedSender<SessionUpdate>,
) -> Result<SessionEnd, NetError>
where
    R: SyncRole + Send,
    T: Transport,
{
    let opening = sync.on_open();
    if send_all(transport, opening).await.is_err() {
        sync.on_close(CloseReason::Dropped);
        publish(sync, updates);
        return Ok(SessionEnd::Dropped);
    }
    publish(sync, updates);

    loop {
        let outgoing = tokio::select! {
            incoming = transport.recv() => {
                let Some(msg) = incoming else {
                    sync.on_close(CloseReason::Dropped);
                    publish(sync, updates);
                    return Ok(SessionEnd::Dropped);
                };
                debug!("Received {}", msg.kind());
                match sync.on_message(msg) {
                    Ok(out) => out,
                    Err(e) => {
                        warn!("Rejected message: {}", e);
                        let _ = updates.send(SessionUpdate::Error(e.status_message()));
                        Vec::new()
                    }
                }
            }
            command = commands.recv() => match command {
                Some(LocalCommand::Click(index)) => match sync.local_move(index) {
                    Ok(out) => out,
                    Err(e) => {
                        debug!("Click on {} rejected: {}", index, e);
                        let _ = updates.send(SessionUpdate::Error(e.status_message()));
                        continue;
                    }
                },
                Some(LocalCommand::Rematch) => sync.request_rematch(),
                Some(LocalCommand::Abandon) | None => {
                    let out = sync.abandon();
                    let _ = send_all(transport, out).await;
                    transport.close().await;
                    publish(sync, updates);
                    return Ok(SessionEnd::Abandoned);
                }
            },
        };

        if send_all(transport, outgoing).await.is_err() {
            sync.on_close(CloseReason::Dropped);
            publish(sync, updates);
            return Ok(SessionEnd::Dropped);
        }
        publish(sync, updates);

        if sync.status() == SyncStatus::Closed {
            transport.close().await;
            return Ok(SessionEnd::ModeSwitch);
        }
    }
}

async fn registered_connection(url: &str, id: &str) -> Result<RelayConnection, NetError> {
    let mut conn = RelayConnection::connect(url).await?;
    conn.register(id).await?;
    Ok(conn)
}

/// Join a networked match through the relay and play it until it ends.
pub async fn play_online<St: SessionStore>(
    config: &ClientConfig,
    store: &St,
    start_type: StartType,
    mut commands: mpsc::UnboundedReceiver<LocalCommand>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
) -> Result<SessionEnd, NetError> {
    let mut conn = RelayConnection::connect(&config.relay_url).await?;
    let session = negotiate(&mut conn, store, start_type, now_millis()).await?;

    // The seat is released however the session ends, so a failed resume
    // searches the lobby again on the next attempt
    let outcome = take_seat(config, store, session, conn, &mut commands, &updates).await;
    if let Err(e) = &outcome {
        warn!("Giving up seat: {}", e);
    }
    store.clear()?;
    outcome
}

async fn take_seat<St: SessionStore>(
    config: &ClientConfig,
    store: &St,
    session: MultiplayerSession,
    mut conn: RelayConnection,
    commands: &mut mpsc::UnboundedReceiver<LocalCommand>,
    updates: &mpsc::UnboundedSender<SessionUpdate>,
) -> Result<SessionEnd, NetError> {
    conn.register(&session.local_id()).await?;
    match session.role {
        Role::Host => {
            let sync = HostSync::new(session, config.rows, config.cols)?;
            host_loop(config, store, sync, conn, commands, updates).await
        }
        Role::Peer => {
            let sync = PeerSync::new(session, config.rows, config.cols)?;
            peer_loop(config, store, sync, conn, commands, updates).await
        }
    }
}

/// Host keeps its seat and board, and waits for the peer to come back.
async fn host_loop<St: SessionStore>(
    config: &ClientConfig,
    store: &St,
    mut sync: HostSync,
    mut conn: RelayConnection,
    commands: &mut mpsc::UnboundedReceiver<LocalCommand>,
    updates: &mpsc::UnboundedSender<SessionUpdate>,
) -> Result<SessionEnd, NetError> {
    loop {
        publish(&sync, updates);
        let accept = conn.accept();
        tokio::pin!(accept);
        let mut transport = loop {
            tokio::select! {
                linked = &mut accept => break linked?,
                command = commands.recv() => {
                    if matches!(command, None | Some(LocalCommand::Abandon)) {
                        return Ok(SessionEnd::Abandoned);
                    }
                }
            }
        };
        info!("Peer {} connected", transport.remote());

        match run_session(&mut sync, &mut transport, commands, updates).await? {
            SessionEnd::Dropped => {
                store.save(&sync.session().record())?;
                conn = match transport.into_connection() {
                    Some(conn) => conn,
                    None => registered_connection(&config.relay_url, &sync.session().local_id()).await?,
                };
            }
            end => return Ok(end),
        }
    }
}

/// Peer redials the host while the stored session is fresh.
async fn peer_loop<St: SessionStore>(
    config: &ClientConfig,
    store: &St,
    mut sync: PeerSync,
    conn: RelayConnection,
    commands: &mut mpsc::UnboundedReceiver<LocalCommand>,
    updates: &mpsc::UnboundedSender<SessionUpdate>,
) -> Result<SessionEnd, NetError> {
    let remote = sync.session().remote_id();
    let mut transport = conn.dial(&remote).await?;

    loop {
        match run_session(&mut sync, &mut transport, commands, updates).await? {
            SessionEnd::Dropped => {
                store.save(&sync.session().record())?;
                let mut spare = transport.into_connection();
                transport = match redial(config, store, &sync, &mut spare).await? {
                    Some(transport) => transport,
                    None => {
                        let _ = updates.send(SessionUpdate::Error("Connection lost"));
                        return Ok(SessionEnd::Dropped);
                    }
                };
            }
            end => return Ok(end),
        }
    }
}

async fn redial<St: SessionStore>(
    config: &ClientConfig,
    store: &St,
    sync: &PeerSync,
    spare: &mut Option<RelayConnection>,
) -> Result<Option<RelayTransport>, NetError> {
    let start_type = sync.session().start_type;
    for attempt in 0.. {
        let session = match plan_reconnect(store, start_type, attempt, now_millis())? {
            Reconnect::Resume(session) => session,
            Reconnect::ManualRetry => return Ok(None),
        };
        tokio::time::sleep(RECONNECT_DELAY).await;
        info!("Reconnect attempt {} to {}", attempt + 1, session.remote_id());

        let conn = match spare.take() {
            Some(conn) => conn,
            None => match registered_connection(&config.relay_url, &session.local_id()).await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Relay unreachable: {}", e);
                    continue;
                }
            },
        };
        match conn.dial(&session.remote_id()).await {
            Ok(transport) => return Ok(Some(transport)),
            Err(e) => warn!("Host not reachable yet: {}", e),
        }
    }
    Ok(None)
}
