//! End-to-end tests against a relay on an ephemeral port.

use dotmination_net::session::now_millis;
use dotmination_net::{
    lobby_id, play_online, run_server, ClientConfig, LocalCommand, MemorySessionStore, MultiplayerSession, NetError,
    RelayConnection, Role, ServerState, SessionEnd, SessionStore, SessionUpdate, SlotAssignment, SyncStatus, Transport,
    WireMessage,
};
use dotmination_core::{Player, StartType};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(run_server(listener, Arc::new(ServerState::new())));
    format!("ws://{}", addr)
}

fn config(url: &str) -> ClientConfig {
    ClientConfig {
        relay_url: url.to_string(),
        session_file: std::env::temp_dir().join("unused-session.json"),
        rows: 1,
        cols: 4,
    }
}

async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<SessionUpdate>,
    pred: impl Fn(&SessionUpdate) -> bool,
) -> SessionUpdate {
    loop {
        let update = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for update")
            .expect("update channel closed");
        if pred(&update) {
            return update;
        }
    }
}

async fn wait_until_registered(url: &str, id: &str) {
    let mut watcher = RelayConnection::connect(url).await.unwrap();
    for _ in 0..100 {
        if watcher.lookup(id).await.unwrap() {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("{} never registered", id);
}

#[tokio::test]
async fn test_register_and_lookup() {
    let url = start_relay().await;
    let mut a = RelayConnection::connect(&url).await.unwrap();
    let mut b = RelayConnection::connect(&url).await.unwrap();

    a.register("dotmination-blank-host-1").await.unwrap();
    assert_eq!(a.registered_id(), Some("dotmination-blank-host-1"));

    assert!(b.lookup("dotmination-blank-host-1").await.unwrap());
    assert!(!b.lookup("dotmination-blank-peer-1").await.unwrap());
    assert!(b.register("dotmination-blank-host-1").await.is_err());
}

#[tokio::test]
async fn test_link_carries_messages_and_reports_close() {
    let url = start_relay().await;
    let mut host = RelayConnection::connect(&url).await.unwrap();
    let mut peer = RelayConnection::connect(&url).await.unwrap();
    host.register("host").await.unwrap();
    peer.register("peer").await.unwrap();

    let mut peer_link = peer.dial("host").await.unwrap();
    let mut host_link = host.accept().await.unwrap();
    assert_eq!(peer_link.remote(), "host");
    assert_eq!(host_link.remote(), "peer");

    peer_link.send(WireMessage::Ready).await.unwrap();
    assert_eq!(host_link.recv().await, Some(WireMessage::Ready));
    host_link.send(WireMessage::Move { dot_index: 2 }).await.unwrap();
    assert_eq!(peer_link.recv().await, Some(WireMessage::Move { dot_index: 2 }));

    peer_link.close().await;
    assert_eq!(host_link.recv().await, None);
    assert!(peer_link.into_connection().is_none());

    // Host keeps its registration and can take a new peer
    let mut host = host_link.into_connection().expect("relay connection survives");
    assert!(host.lookup("host").await.unwrap());
    let mut again = RelayConnection::connect(&url).await.unwrap();
    again.register("peer").await.unwrap();
    let _again_link = again.dial("host").await.unwrap();
    assert_eq!(host.accept().await.unwrap().remote(), "peer");
}

#[tokio::test]
async fn test_two_clients_play_online() {
    let url = start_relay().await;

    let (host_cmd, host_cmd_rx) = mpsc::unbounded_channel();
    let (host_up_tx, mut host_up) = mpsc::unbounded_channel();
    let host_config = config(&url);
    let host = tokio::spawn(async move {
        let store = MemorySessionStore::default();
        play_online(&host_config, &store, StartType::Blank, host_cmd_rx, host_up_tx).await
    });
    wait_until_registered(&url, &lobby_id(StartType::Blank, Role::Host, 1)).await;

    let (peer_cmd, peer_cmd_rx) = mpsc::unbounded_channel();
    let (peer_up_tx, mut peer_up) = mpsc::unbounded_channel();
    let peer_config = config(&url);
    let peer = tokio::spawn(async move {
        let store = MemorySessionStore::default();
        play_online(&peer_config, &store, StartType::Blank, peer_cmd_rx, peer_up_tx).await
    });

    wait_for(&mut peer_up, |u| {
        matches!(u, SessionUpdate::State { status: SyncStatus::Playing, .. })
    })
    .await;

    host_cmd.send(LocalCommand::Click(1)).unwrap();
    wait_for(&mut peer_up, |u| {
        matches!(u, SessionUpdate::State { map_string, current_player: Player::P2, .. } if map_string == "0100")
    })
    .await;

    peer_cmd.send(LocalCommand::Click(2)).unwrap();
    wait_for(&mut host_up, |u| {
        matches!(u, SessionUpdate::State { map_string, move_count: 2, .. } if map_string == "0160")
    })
    .await;

    peer_cmd.send(LocalCommand::Abandon).unwrap();
    let peer_end = timeout(Duration::from_secs(5), peer).await.unwrap().unwrap().unwrap();
    let host_end = timeout(Duration::from_secs(5), host).await.unwrap().unwrap().unwrap();
    assert_eq!(peer_end, SessionEnd::Abandoned);
    assert_eq!(host_end, SessionEnd::ModeSwitch);
    drop(host_cmd);
}

#[tokio::test]
async fn test_failed_resume_releases_seat() {
    let url = start_relay().await;
    let store = Arc::new(MemorySessionStore::default());
    let seat = MultiplayerSession::from_assignment(
        SlotAssignment { slot: 1, role: Role::Peer },
        StartType::Blank,
        now_millis(),
    );
    store.save(&seat.record()).unwrap();

    // Nobody hosts slot 1 any more
    let (_cmd, cmd_rx) = mpsc::unbounded_channel();
    let (up_tx, _up) = mpsc::unbounded_channel();
    let result = play_online(&config(&url), store.as_ref(), StartType::Blank, cmd_rx, up_tx).await;
    assert!(matches!(result, Err(NetError::Connection(_))));
    assert_eq!(store.load().unwrap(), None);

    // The next attempt searches the lobby and hosts the free slot
    let (cmd, cmd_rx) = mpsc::unbounded_channel();
    let (up_tx, _up) = mpsc::unbounded_channel();
    let retry_store = Arc::clone(&store);
    let retry_config = config(&url);
    let retry = tokio::spawn(async move {
        play_online(&retry_config, retry_store.as_ref(), StartType::Blank, cmd_rx, up_tx).await
    });
    wait_until_registered(&url, &lobby_id(StartType::Blank, Role::Host, 1)).await;

    cmd.send(LocalCommand::Abandon).unwrap();
    let end = timeout(Duration::from_secs(5), retry).await.unwrap().unwrap().unwrap();
    assert_eq!(end, SessionEnd::Abandoned);
    assert_eq!(store.load().unwrap(), None);
}
