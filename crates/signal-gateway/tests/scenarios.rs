//! End-to-end scenario tests
//!
//! Drives the gateway through the dispatcher with in-memory sockets: join
//! admission, the signaling round-trip, the relay fallback gate, and the
//! reconnect budget. Background ticks are driven manually (`drain_once`,
//! `monitor_once`, `reap_once`) so the tests are deterministic.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use signal_common::{AppConfig, AppSettings, Environment, HealthConfig, QueueConfig, ServerConfig};
use signal_core::{ConnectionState, DomainEvent, PairKey, PeerId, RoomId, RoomRules};
use signal_gateway::connection::PeerSocket;
use signal_gateway::handlers::MessageDispatcher;
use signal_gateway::protocol::{ClientEvent, ServerEvent};
use signal_gateway::server::{create_gateway_state, GatewayState};
use signal_service::{EventHandler, RoomService};

fn test_config() -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "signal-server-test".to_string(),
            env: Environment::Development,
        },
        gateway: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        api: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        ws_path: "/signal".to_string(),
        max_connections_per_room: 20,
        // Loop periods pushed out so ticks only happen when a test asks
        queue: QueueConfig {
            drain_ms: 3_600_000,
            batch_size: 10,
        },
        health: HealthConfig {
            stale_connection_ms: 30_000,
            max_reconnect_attempts: 3,
        },
        room_stats_monitor_ms: 3_600_000,
    }
}

struct Recorder(Mutex<Vec<String>>);

#[async_trait::async_trait]
impl EventHandler for Recorder {
    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(event.event_type().to_string());
        Ok(())
    }
}

async fn recording_state() -> (GatewayState, Arc<Recorder>) {
    let state = create_gateway_state(test_config());
    let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
    for name in [
        "room-created",
        "player-joined",
        "player-left",
        "room-closed",
        "connection-state-changed",
        "offer-received",
        "answer-received",
        "ice-candidate-received",
        "connection-timeout",
    ] {
        state
            .service_context()
            .publisher()
            .register(name, recorder.clone() as Arc<dyn EventHandler>)
            .await;
    }
    (state, recorder)
}

async fn create_room(state: &GatewayState, owner: &str, max_players: u32) -> RoomId {
    let service = RoomService::new(state.service_context());
    service
        .create_room(
            PeerId::new(owner),
            RoomRules {
                max_players,
                ..RoomRules::default()
            },
        )
        .await
        .unwrap()
        .id
}

fn connect(
    state: &GatewayState,
    room: &RoomId,
    peer: &str,
) -> (Arc<PeerSocket>, mpsc::Receiver<ServerEvent>) {
    let (tx, rx) = mpsc::channel(64);
    let socket = PeerSocket::new(room.clone(), PeerId::new(peer), tx);
    state.sockets().add_socket(socket.clone());
    (socket, rx)
}

fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn join(
    state: &GatewayState,
    socket: &Arc<PeerSocket>,
    room: &RoomId,
    peer: &str,
) {
    MessageDispatcher::dispatch(
        state,
        socket,
        ClientEvent::Join {
            room_id: room.clone(),
            peer_id: PeerId::new(peer),
        },
    )
    .await
    .unwrap();
}

// ============================================================================
// Scenario: create + join + room state
// ============================================================================

#[tokio::test]
async fn scenario_create_join_state() {
    let (state, _) = recording_state().await;
    let room = create_room(&state, "u1", 4).await;

    let (socket, mut rx) = connect(&state, &room, "u1");
    join(&state, &socket, &room, "u1").await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    match &events[0] {
        ServerEvent::PlayerJoined {
            peer_id,
            total_players,
            is_room_owner,
            ..
        } => {
            assert_eq!(peer_id, &PeerId::new("u1"));
            assert_eq!(*total_players, 1);
            assert!(is_room_owner);
        }
        other => panic!("expected player-joined, got {other:?}"),
    }
    match &events[1] {
        ServerEvent::RoomState {
            room_id,
            owner_id,
            players,
            ..
        } => {
            assert_eq!(room_id, &room);
            assert_eq!(owner_id, &PeerId::new("u1"));
            assert_eq!(players, &vec![PeerId::new("u1")]);
        }
        other => panic!("expected room-state, got {other:?}"),
    }
}

// ============================================================================
// Scenario: offer / answer / ice round-trip
// ============================================================================

#[tokio::test]
async fn scenario_signal_round_trip() {
    let (state, recorder) = recording_state().await;
    let room = create_room(&state, "A", 4).await;

    let (sock_a, mut rx_a) = connect(&state, &room, "A");
    let (sock_b, mut rx_b) = connect(&state, &room, "B");
    join(&state, &sock_a, &room, "A").await;
    join(&state, &sock_b, &room, "B").await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    // A offers; B sees it immediately on the fan-out path
    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::Offer {
            room_id: room.clone(),
            from: PeerId::new("A"),
            to: PeerId::new("B"),
            offer: serde_json::json!({"sdp": "O"}),
        },
    )
    .await
    .unwrap();

    let events = drain(&mut rx_b);
    assert!(matches!(
        &events[..],
        [ServerEvent::Offer { from, offer }]
            if from == &PeerId::new("A") && offer == &serde_json::json!({"sdp": "O"})
    ));
    state.queue().drain_once().await;

    // B answers
    MessageDispatcher::dispatch(
        &state,
        &sock_b,
        ClientEvent::Answer {
            room_id: room.clone(),
            from: PeerId::new("B"),
            to: PeerId::new("A"),
            answer: serde_json::json!({"sdp": "X"}),
        },
    )
    .await
    .unwrap();

    let events = drain(&mut rx_a);
    assert!(matches!(
        &events[..],
        [ServerEvent::Answer { from, .. }] if from == &PeerId::new("B")
    ));
    state.queue().drain_once().await;

    // A trickles a candidate
    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::IceCandidate {
            room_id: room.clone(),
            from: PeerId::new("A"),
            to: PeerId::new("B"),
            candidate: serde_json::json!({"candidate": "c1"}),
        },
    )
    .await
    .unwrap();

    let events = drain(&mut rx_b);
    assert!(matches!(
        &events[..],
        [ServerEvent::IceCandidate { from, .. }] if from == &PeerId::new("A")
    ));
    state.queue().drain_once().await;

    // The (A,B) aggregate went connecting then connected and counted the candidate
    let stored = state
        .service_context()
        .peer_repo()
        .find_by_id(&PairKey::new("A", "B"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, ConnectionState::Connected);
    assert!(stored.ice_candidate_count >= 1);

    let names = recorder.0.lock().unwrap().clone();
    let offer_pos = names.iter().position(|n| n == "offer-received").unwrap();
    let answer_pos = names.iter().position(|n| n == "answer-received").unwrap();
    let ice_pos = names
        .iter()
        .position(|n| n == "ice-candidate-received")
        .unwrap();
    assert!(offer_pos < answer_pos && answer_pos < ice_pos);
}

// ============================================================================
// Scenario: full room
// ============================================================================

#[tokio::test]
async fn scenario_full_room_rejects_third_peer() {
    let (state, _) = recording_state().await;
    let room = create_room(&state, "A", 2).await;

    let (sock_a, _rx_a) = connect(&state, &room, "A");
    let (sock_b, _rx_b) = connect(&state, &room, "B");
    let (sock_c, _rx_c) = connect(&state, &room, "C");
    join(&state, &sock_a, &room, "A").await;
    join(&state, &sock_b, &room, "B").await;

    let err = MessageDispatcher::dispatch(
        &state,
        &sock_c,
        ClientEvent::Join {
            room_id: room.clone(),
            peer_id: PeerId::new("C"),
        },
    )
    .await
    .unwrap_err();

    match err.to_server_event() {
        ServerEvent::Error { message, .. } => assert!(message.to_lowercase().contains("full")),
        other => panic!("expected error frame, got {other:?}"),
    }

    let service = RoomService::new(state.service_context());
    let loaded = service.get_room(&room).await.unwrap();
    assert_eq!(loaded.player_count(), 2);
    assert!(!loaded.has_player(&PeerId::new("C")));
}

// ============================================================================
// Scenario: close on last leave
// ============================================================================

#[tokio::test]
async fn scenario_room_closes_when_last_player_leaves() {
    let (state, recorder) = recording_state().await;
    let room = create_room(&state, "A", 4).await;

    let (sock_a, mut rx_a) = connect(&state, &room, "A");
    join(&state, &sock_a, &room, "A").await;
    drain(&mut rx_a);

    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::Leave {
            room_id: room.clone(),
            peer_id: PeerId::new("A"),
        },
    )
    .await
    .unwrap();

    let names = recorder.0.lock().unwrap().clone();
    let left_pos = names.iter().position(|n| n == "player-left").unwrap();
    let closed_pos = names.iter().position(|n| n == "room-closed").unwrap();
    assert!(left_pos < closed_pos);

    // The room is destroyed once inactive and empty
    let service = RoomService::new(state.service_context());
    assert!(service.get_room(&room).await.is_err());
}

// ============================================================================
// Scenario: fallback gate
// ============================================================================

#[tokio::test]
async fn scenario_fallback_gate() {
    let (state, _) = recording_state().await;
    let room = create_room(&state, "A", 4).await;

    let (sock_a, mut rx_a) = connect(&state, &room, "A");
    let (sock_b, mut rx_b) = connect(&state, &room, "B");
    join(&state, &sock_a, &room, "A").await;
    join(&state, &sock_b, &room, "B").await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    // Relay before activation is rejected and nothing reaches B
    let err = MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::RelayData {
            room_id: room.clone(),
            from: PeerId::new("A"),
            to: PeerId::new("B"),
            payload: serde_json::json!({"x": 1}),
        },
    )
    .await
    .unwrap_err();
    match err.to_server_event() {
        ServerEvent::Error { code, .. } => {
            assert_eq!(code.as_deref(), Some("ERR_FALLBACK_NOT_ENABLED"));
        }
        other => panic!("expected error frame, got {other:?}"),
    }
    assert!(drain(&mut rx_b).is_empty());

    // Activation: B is told, A is acked
    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::WebrtcFallbackActivate {
            room_id: room.clone(),
            from: PeerId::new("A"),
            to: PeerId::new("B"),
        },
    )
    .await
    .unwrap();

    let events = drain(&mut rx_b);
    assert!(matches!(
        &events[..],
        [ServerEvent::WebrtcFallbackNeeded { from, room_id }]
            if from == &PeerId::new("A") && room_id == &room
    ));
    let events = drain(&mut rx_a);
    assert!(matches!(
        &events[..],
        [ServerEvent::WebrtcFallbackActivated { to, success: true }]
            if to == &PeerId::new("B")
    ));

    // Relay now forwards the payload untouched
    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::RelayData {
            room_id: room.clone(),
            from: PeerId::new("A"),
            to: PeerId::new("B"),
            payload: serde_json::json!({"x": 1}),
        },
    )
    .await
    .unwrap();

    let events = drain(&mut rx_b);
    assert!(matches!(
        &events[..],
        [ServerEvent::RelayData { from, payload }]
            if from == &PeerId::new("A") && payload == &serde_json::json!({"x": 1})
    ));
}

// ============================================================================
// Scenario: reconnect budget
// ============================================================================

#[tokio::test]
async fn scenario_reconnect_budget() {
    let (state, _) = recording_state().await;
    let room = create_room(&state, "A", 4).await;

    let (sock_a, mut rx_a) = connect(&state, &room, "A");
    let (sock_b, mut rx_b) = connect(&state, &room, "B");
    join(&state, &sock_a, &room, "A").await;
    join(&state, &sock_b, &room, "B").await;

    // Establish the pair
    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::Offer {
            room_id: room.clone(),
            from: PeerId::new("A"),
            to: PeerId::new("B"),
            offer: serde_json::json!({"sdp": "O"}),
        },
    )
    .await
    .unwrap();
    state.queue().drain_once().await;
    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::ConnectionState {
            room_id: room.clone(),
            peer_id: PeerId::new("A"),
            state: ConnectionState::Connected,
        },
    )
    .await
    .unwrap();
    drain(&mut rx_a);
    drain(&mut rx_b);

    // Repeated failure reports, each followed by a monitor pass
    let mut reconnects = 0;
    for _ in 0..3 {
        MessageDispatcher::dispatch(
            &state,
            &sock_a,
            ClientEvent::ConnectionState {
                room_id: room.clone(),
                peer_id: PeerId::new("A"),
                state: ConnectionState::Failed,
            },
        )
        .await
        .unwrap();
        state.connections().monitor_once().await;

        reconnects += drain(&mut rx_b)
            .iter()
            .filter(|e| matches!(e, ServerEvent::ReconnectNeeded { .. }))
            .count();
    }
    assert!(reconnects >= 1 && reconnects <= 3);

    // Budget spent: the reaper deletes the aggregate
    assert!(state.connections().reap_once().await >= 1);
    assert!(state
        .service_context()
        .peer_repo()
        .find_by_id(&PairKey::new("A", "B"))
        .await
        .unwrap()
        .is_none());

    // Further failure reports stay silent without a fresh connect
    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::ConnectionState {
            room_id: room.clone(),
            peer_id: PeerId::new("A"),
            state: ConnectionState::Failed,
        },
    )
    .await
    .unwrap();
    state.connections().monitor_once().await;
    let extra = drain(&mut rx_b)
        .iter()
        .filter(|e| matches!(e, ServerEvent::ReconnectNeeded { .. }))
        .count();
    assert_eq!(extra, 0);
}

// ============================================================================
// Scenario: failure suggests fallback to both endpoints
// ============================================================================

#[tokio::test]
async fn scenario_failed_state_suggests_fallback() {
    let (state, _) = recording_state().await;
    let room = create_room(&state, "A", 4).await;

    let (sock_a, mut rx_a) = connect(&state, &room, "A");
    let (sock_b, mut rx_b) = connect(&state, &room, "B");
    join(&state, &sock_a, &room, "A").await;
    join(&state, &sock_b, &room, "B").await;

    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::Offer {
            room_id: room.clone(),
            from: PeerId::new("A"),
            to: PeerId::new("B"),
            offer: serde_json::json!({"sdp": "O"}),
        },
    )
    .await
    .unwrap();
    state.queue().drain_once().await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::ConnectionState {
            room_id: room.clone(),
            peer_id: PeerId::new("A"),
            state: ConnectionState::Failed,
        },
    )
    .await
    .unwrap();

    let b_events = drain(&mut rx_b);
    assert!(b_events
        .iter()
        .any(|e| matches!(e, ServerEvent::PeerConnectionState { state, .. } if *state == ConnectionState::Failed)));
    assert!(b_events
        .iter()
        .any(|e| matches!(e, ServerEvent::WebrtcFallbackSuggested { .. })));
    assert!(drain(&mut rx_a)
        .iter()
        .any(|e| matches!(e, ServerEvent::WebrtcFallbackSuggested { .. })));
}

// ============================================================================
// Scenario: reconnect request gated on membership
// ============================================================================

#[tokio::test]
async fn scenario_reconnect_request_checks_membership() {
    let (state, _) = recording_state().await;
    let room = create_room(&state, "A", 4).await;

    let (sock_a, _rx_a) = connect(&state, &room, "A");
    let (sock_b, mut rx_b) = connect(&state, &room, "B");
    join(&state, &sock_a, &room, "A").await;
    join(&state, &sock_b, &room, "B").await;
    drain(&mut rx_b);

    // Unknown target peer
    let err = MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::ReconnectRequest {
            room_id: room.clone(),
            from: PeerId::new("A"),
            to: PeerId::new("ghost"),
        },
    )
    .await
    .unwrap_err();
    match err.to_server_event() {
        ServerEvent::Error { code, .. } => {
            assert_eq!(code.as_deref(), Some("ERR_PEER_NOT_FOUND"));
        }
        other => panic!("expected error frame, got {other:?}"),
    }

    // Member target receives the nudge
    MessageDispatcher::dispatch(
        &state,
        &sock_a,
        ClientEvent::ReconnectRequest {
            room_id: room.clone(),
            from: PeerId::new("A"),
            to: PeerId::new("B"),
        },
    )
    .await
    .unwrap();

    let events = drain(&mut rx_b);
    assert!(matches!(
        &events[..],
        [ServerEvent::ReconnectNeeded { from }] if from == &PeerId::new("A")
    ));
}
