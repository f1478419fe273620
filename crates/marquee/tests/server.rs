//! Integration tests for the Marquee server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use marquee::prelude::*;
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = MarqueeServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    ws.send(Message::text(frame)).await.expect("should send");
}

/// Receives the next event as `(name, data)`.
async fn recv(ws: &mut ClientWs) -> (String, Value) {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("should receive within timeout")
            .expect("stream should not end")
            .expect("should not error");

        let text = match msg {
            Message::Text(text) => text.to_string(),
            Message::Binary(data) => String::from_utf8(data.to_vec()).expect("utf-8"),
            _ => continue,
        };
        let value: Value = serde_json::from_str(&text).expect("server sends JSON");
        let name = value["event"].as_str().expect("event name").to_string();
        return (name, value["data"].clone());
    }
}

/// Asserts nothing arrives for a short while.
async fn assert_silent(ws: &mut ClientWs) {
    let result = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(result.is_err(), "expected no event, got {result:?}");
}

async fn create_room(ws: &mut ClientWs, code: &str, host: &str) {
    send(
        ws,
        "createRoom",
        json!({ "roomCode": code, "hostName": host, "rounds": 3 }),
    )
    .await;
    assert_eq!(recv(ws).await, ("roomCreated".into(), json!({ "roomCode": code })));
}

/// Host creates `code`, guest joins it. Both sides have consumed their
/// lifecycle events on return.
async fn paired_room(addr: &str, code: &str) -> (ClientWs, ClientWs) {
    let mut host = connect(addr).await;
    let mut guest = connect(addr).await;

    create_room(&mut host, code, "Alice").await;
    send(
        &mut guest,
        "joinRoom",
        json!({ "roomCode": code, "guestName": "Bob" }),
    )
    .await;

    assert_eq!(
        recv(&mut host).await,
        (
            "guestJoined".into(),
            json!({ "guestName": "Bob", "roomCode": code })
        )
    );
    assert_eq!(
        recv(&mut guest).await,
        (
            "joinedSuccess".into(),
            json!({ "hostName": "Alice", "roomCode": code })
        )
    );

    (host, guest)
}

// =========================================================================
// Server lifecycle
// =========================================================================

#[tokio::test]
async fn test_server_binds_and_reports_local_addr() {
    let server = MarqueeServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    assert_eq!(addr.ip().to_string(), "127.0.0.1");
    assert_ne!(addr.port(), 0);
}

#[tokio::test]
async fn test_server_builds_from_config() {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
    };
    let server = MarqueeServer::builder().config(&config).build().await.unwrap();
    assert_ne!(server.local_addr().unwrap().port(), 0);
}

#[tokio::test]
async fn test_bind_failure_is_transport_error() {
    let err = MarqueeServer::builder()
        .bind("not an address")
        .build()
        .await
        .err()
        .expect("bind should fail");
    assert!(matches!(err, MarqueeError::Transport(_)));
}

#[tokio::test]
async fn test_run_until_stops_on_shutdown_signal() {
    let server = MarqueeServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(server.run_until(async move {
        let _ = stop_rx.await;
    }));

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("server should stop")
        .expect("task should not panic");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_silent_socket_does_not_block_other_players() {
    let addr = start_server().await;

    // Opens a TCP connection and never sends the upgrade request.
    let _silent = tokio::net::TcpStream::connect(&addr)
        .await
        .expect("tcp connect");

    let mut alice = tokio::time::timeout(Duration::from_secs(3), connect(&addr))
        .await
        .expect("a player should connect while another socket stalls");
    create_room(&mut alice, "ABCD", "Alice").await;
}

// =========================================================================
// Room lifecycle
// =========================================================================

#[tokio::test]
async fn test_create_join_disconnect_scenario() {
    let addr = start_server().await;
    let (mut host, mut guest) = paired_room(&addr, "ABCD").await;

    guest.close(None).await.unwrap();

    assert_eq!(
        recv(&mut host).await,
        ("playerDisconnected".into(), json!({ "roomCode": "ABCD" }))
    );

    // The code is free again.
    let mut carol = connect(&addr).await;
    create_room(&mut carol, "ABCD", "Carol").await;
}

#[tokio::test]
async fn test_join_unknown_room_gets_room_not_found() {
    let addr = start_server().await;
    let mut guest = connect(&addr).await;

    send(
        &mut guest,
        "joinRoom",
        json!({ "roomCode": "NOPE", "guestName": "Bob" }),
    )
    .await;
    assert_eq!(
        recv(&mut guest).await,
        ("roomNotFound".into(), json!({ "roomCode": "NOPE" }))
    );
}

#[tokio::test]
async fn test_third_player_gets_room_full() {
    let addr = start_server().await;
    let (mut host, mut guest) = paired_room(&addr, "ABCD").await;
    let mut carol = connect(&addr).await;

    send(
        &mut carol,
        "joinRoom",
        json!({ "roomCode": "ABCD", "guestName": "Carol" }),
    )
    .await;
    assert_eq!(
        recv(&mut carol).await,
        ("roomFull".into(), json!({ "roomCode": "ABCD" }))
    );

    // The pair is not told about the refused join.
    assert_silent(&mut host).await;
    assert_silent(&mut guest).await;
}

#[tokio::test]
async fn test_taken_code_gets_room_full() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut carol = connect(&addr).await;
    create_room(&mut alice, "ABCD", "Alice").await;

    send(
        &mut carol,
        "createRoom",
        json!({ "roomCode": "ABCD", "hostName": "Carol" }),
    )
    .await;
    assert_eq!(
        recv(&mut carol).await,
        ("roomFull".into(), json!({ "roomCode": "ABCD" }))
    );
}

#[tokio::test]
async fn test_leave_room_notifies_both_and_frees_code() {
    let addr = start_server().await;
    let (mut host, mut guest) = paired_room(&addr, "ABCD").await;

    send(&mut host, "leaveRoom", json!({ "roomCode": "ABCD" })).await;

    let notice = ("playerDisconnected".to_string(), json!({ "roomCode": "ABCD" }));
    assert_eq!(recv(&mut host).await, notice);
    assert_eq!(recv(&mut guest).await, notice);

    // Both connections are unbound, so either can host again.
    create_room(&mut guest, "ABCD", "Bob").await;
}

#[tokio::test]
async fn test_leave_unknown_room_is_silent() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;

    send(&mut alice, "leaveRoom", json!({ "roomCode": "NOPE" })).await;
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_rejoin_host_moves_host_seat() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    create_room(&mut alice, "ABCD", "Alice").await;

    let mut alice_again = connect(&addr).await;
    send(
        &mut alice_again,
        "rejoinHost",
        json!({ "roomCode": "ABCD", "hostName": "Alice" }),
    )
    .await;
    assert_eq!(
        recv(&mut alice_again).await,
        ("roomCreated".into(), json!({ "roomCode": "ABCD" }))
    );

    // The new connection is the host now: it hears about the guest.
    let mut bob = connect(&addr).await;
    send(
        &mut bob,
        "joinRoom",
        json!({ "roomCode": "ABCD", "guestName": "Bob" }),
    )
    .await;
    assert_eq!(recv(&mut alice_again).await.0, "guestJoined");
    assert_eq!(recv(&mut bob).await.0, "joinedSuccess");

    // The stale connection going away does not close the room.
    alice.close(None).await.unwrap();
    assert_silent(&mut bob).await;
    assert_silent(&mut alice_again).await;
}

#[tokio::test]
async fn test_rejoin_unknown_room_is_silent() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;

    send(
        &mut alice,
        "rejoinHost",
        json!({ "roomCode": "NOPE", "hostName": "Alice" }),
    )
    .await;
    assert_silent(&mut alice).await;
}

// =========================================================================
// Relay
// =========================================================================

#[tokio::test]
async fn test_letter_guess_reaches_only_the_other_player() {
    let addr = start_server().await;
    let (mut host, mut guest) = paired_room(&addr, "ABCD").await;

    send(
        &mut guest,
        "letterGuess",
        json!({ "roomCode": "ABCD", "letter": "E", "isCorrect": true, "sender": "Bob" }),
    )
    .await;

    assert_eq!(
        recv(&mut host).await,
        (
            "letterAttempt".into(),
            json!({ "letter": "E", "guesser": "Bob" })
        )
    );
    assert_silent(&mut guest).await;
}

#[tokio::test]
async fn test_movie_set_and_round_result_are_relayed_verbatim() {
    let addr = start_server().await;
    let (mut host, mut guest) = paired_room(&addr, "ABCD").await;

    let movie = json!({ "roomCode": "ABCD", "movie": "Alien", "setterName": "Alice" });
    send(&mut host, "movieSet", movie.clone()).await;
    assert_eq!(recv(&mut guest).await, ("movieSet".into(), movie));

    let result = json!({ "roomCode": "ABCD", "winner": "Bob", "score": [1, 0] });
    send(&mut guest, "roundResult", result.clone()).await;
    assert_eq!(recv(&mut host).await, ("roundResult".into(), result));

    assert_silent(&mut host).await;
    assert_silent(&mut guest).await;
}

#[tokio::test]
async fn test_start_round_reaches_both_players() {
    let addr = start_server().await;
    let (mut host, mut guest) = paired_room(&addr, "ABCD").await;

    let round = json!({ "roomCode": "ABCD", "round": 2 });
    send(&mut host, "startRound", round.clone()).await;

    assert_eq!(recv(&mut host).await, ("startRound".into(), round.clone()));
    assert_eq!(recv(&mut guest).await, ("startRound".into(), round));
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let addr = start_server().await;
    let (mut host_a, mut guest_a) = paired_room(&addr, "AAAA").await;
    let (mut host_b, mut guest_b) = paired_room(&addr, "BBBB").await;

    send(
        &mut host_a,
        "startRound",
        json!({ "roomCode": "AAAA", "round": 1 }),
    )
    .await;
    assert_eq!(recv(&mut host_a).await.0, "startRound");
    assert_eq!(recv(&mut guest_a).await.0, "startRound");

    assert_silent(&mut host_b).await;
    assert_silent(&mut guest_b).await;
}

#[tokio::test]
async fn test_relay_to_unknown_room_is_dropped() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;

    send(&mut alice, "startRound", json!({ "roomCode": "NOPE" })).await;
    assert_silent(&mut alice).await;
}

// =========================================================================
// Malformed input
// =========================================================================

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;

    alice.send(Message::text("not json")).await.unwrap();
    alice
        .send(Message::Binary(vec![0xff, 0x00, 0x13].into()))
        .await
        .unwrap();
    send(&mut alice, "dance", json!({ "roomCode": "ABCD" })).await;
    send(&mut alice, "createRoom", json!({ "hostName": "Alice" })).await;
    assert_silent(&mut alice).await;

    // The connection is still usable.
    create_room(&mut alice, "ABCD", "Alice").await;
}
