//! End-to-end tests over real WebSocket connections.
//!
//! A minimal turn-based ruleset ("countdown": take 1-3 from a shared pile,
//! whoever empties it wins) exercises the full path: upgrade → handshake →
//! engine → broadcast, plus every handshake rejection branch.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parlor::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Countdown ruleset
// =========================================================================

#[derive(Debug, Clone, Serialize)]
struct CountdownBoard {
    pile: u32,
    last: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Take {
    take: u32,
}

struct CountdownRules;

impl Ruleset for CountdownRules {
    type Board = CountdownBoard;
    type Action = Take;

    fn pacing(&self) -> Pacing {
        Pacing::TurnBased
    }

    fn fresh_board(&self) -> CountdownBoard {
        CountdownBoard {
            pile: 10,
            last: None,
        }
    }

    fn assign_roles(
        &self,
        _board: &mut CountdownBoard,
        roster: &mut Roster,
    ) -> RoleAssignment {
        let marks = ["A", "B"];
        let mut first = None;
        for (i, entry) in roster.iter_mut().enumerate() {
            entry.mark = marks.get(i).copied().unwrap_or("").to_string();
            if i == 0 {
                first = Some(entry.id.clone());
            }
        }
        let active = roster.mark_holders() >= 2;
        RoleAssignment {
            turn: first.filter(|_| active),
            active,
        }
    }

    fn validate_action(
        &self,
        board: &CountdownBoard,
        _actor: Actor<'_>,
        action: &Take,
    ) -> Result<(), String> {
        if !(1..=3).contains(&action.take) {
            return Err("take 1 to 3".into());
        }
        if action.take > board.pile {
            return Err("pile too small".into());
        }
        Ok(())
    }

    fn apply(
        &self,
        board: &mut CountdownBoard,
        actor: Actor<'_>,
        action: Take,
        _roster: &mut Roster,
    ) {
        board.pile -= action.take;
        board.last = Some(actor.mark.to_string());
    }

    fn winner(&self, board: &CountdownBoard) -> Option<String> {
        if board.pile == 0 { board.last.clone() } else { None }
    }
}

// =========================================================================
// Harness
// =========================================================================

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn start() -> String {
    let server = ParlorServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(CountdownRules)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn ws(addr: &str) -> Ws {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .unwrap();
    ws
}

async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

/// Receives the next text frame as JSON, with a timeout.
async fn recv_json(ws: &mut Ws) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("stream ended")
            .expect("read error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            _ => continue, // skip ping/pong
        }
    }
}

/// Drains frames until one of the given type arrives.
async fn recv_until(ws: &mut Ws, frame_type: &str) -> Value {
    for _ in 0..32 {
        let frame = recv_json(ws).await;
        if frame["type"] == frame_type {
            return frame;
        }
    }
    panic!("no {frame_type} frame within 32 frames");
}

/// Connects and completes the handshake, draining the first snapshot.
async fn join(addr: &str, id: &str) -> Ws {
    let mut ws = ws(addr).await;
    send_json(&mut ws, json!({"type": "init", "playerId": id, "name": id})).await;
    recv_until(&mut ws, "gameState").await;
    ws
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_handshake_broadcasts_state_and_join_notice() {
    let addr = start().await;
    let mut p1 = ws(&addr).await;

    send_json(&mut p1, json!({"type": "init", "playerId": "p1", "name": "Alice"})).await;

    let state = recv_until(&mut p1, "gameState").await;
    assert_eq!(state["pile"], 10);
    assert_eq!(state["players"][0]["id"], "p1");
    assert_eq!(state["players"][0]["name"], "Alice");

    let notice = recv_until(&mut p1, "playerJoinedOrLeave").await;
    assert_eq!(notice["totalPlayers"], 1);
    assert!(notice["message"][0]
        .as_str()
        .unwrap()
        .contains("joined the game"));
}

#[tokio::test]
async fn test_missing_name_gets_a_placeholder() {
    let addr = start().await;
    let mut p1 = ws(&addr).await;

    send_json(&mut p1, json!({"type": "init", "playerId": "longident"})).await;

    let state = recv_until(&mut p1, "gameState").await;
    assert_eq!(state["players"][0]["name"], "anon-long");
}

#[tokio::test]
async fn test_malformed_handshake_rejected_with_error_frame() {
    let addr = start().await;
    let mut p1 = ws(&addr).await;

    p1.send(Message::Text("this is not json".into())).await.unwrap();

    let frame = recv_json(&mut p1).await;
    assert_eq!(frame["type"], "error");
    assert!(frame["message"].as_str().unwrap().contains("initialization"));
}

#[tokio::test]
async fn test_non_init_first_frame_rejected() {
    let addr = start().await;
    let mut p1 = ws(&addr).await;

    send_json(&mut p1, json!({"type": "reset"})).await;

    let frame = recv_json(&mut p1).await;
    assert_eq!(frame["type"], "error");
}

#[tokio::test]
async fn test_empty_player_id_rejected() {
    let addr = start().await;
    let mut p1 = ws(&addr).await;

    send_json(&mut p1, json!({"type": "init", "playerId": ""})).await;

    let frame = recv_json(&mut p1).await;
    assert_eq!(frame["type"], "error");
    assert!(frame["message"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_duplicate_id_rejected_and_existing_session_kept() {
    let addr = start().await;
    let mut p1 = join(&addr, "p1").await;

    // Same identifier on a fresh connection: only the intruder is closed.
    let mut dup = ws(&addr).await;
    send_json(&mut dup, json!({"type": "init", "playerId": "p1"})).await;
    let frame = recv_json(&mut dup).await;
    assert_eq!(frame["type"], "error");
    assert!(frame["message"].as_str().unwrap().contains("already connected"));

    // The original session is still registered: a third player's snapshot
    // lists it, and p1 keeps receiving broadcasts.
    let mut p2 = ws(&addr).await;
    send_json(&mut p2, json!({"type": "init", "playerId": "p2"})).await;
    let state = recv_until(&mut p2, "gameState").await;
    let ids: Vec<&str> = state["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["p1", "p2"]);

    let state = recv_until(&mut p1, "gameState").await;
    assert_eq!(state["turn"], "p1");
}

// =========================================================================
// Game flow
// =========================================================================

#[tokio::test]
async fn test_action_mutates_and_broadcasts_to_everyone() {
    let addr = start().await;
    let mut p1 = join(&addr, "p1").await;
    let mut p2 = join(&addr, "p2").await;
    recv_until(&mut p1, "gameState").await; // p2's join broadcast

    send_json(&mut p1, json!({"type": "action", "take": 3})).await;

    for ws in [&mut p1, &mut p2] {
        let state = recv_until(ws, "gameState").await;
        assert_eq!(state["pile"], 7);
        assert_eq!(state["turn"], "p2");
    }
}

#[tokio::test]
async fn test_invalid_action_is_silently_dropped() {
    let addr = start().await;
    let mut p1 = join(&addr, "p1").await;
    let mut p2 = join(&addr, "p2").await;
    recv_until(&mut p1, "gameState").await;

    // take 0 fails validation no matter whose turn it is — dropped with
    // no reply. p1's following legal move shows it never landed.
    send_json(&mut p1, json!({"type": "action", "take": 0})).await;
    send_json(&mut p1, json!({"type": "action", "take": 1})).await;

    let state = recv_until(&mut p2, "gameState").await;
    assert_eq!(state["pile"], 9);
    assert_eq!(state["turn"], "p2");
}

/// Sends one move and drains the resulting broadcast from both players.
async fn play(sender: &mut Ws, other: &mut Ws, take: u32) -> Value {
    send_json(sender, json!({"type": "action", "take": take})).await;
    let state = recv_until(sender, "gameState").await;
    recv_until(other, "gameState").await;
    state
}

#[tokio::test]
async fn test_emptying_the_pile_wins_and_reset_starts_over() {
    let addr = start().await;
    let mut p1 = join(&addr, "p1").await;
    let mut p2 = join(&addr, "p2").await;
    recv_until(&mut p1, "gameState").await;

    // 10 → 7 → 4 → 1 → 0: p2 takes the last chip.
    play(&mut p1, &mut p2, 3).await;
    play(&mut p2, &mut p1, 3).await;
    play(&mut p1, &mut p2, 3).await;
    let state = play(&mut p2, &mut p1, 1).await;
    assert_eq!(state["winner"], "p2");

    // Terminal: further actions are ignored until an explicit reset.
    send_json(&mut p1, json!({"type": "action", "take": 1})).await;
    send_json(&mut p1, json!({"type": "reset"})).await;

    let state = recv_until(&mut p1, "gameState").await;
    assert_eq!(state["pile"], 10);
    assert!(state.get("winner").is_none());
    assert_eq!(state["turn"], "p1");
}

#[tokio::test]
async fn test_disconnect_notifies_remaining_players() {
    let addr = start().await;
    let mut p1 = join(&addr, "p1").await;
    let mut p2 = join(&addr, "p2").await;
    recv_until(&mut p1, "gameState").await;

    p1.send(Message::Close(None)).await.unwrap();

    let notice = recv_until(&mut p2, "playerJoinedOrLeave").await;
    // p2's own join notice may still be queued ahead of the leave notice.
    let notice = if notice["message"][0].as_str().unwrap().contains("joined") {
        recv_until(&mut p2, "playerJoinedOrLeave").await
    } else {
        notice
    };
    assert!(notice["message"][0].as_str().unwrap().contains("left the game"));
    assert_eq!(notice["totalPlayers"], 1);
}
