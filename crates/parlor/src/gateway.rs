//! Per-connection gateway: handshake and message routing.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!
//!   1. Wait (bounded by the read deadline) for a single `init` frame.
//!   2. Validate it and register the session — or send one `error` frame
//!      and close.
//!   3. Spawn the liveness monitor for the session.
//!   4. Loop: receive frames, dispatch actions and resets to the engine.
//!
//! Every exit path from the read loop funnels into `GameServer::leave`,
//! which is idempotent with the liveness monitor's own disconnect call.

use std::sync::Arc;

use parlor_engine::{GameServer, Ruleset};
use parlor_protocol::{ClientFrame, Codec, JsonCodec, Notice, PlayerId, ProtocolError};
use parlor_session::Session;
use parlor_transport::{Connection, WsReceiver, WsSender};

use crate::liveness;
use crate::ParlorError;

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<R: Ruleset>(
    engine: Arc<GameServer<R, WsSender>>,
    sender: WsSender,
    mut receiver: WsReceiver,
) {
    let conn_id = sender.id();
    tracing::debug!(%conn_id, "handling new connection");

    let player_id = match perform_handshake(&engine, &sender, &mut receiver).await {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "handshake rejected");
            let _ = sender.close().await;
            return;
        }
    };
    tracing::info!(%conn_id, player_id = %player_id, "player connected");

    tokio::spawn(liveness::monitor(
        Arc::clone(&engine),
        player_id.clone(),
        sender.clone(),
    ));

    read_loop(&engine, &player_id, &mut receiver).await;

    // Graceful close, read failure, and liveness failure all end here;
    // leave() no-ops if the liveness monitor got there first.
    engine.leave(&player_id).await;
}

/// Waits for the `init` frame, validates it, and registers the session.
///
/// On any rejection the client gets a single `error` frame; the caller
/// closes the connection. A duplicate-id rejection leaves the existing
/// session untouched — only this new connection is refused.
async fn perform_handshake<R: Ruleset>(
    engine: &Arc<GameServer<R, WsSender>>,
    sender: &WsSender,
    receiver: &mut WsReceiver,
) -> Result<PlayerId, ParlorError> {
    let codec = JsonCodec;

    // The transport's read deadline doubles as the handshake window.
    let text = match receiver.next_frame().await {
        Ok(Some(text)) => text,
        Ok(None) => {
            return Err(ProtocolError::InvalidFrame(
                "connection closed before init".into(),
            )
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    let frame: ClientFrame = match codec.decode(&text) {
        Ok(frame) => frame,
        Err(e) => {
            reject(sender, "invalid initialization message").await;
            return Err(e.into());
        }
    };

    let (raw_id, name) = match frame {
        ClientFrame::Init { player_id, name } => (player_id, name),
        _ => {
            reject(sender, "invalid initialization message").await;
            return Err(
                ProtocolError::InvalidFrame("first frame must be init".into()).into(),
            );
        }
    };

    if raw_id.is_empty() {
        reject(sender, "player id must not be empty").await;
        return Err(ProtocolError::InvalidFrame("empty player id".into()).into());
    }

    // Clients may omit the display name; derive a placeholder from the id.
    let name = name.filter(|n| !n.is_empty()).unwrap_or_else(|| {
        let prefix: String = raw_id.chars().take(4).collect();
        format!("anon-{prefix}")
    });

    let player_id = PlayerId(raw_id);
    let session = Session::new(player_id.clone(), name, sender.clone());
    if let Err(e) = engine.join(session).await {
        reject(sender, "player id already connected").await;
        return Err(e.into());
    }

    Ok(player_id)
}

/// Sends a one-shot `error` frame. Best-effort: the peer may be gone.
async fn reject(sender: &WsSender, message: &str) {
    let codec = JsonCodec;
    if let Ok(payload) = codec.encode(&Notice::Error {
        message: message.to_string(),
    }) {
        let _ = sender.send_text(&payload).await;
    }
}

/// Receives frames until the connection dies, dispatching them to the
/// engine. Undecodable frames are logged and skipped — the connection
/// survives; only transport failures end the loop.
async fn read_loop<R: Ruleset>(
    engine: &Arc<GameServer<R, WsSender>>,
    player_id: &PlayerId,
    receiver: &mut WsReceiver,
) {
    let codec = JsonCodec;
    loop {
        let text = match receiver.next_frame().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                return;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "read failed");
                return;
            }
        };

        let frame: ClientFrame = match codec.decode(&text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "undecodable frame, skipping");
                continue;
            }
        };

        match frame {
            ClientFrame::Action { payload } => engine.action(player_id, payload).await,
            ClientFrame::Reset => engine.reset().await,
            ClientFrame::Init { .. } => {
                tracing::debug!(%player_id, "init after handshake, ignoring");
            }
        }
    }
}
