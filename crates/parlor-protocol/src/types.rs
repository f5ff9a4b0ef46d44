//! Core protocol types for Parlor's wire format.
//!
//! Every message is a single newline-free JSON text frame with a mandatory
//! `"type"` discriminator. Client frames are small (capped at
//! [`MAX_FRAME_BYTES`]); server frames carry the full game snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum size in bytes accepted for an inbound frame.
///
/// Anything a client legitimately sends (handshake, move, direction change,
/// a short curve volley) fits comfortably; oversized frames are a protocol
/// violation and terminate the connection at the transport layer.
pub const MAX_FRAME_BYTES: usize = 512;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a player, supplied by the client at handshake.
///
/// Newtype over `String` so a player id can't be confused with a display
/// name or a mark. `#[serde(transparent)]` keeps the JSON representation a
/// plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Client → server frames
// ---------------------------------------------------------------------------

/// The raw fields of an `action` frame, minus the `"type"` discriminator.
///
/// The core does not interpret these — they are captured as-is and handed
/// to the active ruleset, which decodes them into its own action type via
/// [`decode_action`](crate::decode_action).
pub type ActionPayload = serde_json::Map<String, serde_json::Value>;

/// Messages consumed by the core.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, so a handshake
/// looks like `{"type":"init","playerId":"p1","name":"Alice"}` — the shape
/// browser clients already send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Handshake. Accepted only as the first frame on a connection.
    Init {
        player_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// A domain action: a move, a direction change, a curve volley.
    /// Remaining fields are opaque to the core.
    Action {
        #[serde(flatten)]
        payload: ActionPayload,
    },

    /// Request to reinitialize the snapshot.
    Reset,
}

// ---------------------------------------------------------------------------
// Server → client frames
// ---------------------------------------------------------------------------

/// One player's entry in the `players` array of a snapshot frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub id: PlayerId,
    pub name: String,
    /// Assigned role ("X", "O", ...); empty for spectators and for games
    /// without roles.
    pub mark: String,
    pub score: u32,
}

/// The authoritative snapshot, sent to every session after each accepted
/// mutation.
///
/// The board type `B` is flattened into the frame, so a gomoku snapshot
/// serializes as `{"type":"gameState","board":[[...]],"players":[...],...}`
/// while a snake snapshot contributes `entities` and `foods` fields instead.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename = "gameState", rename_all = "camelCase")]
pub struct SnapshotFrame<B: Serialize> {
    #[serde(flatten)]
    pub board: B,
    pub players: Vec<PlayerEntry>,
    /// Identifier of the session whose action is currently valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<PlayerId>,
}

/// Out-of-band notices: join/leave announcements and handshake rejections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Notice {
    /// Sent to all sessions when somebody joins or leaves.
    PlayerJoinedOrLeave {
        message: Vec<String>,
        total_players: usize,
    },

    /// Sent once on handshake rejection, then the connection closes.
    Error { message: String },
}

// =========================================================================
// Tests
// =========================================================================
