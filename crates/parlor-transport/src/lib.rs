//! WebSocket transport layer for Parlor.
//!
//! Wraps `tokio-tungstenite` with the deadline discipline the rest of the
//! stack relies on:
//!
//! - every outbound write is bounded by [`WRITE_DEADLINE`], so a stalled
//!   peer can never wedge a broadcast;
//! - the read side enforces a sliding [`READ_DEADLINE`] — any inbound frame
//!   (data, ping, or pong) extends it, so a silent-but-alive peer that only
//!   answers pings stays connected;
//! - inbound frames are capped at
//!   [`MAX_FRAME_BYTES`](parlor_protocol::MAX_FRAME_BYTES).
//!
//! A connection is handed out as two halves: a cloneable [`WsSender`]
//! (stored with the session, usable from the broadcast path) and a
//! [`WsReceiver`] (owned by the connection's read loop).

#![allow(async_fn_in_trait)]

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{WsListener, WsReceiver, WsSender};

use std::fmt;
use std::time::Duration;

/// The write half of a full-duplex connection, as the upper layers see it.
///
/// The engine and session registry are generic over this trait so they can
/// be exercised with an in-memory recorder in tests; [`WsSender`] is the
/// production implementation.
pub trait Connection: Send + Sync + Clone + 'static {
    /// Sends one text frame, bounded by [`WRITE_DEADLINE`].
    async fn send_text(&self, text: &str) -> Result<(), TransportError>;

    /// Sends a ping control frame, bounded by [`PING_DEADLINE`].
    async fn send_ping(&self) -> Result<(), TransportError>;

    /// Closes the connection. Best-effort.
    async fn close(&self) -> Result<(), TransportError>;

    /// The unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// How long an idle connection is tolerated before it is reaped.
/// Pongs and data frames both slide this window.
pub const READ_DEADLINE: Duration = Duration::from_secs(60);

/// Per-recipient bound on a broadcast write.
pub const WRITE_DEADLINE: Duration = Duration::from_secs(10);

/// Bound on sending a ping control frame.
pub const PING_DEADLINE: Duration = Duration::from_secs(10);

/// Opaque identifier for a connection, for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
