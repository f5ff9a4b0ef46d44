//! The per-player session record.

use std::time::Instant;

use parlor_protocol::{PlayerEntry, PlayerId};

/// One connected player.
///
/// Generic over the connection's write half `C` so the registry and engine
/// can be tested with an in-memory connection; in production `C` is
/// [`WsSender`](parlor_transport::WsSender). The connection handle lives
/// and dies with the session — dropping the session drops the server's
/// last write handle to that player.
#[derive(Debug, Clone)]
pub struct Session<C> {
    pub id: PlayerId,
    pub name: String,
    /// Role assigned by the ruleset ("X", "O", ...). Empty means no role:
    /// a spectator, or a game where roles don't apply.
    pub mark: String,
    pub score: u32,
    /// When this session last showed signs of life.
    pub last_seen: Instant,
    conn: C,
}

impl<C> Session<C> {
    pub fn new(id: PlayerId, name: String, conn: C) -> Self {
        Self {
            id,
            name,
            mark: String::new(),
            score: 0,
            last_seen: Instant::now(),
            conn,
        }
    }

    pub fn conn(&self) -> &C {
        &self.conn
    }

    /// Records activity on this session.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if this session holds a role.
    pub fn has_mark(&self) -> bool {
        !self.mark.is_empty()
    }

    /// The wire-format summary of this player for snapshot frames.
    pub fn entry(&self) -> PlayerEntry {
        PlayerEntry {
            id: self.id.clone(),
            name: self.name.clone(),
            mark: self.mark.clone(),
            score: self.score,
        }
    }
}
