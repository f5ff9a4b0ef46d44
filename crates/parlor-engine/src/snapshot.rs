//! The authoritative game snapshot.

use parlor_protocol::PlayerId;

/// The single process-wide game state: the ruleset's board plus the
/// engine's flow bookkeeping.
///
/// Created once at startup, mutated in place under the engine lock, and
/// replaced wholesale by a reset. The invariants the engine maintains:
///
/// - `turn`, when set, names a connected session holding a non-empty mark;
/// - `winner`, once set, survives every mutation except an explicit reset
///   or the role-holder count dropping below two;
/// - `active` is false whenever `winner` is set or fewer than two
///   role-holders are connected (turn-based pacing).
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<B> {
    pub board: B,
    /// Identifier of the session whose action is currently valid.
    pub turn: Option<PlayerId>,
    /// The terminal marker.
    pub winner: Option<PlayerId>,
    pub active: bool,
}

impl<B> Snapshot<B> {
    pub fn new(board: B) -> Self {
        Self {
            board,
            turn: None,
            winner: None,
            active: false,
        }
    }
}
