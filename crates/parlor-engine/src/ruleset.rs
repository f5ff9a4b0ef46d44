//! The `Ruleset` trait — the extension point for game rules.
//!
//! One implementation exists per game. The engine calls these methods at
//! the right time, always under its lock; a ruleset just writes game rules
//! against plain data and never sees connections, locks, or tasks.

use std::time::Duration;

use parlor_protocol::{PlayerEntry, PlayerId};
use serde::{de::DeserializeOwned, Serialize};

/// How actions are gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Actions are valid only for the session holding the turn pointer,
    /// which the engine rotates after each accepted action.
    TurnBased,
    /// Actions are valid from any session while the game is active; the
    /// turn pointer is never set.
    Continuous,
}

/// The ruleset's proposal after a role recomputation.
///
/// The engine reconciles this with its own bookkeeping: a proposed turn is
/// only adopted when no connected role-holder already owns the turn, and a
/// set terminal marker always overrides `active`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleAssignment {
    /// The session that should act first in a fresh match, if any.
    pub turn: Option<PlayerId>,
    /// Whether enough role-holders are present for play.
    pub active: bool,
}

/// The acting session, as the ruleset sees it.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub id: &'a PlayerId,
    pub mark: &'a str,
}

/// A mutable, connection-free view of the connected sessions, in join
/// order.
///
/// Rulesets assign marks and award scores through this view; the engine
/// copies the result back onto the real sessions afterwards. Membership is
/// the engine's business — rulesets never add or remove entries.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<PlayerEntry>,
}

impl Roster {
    pub fn new(entries: Vec<PlayerEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlayerEntry> {
        self.entries.iter_mut()
    }

    pub fn get(&self, id: &PlayerId) -> Option<&PlayerEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut PlayerEntry> {
        self.entries.iter_mut().find(|e| &e.id == id)
    }

    /// Number of entries holding a non-empty mark.
    pub fn mark_holders(&self) -> usize {
        self.entries.iter().filter(|e| !e.mark.is_empty()).count()
    }

    pub fn entries(&self) -> &[PlayerEntry] {
        &self.entries
    }

    /// Awards points, ignoring unknown ids (the scorer may have
    /// disconnected between sampling and application).
    pub fn add_score(&mut self, id: &PlayerId, delta: u32) {
        if let Some(entry) = self.get_mut(id) {
            entry.score += delta;
        }
    }
}

/// Domain rules for one game, invoked by the engine through a narrow
/// interface.
pub trait Ruleset: Send + Sync + 'static {
    /// The game-specific part of the snapshot. Flattened into every
    /// `gameState` frame, so its fields are the wire format.
    type Board: Send + Sync + Serialize + 'static;

    /// The payload of an `action` frame, decoded before validation.
    type Action: Send + Sync + DeserializeOwned + 'static;

    fn pacing(&self) -> Pacing;

    /// A board indistinguishable from process start.
    fn fresh_board(&self) -> Self::Board;

    /// Recomputes marks (and any per-player board state) across the
    /// current roster. Called on every join, leave, and reset — not just
    /// at game start.
    fn assign_roles(&self, board: &mut Self::Board, roster: &mut Roster) -> RoleAssignment;

    /// Checks whether an action is legal on the current board. The engine
    /// has already verified the terminal marker and turn/activity gates.
    ///
    /// # Errors
    /// The reason is logged and the action dropped; nothing is sent back.
    fn validate_action(
        &self,
        board: &Self::Board,
        actor: Actor<'_>,
        action: &Self::Action,
    ) -> Result<(), String>;

    /// Applies a validated action to the board. The roster is writable so
    /// rulesets whose actions score points (rather than end the game) can
    /// award them here.
    fn apply(
        &self,
        board: &mut Self::Board,
        actor: Actor<'_>,
        action: Self::Action,
        roster: &mut Roster,
    );

    /// Terminal detection: the winning mark, if the board has one.
    /// The engine resolves the mark to a session id and freezes the game.
    fn winner(&self, board: &Self::Board) -> Option<String>;

    /// One simulation step for continuous games. Default: no-op.
    fn tick(&self, _board: &mut Self::Board, _roster: &mut Roster) {}

    /// The simulation period, or `None` for event-driven games.
    fn tick_period(&self) -> Option<Duration> {
        None
    }

    /// Whether a role reassignment that tears down the current match
    /// should also clear the board. Whether a role reset implies a board
    /// reset is a per-game choice, so it lives here rather than in the
    /// engine. Default: the board survives until an explicit reset.
    fn board_reset_on_new_match(&self) -> bool {
        false
    }
}
