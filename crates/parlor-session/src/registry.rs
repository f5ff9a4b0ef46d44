//! The session registry: authoritative map of connected players.

use std::collections::HashMap;

use parlor_protocol::{PlayerEntry, PlayerId};

use crate::{Session, SessionError};

/// All connected sessions, keyed by player id.
///
/// Alongside the map, the registry tracks join order. Everything that
/// iterates sessions — role assignment, turn rotation, broadcast fan-out —
/// walks that order, so the outcome of "pick the first role-holder" is the
/// same on every call. A plain `HashMap` walk would make turn handoffs
/// depend on hasher state.
pub struct SessionRegistry<C> {
    sessions: HashMap<PlayerId, Session<C>>,
    order: Vec<PlayerId>,
}

impl<C> SessionRegistry<C> {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Adds a session.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the id is taken. The
    /// existing session is untouched.
    pub fn insert(&mut self, session: Session<C>) -> Result<(), SessionError> {
        if self.sessions.contains_key(&session.id) {
            return Err(SessionError::AlreadyConnected(session.id.clone()));
        }
        self.order.push(session.id.clone());
        tracing::info!(player_id = %session.id, total = self.order.len(), "session registered");
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    /// Removes and returns a session.
    ///
    /// Idempotent: a second call for the same id returns `None` and changes
    /// nothing, which is what makes the disconnect path safe to enter from
    /// the read loop and the liveness monitor concurrently.
    pub fn remove(&mut self, id: &PlayerId) -> Option<Session<C>> {
        let session = self.sessions.remove(id)?;
        self.order.retain(|other| other != id);
        tracing::info!(player_id = %id, total = self.order.len(), "session removed");
        Some(session)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Session<C>> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Session<C>> {
        self.sessions.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Player ids in join order.
    pub fn ids(&self) -> Vec<PlayerId> {
        self.order.clone()
    }

    /// Sessions in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Session<C>> {
        self.order.iter().filter_map(|id| self.sessions.get(id))
    }

    /// Number of sessions currently holding a role.
    pub fn mark_holders(&self) -> usize {
        self.iter().filter(|s| s.has_mark()).count()
    }

    /// Clears every session's mark. Role assignment starts from here.
    pub fn clear_marks(&mut self) {
        for session in self.sessions.values_mut() {
            session.mark.clear();
        }
    }

    /// Assigns a mark, ignoring unknown ids.
    pub fn set_mark(&mut self, id: &PlayerId, mark: &str) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.mark = mark.to_string();
        }
    }

    /// Adds to a player's score, ignoring unknown ids.
    pub fn add_score(&mut self, id: &PlayerId, delta: u32) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.score += delta;
        }
    }

    /// The wire-format player list, in join order.
    pub fn entries(&self) -> Vec<PlayerEntry> {
        self.iter().map(Session::entry).collect()
    }
}

impl<C> Default for SessionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
