//! `GameServer`: the single owner of all shared mutable state.
//!
//! One lock guards the session registry and the snapshot together; there
//! is no finer-grained locking. Every operation here is a bounded critical
//! section — acquire, re-validate preconditions, mutate, broadcast,
//! release — and the guard's RAII release covers every exit path.
//!
//! Mutation broadcasts run inside the lock: each write is bounded by the
//! transport's write deadline and failures are logged without retry, so
//! the critical section stays bounded and clients observe one totally
//! ordered sequence of snapshots. [`tick`] is the exception — it
//! serializes under the lock but fans out after release; see the method
//! docs.
//!
//! A write failure never disconnects the recipient from inside the
//! broadcast loop — the dead connection is reaped by its own read loop or
//! liveness monitor. This keeps the disconnect path out of the lock
//! holder's stack.
//!
//! [`tick`]: GameServer::tick

use parlor_protocol::{
    decode_action, ActionPayload, Codec, JsonCodec, Notice, PlayerId, SnapshotFrame,
};
use parlor_session::{Session, SessionError, SessionRegistry};
use parlor_transport::Connection;
use tokio::sync::Mutex;

use crate::{Actor, Pacing, RoleAssignment, Roster, Ruleset, Snapshot};

struct Shared<B, C> {
    registry: SessionRegistry<C>,
    snapshot: Snapshot<B>,
}

/// The authoritative state owner for one game process.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct GameServer<R: Ruleset, C: Connection> {
    rules: R,
    codec: JsonCodec,
    shared: Mutex<Shared<R::Board, C>>,
}

impl<R: Ruleset, C: Connection> GameServer<R, C> {
    pub fn new(rules: R) -> Self {
        let snapshot = Snapshot::new(rules.fresh_board());
        Self {
            rules,
            codec: JsonCodec,
            shared: Mutex::new(Shared {
                registry: SessionRegistry::new(),
                snapshot,
            }),
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Registers a session, recomputes roles, and broadcasts.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the id is taken; the existing
    /// session is left untouched and nothing is broadcast.
    pub async fn join(&self, session: Session<C>) -> Result<(), SessionError> {
        let mut shared = self.shared.lock().await;

        let id = session.id.clone();
        let name = session.name.clone();
        shared.registry.insert(session)?;

        self.recompute_roles(&mut shared);
        self.broadcast_snapshot(&shared).await;
        self.notify(&shared, format!("{name} ({id}) joined the game."), None)
            .await;
        Ok(())
    }

    /// Applies a domain action from `actor`.
    ///
    /// Rejections (unknown actor, undecodable or invalid payload, terminal
    /// game, wrong turn, inactive game) are logged and dropped: no state
    /// change, no broadcast, nothing sent back. The client corrects and
    /// resends.
    pub async fn action(&self, actor: &PlayerId, payload: ActionPayload) {
        let mut shared = self.shared.lock().await;

        // The actor may have been reaped by its liveness monitor while
        // this call waited for the lock.
        let Some(session) = shared.registry.get_mut(actor) else {
            tracing::debug!(player_id = %actor, "action from unknown session, ignoring");
            return;
        };
        session.touch();
        let mark = session.mark.clone();

        let action: R::Action = match decode_action(payload) {
            Ok(action) => action,
            Err(e) => {
                tracing::debug!(player_id = %actor, error = %e, "undecodable action");
                return;
            }
        };

        if shared.snapshot.winner.is_some() {
            tracing::debug!(player_id = %actor, "action ignored: game already won");
            return;
        }
        match self.rules.pacing() {
            Pacing::TurnBased => {
                if shared.snapshot.turn.as_ref() != Some(actor) {
                    tracing::debug!(
                        player_id = %actor,
                        turn = ?shared.snapshot.turn,
                        "action ignored: not their turn"
                    );
                    return;
                }
            }
            Pacing::Continuous => {
                if !shared.snapshot.active {
                    tracing::debug!(player_id = %actor, "action ignored: game not active");
                    return;
                }
            }
        }

        let acting = Actor { id: actor, mark: &mark };
        if let Err(reason) =
            self.rules.validate_action(&shared.snapshot.board, acting, &action)
        {
            tracing::debug!(player_id = %actor, %reason, "action rejected");
            return;
        }

        let mut roster = Roster::new(shared.registry.entries());
        self.rules
            .apply(&mut shared.snapshot.board, acting, action, &mut roster);
        sync_roster(&mut shared.registry, &roster);

        if let Some(winning_mark) = self.rules.winner(&shared.snapshot.board) {
            let winner = shared
                .registry
                .iter()
                .find(|s| s.mark == winning_mark)
                .map(|s| s.id.clone())
                .unwrap_or_else(|| actor.clone());
            tracing::info!(player_id = %winner, "game won");
            shared.snapshot.winner = Some(winner);
            shared.snapshot.active = false;
        } else if self.rules.pacing() == Pacing::TurnBased {
            self.rotate_turn(&mut shared);
        }

        self.broadcast_snapshot(&shared).await;
    }

    /// Removes a session, recomputes roles and turn, and broadcasts.
    ///
    /// Idempotent and safe to invoke concurrently from the read loop, the
    /// liveness monitor, or both: the existence check under the lock turns
    /// the second invocation into a no-op.
    pub async fn leave(&self, id: &PlayerId) {
        let mut shared = self.shared.lock().await;

        let Some(session) = shared.registry.remove(id) else {
            tracing::debug!(player_id = %id, "already disconnected");
            return;
        };
        let name = session.name.clone();
        if let Err(e) = session.conn().close().await {
            tracing::debug!(player_id = %id, error = %e, "close failed (peer likely gone)");
        }

        self.recompute_roles(&mut shared);
        self.broadcast_snapshot(&shared).await;
        // The departing session never receives its own "left" notice; it
        // is already out of the registry, and the exclusion also covers a
        // hypothetical reconnect racing this broadcast.
        self.notify(&shared, format!("{name} ({id}) left the game."), Some(id))
            .await;
    }

    /// Reinitializes the snapshot and re-runs role assignment over the
    /// currently connected sessions.
    pub async fn reset(&self) {
        let mut shared = self.shared.lock().await;

        tracing::info!("resetting game state");
        shared.snapshot = Snapshot::new(self.rules.fresh_board());
        self.recompute_roles(&mut shared);
        self.broadcast_snapshot(&shared).await;
    }

    /// One simulation step for continuous games.
    ///
    /// The ruleset's tick runs under the lock, so no entity observes a
    /// partially updated batch; the snapshot is then serialized, the lock
    /// released, and the fan-out happens outside it.
    pub async fn tick(&self) {
        let outbound = {
            let mut shared = self.shared.lock().await;
            if shared.registry.is_empty() {
                return;
            }

            let mut roster = Roster::new(shared.registry.entries());
            self.rules.tick(&mut shared.snapshot.board, &mut roster);
            sync_roster(&mut shared.registry, &roster);

            match self.encode_snapshot(&shared) {
                Some(payload) => {
                    let recipients: Vec<(PlayerId, C)> = shared
                        .registry
                        .iter()
                        .map(|s| (s.id.clone(), s.conn().clone()))
                        .collect();
                    Some((payload, recipients))
                }
                None => None,
            }
        };

        if let Some((payload, recipients)) = outbound {
            for (id, conn) in recipients {
                if let Err(e) = conn.send_text(&payload).await {
                    tracing::warn!(player_id = %id, error = %e, "tick broadcast failed");
                }
            }
        }
    }

    /// Whether a session is currently registered. Used by liveness
    /// monitors to decide when to stop.
    pub async fn is_connected(&self, id: &PlayerId) -> bool {
        self.shared.lock().await.registry.contains(id)
    }

    pub async fn player_count(&self) -> usize {
        self.shared.lock().await.registry.len()
    }

    /// A copy of the current snapshot, for tests and diagnostics.
    pub async fn snapshot(&self) -> Snapshot<R::Board>
    where
        R::Board: Clone,
    {
        self.shared.lock().await.snapshot.clone()
    }

    // -- internals --------------------------------------------------------

    /// Re-runs role assignment and reconciles the engine's flow
    /// bookkeeping with the ruleset's proposal.
    fn recompute_roles(&self, shared: &mut Shared<R::Board, C>) {
        let mut roster = Roster::new(shared.registry.entries());
        let proposal = self.rules.assign_roles(&mut shared.snapshot.board, &mut roster);
        sync_roster(&mut shared.registry, &roster);
        self.reconcile_flow(shared, proposal);
    }

    fn reconcile_flow(&self, shared: &mut Shared<R::Board, C>, proposal: RoleAssignment) {
        match self.rules.pacing() {
            Pacing::Continuous => {
                shared.snapshot.turn = None;
                shared.snapshot.active =
                    proposal.active && !shared.registry.is_empty();
            }
            Pacing::TurnBased => {
                if shared.registry.mark_holders() < 2 {
                    // Below two role-holders the game returns to idle,
                    // terminal or not.
                    shared.snapshot.turn = None;
                    shared.snapshot.winner = None;
                    shared.snapshot.active = false;
                    if self.rules.board_reset_on_new_match() {
                        shared.snapshot.board = self.rules.fresh_board();
                    }
                } else if shared.snapshot.winner.is_some() {
                    // A join never clears a set terminal marker.
                    shared.snapshot.turn = None;
                    shared.snapshot.active = false;
                } else {
                    let keep = shared
                        .snapshot
                        .turn
                        .as_ref()
                        .and_then(|id| shared.registry.get(id))
                        .is_some_and(|s| s.has_mark());
                    if !keep {
                        let fallback = shared
                            .registry
                            .iter()
                            .find(|s| s.has_mark())
                            .map(|s| s.id.clone());
                        shared.snapshot.turn = proposal
                            .turn
                            .filter(|id| {
                                shared.registry.get(id).is_some_and(|s| s.has_mark())
                            })
                            .or(fallback);
                    }
                    shared.snapshot.active = shared.snapshot.turn.is_some();
                }
            }
        }
    }

    /// The turn-rotation step after an accepted non-terminal action: the
    /// first connected role-holder, in join order, other than the current
    /// holder. No candidate clears the turn and deactivates the game.
    fn rotate_turn(&self, shared: &mut Shared<R::Board, C>) {
        let current = shared.snapshot.turn.clone();
        let next = shared
            .registry
            .iter()
            .find(|s| s.has_mark() && Some(&s.id) != current.as_ref())
            .map(|s| s.id.clone());
        match next {
            Some(id) => shared.snapshot.turn = Some(id),
            None => {
                shared.snapshot.turn = None;
                shared.snapshot.active = false;
            }
        }
    }

    fn encode_snapshot(&self, shared: &Shared<R::Board, C>) -> Option<String> {
        let frame = SnapshotFrame {
            board: &shared.snapshot.board,
            players: shared.registry.entries(),
            turn: shared.snapshot.turn.clone(),
            winner: shared.snapshot.winner.clone(),
        };
        match self.codec.encode(&frame) {
            Ok(payload) => Some(payload),
            Err(e) => {
                // Skip this broadcast cycle; the next mutation will carry
                // the state forward.
                tracing::error!(error = %e, "snapshot serialization failed, skipping broadcast");
                None
            }
        }
    }

    /// Serializes the snapshot once, then writes it to every session.
    /// Per-recipient failures are logged and do not abort delivery to the
    /// others, and never trigger a disconnect from here.
    async fn broadcast_snapshot(&self, shared: &Shared<R::Board, C>) {
        let Some(payload) = self.encode_snapshot(shared) else {
            return;
        };
        tracing::debug!(
            turn = ?shared.snapshot.turn,
            winner = ?shared.snapshot.winner,
            players = shared.registry.len(),
            "broadcasting snapshot"
        );
        for session in shared.registry.iter() {
            if let Err(e) = session.conn().send_text(&payload).await {
                tracing::warn!(player_id = %session.id, error = %e, "snapshot delivery failed");
            }
        }
    }

    /// Fans a join/leave notice out to every session except `exclude`.
    async fn notify(
        &self,
        shared: &Shared<R::Board, C>,
        text: String,
        exclude: Option<&PlayerId>,
    ) {
        tracing::info!("{text}");
        let notice = Notice::PlayerJoinedOrLeave {
            message: vec![text],
            total_players: shared.registry.len(),
        };
        let payload = match self.codec.encode(&notice) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "notice serialization failed");
                return;
            }
        };
        for session in shared.registry.iter() {
            if Some(&session.id) == exclude {
                continue;
            }
            if let Err(e) = session.conn().send_text(&payload).await {
                tracing::warn!(player_id = %session.id, error = %e, "notice delivery failed");
            }
        }
    }
}

fn sync_roster<C>(registry: &mut SessionRegistry<C>, roster: &Roster) {
    for entry in roster.iter() {
        if let Some(session) = registry.get_mut(&entry.id) {
            session.mark = entry.mark.clone();
            session.score = entry.score;
        }
    }
}
