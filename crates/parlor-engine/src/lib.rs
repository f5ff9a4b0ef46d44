//! The state-mutation and broadcast engine for Parlor.
//!
//! Every Parlor game process owns exactly one [`GameServer`]: a registry of
//! connected sessions plus a single authoritative [`Snapshot`], guarded by
//! one lock. All mutating operations — join, action, leave, reset, tick —
//! pass through that lock, so every client observes one totally ordered
//! sequence of snapshots and never a state split across two mutations.
//!
//! Domain rules live behind the [`Ruleset`] trait. The engine owns the
//! generic bookkeeping (turn pointer, terminal marker, activity flag, role
//! recomputation on every roster change); a ruleset owns the board, action
//! validation, effect application, and terminal detection.

mod ruleset;
mod server;
mod snapshot;

pub use ruleset::{Actor, Pacing, RoleAssignment, Roster, Ruleset};
pub use server::GameServer;
pub use snapshot::Snapshot;
