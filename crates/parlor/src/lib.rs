//! # Parlor
//!
//! Live-state backend for small browser games: a registry of connected
//! sessions, one authoritative game snapshot, and a broadcast-on-mutation
//! protocol over persistent WebSocket connections.
//!
//! Game developers implement a single [`Ruleset`](parlor_engine::Ruleset)
//! and the framework handles the handshake, session lifecycle, liveness
//! pings, lock discipline, and snapshot fan-out.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use parlor::prelude::*;
//!
//! // Implement Ruleset for your game, then:
//! // let server = ParlorServerBuilder::new()
//! //     .bind("0.0.0.0:8080")
//! //     .build(MyRules)
//! //     .await?;
//! // server.run().await
//! ```

mod error;
mod gateway;
mod liveness;
mod server;

pub use error::ParlorError;
pub use liveness::PING_INTERVAL;
pub use server::{ParlorServer, ParlorServerBuilder};

pub mod prelude {
    pub use crate::{ParlorError, ParlorServer, ParlorServerBuilder};
    pub use parlor_engine::{
        Actor, GameServer, Pacing, RoleAssignment, Roster, Ruleset, Snapshot,
    };
    pub use parlor_protocol::{
        ClientFrame, Notice, PlayerEntry, PlayerId, SnapshotFrame,
    };
    pub use parlor_session::{Session, SessionError};
}
