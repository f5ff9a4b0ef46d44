//! Connected-player sessions for Parlor.
//!
//! A session is the server-side record of one connected player: identity,
//! display name, the role the ruleset assigned, a running score, and the
//! connection's write half. The [`SessionRegistry`] is the single source of
//! truth for "who is connected" — a player id is present exactly while
//! that player's connection is alive.
//!
//! The registry itself is not thread-safe; it is owned by the engine and
//! only ever touched under the engine's single lock.

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::Session;
