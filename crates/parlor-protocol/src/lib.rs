//! Wire protocol for Parlor.
//!
//! This crate defines the "language" that game clients and the server speak:
//!
//! - **Types** ([`ClientFrame`], [`SnapshotFrame`], [`Notice`], [`PlayerId`]) —
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from text frames.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer sits between transport (raw WebSocket frames) and the
//! engine (sessions and game state). It doesn't know about connections or
//! rulesets — it only knows how to serialize and deserialize messages.

mod codec;
mod error;
mod types;

pub use codec::{decode_action, Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ActionPayload, ClientFrame, Notice, PlayerEntry, PlayerId, SnapshotFrame,
    MAX_FRAME_BYTES,
};
