//! Error types for the session layer.

use parlor_protocol::PlayerId;

/// Errors that can occur in the session registry.
///
/// Removal has no error: removing an absent session is a no-op — see
/// [`SessionRegistry::remove`](crate::SessionRegistry::remove).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The player id is already present in the registry. The existing
    /// session is left untouched; only the new connection is rejected.
    #[error("player {0} already connected")]
    AlreadyConnected(PlayerId),
}
