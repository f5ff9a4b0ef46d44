/// Errors that can occur in the transport layer.
///
/// All of these are treated identically by the layers above — the
/// connection is considered dead and the session is reaped — but keeping
/// the variants distinct makes the logs say why.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a frame failed (includes oversized inbound frames).
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The write deadline elapsed before the frame was flushed.
    #[error("write deadline elapsed")]
    WriteDeadline,

    /// No data or pong arrived within the read deadline.
    #[error("read deadline elapsed")]
    ReadDeadline,
}
