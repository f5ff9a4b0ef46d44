//! WebSocket listener and connection halves, via `tokio-tungstenite`.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parlor_protocol::MAX_FRAME_BYTES;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;

use crate::{
    Connection, ConnectionId, TransportError, PING_DEADLINE, READ_DEADLINE,
    WRITE_DEADLINE,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// Listens for and upgrades incoming WebSocket connections.
pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    /// Binds the listener to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket listener bound");
        Ok(Self { listener })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next connection and performs the WebSocket upgrade.
    ///
    /// The returned sender half is cheap to clone and safe to use from any
    /// task; the receiver half belongs to the connection's read loop.
    pub async fn accept(&self) -> Result<(WsSender, WsReceiver), TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let config = WebSocketConfig::default()
            .max_message_size(Some(MAX_FRAME_BYTES))
            .max_frame_size(Some(MAX_FRAME_BYTES));

        let ws = tokio_tungstenite::accept_async_with_config(stream, Some(config))
            .await
            .map_err(|e| {
                TransportError::AcceptFailed(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        let sender = WsSender {
            id,
            sink: Arc::new(Mutex::new(sink)),
        };
        let receiver = WsReceiver { id, stream };
        Ok((sender, receiver))
    }
}

/// The write half of a connection.
///
/// Cloneable: one copy lives in the session registry (for broadcasts), one
/// in the liveness monitor (for pings). All writes share a single internal
/// sink behind a mutex, and every write is deadline-bounded, so contention
/// on that mutex is itself bounded.
#[derive(Clone)]
pub struct WsSender {
    id: ConnectionId,
    sink: Arc<Mutex<SplitSink<WsStream, Message>>>,
}

impl Connection for WsSender {
    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.send_bounded(Message::Text(text.to_owned().into()), WRITE_DEADLINE)
            .await
    }

    async fn send_ping(&self) -> Result<(), TransportError> {
        self.send_bounded(Message::Ping(Vec::new().into()), PING_DEADLINE)
            .await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.send_bounded(Message::Close(None), WRITE_DEADLINE).await
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl WsSender {
    async fn send_bounded(
        &self,
        msg: Message,
        deadline: Duration,
    ) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        match tokio::time::timeout(deadline, sink.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::SendFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                e,
            ))),
            Err(_) => Err(TransportError::WriteDeadline),
        }
    }
}

/// The read half of a connection. Owned by exactly one read loop.
pub struct WsReceiver {
    id: ConnectionId,
    stream: SplitStream<WsStream>,
}

impl WsReceiver {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Waits for the next inbound text frame.
    ///
    /// Returns `Ok(None)` on a clean close. Control frames (pong, ping) and
    /// binary frames are skipped, and each one restarts the read deadline —
    /// this is what makes the deadline a sliding liveness window rather
    /// than a hard idle cap.
    pub async fn next_frame(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let msg = match tokio::time::timeout(READ_DEADLINE, self.stream.next()).await
            {
                Ok(msg) => msg,
                Err(_) => return Err(TransportError::ReadDeadline),
            };

            match msg {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // pong/ping/binary: slide the deadline
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }
}
