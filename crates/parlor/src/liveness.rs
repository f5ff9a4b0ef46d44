//! Per-session liveness monitor.
//!
//! One task per session. Sends a WebSocket ping every [`PING_INTERVAL`];
//! the transport bounds each send with its ping deadline. Pong handling is
//! the read side's job — any inbound frame slides the connection's read
//! deadline — so this task only has to notice *send* failures.
//!
//! A failed ping invokes the disconnect path. That path may race the read
//! loop's own disconnect; `GameServer::leave` performs an existence check
//! under the lock, so whichever arrives second is a no-op.

use std::sync::Arc;
use std::time::Duration;

use parlor_engine::{GameServer, Ruleset};
use parlor_protocol::PlayerId;
use parlor_transport::{Connection, WsSender};

/// How often each session is pinged. Together with the transport's read
/// deadline this bounds worst-case dead-peer detection latency.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

pub(crate) async fn monitor<R: Ruleset>(
    engine: Arc<GameServer<R, WsSender>>,
    player_id: PlayerId,
    conn: WsSender,
) {
    tracing::debug!(%player_id, "liveness monitor started");
    let mut interval = tokio::time::interval(PING_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // interval's first tick completes immediately; consume it so the
    // first ping goes out one full interval after connect.
    interval.tick().await;

    loop {
        interval.tick().await;

        // The session may have been removed by the read loop while this
        // task slept.
        if !engine.is_connected(&player_id).await {
            tracing::debug!(%player_id, "session gone, liveness monitor stopping");
            return;
        }

        if let Err(e) = conn.send_ping().await {
            tracing::info!(%player_id, error = %e, "ping failed, disconnecting");
            engine.leave(&player_id).await;
            return;
        }
    }
}
