//! `ParlorServer` builder and accept loop.
//!
//! This is the entry point for running a Parlor game process. It ties the
//! layers together: transport → protocol → session → engine, plus the
//! global tick driver for continuous-motion rulesets.

use std::sync::Arc;

use parlor_engine::{GameServer, Ruleset};
use parlor_tick::{TickConfig, TickScheduler};
use parlor_transport::{WsListener, WsSender};

use crate::gateway::handle_connection;
use crate::ParlorError;

/// Builder for configuring and starting a Parlor server.
///
/// ```rust,ignore
/// let server = ParlorServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(GomokuRules::default())
///     .await?;
/// server.run().await
/// ```
pub struct ParlorServerBuilder {
    bind_addr: String,
}

impl ParlorServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and wires up the engine with the given ruleset.
    pub async fn build<R: Ruleset>(self, rules: R) -> Result<ParlorServer<R>, ParlorError> {
        let listener = WsListener::bind(&self.bind_addr).await?;
        let engine = Arc::new(GameServer::new(rules));
        Ok(ParlorServer { listener, engine })
    }
}

impl Default for ParlorServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Parlor game server: one listener, one engine, one snapshot.
pub struct ParlorServer<R: Ruleset> {
    listener: WsListener,
    engine: Arc<GameServer<R, WsSender>>,
}

impl<R: Ruleset> ParlorServer<R> {
    pub fn builder() -> ParlorServerBuilder {
        ParlorServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared handle to the engine, for embedding and tests.
    pub fn engine(&self) -> Arc<GameServer<R, WsSender>> {
        Arc::clone(&self.engine)
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// For rulesets with a tick period, also spawns the global tick driver
    /// that re-enters the engine on the fixed period.
    pub async fn run(self) -> Result<(), ParlorError> {
        tracing::info!("parlor server running");

        if let Some(period) = self.engine.rules().tick_period() {
            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                let mut scheduler = TickScheduler::new(TickConfig::with_period(period));
                loop {
                    scheduler.wait_for_tick().await;
                    engine.tick().await;
                    scheduler.record_tick_end();
                }
            });
        }

        loop {
            match self.listener.accept().await {
                Ok((sender, receiver)) => {
                    let engine = Arc::clone(&self.engine);
                    tokio::spawn(handle_connection(engine, sender, receiver));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
