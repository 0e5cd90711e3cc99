//! Listener and accept loop.
//!
//! Connections are served strictly one after another: the next `accept`
//! only happens once the previous connection finished its session or was
//! abandoned.

mod connection;
mod handler;

pub use handler::{ConnectionEvents, SessionHandler};

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::config::ServerConfig;
use crate::config::keys::fingerprint;
use crate::error::{Result, ServerError, SessionError};
use crate::policy::{BbsPolicy, ServerPolicy, method_list, transport_methods};

/// A bound SSH server.
pub struct Server {
    config: ServerConfig,
    russh_config: Arc<russh::server::Config>,
    policy: Arc<dyn ServerPolicy>,
    listener: TcpListener,
}

impl Server {
    /// Bind with the demo policy built from `config`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let policy = Arc::new(BbsPolicy::from_config(&config));
        Self::bind_with_policy(config, policy)
    }

    /// Bind with a custom policy.
    pub fn bind_with_policy(config: ServerConfig, policy: Arc<dyn ServerPolicy>) -> Result<Self> {
        info!("Read key: {}", fingerprint(config.host_key.public_key()));

        let advertised = policy.allowed_auths("");
        let mut russh_config = config.russh_config();
        russh_config.methods = transport_methods(&advertised);
        if advertised.iter().any(|m| m.transport_kind().is_none()) {
            debug!(
                "Policy advertises '{}'; the transport negotiates only what it supports",
                method_list(&advertised)
            );
        }

        let listener = listen(config.bind_addr, config.backlog).map_err(|source| {
            ServerError::Bind {
                addr: config.bind_addr,
                source,
            }
        })?;

        Ok(Self {
            config,
            russh_config: Arc::new(russh_config),
            policy,
            listener,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The configuration this server runs with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Wait for the next connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        info!("Listening for connection ...");
        let accepted = self.listener.accept().await.map_err(ServerError::Accept)?;
        info!("Got a connection from {}", accepted.1);
        Ok(accepted)
    }

    /// Serve one accepted connection to completion.
    ///
    /// Returns the username the client typed at the prompt.
    pub async fn serve(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> std::result::Result<String, SessionError> {
        connection::serve(
            &self.config,
            self.russh_config.clone(),
            self.policy.clone(),
            stream,
            peer,
        )
        .await
    }

    /// Accept and serve connections forever.
    ///
    /// Returns only when accepting fails; per-connection failures are
    /// logged and the loop moves on.
    pub async fn run(&self) -> Result<()> {
        loop {
            let (stream, peer) = self.accept().await?;
            match self.serve(stream, peer).await {
                Ok(username) => info!("Session with {} ({}) complete", peer, username),
                Err(e) => error!("*** Connection from {} dropped: {}", peer, e),
            }
        }
    }
}

fn listen(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}
