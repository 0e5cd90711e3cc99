//! Driving a single accepted connection.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, info};
use russh::Disconnect;
use tokio::io::{AsyncRead, AsyncWrite};

use super::handler::{ConnectionEvents, SessionHandler};
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::policy::ServerPolicy;
use crate::session::bbs;

/// Run one connection from key exchange to the end of the toy session.
///
/// The transport itself is spawned onto the runtime and outlives this
/// function when the exchange succeeds; the client decides when to hang up.
/// On failure the transport is disconnected before returning.
pub(crate) async fn serve<S>(
    config: &ServerConfig,
    russh_config: Arc<russh::server::Config>,
    policy: Arc<dyn ServerPolicy>,
    stream: S,
    peer: SocketAddr,
) -> Result<String, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (handler, events) = SessionHandler::new(policy, Some(peer));

    // run_stream reads the client's version line before returning
    let handshake = russh::server::run_stream(russh_config, stream, handler);
    let session = tokio::time::timeout(config.accept_timeout, handshake)
        .await
        .map_err(|_| SessionError::HandshakeTimeout(config.accept_timeout))?
        .map_err(|e| match e {
            SessionError::Ssh(e) => SessionError::Negotiation(e),
            other => other,
        })?;
    let handle = session.handle();

    tokio::spawn(async move {
        match session.await {
            Ok(()) => debug!("Transport with {} finished", peer),
            Err(e) => debug!("Transport with {} ended: {}", peer, e),
        }
    });

    let result = run_session(config, events).await;

    if let Err(ref e) = result {
        // Best effort: the peer may already be gone.
        let _ = handle
            .disconnect(Disconnect::ByApplication, e.to_string(), "en".to_string())
            .await;
    }

    result
}

/// Wait for the channel and the shell request, then run the BBS.
async fn run_session(
    config: &ServerConfig,
    events: ConnectionEvents,
) -> Result<String, SessionError> {
    let mut channel = events
        .channel
        .wait(config.accept_timeout)
        .await
        .ok_or(SessionError::NoChannel(config.accept_timeout))?;
    info!("Authenticated!");

    events
        .shell
        .wait(config.shell_timeout)
        .await
        .ok_or(SessionError::NoShellRequest(config.shell_timeout))?;

    bbs::run(&mut channel, config.line_timeout).await
}
