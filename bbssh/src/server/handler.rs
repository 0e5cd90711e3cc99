//! russh callback handler.
//!
//! One [`SessionHandler`] exists per connection. It forwards every decision
//! to the shared [`ServerPolicy`] and reports the two events the connection
//! driver waits for: the first accepted session channel and the first
//! granted shell request.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, info};
use russh::keys::PublicKey;
use russh::server::{Auth, Handler, Msg, Session};
use russh::{Channel, ChannelId, Pty};
use secrecy::SecretString;

use crate::error::SessionError;
use crate::policy::{
    AuthDecision, ChannelKind, ChannelOpenDecision, PtyRequest, ServerPolicy, transport_methods,
};
use crate::session::{Notifier, Waiter, signal};

/// Receiving side of a connection's events.
pub struct ConnectionEvents {
    /// First session channel the policy accepted (implies authentication).
    pub channel: Waiter<Channel<Msg>>,

    /// Fires on the first granted shell request.
    pub shell: Waiter<()>,
}

/// Per-connection russh handler.
///
/// Only `session`, `x11`, `direct-tcpip` and `forwarded-tcpip` opens reach
/// the policy. russh refuses any other channel type itself, with
/// `SSH_OPEN_UNKNOWN_CHANNEL_TYPE` rather than administrative prohibition.
pub struct SessionHandler {
    policy: Arc<dyn ServerPolicy>,
    peer: Option<SocketAddr>,
    channel: Notifier<Channel<Msg>>,
    shell: Notifier<()>,
}

impl SessionHandler {
    /// Create a handler and the events its connection driver waits on.
    pub fn new(policy: Arc<dyn ServerPolicy>, peer: Option<SocketAddr>) -> (Self, ConnectionEvents) {
        let (channel_tx, channel_rx) = signal();
        let (shell_tx, shell_rx) = signal();

        let handler = Self {
            policy,
            peer,
            channel: channel_tx,
            shell: shell_tx,
        };
        let events = ConnectionEvents {
            channel: channel_rx,
            shell: shell_rx,
        };
        (handler, events)
    }

    /// Turn a policy decision into a russh answer.
    ///
    /// Rejections re-advertise the policy's methods for this user.
    fn auth(&self, user: &str, decision: AuthDecision) -> Auth {
        if decision.is_accept() {
            return Auth::Accept;
        }
        Auth::Reject {
            proceed_with_methods: Some(transport_methods(&self.policy.allowed_auths(user))),
            partial_success: false,
        }
    }

    fn open_channel(&self, kind: ChannelKind) -> bool {
        let decision = self.policy.check_channel_request(kind);
        debug!("Channel open '{}' from {:?}: {:?}", kind, self.peer, decision);
        decision == ChannelOpenDecision::Accept
    }
}

/// Answer a channel request that asked for a reply.
fn reply(session: &mut Session, channel: ChannelId, granted: bool) -> Result<(), SessionError> {
    if granted {
        session.channel_success(channel)?;
    } else {
        session.channel_failure(channel)?;
    }
    Ok(())
}

impl Handler for SessionHandler {
    type Error = SessionError;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        let password = SecretString::from(password.to_string());
        let decision = self.policy.check_password(user, &password);
        Ok(self.auth(user, decision))
    }

    async fn auth_publickey(&mut self, user: &str, public_key: &PublicKey) -> Result<Auth, Self::Error> {
        let decision = self.policy.check_public_key(user, public_key);
        debug!("Public key auth for '{}': {:?}", user, decision);
        Ok(self.auth(user, decision))
    }

    async fn auth_succeeded(&mut self, _session: &mut Session) -> Result<(), Self::Error> {
        info!("Client {:?} authenticated", self.peer);
        Ok(())
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if !self.open_channel(ChannelKind::Session) {
            return Ok(false);
        }
        if !self.channel.notify(channel) {
            debug!("Extra session channel from {:?} is left idle", self.peer);
        }
        Ok(true)
    }

    async fn channel_open_x11(
        &mut self,
        _channel: Channel<Msg>,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(self.open_channel(ChannelKind::X11))
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        _channel: Channel<Msg>,
        _host_to_connect: &str,
        _port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(self.open_channel(ChannelKind::DirectTcpip))
    }

    async fn channel_open_forwarded_tcpip(
        &mut self,
        _channel: Channel<Msg>,
        _host_to_connect: &str,
        _port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(self.open_channel(ChannelKind::ForwardedTcpip))
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        pix_width: u32,
        pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let request = PtyRequest {
            term,
            cols: col_width,
            rows: row_height,
            pixel_width: pix_width,
            pixel_height: pix_height,
        };
        let granted = self.policy.check_pty_request(&request);
        debug!("PTY request {:?} on {:?}: {}", request, channel, granted);
        reply(session, channel, granted)
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let granted = self.policy.check_shell_request();
        debug!("Shell request on {:?}: {}", channel, granted);
        if granted {
            self.shell.notify(());
        }
        reply(session, channel, granted)
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let granted = self.policy.check_exec_request(data);
        debug!("Exec request on {:?}: {}", channel, granted);
        reply(session, channel, granted)
    }

    async fn subsystem_request(
        &mut self,
        channel: ChannelId,
        name: &str,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let granted = self.policy.check_subsystem_request(name);
        debug!("Subsystem '{}' request on {:?}: {}", name, channel, granted);
        reply(session, channel, granted)
    }
}
