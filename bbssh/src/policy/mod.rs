//! Authentication and channel policy.
//!
//! The transport asks a [`ServerPolicy`] what to do with every credential
//! and every channel request. Implementations are pure decision logic: they
//! do no I/O and hold no per-connection state, so one instance is shared by
//! all connections.

mod bbs;

use std::fmt;

use russh::keys::PublicKey;
use russh::{MethodKind, MethodSet};
use secrecy::SecretString;

pub use bbs::BbsPolicy;

/// Outcome of an authentication check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Accept,
    Reject,
}

impl AuthDecision {
    /// Returns `true` for [`AuthDecision::Accept`].
    pub fn is_accept(self) -> bool {
        self == AuthDecision::Accept
    }
}

/// Authentication methods a policy can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    GssapiKeyex,
    GssapiWithMic,
    Password,
    PublicKey,
}

impl AuthMethod {
    /// Wire name of the method.
    pub fn name(self) -> &'static str {
        match self {
            AuthMethod::GssapiKeyex => "gssapi-keyex",
            AuthMethod::GssapiWithMic => "gssapi-with-mic",
            AuthMethod::Password => "password",
            AuthMethod::PublicKey => "publickey",
        }
    }

    /// The russh method this maps to, if russh can negotiate it.
    ///
    /// russh has no GSSAPI support, so both GSSAPI variants map to `None`.
    pub fn transport_kind(self) -> Option<MethodKind> {
        match self {
            AuthMethod::Password => Some(MethodKind::Password),
            AuthMethod::PublicKey => Some(MethodKind::PublicKey),
            AuthMethod::GssapiKeyex | AuthMethod::GssapiWithMic => None,
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comma-separated method list, as sent in a userauth failure message.
pub fn method_list(methods: &[AuthMethod]) -> String {
    methods
        .iter()
        .map(|m| m.name())
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the russh method set for the methods the transport can negotiate.
pub fn transport_methods(methods: &[AuthMethod]) -> MethodSet {
    let kinds: Vec<MethodKind> = methods
        .iter()
        .filter_map(|m| m.transport_kind())
        .collect();
    MethodSet::from(kinds.as_slice())
}

/// The two GSSAPI authentication flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GssapiMethod {
    /// `gssapi-keyex`: identity bound during key exchange.
    KeyExchange,
    /// `gssapi-with-mic`: identity asserted during user authentication.
    WithMic,
}

/// What the transport reports about a GSSAPI exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GssapiStatus {
    Succeeded,
    Failed,
}

/// Channel types a client can ask to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Session,
    X11,
    DirectTcpip,
    ForwardedTcpip,
}

impl ChannelKind {
    /// Wire name of the channel type.
    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::Session => "session",
            ChannelKind::X11 => "x11",
            ChannelKind::DirectTcpip => "direct-tcpip",
            ChannelKind::ForwardedTcpip => "forwarded-tcpip",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a channel open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOpenDecision {
    Accept,
    /// Refuse with `SSH_OPEN_ADMINISTRATIVELY_PROHIBITED`.
    AdministrativelyProhibited,
}

/// Parameters of a `pty-req` channel request.
#[derive(Debug, Clone, Copy)]
pub struct PtyRequest<'a> {
    pub term: &'a str,
    pub cols: u32,
    pub rows: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

/// Decision hooks consulted by the SSH session handler.
pub trait ServerPolicy: Send + Sync {
    /// Methods advertised to `user`.
    ///
    /// The empty username stands for "before any username is known" and is
    /// used to seed the transport's initial method list.
    fn allowed_auths(&self, user: &str) -> Vec<AuthMethod>;

    /// Password authentication.
    fn check_password(&self, user: &str, password: &SecretString) -> AuthDecision;

    /// Public-key authentication. Called once the signature has been verified.
    fn check_public_key(&self, user: &str, key: &PublicKey) -> AuthDecision;

    /// GSSAPI authentication, after the transport ran the GSSAPI exchange.
    ///
    /// The default accepts whenever the exchange succeeded. It does NOT check
    /// that the authenticated principal may log in as `user`; a real
    /// deployment must map the principal to a local account (for example
    /// with `krb5_kuserok`) before accepting.
    fn check_gssapi(
        &self,
        _user: &str,
        _method: GssapiMethod,
        status: GssapiStatus,
    ) -> AuthDecision {
        match status {
            GssapiStatus::Succeeded => AuthDecision::Accept,
            GssapiStatus::Failed => AuthDecision::Reject,
        }
    }

    /// Channel open request.
    fn check_channel_request(&self, kind: ChannelKind) -> ChannelOpenDecision;

    /// `pty-req` on an open channel.
    fn check_pty_request(&self, request: &PtyRequest<'_>) -> bool;

    /// `shell` on an open channel.
    fn check_shell_request(&self) -> bool;

    /// `exec` on an open channel.
    fn check_exec_request(&self, _command: &[u8]) -> bool {
        false
    }

    /// `subsystem` on an open channel.
    fn check_subsystem_request(&self, _name: &str) -> bool {
        false
    }
}
