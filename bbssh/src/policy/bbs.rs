//! Policy of the demo BBS.

use log::{debug, info};
use russh::keys::PublicKey;
use secrecy::{ExposeSecret, SecretString};

use super::{
    AuthDecision, AuthMethod, ChannelKind, ChannelOpenDecision, PtyRequest, ServerPolicy,
};
use crate::config::keys::{AllowedKey, fingerprint};
use crate::config::ServerConfig;

/// Every method is advertised, whether or not it can succeed.
const ADVERTISED: [AuthMethod; 4] = [
    AuthMethod::GssapiKeyex,
    AuthMethod::GssapiWithMic,
    AuthMethod::Password,
    AuthMethod::PublicKey,
];

/// Hardcoded single-user policy.
///
/// - password: the process owner with any non-empty password
/// - publickey: one fixed username with one fixed key
/// - gssapi: whatever the transport's GSSAPI exchange decided
/// - channels: `session` only, any PTY, any shell
#[derive(Debug, Clone)]
pub struct BbsPolicy {
    password_user: Option<String>,
    key_user: String,
    key: AllowedKey,
}

impl BbsPolicy {
    pub fn new(password_user: Option<String>, key_user: impl Into<String>, key: AllowedKey) -> Self {
        Self {
            password_user,
            key_user: key_user.into(),
            key,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.password_user.clone(),
            config.allowed_user.clone(),
            config.allowed_key.clone(),
        )
    }
}

impl ServerPolicy for BbsPolicy {
    fn allowed_auths(&self, _user: &str) -> Vec<AuthMethod> {
        ADVERTISED.to_vec()
    }

    fn check_password(&self, user: &str, password: &SecretString) -> AuthDecision {
        let user_ok = self.password_user.as_deref() == Some(user);
        let decision = if user_ok && !password.expose_secret().is_empty() {
            AuthDecision::Accept
        } else {
            AuthDecision::Reject
        };
        debug!("Password auth for '{}': {:?}", user, decision);
        decision
    }

    fn check_public_key(&self, user: &str, key: &PublicKey) -> AuthDecision {
        info!("Auth attempt with key: {}", fingerprint(key));
        if user == self.key_user && self.key.matches(key) {
            AuthDecision::Accept
        } else {
            AuthDecision::Reject
        }
    }

    fn check_channel_request(&self, kind: ChannelKind) -> ChannelOpenDecision {
        match kind {
            ChannelKind::Session => ChannelOpenDecision::Accept,
            _ => ChannelOpenDecision::AdministrativelyProhibited,
        }
    }

    fn check_pty_request(&self, _request: &PtyRequest<'_>) -> bool {
        true
    }

    fn check_shell_request(&self) -> bool {
        true
    }
}
