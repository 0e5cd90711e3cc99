//! Builder for server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use russh::keys::PrivateKey;

use super::keys::{AllowedKey, load_host_key};
use super::{
    DEFAULT_ALLOWED_USER, DEFAULT_BACKLOG, DEFAULT_HOST_KEY_PATH, DEFAULT_LINE_TIMEOUT,
    DEFAULT_PORT, DEFAULT_WAIT, ServerConfig, process_owner,
};
use crate::error::{ConfigError, Result};

/// Builder for [`ServerConfig`].
///
/// Starts from the demo defaults: all interfaces on port 2200, host key
/// from `test_rsa.key`, the built-in key for user `robey`, and the process
/// owner for password logins.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use bbssh::ServerBuilder;
///
/// # fn example() -> Result<(), bbssh::Error> {
/// let config = ServerBuilder::new()
///     .port(2222)
///     .host_key_path("/etc/bbssh/host_key")
///     .timeout(Duration::from_secs(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ServerBuilder {
    ip: IpAddr,
    port: u16,
    backlog: u32,
    host_key_path: PathBuf,
    host_key: Option<PrivateKey>,
    allowed_user: String,
    allowed_key: Option<AllowedKey>,
    allowed_key_path: Option<PathBuf>,
    password_user: Option<String>,
    accept_timeout: Duration,
    shell_timeout: Duration,
    line_timeout: Duration,
    auth_rejection_time: Duration,
    inactivity_timeout: Option<Duration>,
}

impl ServerBuilder {
    /// Create a builder with the demo defaults.
    pub fn new() -> Self {
        Self {
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            host_key_path: PathBuf::from(DEFAULT_HOST_KEY_PATH),
            host_key: None,
            allowed_user: DEFAULT_ALLOWED_USER.to_string(),
            allowed_key: None,
            allowed_key_path: None,
            password_user: process_owner(),
            accept_timeout: DEFAULT_WAIT,
            shell_timeout: DEFAULT_WAIT,
            line_timeout: DEFAULT_LINE_TIMEOUT,
            auth_rejection_time: Duration::from_secs(1),
            inactivity_timeout: Some(Duration::from_secs(300)),
        }
    }

    /// Set the address to listen on (default: all IPv4 interfaces).
    pub fn bind(mut self, ip: IpAddr) -> Self {
        self.ip = ip;
        self
    }

    /// Set the port (default: 2200). Port 0 picks a free port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the listen backlog (default: 100).
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Load the host key from this file.
    pub fn host_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.host_key_path = path.into();
        self.host_key = None;
        self
    }

    /// Use an already loaded host key.
    pub fn host_key(mut self, key: PrivateKey) -> Self {
        self.host_key = Some(key);
        self
    }

    /// Set the username allowed to use the public key.
    pub fn allowed_user(mut self, user: impl Into<String>) -> Self {
        self.allowed_user = user.into();
        self
    }

    /// Replace the built-in allowed key.
    pub fn allowed_key(mut self, key: AllowedKey) -> Self {
        self.allowed_key = Some(key);
        self.allowed_key_path = None;
        self
    }

    /// Replace the built-in allowed key with the one in an OpenSSH `.pub` file.
    pub fn allowed_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.allowed_key_path = Some(path.into());
        self.allowed_key = None;
        self
    }

    /// Override the username accepted for password logins.
    ///
    /// `None` disables password logins entirely.
    pub fn password_user(mut self, user: Option<String>) -> Self {
        self.password_user = user;
        self
    }

    /// Set both the channel and the shell-request waits.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self.shell_timeout = timeout;
        self
    }

    /// Set the wait for an authenticated session channel.
    pub fn accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Set the wait for the shell request.
    pub fn shell_timeout(mut self, timeout: Duration) -> Self {
        self.shell_timeout = timeout;
        self
    }

    /// Set the wait for the client's input line.
    pub fn line_timeout(mut self, timeout: Duration) -> Self {
        self.line_timeout = timeout;
        self
    }

    /// Set the delay before a rejected authentication is answered.
    pub fn auth_rejection_time(mut self, delay: Duration) -> Self {
        self.auth_rejection_time = delay;
        self
    }

    /// Set the transport inactivity timeout (`None` disables it).
    pub fn inactivity_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    /// Validate the settings and load key material.
    pub fn build(self) -> Result<ServerConfig> {
        if self.allowed_user.is_empty() {
            return Err(ConfigError::Invalid {
                message: "allowed user must not be empty".to_string(),
            }
            .into());
        }

        for (name, value) in [
            ("accept timeout", self.accept_timeout),
            ("shell timeout", self.shell_timeout),
            ("line timeout", self.line_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid {
                    message: format!("{} must be greater than zero", name),
                }
                .into());
            }
        }

        let (host_key, host_key_path) = match self.host_key {
            Some(key) => (key, None),
            None => (load_host_key(&self.host_key_path)?, Some(self.host_key_path)),
        };

        let allowed_key = match (self.allowed_key, self.allowed_key_path) {
            (Some(key), _) => key,
            (None, Some(path)) => AllowedKey::from_openssh_file(&path)?,
            (None, None) => AllowedKey::builtin()?,
        };

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(self.ip, self.port),
            backlog: self.backlog,
            host_key,
            host_key_path,
            allowed_user: self.allowed_user,
            allowed_key,
            password_user: self.password_user.filter(|user| !user.is_empty()),
            accept_timeout: self.accept_timeout,
            shell_timeout: self.shell_timeout,
            line_timeout: self.line_timeout,
            auth_rejection_time: self.auth_rejection_time,
            inactivity_timeout: self.inactivity_timeout,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
