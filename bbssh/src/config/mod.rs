//! Server configuration.
//!
//! Everything here is loaded once at process start and then shared
//! read-only with every connection.

mod builder;
pub mod keys;

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use russh::keys::PrivateKey;

pub use builder::ServerBuilder;
pub use keys::AllowedKey;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 2200;

/// Default listen backlog.
pub const DEFAULT_BACKLOG: u32 = 100;

/// Default host key location, relative to the working directory.
pub const DEFAULT_HOST_KEY_PATH: &str = "test_rsa.key";

/// The only username allowed to use public-key authentication by default.
pub const DEFAULT_ALLOWED_USER: &str = "robey";

/// Default wait for the channel and for the shell request.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(10);

/// Default wait for the client's answer to the username prompt.
pub const DEFAULT_LINE_TIMEOUT: Duration = Duration::from_secs(60);

/// Complete server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,

    /// Listen backlog.
    pub backlog: u32,

    /// Host private key.
    pub host_key: PrivateKey,

    /// Where the host key was loaded from, if it came from disk.
    pub host_key_path: Option<PathBuf>,

    /// Username allowed to authenticate with [`allowed_key`](Self::allowed_key).
    pub allowed_user: String,

    /// The one public key accepted for `allowed_user`.
    pub allowed_key: AllowedKey,

    /// Username accepted for password authentication (the process owner).
    /// `None` disables password logins.
    pub password_user: Option<String>,

    /// How long to wait for an authenticated session channel.
    pub accept_timeout: Duration,

    /// How long to wait for the shell request once the channel is open.
    pub shell_timeout: Duration,

    /// How long to wait for the client to answer the prompt.
    pub line_timeout: Duration,

    /// Delay russh applies before answering a rejected authentication.
    pub auth_rejection_time: Duration,

    /// Idle transports are dropped after this long.
    pub inactivity_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Start building a configuration from the demo defaults.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Derive the russh server configuration.
    ///
    /// Authentication methods are filled in by the server from its policy.
    pub fn russh_config(&self) -> russh::server::Config {
        russh::server::Config {
            keys: vec![self.host_key.clone()],
            auth_rejection_time: self.auth_rejection_time,
            inactivity_timeout: self.inactivity_timeout,
            ..Default::default()
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("backlog", &self.backlog)
            .field("host_key", &self.host_key.algorithm().as_str())
            .field("host_key_path", &self.host_key_path)
            .field("allowed_user", &self.allowed_user)
            .field("allowed_key", &self.allowed_key)
            .field("password_user", &self.password_user)
            .field("accept_timeout", &self.accept_timeout)
            .field("shell_timeout", &self.shell_timeout)
            .field("line_timeout", &self.line_timeout)
            .finish_non_exhaustive()
    }
}

/// Resolve the username of the process owner.
///
/// `USER` wins when set, otherwise the passwd entry of the current uid.
pub fn process_owner() -> Option<String> {
    std::env::var("USER")
        .ok()
        .filter(|name| !name.is_empty())
        .or_else(|| {
            users::get_current_username().and_then(|name| name.into_string().ok())
        })
}
