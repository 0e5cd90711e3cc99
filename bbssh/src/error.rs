//! Error types for bbssh.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for bbssh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration and key material errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Listener errors (fatal for the process)
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Per-connection errors (fatal for that connection only)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration errors, raised while building a [`ServerConfig`](crate::ServerConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The host private key could not be loaded
    #[error("Failed to load host key from {path}: {message}")]
    HostKey { path: PathBuf, message: String },

    /// The allowed public key is not valid base64 or OpenSSH text
    #[error("Invalid allowed public key: {message}")]
    AllowedKey { message: String },

    /// The allowed public key file could not be read
    #[error("Failed to read allowed key file {path}: {source}")]
    AllowedKeyFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid value in the server builder
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Listener errors. Both are fatal: there is no retry.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind or listen
    #[error("Bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Failed to accept a connection
    #[error("Accept failed: {0}")]
    Accept(#[source] io::Error),
}

/// Errors that abandon a single connection.
#[derive(Error, Debug)]
pub enum SessionError {
    /// SSH negotiation failed before a session could start
    #[error("SSH negotiation failed: {0}")]
    Negotiation(#[source] russh::Error),

    /// The client did not start the SSH exchange in time
    #[error("No SSH handshake within {0:?}")]
    HandshakeTimeout(Duration),

    /// No authenticated session channel within the wait window
    #[error("No channel within {0:?}")]
    NoChannel(Duration),

    /// The client never asked for a shell
    #[error("Client never asked for a shell within {0:?}")]
    NoShellRequest(Duration),

    /// The client did not finish its line in time
    #[error("No input line within {0:?}")]
    LineTimeout(Duration),

    /// Channel closed before the exchange finished
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on an established session
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using bbssh's Error.
pub type Result<T> = std::result::Result<T, Error>;
