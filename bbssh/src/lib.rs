//! # bbssh
//!
//! Minimal demonstration SSH server built on russh.
//!
//! Each connection is negotiated by russh; bbssh only decides who may log
//! in and what they may open, then plays a tiny "BBS": a banner, a prompt
//! for a username, and a rude answer.
//!
//! ## Features
//!
//! - Password login for the process owner (any non-empty password)
//! - Public-key login for one fixed user with one fixed key
//! - `session` channels only, with PTY and shell requests
//! - Strictly sequential accept loop with bounded waits per connection
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bbssh::{Server, ServerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bbssh::Error> {
//!     let config = ServerBuilder::new()
//!         .host_key_path("test_rsa.key")
//!         .build()?;
//!
//!     let server = Server::bind(config)?;
//!     server.run().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod policy;
pub mod server;
pub mod session;

// Re-export main types for convenience
pub use config::{AllowedKey, ServerBuilder, ServerConfig};
pub use error::Error;
pub use policy::{AuthDecision, BbsPolicy, ServerPolicy};
pub use server::Server;
