//! The interactive part of a connection.
//!
//! Once a client is authenticated and has asked for a shell, the connection
//! driver hands its session channel to [`bbs::run`].

pub mod bbs;
mod line;
pub mod signal;

pub use line::LineBuffer;
pub use signal::{Notifier, Waiter, signal};

use std::future::Future;

use russh::server::Msg;
use russh::{Channel, ChannelMsg};

use crate::error::SessionError;

/// Byte stream the toy session talks to.
pub trait Terminal: Send {
    /// Write text to the client.
    fn send(&mut self, text: &str) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Next chunk of client input, or `None` once the client sent EOF or
    /// closed the channel.
    fn recv(&mut self) -> impl Future<Output = Option<Vec<u8>>> + Send;

    /// Close the channel.
    fn close(&mut self) -> impl Future<Output = Result<(), SessionError>> + Send;
}

impl Terminal for Channel<Msg> {
    async fn send(&mut self, text: &str) -> Result<(), SessionError> {
        self.data(text.as_bytes()).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.wait().await? {
                ChannelMsg::Data { data } => return Some(data.to_vec()),
                ChannelMsg::Eof | ChannelMsg::Close => return None,
                // pty-req, shell, window changes: already answered by the handler
                _ => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Channel::close(self).await?;
        Ok(())
    }
}
