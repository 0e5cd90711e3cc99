//! The toy BBS: a banner, one question, one answer.

use std::time::Duration;

use log::debug;

use super::Terminal;
use super::line::LineBuffer;
use crate::error::SessionError;

/// Sent in order once the shell is granted. The last part is the prompt.
pub const BANNER: [&str; 4] = [
    "\r\n\r\nWelcome to my dorky little BBS!\r\n\r\n",
    "We are on fire all the time!  Hooray!  Candy corn for everyone!\r\n",
    "Happy birthday to Robot Dave!\r\n\r\n",
    "Username: ",
];

/// Longest username kept from the client.
const MAX_LINE: usize = 1024;

/// The reply to a username.
pub fn farewell(username: &str) -> String {
    format!("\r\nI don't like you, {}.\r\n", username)
}

/// Run the whole exchange and close the channel.
///
/// Returns the username the client typed.
pub async fn run<T: Terminal>(
    terminal: &mut T,
    line_timeout: Duration,
) -> Result<String, SessionError> {
    for part in BANNER {
        terminal.send(part).await?;
    }

    let username = read_line(terminal, line_timeout).await?;
    debug!("Client answered '{}'", username);

    terminal.send(&farewell(&username)).await?;
    terminal.close().await?;

    Ok(username)
}

/// Read one line. EOF ends the line with whatever was received so far.
async fn read_line<T: Terminal>(terminal: &mut T, timeout: Duration) -> Result<String, SessionError> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut buffer = LineBuffer::new(MAX_LINE);

    loop {
        let chunk = tokio::time::timeout_at(deadline, terminal.recv())
            .await
            .map_err(|_| SessionError::LineTimeout(timeout))?;

        match chunk {
            Some(data) => {
                buffer.extend(&data);
                if let Some(line) = buffer.next_line() {
                    return Ok(line);
                }
            }
            None => return Ok(buffer.take_remaining()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use tokio_test::{assert_err, assert_ok};

    use super::*;

    /// Scripted terminal: replays `input`, then either reports EOF or
    /// stalls forever.
    #[derive(Default)]
    struct ScriptedTerminal {
        input: VecDeque<Vec<u8>>,
        sent: Vec<String>,
        closed: bool,
        stall: bool,
    }

    impl ScriptedTerminal {
        fn with_input(chunks: &[&[u8]]) -> Self {
            Self {
                input: chunks.iter().map(|c| c.to_vec()).collect(),
                ..Default::default()
            }
        }

        fn output(&self) -> String {
            self.sent.concat()
        }
    }

    impl Terminal for ScriptedTerminal {
        async fn send(&mut self, text: &str) -> Result<(), SessionError> {
            if self.closed {
                return Err(SessionError::Closed);
            }
            self.sent.push(text.to_string());
            Ok(())
        }

        async fn recv(&mut self) -> Option<Vec<u8>> {
            match self.input.pop_front() {
                Some(chunk) => Some(chunk),
                None if self.stall => std::future::pending().await,
                None => None,
            }
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            self.closed = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_full_exchange() {
        let mut terminal = ScriptedTerminal::with_input(&[b"alice\n"]);
        let name = assert_ok!(run(&mut terminal, Duration::from_secs(1)).await);

        assert_eq!(name, "alice");
        assert!(terminal.closed);
        assert_eq!(
            terminal.output(),
            format!("{}\r\nI don't like you, alice.\r\n", BANNER.concat())
        );
    }

    #[tokio::test]
    async fn test_banner_order() {
        let mut terminal = ScriptedTerminal::with_input(&[b"bob\r"]);
        assert_ok!(run(&mut terminal, Duration::from_secs(1)).await);

        assert_eq!(&terminal.sent[..4], &BANNER[..]);
        assert_eq!(terminal.sent[4], farewell("bob"));
    }

    #[tokio::test]
    async fn test_chunked_input() {
        let mut terminal = ScriptedTerminal::with_input(&[b"al", b"i", b"ce\r\n"]);
        let name = assert_ok!(run(&mut terminal, Duration::from_secs(1)).await);
        assert_eq!(name, "alice");
    }

    #[tokio::test]
    async fn test_eof_before_newline() {
        let mut terminal = ScriptedTerminal::with_input(&[b"carol"]);
        let name = assert_ok!(run(&mut terminal, Duration::from_secs(1)).await);
        assert_eq!(name, "carol");
        assert!(terminal.output().ends_with("I don't like you, carol.\r\n"));
    }

    #[tokio::test]
    async fn test_line_timeout() {
        let mut terminal = ScriptedTerminal {
            stall: true,
            ..Default::default()
        };
        let err = assert_err!(run(&mut terminal, Duration::from_millis(50)).await);

        assert!(matches!(err, SessionError::LineTimeout(_)));
        assert_eq!(terminal.output(), BANNER.concat());
        assert!(!terminal.closed);
    }
}
