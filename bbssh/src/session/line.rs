//! Line accumulation for interactive input.
//!
//! Terminal clients end a line with `\r`, `\n` or `\r\n` depending on the
//! PTY mode. All three are accepted; a `\r\n` pair counts as one
//! terminator even when it arrives split across two chunks.

use bytes::{Buf, BytesMut};
use memchr::memchr2;

/// Buffer that collects channel data and yields complete lines.
#[derive(Debug)]
pub struct LineBuffer {
    buffer: BytesMut,

    /// Longest line returned; longer input is cut at this length.
    max_len: usize,

    /// The last terminator was `\r`, so a leading `\n` belongs to it.
    skip_lf: bool,
}

impl LineBuffer {
    /// Create a buffer that returns lines of at most `max_len` bytes.
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_len.min(4096)),
            max_len,
            skip_lf: false,
        }
    }

    /// Append received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        let data = if self.skip_lf && !data.is_empty() {
            self.skip_lf = false;
            data.strip_prefix(b"\n").unwrap_or(data)
        } else {
            data
        };
        self.buffer.extend_from_slice(data);
    }

    /// Take the next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let Some(pos) = memchr2(b'\r', b'\n', &self.buffer) else {
            if self.buffer.len() >= self.max_len {
                let line = self.buffer.split_to(self.max_len);
                return Some(String::from_utf8_lossy(&line).into_owned());
            }
            return None;
        };

        let end = pos.min(self.max_len);
        let line = String::from_utf8_lossy(&self.buffer[..end]).into_owned();

        let terminator = self.buffer[pos];
        self.buffer.advance(pos + 1);
        if terminator == b'\r' {
            if self.buffer.first() == Some(&b'\n') {
                self.buffer.advance(1);
            } else if self.buffer.is_empty() {
                self.skip_lf = true;
            }
        }

        Some(line)
    }

    /// Take whatever is buffered as a final, unterminated line.
    pub fn take_remaining(&mut self) -> String {
        let end = self.buffer.len().min(self.max_len);
        let line = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
        self.clear();
        line
    }

    /// Current number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop all buffered input.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.skip_lf = false;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(1024)
    }
}
