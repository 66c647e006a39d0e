//! SMTP reply decoding.
//!
//! Replies arrive as CRLF-terminated lines. A reply can span several lines:
//!
//! - Single: `250 OK\r\n`
//! - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
//!
//! [`ReplyDecoder`] accepts bytes exactly as they come off the socket, so a
//! reply split over several reads, or several replies in one read, decode the
//! same way as one reply per read.

use bytes::BytesMut;

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Upper bound for one reply, all of its lines together.
pub const MAX_REPLY_LENGTH: usize = 64 * 1024;

/// Parses an SMTP reply from response lines (terminators already stripped).
///
/// # Errors
///
/// Returns an error if the reply is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::Protocol("Empty reply".into()));
    };

    let Some(code_str) = first.get(0..3) else {
        return Err(Error::Protocol(format!("Reply too short: {first}")));
    };

    if !code_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Protocol(format!("Invalid reply code: {code_str}")));
    }
    let code = code_str
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {code_str}")))?;

    // Skip code and separator ("250-" or "250 ")
    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        match line.get(4..) {
            Some(text) => message.push(text.to_string()),
            None if line.len() <= 4 => message.push(String::new()),
            None => return Err(Error::Protocol(format!("Malformed reply line: {line}"))),
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

/// Checks if a line continues a multi-line reply (`250-...`).
#[must_use]
pub fn is_continuation_line(line: &str) -> bool {
    line.len() >= 4 && line.as_bytes()[3] == b'-'
}

/// Incremental reply decoder.
#[derive(Debug, Default)]
pub struct ReplyDecoder {
    buffer: BytesMut,
    lines: Vec<String>,
    raw: String,
}

impl ReplyDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes received from the server.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns true if part of a reply is buffered but not yet complete.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty() || !self.lines.is_empty()
    }

    /// Decodes the next complete reply, if one is buffered.
    ///
    /// A malformed reply is returned as [`Error::MalformedReply`] carrying the
    /// raw text; the decoder stays usable afterwards.
    pub fn next_reply(&mut self) -> Option<Result<Reply>> {
        loop {
            let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') else {
                if self.raw.len() + self.buffer.len() > MAX_REPLY_LENGTH {
                    let mut raw = std::mem::take(&mut self.raw);
                    raw.push_str(&String::from_utf8_lossy(&self.buffer));
                    self.buffer.clear();
                    self.lines.clear();
                    return Some(Err(Error::malformed(raw)));
                }
                return None;
            };

            let chunk = self.buffer.split_to(pos + 1);
            let text = String::from_utf8_lossy(&chunk);
            let line = text.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }

            self.raw.push_str(&text);
            let is_last = !is_continuation_line(line);
            self.lines.push(line.to_string());

            if !is_last && self.raw.len() > MAX_REPLY_LENGTH {
                // Drop the oversized reply; its remaining lines decode as new replies.
                self.lines.clear();
                return Some(Err(Error::malformed(std::mem::take(&mut self.raw))));
            }

            if is_last {
                let lines = std::mem::take(&mut self.lines);
                let raw = std::mem::take(&mut self.raw);
                let reply = match parse_reply(&lines) {
                    Ok(reply) => Ok(Reply::with_raw(reply.code, reply.message, raw)),
                    Err(_) => Err(Error::malformed(raw)),
                };
                return Some(reply);
            }
        }
    }
}
