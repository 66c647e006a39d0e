//! Outgoing protocol data.
//!
// Allow missing_const_for_fn since Vec methods aren't const in stable Rust.
#![allow(clippy::missing_const_for_fn)]

use std::fmt;

/// Bytes the session wants written to the server.
///
/// The session never touches the socket; the I/O layer writes these.
#[derive(Clone, PartialEq, Eq)]
pub struct Transmit {
    /// Raw bytes to send to the server.
    pub data: Vec<u8>,
    sensitive: bool,
}

impl Transmit {
    /// Creates a new transmit from bytes.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            sensitive: false,
        }
    }

    /// Creates a transmit carrying a secret; its contents are never logged.
    #[must_use]
    pub fn secret(data: Vec<u8>) -> Self {
        Self {
            data,
            sensitive: true,
        }
    }

    /// Returns true if the contents must not be logged.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }
}

impl fmt::Debug for Transmit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sensitive {
            return write!(f, "Transmit(<redacted {} bytes>)", self.data.len());
        }
        match std::str::from_utf8(&self.data) {
            Ok(text) => write!(f, "Transmit({:?})", text.trim_end()),
            Err(_) => write!(f, "Transmit(<{} bytes>)", self.data.len()),
        }
    }
}
