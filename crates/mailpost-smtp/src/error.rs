//! Error types for SMTP protocol handling.

/// Result type alias for SMTP protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Protocol error (unexpected input from the server).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server sent a reply that does not start with a three digit code.
    #[error("Malformed reply: {raw:?}")]
    MalformedReply {
        /// The reply text exactly as received.
        raw: String,
    },

    /// Invalid envelope address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Header value would break out of its header line.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl Error {
    /// Creates a malformed-reply error from the raw server text.
    #[must_use]
    pub fn malformed(raw: impl Into<String>) -> Self {
        Self::MalformedReply { raw: raw.into() }
    }

    /// Returns the raw server text if this error came from a bad reply.
    #[must_use]
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            Self::MalformedReply { raw } => Some(raw),
            _ => None,
        }
    }
}
