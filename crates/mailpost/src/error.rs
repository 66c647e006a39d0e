//! Error types for the mailer.

use std::io;

use mailpost_smtp::State;

/// Result type alias for mailer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned synchronously by the mailer and its transports.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The host is not a valid TLS server name.
    #[error("Invalid server name: {0}")]
    InvalidServerName(String),

    /// The stream is not in a state that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The mail request failed validation.
    #[error("Invalid request: {0}")]
    Invalid(#[from] ValidationError),

    /// The mailer configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration document could not be decoded.
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// No tokio runtime is available to drive the session.
    #[error("No async runtime available; mail not sent")]
    NoRuntime,
}

/// A mail request field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The server host is empty.
    #[error("server host is empty")]
    EmptyHost,
    /// The sender address is empty.
    #[error("sender address is empty")]
    EmptyFrom,
    /// The recipient address is empty.
    #[error("recipient address is empty")]
    EmptyTo,
    /// The subject is empty.
    #[error("subject is empty")]
    EmptySubject,
    /// The username is empty.
    #[error("username is empty")]
    EmptyUsername,
    /// The password is empty.
    #[error("password is empty")]
    EmptyPassword,
    /// A header-bound field contains CR or LF.
    #[error("{field} contains a line break")]
    LineBreak {
        /// Name of the offending field.
        field: &'static str,
    },
}

impl ValidationError {
    /// Returns the name of the field that failed.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyHost => "host",
            Self::EmptyFrom => "from",
            Self::EmptyTo => "to",
            Self::EmptySubject => "subject",
            Self::EmptyUsername => "username",
            Self::EmptyPassword => "password",
            Self::LineBreak { field } => *field,
        }
    }
}

/// Why a delivery did not complete.
///
/// Reported once per session through [`crate::Delivery::outcome`].
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The server answered with a reply the dialog does not accept.
    #[error("rejected in {state}: {}", .reply.trim_end())]
    Rejected {
        /// Dialog state when the reply arrived.
        state: State,
        /// The reply exactly as received.
        reply: String,
    },

    /// The host name did not resolve.
    #[error("could not resolve {host}: {source}")]
    Resolve {
        /// The host that was looked up.
        host: String,
        /// Underlying lookup error.
        #[source]
        source: io::Error,
    },

    /// The TCP connection could not be established.
    #[error("could not connect: {0}")]
    Connect(#[source] io::Error),

    /// Reading from or writing to the server failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// The STARTTLS upgrade failed.
    #[error("TLS upgrade failed: {0}")]
    Transport(#[source] Error),

    /// The server closed the connection before accepting the message.
    #[error("connection closed in {state}")]
    ConnectionClosed {
        /// Dialog state when the connection closed.
        state: State,
    },

    /// The session exceeded its deadline.
    #[error("session timed out")]
    TimedOut,

    /// The mailer shut down, or the session's task ended without reporting.
    #[error("delivery cancelled")]
    Cancelled,
}

impl DeliveryError {
    /// Returns the literal server reply, for rejections.
    #[must_use]
    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Rejected { reply, .. } => Some(reply),
            _ => None,
        }
    }

    /// Returns the dialog state the failure happened in, when known.
    #[must_use]
    pub const fn state(&self) -> Option<State> {
        match self {
            Self::Rejected { state, .. } | Self::ConnectionClosed { state } => Some(*state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_field_names() {
        assert_eq!(ValidationError::EmptyHost.field(), "host");
        assert_eq!(ValidationError::EmptyPassword.field(), "password");
        let err = ValidationError::LineBreak { field: "subject" };
        assert_eq!(err.field(), "subject");
        assert_eq!(err.to_string(), "subject contains a line break");
    }

    #[test]
    fn test_rejection_display_keeps_reply() {
        let err = DeliveryError::Rejected {
            state: State::SendMailFrom,
            reply: "535 5.7.8 Authentication failed\r\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "rejected in SendMailFrom: 535 5.7.8 Authentication failed"
        );
        assert_eq!(err.reply(), Some("535 5.7.8 Authentication failed\r\n"));
        assert_eq!(err.state(), Some(State::SendMailFrom));
    }

    #[test]
    fn test_error_wraps_validation() {
        let err: Error = ValidationError::EmptyTo.into();
        assert!(matches!(err, Error::Invalid(ValidationError::EmptyTo)));
        assert_eq!(err.to_string(), "Invalid request: recipient address is empty");
        assert!(DeliveryError::TimedOut.reply().is_none());
        assert!(DeliveryError::Cancelled.state().is_none());
    }
}
