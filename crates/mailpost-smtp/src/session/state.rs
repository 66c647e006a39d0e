//! Submission dialog states.

use std::fmt;

/// Where a submission stands in the SMTP dialog.
///
/// Variants are declared in dialog order, so `Ord` follows progress: a
/// session only ever moves to an equal or greater state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum State {
    /// Connected, waiting for the `220` greeting.
    #[default]
    Init,
    /// EHLO sent; waiting for its `250`, then for the `220` to STARTTLS.
    Handshake,
    /// TLS handshake in progress; no replies are expected.
    TlsNegotiation,
    /// Post-upgrade EHLO sent; waiting for its `250`.
    Authenticate,
    /// AUTH LOGIN sent; waiting for the username prompt.
    SendUser,
    /// Username sent; waiting for the password prompt.
    SendPassword,
    /// Password sent; waiting for `235`.
    SendMailFrom,
    /// MAIL FROM sent.
    SendRcptTo,
    /// RCPT TO sent.
    SendData,
    /// DATA sent; waiting for `354`.
    SendBody,
    /// Payload sent; waiting for the server to accept it.
    Quit,
    /// QUIT sent, or the dialog failed.
    Closed,
}

impl State {
    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::Handshake => "Handshake",
            Self::TlsNegotiation => "TlsNegotiation",
            Self::Authenticate => "Authenticate",
            Self::SendUser => "SendUser",
            Self::SendPassword => "SendPassword",
            Self::SendMailFrom => "SendMailFrom",
            Self::SendRcptTo => "SendRcptTo",
            Self::SendData => "SendData",
            Self::SendBody => "SendBody",
            Self::Quit => "Quit",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_init() {
        assert_eq!(State::default(), State::Init);
    }

    #[test]
    fn test_order_follows_dialog() {
        assert!(State::Init < State::Handshake);
        assert!(State::Handshake < State::TlsNegotiation);
        assert!(State::SendBody < State::Quit);
        assert!(State::Quit < State::Closed);
    }

    #[test]
    fn test_terminal() {
        assert!(State::Closed.is_terminal());
        assert!(!State::Quit.is_terminal());
        assert_eq!(State::TlsNegotiation.to_string(), "TlsNegotiation");
    }
}
