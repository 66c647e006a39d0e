//! Sans-I/O submission state machine.
//!
//! A [`Session`] drives one message through the dialog
//! `greeting → EHLO → STARTTLS → EHLO → AUTH LOGIN → MAIL → RCPT → DATA → QUIT`
//! purely from reply codes. It performs no I/O:
//!
//! - Feed server bytes with [`Session::handle_input`]
//! - Write every [`Action::Send`] it returns
//! - On [`Action::StartTls`], upgrade the transport and call
//!   [`Session::handle_tls_established`], then write the transmit it returns
//! - On [`Action::Complete`], report the outcome and close the connection
//!
//! Any reply other than the one expected in the current state ends the
//! dialog; no command is retried.
//!
//! ```
//! use mailpost_smtp::session::{Action, Session, State};
//! use mailpost_smtp::{Address, ContentType, Credentials, HeaderValue, Message};
//!
//! let message = Message {
//!     from: Address::new("me@example.com").unwrap(),
//!     to: Address::new("you@example.com").unwrap(),
//!     subject: HeaderValue::new("Hi").unwrap(),
//!     body: "Hello".into(),
//!     content_type: ContentType::Plain,
//! };
//! let mut session = Session::new("client.example.com", message, Credentials::new("me", "pw"));
//!
//! let actions = session.handle_input(b"220 mx.example.com ESMTP\r\n");
//! assert!(matches!(&actions[..], [Action::Send(t)] if t.data == b"EHLO client.example.com\r\n"));
//! assert_eq!(session.state(), State::Handshake);
//! ```

mod state;
mod transmit;

use std::fmt;

pub use state::State;
pub use transmit::Transmit;

use crate::auth::{Credentials, encode_credential};
use crate::command::Command;
use crate::compose::Message;
use crate::parser::ReplyDecoder;
use crate::types::{Reply, ReplyCode};

/// What the I/O layer must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write these bytes to the server.
    Send(Transmit),
    /// Upgrade the connection to TLS, then call
    /// [`Session::handle_tls_established`].
    StartTls,
    /// The dialog is over; report the outcome and close.
    Complete(Completion),
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The server accepted the message.
    Delivered,
    /// The server sent an unexpected or malformed reply.
    Rejected {
        /// State the session was in when the reply arrived.
        state: State,
        /// The reply exactly as received.
        reply: String,
    },
    /// The connection closed before the message was accepted.
    ConnectionLost {
        /// State the session was in.
        state: State,
    },
}

impl Completion {
    /// Returns true if the message was delivered.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => f.write_str("delivered"),
            Self::Rejected { state, reply } => {
                write!(f, "rejected in {state}: {}", reply.trim_end())
            }
            Self::ConnectionLost { state } => write!(f, "connection lost in {state}"),
        }
    }
}

/// What a transition asks for, before it is rendered to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Ehlo,
    StartTls,
    Upgrade,
    AuthLogin,
    Username,
    Password,
    MailFrom,
    RcptTo,
    Data,
    Payload,
    Quit,
    Finish,
}

/// The transition table: `(state, code) → (directive, next state)`.
///
/// `None` means the reply is not acceptable in this state.
const fn transition(state: State, code: ReplyCode) -> Option<(Directive, State)> {
    let step = match (state, code) {
        (State::Init, ReplyCode::SERVICE_READY) => (Directive::Ehlo, State::Handshake),
        (State::Handshake, ReplyCode::OK) => (Directive::StartTls, State::Handshake),
        (State::Handshake, ReplyCode::SERVICE_READY) => (Directive::Upgrade, State::TlsNegotiation),
        (State::Authenticate, ReplyCode::OK) => (Directive::AuthLogin, State::SendUser),
        (State::SendUser, ReplyCode::AUTH_CONTINUE) => (Directive::Username, State::SendPassword),
        (State::SendPassword, ReplyCode::AUTH_CONTINUE) => {
            (Directive::Password, State::SendMailFrom)
        }
        (State::SendMailFrom, ReplyCode::AUTH_SUCCEEDED) => {
            (Directive::MailFrom, State::SendRcptTo)
        }
        (State::SendRcptTo, ReplyCode::OK) => (Directive::RcptTo, State::SendData),
        (State::SendData, ReplyCode::OK) => (Directive::Data, State::SendBody),
        (State::SendBody, ReplyCode::START_DATA) => (Directive::Payload, State::Quit),
        (State::Quit, ReplyCode::OK) => (Directive::Quit, State::Closed),
        (State::Closed, _) => (Directive::Finish, State::Closed),
        (
            State::Init
            | State::Handshake
            | State::TlsNegotiation
            | State::Authenticate
            | State::SendUser
            | State::SendPassword
            | State::SendMailFrom
            | State::SendRcptTo
            | State::SendData
            | State::SendBody
            | State::Quit,
            _,
        ) => return None,
    };
    Some(step)
}

/// One message submission.
#[derive(Debug)]
pub struct Session {
    state: State,
    client_name: String,
    message: Message,
    credentials: Credentials,
    decoder: ReplyDecoder,
    /// EHLO held back until the TLS upgrade completes.
    deferred: Option<Transmit>,
    completed: bool,
}

impl Session {
    /// Creates a session in [`State::Init`].
    #[must_use]
    pub fn new(client_name: impl Into<String>, message: Message, credentials: Credentials) -> Self {
        Self {
            state: State::Init,
            client_name: client_name.into(),
            message,
            credentials,
            decoder: ReplyDecoder::new(),
            deferred: None,
            completed: false,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Returns true once an [`Action::Complete`] has been produced.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.completed
    }

    /// Returns the message being submitted.
    #[must_use]
    pub const fn message(&self) -> &Message {
        &self.message
    }

    /// Feeds bytes received from the server.
    ///
    /// Bytes may hold part of a reply, one reply, or several; each complete
    /// reply advances the session once. Nothing is produced after completion.
    pub fn handle_input(&mut self, data: &[u8]) -> Vec<Action> {
        if self.completed {
            tracing::trace!(len = data.len(), "input after completion ignored");
            return Vec::new();
        }

        self.decoder.feed(data);
        let mut actions = Vec::new();

        while let Some(decoded) = self.decoder.next_reply() {
            let action = match decoded {
                Ok(reply) => self.handle_reply(&reply),
                // QUIT already went out after the payload was accepted
                Err(_) if self.state == State::Closed => Some(self.delivered()),
                Err(err) => {
                    let raw = err.raw_reply().unwrap_or_default().to_string();
                    tracing::debug!(state = %self.state, raw = %raw.trim_end(), "malformed reply");
                    Some(self.fail(raw))
                }
            };
            match action {
                Some(Action::Complete(completion)) => {
                    // Never upgrade a connection whose dialog already failed
                    actions.retain(|a| !matches!(a, Action::StartTls));
                    actions.push(Action::Complete(completion));
                    return actions;
                }
                Some(action) => actions.push(action),
                None => {}
            }
        }

        // Plaintext bytes pipelined behind the STARTTLS go-ahead
        if self.state == State::TlsNegotiation && self.decoder.has_partial() {
            tracing::debug!("unexpected data before TLS upgrade");
            actions.retain(|a| !matches!(a, Action::StartTls));
            actions.push(self.fail(String::new()));
        }

        actions
    }

    /// Advances the session by one decoded reply.
    ///
    /// Returns `None` once the session has completed.
    pub fn handle_reply(&mut self, reply: &Reply) -> Option<Action> {
        if self.completed {
            return None;
        }

        let Some((directive, next)) = transition(self.state, reply.code) else {
            tracing::debug!(state = %self.state, code = %reply.code, "unexpected reply");
            return Some(self.fail(reply.raw().to_string()));
        };

        tracing::debug!(from = %self.state, to = %next, code = %reply.code, "transition");
        self.state = next;

        let action = match directive {
            Directive::Ehlo => Action::Send(self.ehlo()),
            Directive::StartTls => Action::Send(command(&Command::StartTls)),
            Directive::Upgrade => {
                self.deferred = Some(self.ehlo());
                Action::StartTls
            }
            Directive::AuthLogin => Action::Send(command(&Command::AuthLogin)),
            Directive::Username => Action::Send(Transmit::secret(
                encode_credential(self.credentials.username().as_bytes()).into_bytes(),
            )),
            Directive::Password => Action::Send(Transmit::secret(
                encode_credential(self.credentials.password().as_bytes()).into_bytes(),
            )),
            Directive::MailFrom => Action::Send(command(&Command::MailFrom {
                from: self.message.from.clone(),
            })),
            Directive::RcptTo => Action::Send(command(&Command::RcptTo {
                to: self.message.to.clone(),
            })),
            Directive::Data => Action::Send(command(&Command::Data)),
            Directive::Payload => Action::Send(Transmit::new(self.message.compose())),
            Directive::Quit => Action::Send(command(&Command::Quit)),
            Directive::Finish => self.delivered(),
        };
        Some(action)
    }

    /// Signals that the encrypted channel is established.
    ///
    /// Returns the EHLO to send over it. Outside [`State::TlsNegotiation`]
    /// this does nothing.
    pub fn handle_tls_established(&mut self) -> Option<Transmit> {
        if self.completed || self.state != State::TlsNegotiation {
            return None;
        }
        tracing::debug!(from = %self.state, to = %State::Authenticate, "tls established");
        self.state = State::Authenticate;
        self.deferred.take()
    }

    /// Signals that the connection closed.
    ///
    /// Once QUIT has been sent the message was already accepted, so closing
    /// then counts as delivered. Returns `None` if already complete.
    pub fn handle_disconnect(&mut self) -> Option<Completion> {
        if self.completed {
            return None;
        }
        self.completed = true;
        let completion = if self.state == State::Closed {
            Completion::Delivered
        } else {
            Completion::ConnectionLost { state: self.state }
        };
        self.state = State::Closed;
        Some(completion)
    }

    fn ehlo(&self) -> Transmit {
        command(&Command::Ehlo {
            hostname: self.client_name.clone(),
        })
    }

    fn delivered(&mut self) -> Action {
        self.completed = true;
        Action::Complete(Completion::Delivered)
    }

    fn fail(&mut self, reply: String) -> Action {
        let state = self.state;
        self.state = State::Closed;
        self.completed = true;
        self.deferred = None;
        Action::Complete(Completion::Rejected { state, reply })
    }
}

fn command(cmd: &Command) -> Transmit {
    tracing::trace!(verb = cmd.verb(), "command");
    Transmit::new(cmd.serialize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::too_many_lines)]
mod tests {
    use super::*;
    use crate::compose::ContentType;
    use crate::types::{Address, HeaderValue};

    fn session() -> Session {
        let message = Message {
            from: Address::new("from@example.com").unwrap(),
            to: Address::new("to@example.com").unwrap(),
            subject: HeaderValue::new("Subject").unwrap(),
            body: "Body".to_string(),
            content_type: ContentType::Plain,
        };
        Session::new("client.test", message, Credentials::new("user", "pass"))
    }

    fn sent(actions: &[Action]) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send(t) => Some(String::from_utf8(t.data.clone()).unwrap()),
                _ => None,
            })
            .collect()
    }

    /// Drives a session up to `Authenticate`.
    fn upgraded() -> Session {
        let mut s = session();
        s.handle_input(b"220 mx ESMTP\r\n");
        s.handle_input(b"250-mx\r\n250 STARTTLS\r\n");
        s.handle_input(b"220 Ready to start TLS\r\n");
        s.handle_tls_established().unwrap();
        s
    }

    #[test]
    fn test_happy_path() {
        let mut s = session();
        let mut wire = Vec::new();

        wire.extend(sent(&s.handle_input(b"220 mx.example.com ESMTP\r\n")));
        assert_eq!(s.state(), State::Handshake);

        wire.extend(sent(&s.handle_input(b"250-mx.example.com\r\n250 STARTTLS\r\n")));
        assert_eq!(s.state(), State::Handshake);

        let actions = s.handle_input(b"220 2.0.0 Ready to start TLS\r\n");
        assert_eq!(actions, vec![Action::StartTls]);
        assert_eq!(s.state(), State::TlsNegotiation);

        let ehlo = s.handle_tls_established().unwrap();
        wire.push(String::from_utf8(ehlo.data).unwrap());
        assert_eq!(s.state(), State::Authenticate);

        for reply in [
            &b"250-mx.example.com\r\n250 AUTH LOGIN PLAIN\r\n"[..],
            b"334 VXNlcm5hbWU6\r\n",
            b"334 UGFzc3dvcmQ6\r\n",
            b"235 2.7.0 Authentication successful\r\n",
            b"250 2.1.0 Ok\r\n",
            b"250 2.1.5 Ok\r\n",
            b"354 End data with <CR><LF>.<CR><LF>\r\n",
            b"250 2.0.0 Ok: queued\r\n",
        ] {
            wire.extend(sent(&s.handle_input(reply)));
        }
        assert_eq!(s.state(), State::Closed);
        assert!(!s.is_complete());

        let actions = s.handle_input(b"221 2.0.0 Bye\r\n");
        assert_eq!(actions, vec![Action::Complete(Completion::Delivered)]);
        assert!(s.is_complete());

        assert_eq!(
            wire,
            vec![
                "EHLO client.test\r\n".to_string(),
                "STARTTLS\r\n".to_string(),
                "EHLO client.test\r\n".to_string(),
                "AUTH LOGIN\r\n".to_string(),
                "dXNlcg==\r\n".to_string(),
                "cGFzcw==\r\n".to_string(),
                "MAIL FROM:<from@example.com>\r\n".to_string(),
                "RCPT TO:<to@example.com>\r\n".to_string(),
                "DATA\r\n".to_string(),
                "To: to@example.com\r\nFrom: from@example.com\r\nSubject: Subject\r\n\r\nBody\r\n.\r\n"
                    .to_string(),
                "QUIT\r\n".to_string(),
            ]
        );
    }

    #[test]
    fn test_state_never_regresses() {
        let mut s = session();
        let mut last = s.state();
        for reply in [
            &b"220 hi\r\n"[..],
            b"250 STARTTLS\r\n",
            b"220 go\r\n",
        ] {
            s.handle_input(reply);
            assert!(s.state() >= last);
            last = s.state();
        }
        s.handle_tls_established();
        for reply in [
            &b"250 ok\r\n"[..],
            b"334 a\r\n",
            b"334 b\r\n",
            b"235 ok\r\n",
            b"250 ok\r\n",
            b"250 ok\r\n",
            b"354 go\r\n",
            b"250 ok\r\n",
        ] {
            s.handle_input(reply);
            assert!(s.state() >= last);
            last = s.state();
        }
        assert_eq!(last, State::Closed);
    }

    #[test]
    fn test_credentials_are_sensitive() {
        let mut s = upgraded();
        s.handle_input(b"250 ok\r\n");
        let actions = s.handle_input(b"334 VXNlcm5hbWU6\r\n");
        match &actions[..] {
            [Action::Send(t)] => assert!(t.is_sensitive()),
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn test_unexpected_code_fails_with_raw_reply() {
        let mut s = upgraded();
        s.handle_input(b"250 ok\r\n");
        s.handle_input(b"334 VXNlcm5hbWU6\r\n");
        s.handle_input(b"334 UGFzc3dvcmQ6\r\n");

        let actions = s.handle_input(b"535 5.7.8 Authentication credentials invalid\r\n");
        assert_eq!(
            actions,
            vec![Action::Complete(Completion::Rejected {
                state: State::SendMailFrom,
                reply: "535 5.7.8 Authentication credentials invalid\r\n".to_string(),
            })]
        );
        assert_eq!(s.state(), State::Closed);
        assert!(s.is_complete());
        assert!(s.handle_input(b"250 ok\r\n").is_empty());
    }

    #[test]
    fn test_greeting_rejection() {
        let mut s = session();
        let actions = s.handle_input(b"554 No SMTP service here\r\n");
        assert!(matches!(
            &actions[..],
            [Action::Complete(Completion::Rejected { state: State::Init, reply })]
                if reply == "554 No SMTP service here\r\n"
        ));
    }

    #[test]
    fn test_multi_line_rejection_keeps_all_lines() {
        let mut s = session();
        let actions = s.handle_input(b"421-mx busy\r\n421 try later\r\n");
        assert!(matches!(
            &actions[..],
            [Action::Complete(Completion::Rejected { reply, .. })]
                if reply == "421-mx busy\r\n421 try later\r\n"
        ));
    }

    #[test]
    fn test_malformed_reply_fails() {
        let mut s = session();
        let actions = s.handle_input(b"hi\r\n");
        assert!(matches!(
            &actions[..],
            [Action::Complete(Completion::Rejected { state: State::Init, reply })] if reply == "hi\r\n"
        ));
    }

    #[test]
    fn test_split_reply_waits() {
        let mut s = session();
        assert!(s.handle_input(b"22").is_empty());
        assert_eq!(s.state(), State::Init);
        let actions = s.handle_input(b"0 ready\r\n");
        assert_eq!(sent(&actions), vec!["EHLO client.test\r\n".to_string()]);
    }

    #[test]
    fn test_starttls_refused() {
        let mut s = session();
        s.handle_input(b"220 hi\r\n");
        s.handle_input(b"250 ok\r\n");
        let actions = s.handle_input(b"454 TLS not available\r\n");
        assert!(matches!(
            &actions[..],
            [Action::Complete(Completion::Rejected { state: State::Handshake, .. })]
        ));
    }

    #[test]
    fn test_ehlo_only_sent_after_upgrade() {
        let mut s = session();
        s.handle_input(b"220 hi\r\n");
        s.handle_input(b"250 STARTTLS\r\n");
        let actions = s.handle_input(b"220 go ahead\r\n");
        assert!(sent(&actions).is_empty());
        let ehlo = s.handle_tls_established().unwrap();
        assert_eq!(ehlo.data, b"EHLO client.test\r\n");
        // second signal is ignored
        assert!(s.handle_tls_established().is_none());
    }

    #[test]
    fn test_tls_established_outside_negotiation_is_ignored() {
        let mut s = session();
        assert!(s.handle_tls_established().is_none());
        assert_eq!(s.state(), State::Init);
    }

    #[test]
    fn test_reply_during_negotiation_fails() {
        let mut s = session();
        s.handle_input(b"220 hi\r\n");
        s.handle_input(b"250 STARTTLS\r\n");
        s.handle_input(b"220 go ahead\r\n");
        let actions = s.handle_input(b"250 injected\r\n");
        assert!(matches!(
            &actions[..],
            [Action::Complete(Completion::Rejected { state: State::TlsNegotiation, .. })]
        ));
    }

    #[test]
    fn test_data_pipelined_behind_go_ahead_fails() {
        let mut s = session();
        s.handle_input(b"220 hi\r\n");
        s.handle_input(b"250 STARTTLS\r\n");
        let actions = s.handle_input(b"220 go ahead\r\n250 injected\r\n");
        assert!(!actions.contains(&Action::StartTls));
        assert!(matches!(actions.last(), Some(Action::Complete(Completion::Rejected { .. }))));

        let mut s = session();
        s.handle_input(b"220 hi\r\n");
        s.handle_input(b"250 STARTTLS\r\n");
        let actions = s.handle_input(b"220 go ahead\r\n25");
        assert!(!actions.contains(&Action::StartTls));
        assert!(s.is_complete());
    }

    #[test]
    fn test_disconnect_before_acceptance() {
        let mut s = upgraded();
        assert_eq!(
            s.handle_disconnect(),
            Some(Completion::ConnectionLost {
                state: State::Authenticate
            })
        );
        assert_eq!(s.state(), State::Closed);
        assert!(s.handle_disconnect().is_none());
    }

    #[test]
    fn test_disconnect_after_quit_counts_as_delivered() {
        let mut s = upgraded();
        for reply in [
            &b"250 ok\r\n"[..],
            b"334 a\r\n",
            b"334 b\r\n",
            b"235 ok\r\n",
            b"250 ok\r\n",
            b"250 ok\r\n",
            b"354 go\r\n",
            b"250 queued\r\n",
        ] {
            s.handle_input(reply);
        }
        assert_eq!(s.handle_disconnect(), Some(Completion::Delivered));
    }

    #[test]
    fn test_garbled_goodbye_after_quit_is_delivered() {
        let mut s = upgraded();
        for reply in [
            &b"250 ok\r\n"[..],
            b"334 a\r\n",
            b"334 b\r\n",
            b"235 ok\r\n",
            b"250 ok\r\n",
            b"250 ok\r\n",
            b"354 go\r\n",
            b"250 queued\r\n",
        ] {
            s.handle_input(reply);
        }
        assert_eq!(s.state(), State::Closed);

        let actions = s.handle_input(b"Bye\r\n");
        assert_eq!(actions, vec![Action::Complete(Completion::Delivered)]);
        assert!(s.is_complete());
        assert!(s.handle_input(b"221 late\r\n").is_empty());
    }

    #[test]
    fn test_completion_display() {
        assert_eq!(Completion::Delivered.to_string(), "delivered");
        let rejected = Completion::Rejected {
            state: State::SendRcptTo,
            reply: "550 no such user\r\n".to_string(),
        };
        assert_eq!(rejected.to_string(), "rejected in SendRcptTo: 550 no such user");
        assert!(!rejected.is_delivered());
    }
}
