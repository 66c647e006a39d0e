//! # mailpost-smtp
//!
//! Sans-I/O SMTP submission: everything needed to push one message through
//! an authenticated, STARTTLS-protected SMTP dialog, without owning a socket.
//!
//! ## Features
//!
//! - **Reply decoding**: buffered across reads, multi-line aware
//! - **Reply-code driven state machine**: EHLO, STARTTLS, AUTH LOGIN,
//!   MAIL FROM, RCPT TO, DATA, QUIT
//! - **AUTH LOGIN credentials**: base64 lines, redacted from logs
//! - **Message composition**: headers, body, dot-stuffing, end-of-data marker
//!
//! ## Dialog
//!
//! ```text
//! Init ─220→ Handshake ─250→ Handshake ─220→ TlsNegotiation ─tls→ Authenticate
//!   ─250→ SendUser ─334→ SendPassword ─334→ SendMailFrom ─235→ SendRcptTo
//!   ─250→ SendData ─250→ SendBody ─354→ Quit ─250→ Closed ─any→ delivered
//! ```
//!
//! Any other reply moves the session to `Closed` and fails the submission.
//!
//! ## Modules
//!
//! - [`auth`]: AUTH LOGIN credential encoding
//! - [`command`]: SMTP command builders
//! - [`compose`]: DATA payload composition
//! - [`parser`]: Reply decoder
//! - [`session`]: The submission state machine
//! - [`types`]: Addresses, header values and replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod compose;
mod error;
pub mod parser;
pub mod session;
pub mod types;

pub use auth::Credentials;
pub use compose::{ContentType, Message};
pub use error::{Error, Result};
pub use session::{Action, Completion, Session, State, Transmit};
pub use types::{Address, HeaderValue, Reply, ReplyCode};
