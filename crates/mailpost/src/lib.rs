//! # mailpost
//!
//! Fire-and-forget SMTP submission on tokio.
//!
//! A [`Mailer`] validates a [`MailRequest`], registers a session for it and
//! spawns one task that drives the [`mailpost_smtp::Session`] state machine
//! over TCP, upgrading with STARTTLS and authenticating with AUTH LOGIN.
//! Callers get a [`Delivery`] back immediately and may await its outcome.
//!
//! ## Example
//!
//! ```ignore
//! use mailpost::{MailRequest, Mailer, MailerConfig};
//!
//! let mailer = Mailer::new(MailerConfig::default())?;
//! let delivery = mailer.initiate(
//!     MailRequest::new("smtp.example.com", 587)
//!         .from("alice@example.com")
//!         .to("bob@example.com")
//!         .subject("Hello")
//!         .body("Hi Bob")
//!         .credentials("alice", "app-password"),
//! )?;
//!
//! println!("queued {}", delivery.id());
//! match delivery.outcome().await {
//!     Ok(receipt) => println!("{receipt}"),
//!     Err(err) => eprintln!("failed: {err}"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod delivery;
mod error;
mod mailer;
mod registry;
mod request;
pub mod resolver;
pub mod transport;

pub use config::{MailerConfig, MailerConfigBuilder};
pub use delivery::{Delivery, Outcome, Receipt};
pub use error::{DeliveryError, Error, Result, ValidationError};
pub use mailer::Mailer;
pub use registry::SessionId;
pub use request::MailRequest;
pub use resolver::{Resolver, SystemResolver};
pub use transport::{Connector, MailStream, TcpConnector};

pub use mailpost_smtp::State;
