//! Mail requests and their validation.

use std::fmt;

use mailpost_smtp::{Address, ContentType, Credentials, HeaderValue, Message};

use crate::error::ValidationError;

/// Everything needed to submit one message.
///
/// Built with chained setters and handed to [`crate::Mailer::initiate`],
/// which validates it before any network activity.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MailRequest {
    /// SMTP server host name or address.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// AUTH LOGIN username.
    pub username: String,
    /// AUTH LOGIN password.
    pub password: String,
    /// Send the body as `text/html`.
    pub is_html: bool,
}

impl MailRequest {
    /// Creates a request addressed to an SMTP server.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Sets the sender address.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    /// Sets the recipient address.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the AUTH LOGIN credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Marks the body as HTML.
    #[must_use]
    pub const fn html(mut self, is_html: bool) -> Self {
        self.is_html = is_html;
        self
    }

    /// Checks every field and builds the protocol-level message.
    ///
    /// # Errors
    ///
    /// Returns the first failing field: an empty host, sender, recipient,
    /// subject, username or password, or a line break in the sender,
    /// recipient or subject.
    pub fn validate(&self) -> Result<(Message, Credentials), ValidationError> {
        if self.host.is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        let from = address(&self.from, "from", ValidationError::EmptyFrom)?;
        let to = address(&self.to, "to", ValidationError::EmptyTo)?;
        if self.subject.is_empty() {
            return Err(ValidationError::EmptySubject);
        }
        let subject = HeaderValue::new(self.subject.as_str())
            .map_err(|_| ValidationError::LineBreak { field: "subject" })?;
        if self.username.is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if self.password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }

        let message = Message {
            from,
            to,
            subject,
            body: self.body.clone(),
            content_type: ContentType::from_html_flag(self.is_html),
        };
        Ok((message, Credentials::new(self.username.as_str(), self.password.as_str())))
    }
}

fn address(
    value: &str,
    field: &'static str,
    empty: ValidationError,
) -> Result<Address, ValidationError> {
    if value.is_empty() {
        return Err(empty);
    }
    Address::new(value).map_err(|_| ValidationError::LineBreak { field })
}

impl fmt::Debug for MailRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailRequest")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .field("username", &self.username)
            .field("is_html", &self.is_html)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn request() -> MailRequest {
        MailRequest::new("smtp.example.com", 587)
            .from("alice@example.com")
            .to("bob@example.com")
            .subject("Lunch")
            .body("Noon?")
            .credentials("alice", "hunter2")
    }

    #[test]
    fn test_valid_request() {
        let (message, credentials) = request().validate().unwrap();
        assert_eq!(message.from.as_str(), "alice@example.com");
        assert_eq!(message.to.as_str(), "bob@example.com");
        assert_eq!(message.subject.as_str(), "Lunch");
        assert_eq!(message.body, "Noon?");
        assert_eq!(message.content_type, ContentType::Plain);
        assert_eq!(credentials.username(), "alice");
        assert_eq!(credentials.password(), "hunter2");
    }

    #[test]
    fn test_html_flag() {
        let (message, _) = request().html(true).validate().unwrap();
        assert_eq!(message.content_type, ContentType::Html);
    }

    #[test]
    fn test_empty_body_is_allowed() {
        assert!(request().body("").validate().is_ok());
    }

    #[test]
    fn test_empty_fields() {
        let cases = [
            (MailRequest { host: String::new(), ..request() }, ValidationError::EmptyHost),
            (request().from(""), ValidationError::EmptyFrom),
            (request().to(""), ValidationError::EmptyTo),
            (request().subject(""), ValidationError::EmptySubject),
            (request().credentials("", "hunter2"), ValidationError::EmptyUsername),
            (request().credentials("alice", ""), ValidationError::EmptyPassword),
        ];
        for (req, expected) in cases {
            assert_eq!(req.validate().unwrap_err(), expected);
        }
    }

    #[test]
    fn test_line_breaks() {
        let err = request().from("alice@example.com\r\nRCPT TO:<x@y>").validate().unwrap_err();
        assert_eq!(err, ValidationError::LineBreak { field: "from" });

        let err = request().to("bob@example.com\n").validate().unwrap_err();
        assert_eq!(err.field(), "to");

        let err = request().subject("Hi\rBcc: eve@example.com").validate().unwrap_err();
        assert_eq!(err.field(), "subject");
    }

    #[test]
    fn test_debug_hides_password() {
        let shown = format!("{:?}", request());
        assert!(shown.contains("alice@example.com"));
        assert!(!shown.contains("hunter2"));
    }
}
