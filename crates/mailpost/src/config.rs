//! Mailer configuration.

use std::time::Duration;

use mailpost_smtp::types::has_line_break;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default name announced in `EHLO`.
pub const DEFAULT_CLIENT_NAME: &str = "localhost";

/// Mailer configuration.
///
/// Deserializes from the JSON object a host application passes in; every
/// key is optional and timeouts are given in whole seconds:
///
/// ```json
/// { "client_name": "mx.example.com", "connect_timeout_secs": 10,
///   "session_timeout_secs": 60, "accept_invalid_certs": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailerConfig {
    /// Name announced in `EHLO`.
    pub client_name: String,
    /// Upper bound on establishing the TCP connection.
    #[serde(rename = "connect_timeout_secs", with = "secs")]
    pub connect_timeout: Duration,
    /// Upper bound on a whole session, from resolution to outcome.
    #[serde(rename = "session_timeout_secs", with = "secs")]
    pub session_timeout: Duration,
    /// Skip server certificate validation after STARTTLS.
    ///
    /// **Only for test servers with self-signed certificates.**
    pub accept_invalid_certs: bool,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            connect_timeout: Duration::from_secs(30),
            session_timeout: Duration::from_secs(120),
            accept_invalid_certs: false,
        }
    }
}

impl MailerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> MailerConfigBuilder {
        MailerConfigBuilder::default()
    }

    /// Decodes a configuration from a JSON value and validates it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the value has the wrong shape, or
    /// `Error::Config` if it fails [`MailerConfig::validate`].
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can drive a session.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an empty or multi-line client name, or a
    /// zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.client_name.is_empty() {
            return Err(Error::Config("client_name is empty".to_string()));
        }
        if has_line_break(&self.client_name) {
            return Err(Error::Config("client_name contains a line break".to_string()));
        }
        if self.connect_timeout.is_zero() || self.session_timeout.is_zero() {
            return Err(Error::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for [`MailerConfig`].
#[derive(Debug, Clone, Default)]
pub struct MailerConfigBuilder {
    config: MailerConfig,
}

impl MailerConfigBuilder {
    /// Sets the name announced in `EHLO`.
    #[must_use]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the session deadline.
    #[must_use]
    pub const fn session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_timeout = timeout;
        self
    }

    /// Accepts any server certificate. **Not for production.**
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.accept_invalid_certs = accept;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> MailerConfig {
        self.config
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
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
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = MailerConfig::default();
        assert_eq!(config.client_name, "localhost");
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.session_timeout, Duration::from_secs(120));
        assert!(!config.accept_invalid_certs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = MailerConfig::builder()
            .client_name("relay.example.com")
            .connect_timeout(Duration::from_secs(5))
            .session_timeout(Duration::from_secs(45))
            .accept_invalid_certs(true)
            .build();

        assert_eq!(config.client_name, "relay.example.com");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.session_timeout, Duration::from_secs(45));
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn test_from_json_partial() {
        let config = MailerConfig::from_json(json!({
            "client_name": "smtpclient.example",
            "session_timeout_secs": 15
        }))
        .unwrap();

        assert_eq!(config.client_name, "smtpclient.example");
        assert_eq!(config.session_timeout, Duration::from_secs(15));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_json_empty_object() {
        let config = MailerConfig::from_json(json!({})).unwrap();
        assert_eq!(config, MailerConfig::default());
    }

    #[test]
    fn test_from_json_wrong_type() {
        let err = MailerConfig::from_json(json!({ "connect_timeout_secs": "soon" })).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_json_rejects_injected_name() {
        let err = MailerConfig::from_json(json!({ "client_name": "a\r\nRSET" })).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let config = MailerConfig::builder().session_timeout(Duration::ZERO).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_uses_seconds() {
        let value = serde_json::to_value(MailerConfig::default()).unwrap();
        assert_eq!(value["connect_timeout_secs"], 30);
        assert_eq!(value["session_timeout_secs"], 120);
    }
}
