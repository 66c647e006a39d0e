//! Envelope address and header value types.
//!
//! Both types refuse carriage returns and line feeds, so a value that made it
//! into one of them can be written into a command line or a header without
//! splitting it.

use crate::error::{Error, Result};

/// Email address for the SMTP envelope and the `From:`/`To:` headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty or contains a line break.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if has_line_break(addr) {
            return Err(Error::InvalidAddress(
                "Address cannot contain line breaks".into(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Single-line header value, such as the subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeaderValue(String);

impl HeaderValue {
    /// Creates a header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value contains a line break.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if has_line_break(&value) {
            return Err(Error::InvalidHeader(
                "Header value cannot contain line breaks".into(),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns true if `s` contains a carriage return or a line feed.
#[must_use]
pub fn has_line_break(s: &str) -> bool {
    s.contains(['\r', '\n'])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert_eq!(addr.to_string(), "user@example.com");
    }

    #[test]
    fn test_invalid_address_empty() {
        assert!(Address::new("").is_err());
    }

    #[test]
    fn test_invalid_address_line_feed() {
        let err = Address::new("user@example.com\nRCPT TO:<victim@example.com>").unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }

    #[test]
    fn test_invalid_address_carriage_return() {
        assert!(Address::new("user@example.com\r").is_err());
    }

    #[test]
    fn test_header_value() {
        let subject = HeaderValue::new("Quarterly report").unwrap();
        assert_eq!(subject.as_str(), "Quarterly report");
        assert!(HeaderValue::new("").is_ok());
    }

    #[test]
    fn test_header_value_injection() {
        let err = HeaderValue::new("Hi\r\nBcc: everyone@example.com").unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn test_has_line_break() {
        assert!(has_line_break("a\nb"));
        assert!(has_line_break("a\rb"));
        assert!(!has_line_break("a b"));
    }
}
