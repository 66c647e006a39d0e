//! DATA payload composition.

use crate::types::{Address, HeaderValue};

/// End-of-data marker: CRLF, a lone dot, CRLF.
pub const END_OF_DATA: &[u8] = b"\r\n.\r\n";

/// Body content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    /// Plain text; no `Content-Type` header is written.
    #[default]
    Plain,
    /// HTML; adds `Content-Type: text/html;`.
    Html,
}

impl ContentType {
    /// Maps the `is_html` flag used by callers.
    #[must_use]
    pub const fn from_html_flag(is_html: bool) -> Self {
        if is_html { Self::Html } else { Self::Plain }
    }
}

/// A single-recipient message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Envelope sender and `From:` header.
    pub from: Address,
    /// Envelope recipient and `To:` header.
    pub to: Address,
    /// `Subject:` header.
    pub subject: HeaderValue,
    /// Message body.
    pub body: String,
    /// Body content type.
    pub content_type: ContentType,
}

impl Message {
    /// Builds the DATA payload, end-of-data marker included.
    ///
    /// Headers come first (`To`, `From`, optional `Content-Type`, `Subject`),
    /// then a blank line and the body. Body line endings are normalized to
    /// CRLF and lines starting with `.` are dot-stuffed; a body with neither
    /// is copied unchanged.
    #[must_use]
    pub fn compose(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 128);

        push_header(&mut out, "To", self.to.as_str());
        push_header(&mut out, "From", self.from.as_str());
        if self.content_type == ContentType::Html {
            out.extend_from_slice(b"Content-Type: text/html;\r\n");
        }
        push_header(&mut out, "Subject", self.subject.as_str());
        out.extend_from_slice(b"\r\n");

        for (i, line) in self.body.as_bytes().split(|&b| b == b'\n').enumerate() {
            if i > 0 {
                out.extend_from_slice(b"\r\n");
            }
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
        }

        out.extend_from_slice(END_OF_DATA);
        out
    }
}

fn push_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(body: &str, content_type: ContentType) -> Message {
        Message {
            from: Address::new("sender@example.com").unwrap(),
            to: Address::new("rcpt@example.com").unwrap(),
            subject: HeaderValue::new("Hello").unwrap(),
            body: body.to_string(),
            content_type,
        }
    }

    fn composed(body: &str, content_type: ContentType) -> String {
        String::from_utf8(message(body, content_type).compose()).unwrap()
    }

    #[test]
    fn test_plain_payload() {
        assert_eq!(
            composed("Hi there", ContentType::Plain),
            "To: rcpt@example.com\r\nFrom: sender@example.com\r\nSubject: Hello\r\n\r\nHi there\r\n.\r\n"
        );
    }

    #[test]
    fn test_html_payload() {
        assert_eq!(
            composed("<p>Hi</p>", ContentType::Html),
            "To: rcpt@example.com\r\nFrom: sender@example.com\r\nContent-Type: text/html;\r\nSubject: Hello\r\n\r\n<p>Hi</p>\r\n.\r\n"
        );
    }

    #[test]
    fn test_crlf_body_is_unchanged() {
        let payload = composed("line one\r\nline two\r\n", ContentType::Plain);
        assert!(payload.ends_with("\r\n\r\nline one\r\nline two\r\n\r\n.\r\n"));
    }

    #[test]
    fn test_bare_lf_is_normalized() {
        let payload = composed("a\nb", ContentType::Plain);
        assert!(payload.ends_with("\r\n\r\na\r\nb\r\n.\r\n"));
    }

    #[test]
    fn test_leading_dots_are_stuffed() {
        let payload = composed(".\r\n..hidden\r\nend", ContentType::Plain);
        assert!(payload.ends_with("\r\n\r\n..\r\n...hidden\r\nend\r\n.\r\n"));
        // only the terminator is a lone dot line
        assert_eq!(payload.matches("\r\n.\r\n").count(), 1);
    }

    #[test]
    fn test_empty_body() {
        let payload = composed("", ContentType::Plain);
        assert!(payload.ends_with("Subject: Hello\r\n\r\n\r\n.\r\n"));
    }

    #[test]
    fn test_content_type_flag() {
        assert_eq!(ContentType::from_html_flag(true), ContentType::Html);
        assert_eq!(ContentType::from_html_flag(false), ContentType::Plain);
        assert_eq!(ContentType::default(), ContentType::Plain);
    }
}
