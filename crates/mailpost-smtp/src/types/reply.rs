//! SMTP reply types.

/// SMTP reply from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g., 250).
    pub code: ReplyCode,
    /// Reply message lines, without code and separator.
    pub message: Vec<String>,
    raw: String,
}

impl Reply {
    /// Creates a new reply.
    ///
    /// The raw text is rebuilt from the code and message lines.
    #[must_use]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        let raw = render_raw(code, &message);
        Self { code, message, raw }
    }

    /// Creates a reply that keeps the exact text received from the server.
    #[must_use]
    pub fn with_raw(code: ReplyCode, message: Vec<String>, raw: impl Into<String>) -> Self {
        Self {
            code,
            message,
            raw: raw.into(),
        }
    }

    /// Returns the reply exactly as it arrived on the wire, CRLFs included.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.message.join("\n"))
    }
}

fn render_raw(code: ReplyCode, message: &[String]) -> String {
    if message.is_empty() {
        return format!("{code}\r\n");
    }
    let last = message.len() - 1;
    message
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let sep = if i == last { ' ' } else { '-' };
            format!("{code}{sep}{line}\r\n")
        })
        .collect()
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Codes the submission dialog reacts to
impl ReplyCode {
    /// 220 Service ready (greeting, and "ready to start TLS")
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCEEDED: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 421 Service not available, closing transmission channel
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 450 Mailbox unavailable (busy)
    pub const MAILBOX_BUSY: Self = Self(450);
    /// 454 TLS not available due to temporary reason
    pub const TLS_UNAVAILABLE: Self = Self(454);
    /// 500 Syntax error, command unrecognized
    pub const SYNTAX_ERROR: Self = Self(500);
    /// 503 Bad sequence of commands
    pub const BAD_SEQUENCE: Self = Self(503);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 Mailbox unavailable (not found, access denied)
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);
    /// 554 Transaction failed
    pub const TRANSACTION_FAILED: Self = Self(554);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    mod reply_code_tests {
        use super::*;

        #[test]
        fn display() {
            assert_eq!(format!("{}", ReplyCode::OK), "250");
            assert_eq!(format!("{}", ReplyCode::new(421)), "421");
        }
    }

    mod reply_tests {
        use super::*;

        #[test]
        fn raw_is_rebuilt_for_single_line() {
            let reply = Reply::new(ReplyCode::OK, vec!["OK".to_string()]);
            assert_eq!(reply.raw(), "250 OK\r\n");
        }

        #[test]
        fn raw_is_rebuilt_for_multi_line() {
            let reply = Reply::new(
                ReplyCode::OK,
                vec!["mx.example.com".to_string(), "STARTTLS".to_string()],
            );
            assert_eq!(reply.raw(), "250-mx.example.com\r\n250 STARTTLS\r\n");
        }

        #[test]
        fn with_raw_keeps_server_text() {
            let reply = Reply::with_raw(
                ReplyCode::AUTH_FAILED,
                vec!["5.7.8 Bad credentials".to_string()],
                "535 5.7.8 Bad credentials\r\n",
            );
            assert_eq!(reply.raw(), "535 5.7.8 Bad credentials\r\n");
            assert_eq!(reply.code, ReplyCode::AUTH_FAILED);
        }

        #[test]
        fn display_joins_lines() {
            let reply = Reply::new(
                ReplyCode::SERVICE_READY,
                vec!["smtp.example.com ESMTP".to_string(), "Ready".to_string()],
            );
            assert_eq!(reply.to_string(), "220 smtp.example.com ESMTP\nReady");
        }

        #[test]
        fn empty_message() {
            let reply = Reply::new(ReplyCode::OK, vec![]);
            assert_eq!(reply.to_string(), "250 ");
            assert_eq!(reply.raw(), "250\r\n");
        }
    }
}
