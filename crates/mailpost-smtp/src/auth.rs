//! AUTH LOGIN credential handling.
//!
//! After `AUTH LOGIN` the server prompts twice with `334`, and the client
//! answers each prompt with one base64 line: first the username, then the
//! password.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Username and password for AUTH LOGIN.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials from a username and password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Encodes one AUTH LOGIN answer line.
///
/// The output is standard padded base64 with no line wrapping, followed by
/// CRLF, so its length is `4 * ceil(n / 3) + 2`.
///
/// # Example
///
/// ```
/// use mailpost_smtp::auth::encode_credential;
///
/// assert_eq!(encode_credential(b"user"), "dXNlcg==\r\n");
/// ```
#[must_use]
pub fn encode_credential(secret: &[u8]) -> String {
    let mut line = STANDARD.encode(secret);
    line.push_str("\r\n");
    line
}
