//! Server replies.

use std::fmt;

/// A complete, possibly multi-line, server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit code shared by all lines.
    pub code: ReplyCode,
    /// Text of each line, code and separator stripped.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true for 2xx replies.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Reply text with lines joined by newlines.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Passes the reply through if `accept` approves its code, otherwise
    /// turns it into [`crate::Error::SmtpError`].
    ///
    /// # Errors
    ///
    /// Returns the rejected code and text.
    pub fn require(self, accept: impl Fn(ReplyCode) -> bool) -> crate::Result<Self> {
        if accept(self.code) {
            return Ok(self);
        }
        Err(crate::Error::smtp_error(self.code.0, self.message_text()))
    }
}

/// Three-digit reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 greeting, also the go-ahead for STARTTLS.
    pub const SERVICE_READY: Self = Self(220);
    /// 250 action completed.
    pub const OK: Self = Self(250);
    /// 334 server challenge during AUTH.
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 send the message, end with `.`.
    pub const START_DATA: Self = Self(354);
    /// 535 credentials refused.
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 mailbox unknown or refused.
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true for 2xx codes.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 / 100 == 2
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
