//! Errors of the SMTP client.

use std::io;

/// Result alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What can go wrong talking to a mail server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS setup or handshake failed.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server hung up while a reply was expected.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Server refused a command.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code, e.g. 550.
        code: u16,
        /// Reply text.
        message: String,
    },

    /// Reply that does not follow the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Address unfit for `MAIL FROM` or `RCPT TO`.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message larger than the server's advertised SIZE.
    #[error("Message of {size} bytes exceeds server limit of {limit} bytes")]
    MessageTooLarge {
        /// Rendered message size.
        size: usize,
        /// Advertised limit.
        limit: usize,
    },

    /// Server lacks a capability the client needs.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Builds a refusal from a reply code and text.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true for 4xx refusals; retrying later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code / 100 == 4)
    }

}
