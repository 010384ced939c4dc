//! Errors raised while assembling a message.

/// Result alias for message assembly.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a message could not be assembled.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A header name or value would corrupt the header block.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),

    /// A header every message needs was never set.
    #[error("Missing required header: {0}")]
    MissingHeader(String),
}
