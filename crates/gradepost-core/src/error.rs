//! Error types for the core library.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while matching submissions and sending them back.
#[derive(Debug, Error)]
pub enum Error {
    /// Roster file is malformed or lacks required columns.
    #[error("Roster {} is malformed: {reason}", path.display())]
    DataFormat {
        /// Roster file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// A submission folder name does not resolve to a roster entry.
    #[error("Cannot resolve a student from folder {folder:?}: {reason}")]
    Naming {
        /// Folder name as found on disk.
        folder: String,
        /// Why resolution failed.
        reason: String,
    },

    /// No roster entry matches the name.
    #[error("No roster entry for {first_name} {last_name}")]
    NotFound {
        /// First name that was looked up.
        first_name: String,
        /// Last name that was looked up.
        last_name: String,
    },

    /// Several roster entries share the name but disagree on the email.
    #[error("Roster lists {first_name} {last_name} with different emails: {}", emails.join(", "))]
    AmbiguousStudent {
        /// First name that was looked up.
        first_name: String,
        /// Last name that was looked up.
        last_name: String,
        /// Every email found for the name.
        emails: Vec<String>,
    },

    /// A submission folder does not hold exactly one PDF.
    #[error("Submission folder {} {reason}", folder.display())]
    Attachment {
        /// Submission folder.
        folder: PathBuf,
        /// What was found instead.
        reason: String,
    },

    /// File or directory operation failed.
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path the operation touched.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// `Sent` already holds a folder of the same name.
    #[error("{} is already archived", target.display())]
    AlreadyArchived {
        /// Occupied path inside `Sent`.
        target: PathBuf,
    },

    /// Server refused the credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection could not be established or broke down.
    #[error("Network error: {0}")]
    Network(String),

    /// Server refused sender, recipient, or message.
    #[error("Rejected by mail server: {0}")]
    Rejected(String),

    /// Operation not valid in the current transport or index state.
    #[error("Invalid state: {0}")]
    State(String),

    /// Configuration file unreadable or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Message could not be assembled.
    #[error("Cannot build message: {0}")]
    Message(#[from] gradepost_mime::Error),
}

impl Error {
    /// Wraps an I/O error with the path it concerns.
    #[must_use]
    pub fn filesystem(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns true if the error concerns one submission only, so the
    /// remaining submissions can still be sent over the same session.
    #[must_use]
    pub const fn is_record_level(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::AmbiguousStudent { .. }
                | Self::Attachment { .. }
                | Self::Filesystem { .. }
                | Self::AlreadyArchived { .. }
                | Self::Rejected(_)
                | Self::Message(_)
        )
    }

}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
