//! # gradepost-core
//!
//! Matching corrected submissions to students and mailing them back.
//!
//! This crate provides:
//! - Roster loading and lookup by exact first/last name
//! - Folder name resolution for names without a marked split point
//! - The submission index and its `Sent` archive
//! - Mail composition with a PDF attachment
//! - An SMTP transport behind the [`Transport`] trait
//! - The dispatch loop tying these together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
mod error;
pub mod mailer;
pub mod resolver;
pub mod roster;
pub mod submission;
pub mod transport;

pub use config::{Config, Security, SendErrorPolicy, SenderData, SmtpConfig, UnresolvedPolicy};
pub use dispatch::{FailedSubmission, Progress, RunReport, prepare, run};
pub use error::{Error, Result};
pub use mailer::{MailMessage, Mailer, attach_pdf, compose, find_pdf};
pub use resolver::{FolderNameResolver, NameSplit, candidate_splits};
pub use roster::{Roster, RosterEntry};
pub use submission::{SkippedFolder, SubmissionIndex, SubmissionRecord};
pub use transport::{SmtpTransport, Transport};
