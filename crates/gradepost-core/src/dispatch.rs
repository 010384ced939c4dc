//! The send loop.
//!
//! Pending submissions are sent one after another over a single transport
//! session. Each sent submission is archived before the next one starts, so
//! an interrupted run can simply be started again.

use crate::config::{Config, SendErrorPolicy};
use crate::error::{Error, Result};
use crate::mailer::Mailer;
use crate::resolver::FolderNameResolver;
use crate::roster::Roster;
use crate::submission::{SubmissionIndex, SubmissionRecord};
use crate::transport::Transport;
use std::path::Path;
use tracing::{error, info, warn};

/// Progress notifications emitted by [`run`].
#[derive(Debug)]
pub enum Progress<'a> {
    /// The loop is about to start.
    Started {
        /// Number of submissions to send.
        total: usize,
    },
    /// A submission was sent and archived.
    Sent {
        /// The submission.
        record: &'a SubmissionRecord,
        /// Where its folder now lives.
        archived_to: &'a Path,
    },
    /// A submission could not be sent.
    Failed {
        /// The submission.
        record: &'a SubmissionRecord,
        /// What went wrong.
        error: &'a Error,
    },
    /// A submission was sent but its folder could not be moved to `Sent`.
    Unarchived {
        /// The submission.
        record: &'a SubmissionRecord,
        /// Why the move failed.
        error: &'a Error,
    },
}

/// A submission left pending after a failure.
#[derive(Debug)]
pub struct FailedSubmission {
    /// The submission.
    pub record: SubmissionRecord,
    /// What went wrong.
    pub error: Error,
}

/// Outcome of a completed loop.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Sent and archived submissions, in order.
    pub sent: Vec<SubmissionRecord>,
    /// Submissions not sent, under [`SendErrorPolicy::Continue`].
    pub failed: Vec<FailedSubmission>,
    /// Submissions sent but still in the submissions directory. They will be
    /// sent again by the next run unless moved by hand.
    pub unarchived: Vec<FailedSubmission>,
}

impl RunReport {
    /// Returns true if every submission was sent and archived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.unarchived.is_empty()
    }

    /// Number of submissions the server accepted.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.sent.len() + self.unarchived.len()
    }
}

/// Loads the roster and indexes the submissions named in the configuration.
///
/// # Errors
///
/// Fails if the roster cannot be loaded, the folder pattern is invalid, or
/// the index cannot be built.
pub fn prepare(config: &Config) -> Result<SubmissionIndex> {
    let roster = Roster::load(&config.records_path, config.delimiter_byte())?;
    let resolver = match &config.folder_pattern {
        Some(pattern) => FolderNameResolver::with_pattern(pattern)?,
        None => FolderNameResolver::new()?,
    };
    SubmissionIndex::build(
        &config.submissions_path,
        &roster,
        &resolver,
        config.on_unresolved,
    )
}

/// Sends every pending submission and archives it.
///
/// The transport is closed before returning, whatever the outcome.
///
/// # Errors
///
/// Returns the first failure unless `policy` is
/// [`SendErrorPolicy::Continue`] and the failure concerns only that
/// submission; session failures always end the loop.
pub async fn run<T: Transport>(
    index: &mut SubmissionIndex,
    mailer: &Mailer,
    transport: &mut T,
    policy: SendErrorPolicy,
    mut progress: impl FnMut(Progress<'_>),
) -> Result<RunReport> {
    let outcome = send_all(index, mailer, transport, policy, &mut progress).await;

    if let Err(e) = transport.close().await {
        warn!(error = %e, "Closing the mail session failed");
    }
    let report = outcome?;

    info!(
        sent = report.sent.len(),
        failed = report.failed.len(),
        unarchived = report.unarchived.len(),
        "Run finished"
    );
    Ok(report)
}

async fn send_all<T: Transport>(
    index: &mut SubmissionIndex,
    mailer: &Mailer,
    transport: &mut T,
    policy: SendErrorPolicy,
    progress: &mut impl FnMut(Progress<'_>),
) -> Result<RunReport> {
    let records = index.pending();
    progress(Progress::Started {
        total: records.len(),
    });

    let mut report = RunReport::default();
    for record in records {
        if let Err(error) = send_one(&record, mailer, transport).await {
            progress(Progress::Failed {
                record: &record,
                error: &error,
            });
            if policy == SendErrorPolicy::Continue && error.is_record_level() {
                warn!(folder = %record.folder_name(), %error, "Submission left pending");
                report.failed.push(FailedSubmission { record, error });
                continue;
            }
            return Err(error);
        }

        match index.archive(&record) {
            Ok(archived_to) => {
                info!(folder = %record.folder_name(), email = %record.email, "Sent submission");
                progress(Progress::Sent {
                    record: &record,
                    archived_to: &archived_to,
                });
                report.sent.push(record);
            }
            Err(error) => {
                error!(
                    folder = %record.folder.display(),
                    %error,
                    "Mail was delivered but the folder could not be archived; it will be sent again on the next run"
                );
                progress(Progress::Unarchived {
                    record: &record,
                    error: &error,
                });
                // Anything but a name clash in `Sent` would hit every
                // following submission too.
                if policy == SendErrorPolicy::Continue
                    && matches!(error, Error::AlreadyArchived { .. })
                {
                    report.unarchived.push(FailedSubmission { record, error });
                    continue;
                }
                return Err(error);
            }
        }
    }
    Ok(report)
}

async fn send_one<T: Transport>(
    record: &SubmissionRecord,
    mailer: &Mailer,
    transport: &mut T,
) -> Result<()> {
    let message = mailer.message_for(record)?;
    transport.send(&message).await
}
