//! Submission folders and their archive.
//!
//! Each immediate subdirectory of the submissions directory is one student's
//! corrected submission. Sent folders are moved, unchanged, into a `Sent`
//! directory next to the submissions directory.

use crate::config::UnresolvedPolicy;
use crate::error::{Error, Result};
use crate::mailer;
use crate::resolver::FolderNameResolver;
use crate::roster::Roster;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the archive directory created next to the submissions directory.
pub const SENT_DIR_NAME: &str = "Sent";

/// A submission matched to a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    /// Submission folder.
    pub folder: PathBuf,
    /// Student's first name as listed in the roster.
    pub first_name: String,
    /// Student's last name as listed in the roster.
    pub last_name: String,
    /// Student's email address.
    pub email: String,
}

impl SubmissionRecord {
    /// Folder name without the parent path.
    #[must_use]
    pub fn folder_name(&self) -> String {
        self.folder
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Locates the PDF to send. Looked up on demand, not at index time.
    ///
    /// # Errors
    ///
    /// See [`mailer::find_pdf`].
    pub fn pdf_path(&self) -> Result<PathBuf> {
        mailer::find_pdf(&self.folder)
    }
}

/// Folder left in place because it matched no student.
#[derive(Debug)]
pub struct SkippedFolder {
    /// The folder.
    pub folder: PathBuf,
    /// Why it was skipped.
    pub error: Error,
}

/// Submissions waiting to be sent.
#[derive(Debug)]
pub struct SubmissionIndex {
    sent_dir: PathBuf,
    pending: Vec<SubmissionRecord>,
    skipped: Vec<SkippedFolder>,
}

impl SubmissionIndex {
    /// Scans the submissions directory and matches every folder to a student.
    ///
    /// Folders are visited in name order; plain files and hidden entries are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the directory cannot be read. With
    /// [`UnresolvedPolicy::Abort`], the first folder that does not resolve to
    /// a unique roster entry fails the whole build.
    pub fn build(
        submissions_path: impl AsRef<Path>,
        roster: &Roster,
        resolver: &FolderNameResolver,
        policy: UnresolvedPolicy,
    ) -> Result<Self> {
        let submissions_path = submissions_path.as_ref();
        let root = submissions_path
            .canonicalize()
            .map_err(|e| Error::filesystem(submissions_path, e))?;
        let sent_dir = root
            .parent()
            .map(|parent| parent.join(SENT_DIR_NAME))
            .ok_or_else(|| {
                Error::filesystem(
                    &root,
                    io::Error::new(io::ErrorKind::InvalidInput, "no parent directory for Sent"),
                )
            })?;

        let mut folders = Vec::new();
        for entry in std::fs::read_dir(&root).map_err(|e| Error::filesystem(&root, e))? {
            let entry = entry.map_err(|e| Error::filesystem(&root, e))?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && path.is_dir() {
                folders.push(path);
            }
        }
        folders.sort();

        let mut pending = Vec::with_capacity(folders.len());
        let mut skipped = Vec::new();
        for folder in folders {
            match Self::match_folder(&folder, roster, resolver) {
                Ok(record) => {
                    tracing::debug!(
                        folder = %record.folder_name(),
                        email = %record.email,
                        "Matched submission"
                    );
                    pending.push(record);
                }
                Err(error) if policy == UnresolvedPolicy::Skip => {
                    tracing::warn!(folder = %folder.display(), %error, "Skipping submission");
                    skipped.push(SkippedFolder { folder, error });
                }
                Err(error) => return Err(error),
            }
        }

        tracing::info!(
            path = %root.display(),
            pending = pending.len(),
            skipped = skipped.len(),
            "Indexed submissions"
        );
        Ok(Self {
            sent_dir,
            pending,
            skipped,
        })
    }

    fn match_folder(
        folder: &Path,
        roster: &Roster,
        resolver: &FolderNameResolver,
    ) -> Result<SubmissionRecord> {
        let name = folder
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        let split = resolver.resolve(&name, roster)?;
        let email = roster.email_of(&split.first_name, &split.last_name)?;
        Ok(SubmissionRecord {
            folder: folder.to_path_buf(),
            email: email.to_string(),
            first_name: split.first_name,
            last_name: split.last_name,
        })
    }

    /// Snapshot of records not yet archived, in folder name order.
    #[must_use]
    pub fn pending(&self) -> Vec<SubmissionRecord> {
        self.pending.clone()
    }

    /// Folders that matched no student and were left in place.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedFolder] {
        &self.skipped
    }

    /// Archive directory. May not exist until the first archive.
    #[must_use]
    pub fn sent_dir(&self) -> &Path {
        &self.sent_dir
    }

    /// Number of pending records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is left to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Moves a sent submission into the archive directory and drops it from
    /// the pending set. Returns the folder's new location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if the record is not pending,
    /// [`Error::AlreadyArchived`] if `Sent` already holds a folder of the same
    /// name, and [`Error::Filesystem`] if the archive directory cannot be
    /// created or the move fails. The record stays pending on error.
    pub fn archive(&mut self, record: &SubmissionRecord) -> Result<PathBuf> {
        let position = self
            .pending
            .iter()
            .position(|pending| pending.folder == record.folder)
            .ok_or_else(|| {
                Error::State(format!("{} is not pending", record.folder.display()))
            })?;

        let name = record.folder.file_name().ok_or_else(|| {
            Error::filesystem(
                &record.folder,
                io::Error::new(io::ErrorKind::InvalidInput, "folder has no name"),
            )
        })?;
        std::fs::create_dir_all(&self.sent_dir).map_err(|e| Error::filesystem(&self.sent_dir, e))?;

        let target = self.sent_dir.join(name);
        if target.exists() {
            return Err(Error::AlreadyArchived { target });
        }
        std::fs::rename(&record.folder, &target).map_err(|e| Error::filesystem(&record.folder, e))?;

        self.pending.remove(position);
        tracing::debug!(from = %record.folder.display(), to = %target.display(), "Archived submission");
        Ok(target)
    }
}
