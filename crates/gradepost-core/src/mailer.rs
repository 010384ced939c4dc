//! Composing the feedback mail.

use crate::error::{Error, Result};
use crate::submission::SubmissionRecord;
use gradepost_mime::{Attachment, MessageBuilder};
use std::path::{Path, PathBuf};

/// A single-recipient mail with a plain-text body and attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Sender address.
    pub sender: String,
    /// Recipient address.
    pub receiver: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Attached files.
    pub attachments: Vec<Attachment>,
}

impl MailMessage {
    /// File names of all attachments.
    pub fn attachment_names(&self) -> impl Iterator<Item = &str> {
        self.attachments.iter().map(|a| a.filename.as_str())
    }

    /// Renders the message as RFC 5322 bytes with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Message`] if an address or the subject cannot be
    /// written as a header.
    pub fn render(&self) -> Result<Vec<u8>> {
        let builder = self.attachments.iter().cloned().fold(
            MessageBuilder::new()
                .from(&self.sender)
                .to(&self.receiver)
                .subject(&self.subject)
                .text_body(&self.body),
            MessageBuilder::attach,
        );
        Ok(builder.build()?.to_bytes())
    }
}

/// Creates a message with From, To and Subject exactly as given.
#[must_use]
pub fn compose(sender: &str, receiver: &str, subject: &str, body: &str) -> MailMessage {
    MailMessage {
        sender: sender.to_string(),
        receiver: receiver.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        attachments: Vec::new(),
    }
}

/// Attaches a PDF under its own file name.
///
/// # Errors
///
/// Returns [`Error::Filesystem`] if the file cannot be read.
pub fn attach_pdf(message: &mut MailMessage, pdf_path: &Path) -> Result<()> {
    let data = std::fs::read(pdf_path).map_err(|e| Error::filesystem(pdf_path, e))?;
    let filename = pdf_path
        .file_name()
        .map_or_else(|| "submission.pdf".to_string(), |n| n.to_string_lossy().into_owned());
    message.attachments.push(Attachment::new(filename, data));
    Ok(())
}

/// Finds the single PDF directly inside a submission folder.
///
/// The extension is compared case-insensitively.
///
/// # Errors
///
/// Returns [`Error::Attachment`] if the folder holds no PDF or more than
/// one, and [`Error::Filesystem`] if it cannot be read.
pub fn find_pdf(folder: &Path) -> Result<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(|e| Error::filesystem(folder, e))? {
        let path = entry.map_err(|e| Error::filesystem(folder, e))?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            found.push(path);
        }
    }

    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(Error::Attachment {
            folder: folder.to_path_buf(),
            reason: "contains no PDF".to_string(),
        }),
        n => {
            found.sort();
            let names: Vec<String> = found
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            Err(Error::Attachment {
                folder: folder.to_path_buf(),
                reason: format!("contains {n} PDFs: {}", names.join(", ")),
            })
        }
    }
}

/// Reads the mail body template.
///
/// # Errors
///
/// Returns [`Error::Filesystem`] if the file cannot be read.
pub fn load_body(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))
}

/// Builds one mail per submission from a shared sender, subject and body.
#[derive(Debug, Clone)]
pub struct Mailer {
    sender: String,
    subject: String,
    body: String,
}

impl Mailer {
    /// Creates a mailer.
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Sender address.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Composes the mail for one submission, with its PDF attached.
    ///
    /// # Errors
    ///
    /// Fails if the submission's PDF cannot be located or read.
    pub fn message_for(&self, record: &SubmissionRecord) -> Result<MailMessage> {
        let pdf = record.pdf_path()?;
        let mut message = compose(&self.sender, &record.email, &self.subject, &self.body);
        attach_pdf(&mut message, &pdf)?;
        Ok(message)
    }
}
