//! MIME message structure and generation.

use crate::content_type::{ContentType, format_parameter};
use crate::encoding::{encode_base64_lines, encode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use chrono::{DateTime, FixedOffset, Local};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;

/// Longest line SMTP guarantees to carry (RFC 5321 §4.5.3.1.6).
const MAX_SMTP_LINE: usize = 998;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII, short lines.
    SevenBit,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Base64 encoding.
    Base64,
}

impl TransferEncoding {
    /// Picks the encoding for a text body.
    #[must_use]
    pub fn for_text(text: &str) -> Self {
        let plain = text.is_ascii()
            && text.lines().all(|line| line.len() <= MAX_SMTP_LINE)
            && !text.chars().any(|c| c.is_ascii_control() && c != '\n' && c != '\r' && c != '\t');
        if plain {
            Self::SevenBit
        } else {
            Self::QuotedPrintable
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// File attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name announced to the recipient.
    pub filename: String,
    /// Content type of the payload.
    pub content_type: ContentType,
    /// Raw file contents.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment, guessing the content type from the file name.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        Self {
            content_type: ContentType::for_file_name(&filename),
            filename,
            data,
        }
    }

    fn into_part(self) -> Result<Part> {
        let mut headers = Headers::new();
        headers.add(
            "Content-Type",
            self.content_type
                .with_parameter("name", self.filename.clone())
                .to_string(),
        )?;
        headers.add(
            "Content-Transfer-Encoding",
            TransferEncoding::Base64.to_string(),
        )?;
        headers.add(
            "Content-Disposition",
            format!("attachment; {}", format_parameter("filename", &self.filename)),
        )?;
        Ok(Part::new(headers, encode_base64_lines(&self.data).into_bytes()))
    }
}

/// MIME message part with an already encoded body.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Encoded body.
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    fn text(text: &str) -> Result<Self> {
        let encoding = TransferEncoding::for_text(text);
        let body = match encoding {
            TransferEncoding::QuotedPrintable => encode_quoted_printable(text),
            _ => text.replace("\r\n", "\n").replace('\n', "\r\n"),
        };

        let mut headers = Headers::new();
        headers.add("Content-Type", ContentType::text_plain().to_string())?;
        headers.add("Content-Transfer-Encoding", encoding.to_string())?;
        Ok(Self::new(headers, body.into_bytes()))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        if !self.body.ends_with(b"\r\n") {
            out.extend_from_slice(b"\r\n");
        }
    }
}

/// MIME message ready to be rendered.
#[derive(Debug, Clone)]
pub struct Message {
    headers: Headers,
    parts: Vec<Part>,
    boundary: String,
}

impl Message {
    /// Renders the message in RFC 5322 form with CRLF line endings.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(b"This is a multi-part message in MIME format.\r\n");

        for part in &self.parts {
            out.extend_from_slice(format!("\r\n--{}\r\n", self.boundary).as_bytes());
            part.write_to(&mut out);
        }
        out.extend_from_slice(format!("\r\n--{}--\r\n", self.boundary).as_bytes());
        out
    }
}

/// Builder for single-recipient messages with attachments.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Option<String>,
    subject: String,
    text_body: String,
    attachments: Vec<Attachment>,
    date: Option<DateTime<FixedOffset>>,
    message_id: Option<String>,
    boundary: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender address.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Sets the recipient address.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = body.into();
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Fixes the Date header instead of using the current time.
    #[must_use]
    pub const fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Fixes the Message-ID (without angle brackets).
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Fixes the multipart boundary instead of generating one.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Builds the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeader`] without sender or recipient, and
    /// [`Error::InvalidHeader`] if a value would break the header block.
    pub fn build(self) -> Result<Message> {
        let from = self
            .from
            .ok_or_else(|| Error::MissingHeader("From".to_string()))?;
        let to = self
            .to
            .ok_or_else(|| Error::MissingHeader("To".to_string()))?;
        let boundary = self.boundary.unwrap_or_else(|| random_token(28));
        let date = self
            .date
            .unwrap_or_else(|| Local::now().fixed_offset());
        let message_id = self
            .message_id
            .unwrap_or_else(|| generate_message_id(&from));

        let mut headers = Headers::new();
        headers.add("Date", date.to_rfc2822())?;
        headers.add("From", from)?;
        headers.add("To", to)?;
        headers.add_text("Subject", &self.subject)?;
        headers.add("Message-ID", format!("<{message_id}>"))?;
        headers.add("MIME-Version", "1.0")?;
        headers.add(
            "Content-Type",
            ContentType::multipart_mixed(format!("=_{boundary}")).to_string(),
        )?;

        let mut parts = Vec::with_capacity(1 + self.attachments.len());
        parts.push(Part::text(&self.text_body)?);
        for attachment in self.attachments {
            parts.push(attachment.into_part()?);
        }

        Ok(Message {
            headers,
            parts,
            boundary: format!("=_{boundary}"),
        })
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn generate_message_id(from: &str) -> String {
    let domain = from
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim_end_matches('>'))
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost");
    format!(
        "{}.{}@{domain}",
        Local::now().timestamp_millis(),
        random_token(16)
    )
}
