//! # gradepost-mime
//!
//! MIME generation for plain-text mail carrying file attachments.
//!
//! ## Features
//!
//! - **Message building**: `From`/`To`/`Subject`, text body, any number of
//!   attachments, rendered as `multipart/mixed` with CRLF line endings
//! - **Encodings**: Base64 (76-column lines), Quoted-Printable, RFC 2047
//!   header words, RFC 2231 parameter values
//! - **Content types**: parameters kept in insertion order so output is
//!   reproducible
//!
//! ## Quick Start
//!
//! ```ignore
//! use gradepost_mime::{Attachment, MessageBuilder};
//!
//! let message = MessageBuilder::new()
//!     .from("tutor@tum.de")
//!     .to("jane@x.com")
//!     .subject("Individual submission correction")
//!     .text_body("Hello Jane,\nplease find your corrected submission attached.")
//!     .attach(Attachment::new("report.pdf", pdf_bytes))
//!     .build()?;
//!
//! let wire: Vec<u8> = message.to_bytes();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

mod encoding;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use message::{Attachment, Message, MessageBuilder};
