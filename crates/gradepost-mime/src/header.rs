//! MIME header handling.

use crate::encoding::encode_header_text;
use crate::error::{Error, Result};
use std::fmt;

/// Header block, written in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the name is not a valid field name
    /// or the value contains a bare CR or LF.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        validate(&name, &value)?;
        self.entries.push((name, value));
        Ok(())
    }

    /// Appends a free-text header, folded or RFC 2047 encoded so that no
    /// line grows too long.
    ///
    /// # Errors
    ///
    /// Same as [`Headers::add`].
    pub fn add_text(&mut self, name: impl Into<String>, text: &str) -> Result<()> {
        let name = name.into();
        let value = encode_header_text(text, name.len() + 2);
        self.add(name, value)
    }
}

fn validate(name: &str, value: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(Error::InvalidHeader(format!("bad field name {name:?}")));
    }

    // Folded values (CRLF followed by whitespace) are the only line breaks allowed.
    let mut rest = value;
    while let Some(pos) = rest.find(['\r', '\n']) {
        let folded = rest[pos..].starts_with("\r\n ") || rest[pos..].starts_with("\r\n\t");
        if !folded {
            return Err(Error::InvalidHeader(format!(
                "line break in value of {name}"
            )));
        }
        rest = &rest[pos + 3..];
    }
    Ok(())
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}
