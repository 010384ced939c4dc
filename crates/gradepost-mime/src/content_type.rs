//! MIME content type handling.

use crate::encoding::encode_rfc2231;
use std::fmt;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "application", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "pdf", "mixed").
    pub sub_type: String,
    /// Parameters in the order they are written.
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a `text/plain; charset=utf-8` content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a `multipart/mixed` content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Guesses the content type of an attachment from its file name.
    #[must_use]
    pub fn for_file_name(name: &str) -> Self {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if extension == "pdf" {
            Self::new("application", "pdf")
        } else {
            Self::new("application", "octet-stream")
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        for (key, value) in &self.parameters {
            write!(f, "; {}", format_parameter(key, value))?;
        }
        Ok(())
    }
}

/// Formats a `key=value` header parameter.
///
/// Tokens are written bare, other ASCII values quoted, and non-ASCII
/// values as RFC 2231 `key*=utf-8''...`.
#[must_use]
pub fn format_parameter(key: &str, value: &str) -> String {
    if !value.is_ascii() || value.chars().any(|c| c.is_ascii_control()) {
        return format!("{key}*={}", encode_rfc2231(value));
    }

    let is_token = !value.is_empty()
        && value
            .chars()
            .all(|c| !c.is_whitespace() && !"()<>@,;:\\\"/[]?=".contains(c));
    if is_token {
        format!("{key}={value}")
    } else {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("{key}=\"{escaped}\"")
    }
}
