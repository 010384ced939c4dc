//! Student roster.
//!
//! An immutable in-memory table of students loaded from the course export
//! (German column names), looked up by exact first and last name.

use crate::error::{Error, Result};
use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;
use std::path::Path;

/// Column holding the first name.
pub const FIRST_NAME_COLUMN: &str = "Vorname";
/// Column holding the last name.
pub const LAST_NAME_COLUMN: &str = "Nachname";
/// Column holding the email address.
pub const EMAIL_COLUMN: &str = "E-Mail-Adresse";

/// One student as listed in the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// First name(s), space separated.
    pub first_name: String,
    /// Last name(s), space separated.
    pub last_name: String,
    /// Email address.
    pub email: String,
}

impl RosterEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }
}

/// Immutable collection of roster entries.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    // first name -> last name -> entry positions
    index: HashMap<String, HashMap<String, Vec<usize>>>,
}

impl Roster {
    /// Loads a roster from a delimited file with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the file cannot be read and
    /// [`Error::DataFormat`] if a required column is missing or a row lacks
    /// a required value.
    pub fn load(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
        let roster = Self::parse(&text, delimiter).map_err(|reason| Error::DataFormat {
            path: path.to_path_buf(),
            reason,
        })?;
        tracing::info!(path = %path.display(), students = roster.len(), "Loaded roster");
        Ok(roster)
    }

    fn parse(text: &str, delimiter: u8) -> std::result::Result<Self, String> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers().map_err(|e| e.to_string())?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);
        let (first, last, email) = match (
            column(FIRST_NAME_COLUMN),
            column(LAST_NAME_COLUMN),
            column(EMAIL_COLUMN),
        ) {
            (Some(f), Some(l), Some(e)) => (f, l, e),
            found => {
                let missing: Vec<&str> = [
                    (found.0, FIRST_NAME_COLUMN),
                    (found.1, LAST_NAME_COLUMN),
                    (found.2, EMAIL_COLUMN),
                ]
                .into_iter()
                .filter(|(idx, _)| idx.is_none())
                .map(|(_, name)| name)
                .collect();
                return Err(format!("missing column(s) {}", missing.join(", ")));
            }
        };

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| e.to_string())?;
            let line = record.position().map_or(0, csv::Position::line);
            if record.iter().all(str::is_empty) {
                continue;
            }

            let cell = |idx: usize, name: &str| match record.get(idx) {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => Err(format!("line {line}: empty {name}")),
            };
            entries.push(RosterEntry {
                first_name: cell(first, FIRST_NAME_COLUMN)?,
                last_name: cell(last, LAST_NAME_COLUMN)?,
                email: cell(email, EMAIL_COLUMN)?,
            });
        }

        Ok(Self::from_entries(entries))
    }

    /// Builds a roster from entries already in memory.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = RosterEntry>) -> Self {
        let entries: Vec<RosterEntry> = entries.into_iter().collect();
        let mut index: HashMap<String, HashMap<String, Vec<usize>>> = HashMap::new();
        for (pos, entry) in entries.iter().enumerate() {
            index
                .entry(entry.first_name.clone())
                .or_default()
                .entry(entry.last_name.clone())
                .or_default()
                .push(pos);
        }
        Self { entries, index }
    }

    fn positions(&self, first_name: &str, last_name: &str) -> &[usize] {
        self.index
            .get(first_name)
            .and_then(|by_last| by_last.get(last_name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns true if a student with exactly this name is listed.
    #[must_use]
    pub fn exists(&self, first_name: &str, last_name: &str) -> bool {
        !self.positions(first_name, last_name).is_empty()
    }

    /// Returns the email address of the student with this name.
    ///
    /// Several entries with the same name are fine as long as they agree on
    /// the address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no entry matches and
    /// [`Error::AmbiguousStudent`] if matching entries list different
    /// addresses.
    pub fn email_of(&self, first_name: &str, last_name: &str) -> Result<&str> {
        let positions = self.positions(first_name, last_name);
        let Some((&head, rest)) = positions.split_first() else {
            return Err(Error::NotFound {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            });
        };

        let email = self.entries[head].email.as_str();
        if rest.iter().any(|&pos| self.entries[pos].email != email) {
            let mut emails: Vec<String> = Vec::new();
            for &pos in positions {
                let candidate = &self.entries[pos].email;
                if !emails.contains(candidate) {
                    emails.push(candidate.clone());
                }
            }
            return Err(Error::AmbiguousStudent {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                emails,
            });
        }
        Ok(email)
    }

    /// All entries in file order.
    #[must_use]
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the roster has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
