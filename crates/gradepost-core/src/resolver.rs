//! Student names from submission folder names.
//!
//! Folder names look like `<name words>_<digits>...` where the name part
//! has two to seven space separated words and nothing marks where the first
//! name ends. Every split point is tried against the roster, shortest first
//! name first.

use crate::error::{Error, Result};
use crate::roster::Roster;
use regex::Regex;

/// Two to seven words of letters, digits or hyphens before `_<digit>`,
/// optionally followed by one space.
pub const DEFAULT_FOLDER_PATTERN: &str = r"((?:[[^\W_]-]+ ){1,6}[[^\W_]-]+) ?_\d";

/// A first/last name pair proposed for a folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameSplit {
    /// Words before the split point.
    pub first_name: String,
    /// Words after the split point.
    pub last_name: String,
}

/// Lists every way to split `words` into a non-empty first and last name,
/// ordered by increasing first name length.
#[must_use]
pub fn candidate_splits<S: AsRef<str>>(words: &[S]) -> Vec<NameSplit> {
    let words: Vec<&str> = words.iter().map(AsRef::as_ref).collect();
    (1..words.len())
        .map(|i| NameSplit {
            first_name: words[..i].join(" "),
            last_name: words[i..].join(" "),
        })
        .collect()
}

/// Maps folder names to roster names.
#[derive(Debug, Clone)]
pub struct FolderNameResolver {
    pattern: Regex,
}

impl FolderNameResolver {
    /// Creates a resolver with [`DEFAULT_FOLDER_PATTERN`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the pattern does not compile.
    pub fn new() -> Result<Self> {
        Self::with_pattern(DEFAULT_FOLDER_PATTERN)
    }

    /// Creates a resolver with a custom pattern whose first capture group
    /// is the space separated name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the pattern does not compile or has no
    /// capture group.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid folder pattern: {e}")))?;
        if pattern.captures_len() < 2 {
            return Err(Error::Config(
                "folder pattern needs a capture group around the name".to_string(),
            ));
        }
        Ok(Self { pattern })
    }

    /// Extracts the name words from a folder name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Naming`] if the folder name has no name part.
    pub fn name_words<'a>(&self, folder_name: &'a str) -> Result<Vec<&'a str>> {
        let span = self
            .pattern
            .captures(folder_name)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| Error::Naming {
                folder: folder_name.to_string(),
                reason: "expected two to seven name words followed by _<digits>".to_string(),
            })?;
        Ok(span.as_str().split_whitespace().collect())
    }

    /// Finds the first split of the folder's name words that the roster
    /// knows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Naming`] if the folder name has no name part or no
    /// split is listed in the roster.
    pub fn resolve(&self, folder_name: &str, roster: &Roster) -> Result<NameSplit> {
        let words = self.name_words(folder_name)?;
        candidate_splits(&words)
            .into_iter()
            .find(|split| roster.exists(&split.first_name, &split.last_name))
            .ok_or_else(|| Error::Naming {
                folder: folder_name.to_string(),
                reason: format!("no roster entry matches any split of {:?}", words.join(" ")),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::roster::RosterEntry;
    use proptest::prelude::*;

    fn roster(names: &[(&str, &str)]) -> Roster {
        Roster::from_entries(
            names
                .iter()
                .map(|(first, last)| RosterEntry::new(*first, *last, "someone@x.com")),
        )
    }

    #[test]
    fn splits_are_ordered_by_first_name_length() {
        let splits = candidate_splits(&["Anna", "Maria", "Schmidt"]);
        assert_eq!(
            splits,
            vec![
                NameSplit {
                    first_name: "Anna".into(),
                    last_name: "Maria Schmidt".into()
                },
                NameSplit {
                    first_name: "Anna Maria".into(),
                    last_name: "Schmidt".into()
                },
            ]
        );
        assert!(candidate_splits(&["Single"]).is_empty());
    }

    #[test]
    fn resolves_simple_name() {
        let resolver = FolderNameResolver::new().unwrap();
        let split = resolver
            .resolve("Jane Doe_12345", &roster(&[("Jane", "Doe")]))
            .unwrap();
        assert_eq!(split.first_name, "Jane");
        assert_eq!(split.last_name, "Doe");
    }

    #[test]
    fn shortest_first_name_wins() {
        let resolver = FolderNameResolver::new().unwrap();
        let both = roster(&[("Anna Maria", "Schmidt"), ("Anna", "Maria Schmidt")]);
        let split = resolver.resolve("Anna Maria Schmidt_1", &both).unwrap();
        assert_eq!(split.first_name, "Anna");
        assert_eq!(split.last_name, "Maria Schmidt");

        let only_long = roster(&[("Anna Maria", "Schmidt")]);
        let split = resolver.resolve("Anna Maria Schmidt_1", &only_long).unwrap();
        assert_eq!(split.first_name, "Anna Maria");
    }

    #[test]
    fn space_before_underscore_is_allowed() {
        let resolver = FolderNameResolver::new().unwrap();
        let split = resolver
            .resolve("Jane Doe _12345", &roster(&[("Jane", "Doe")]))
            .unwrap();
        assert_eq!(split.first_name, "Jane");
        assert_eq!(split.last_name, "Doe");
    }

    #[test]
    fn trailing_text_after_digits_is_ignored() {
        let resolver = FolderNameResolver::new().unwrap();
        let words = resolver
            .name_words("Hans-Peter Müller_987654_assignsubmission_file_")
            .unwrap();
        assert_eq!(words, vec!["Hans-Peter", "Müller"]);
    }

    #[test]
    fn no_name_part_is_naming_error() {
        let resolver = FolderNameResolver::new().unwrap();
        let empty = roster(&[]);
        for folder in ["randomfolder", "Jane_1", "Jane Doe", "Jane Doe_x1"] {
            assert!(
                matches!(resolver.resolve(folder, &empty), Err(Error::Naming { .. })),
                "{folder} should not resolve"
            );
        }
    }

    #[test]
    fn unknown_name_is_naming_error() {
        let resolver = FolderNameResolver::new().unwrap();
        let err = resolver
            .resolve("John Roe_1", &roster(&[("Jane", "Doe")]))
            .unwrap_err();
        assert!(err.to_string().contains("John Roe_1"));
    }

    #[test]
    fn more_than_seven_words_keeps_the_last_seven() {
        let resolver = FolderNameResolver::new().unwrap();
        let words = resolver.name_words("A B C D E F G H_1").unwrap();
        assert_eq!(words, vec!["B", "C", "D", "E", "F", "G", "H"]);
    }

    #[test]
    fn custom_pattern_needs_a_group() {
        assert!(FolderNameResolver::with_pattern(r"\w+_\d").is_err());
        assert!(FolderNameResolver::with_pattern(r"(").is_err());
        let resolver = FolderNameResolver::with_pattern(r"^(\w+ \w+)-\d").unwrap();
        assert_eq!(resolver.name_words("Jane Doe-7").unwrap(), vec!["Jane", "Doe"]);
    }

    proptest! {
        #[test]
        fn splits_rejoin_to_the_input(words in prop::collection::vec("[A-Za-z-]{1,8}", 1..8)) {
            let splits = candidate_splits(&words);
            prop_assert_eq!(splits.len(), words.len() - 1);
            let joined = words.join(" ");
            for (i, split) in splits.iter().enumerate() {
                prop_assert_eq!(format!("{} {}", split.first_name, split.last_name), joined.clone());
                prop_assert_eq!(split.first_name.split(' ').count(), i + 1);
            }
        }

        #[test]
        fn resolved_split_is_the_first_listed_one(
            words in prop::collection::vec("[A-Za-z]{1,8}", 2..8),
            picks in prop::collection::vec(any::<bool>(), 7),
        ) {
            let splits = candidate_splits(&words);
            let listed: Vec<&NameSplit> = splits
                .iter()
                .zip(&picks)
                .filter(|(_, pick)| **pick)
                .map(|(split, _)| split)
                .collect();
            let roster = Roster::from_entries(
                listed
                    .iter()
                    .map(|s| RosterEntry::new(s.first_name.clone(), s.last_name.clone(), "a@b.c")),
            );
            let resolver = FolderNameResolver::new().unwrap();
            let folder = format!("{}_42", words.join(" "));

            match listed.first() {
                Some(expected) => prop_assert_eq!(&resolver.resolve(&folder, &roster).unwrap(), *expected),
                None => prop_assert!(resolver.resolve(&folder, &roster).is_err()),
            }
        }
    }
}
