use serde::{Serialize, Serializer};
use std::fmt;

/// One directory name: non-empty, already trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry(String);

impl Entry {
    /// Trims `text`; returns `None` when nothing is left.
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn first_char(&self) -> char {
        // Non-empty by construction.
        self.0.chars().next().unwrap_or_default()
    }
}

impl AsRef<str> for Entry {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Splits raw text into entries, one per non-blank line, in source order.
///
/// Duplicated lines stay duplicated.
pub fn parse_entries(raw: &str) -> Vec<Entry> {
    raw.lines().filter_map(Entry::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(Entry::as_str).collect()
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_entries("").is_empty());
        assert!(parse_entries("\n \n\t\n").is_empty());
    }

    #[test]
    fn trims_and_drops_blank_lines() {
        let entries = parse_entries("  Ana \n\nBruno\n  \n");
        assert_eq!(texts(&entries), vec!["Ana", "Bruno"]);
    }

    #[test]
    fn keeps_duplicates_and_order() {
        let entries = parse_entries("Zoe\nAna\nZoe\r\nÉrica\r\n");
        assert_eq!(texts(&entries), vec!["Zoe", "Ana", "Zoe", "Érica"]);
    }

    #[test]
    fn entry_rejects_whitespace() {
        assert!(Entry::new("   ").is_none());
        assert_eq!(Entry::new(" Léo ").map(|e| e.to_string()), Some("Léo".into()));
    }
}
