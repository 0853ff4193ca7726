use crate::parser::Entry;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Entries sharing one uppercase initial, sorted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LetterGroup {
    pub letter: char,
    pub names: Vec<Entry>,
}

/// Filtered groups plus the number of entries they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexView {
    pub groups: Vec<LetterGroup>,
    pub total: usize,
}

/// Owner of the loaded entry collection.
#[derive(Debug, Clone, Default)]
pub struct DirectoryIndex {
    entries: Vec<Entry>,
}

impl DirectoryIndex {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Swaps in a freshly parsed collection.
    pub fn replace_all(&mut self, entries: Vec<Entry>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filter(&self, term: &str) -> Vec<&Entry> {
        filter(&self.entries, term)
    }

    /// Filters by `term` and groups what is left.
    pub fn view(&self, term: &str) -> IndexView {
        let filtered = self.filter(term);
        IndexView {
            total: filtered.len(),
            groups: group_by_initial(filtered),
        }
    }
}

/// Uppercase initial used as the bucket key.
pub fn initial_of(entry: &Entry) -> char {
    let first = entry.first_char();
    first.to_uppercase().next().unwrap_or(first)
}

/// Buckets entries by uppercase initial. Letters ascend by code point and each
/// bucket is sorted with [`locale_cmp`].
pub fn group_by_initial<'a, I>(entries: I) -> Vec<LetterGroup>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut buckets: BTreeMap<char, Vec<Entry>> = BTreeMap::new();
    for entry in entries {
        buckets
            .entry(initial_of(entry))
            .or_default()
            .push(entry.clone());
    }
    buckets
        .into_iter()
        .map(|(letter, mut names)| {
            names.sort_by(|a, b| locale_cmp(a.as_str(), b.as_str()));
            LetterGroup { letter, names }
        })
        .collect()
}

/// Case-insensitive substring filter. A blank term keeps everything.
///
/// The term is matched as typed; only blank detection trims it.
pub fn filter<'a>(entries: &'a [Entry], term: &str) -> Vec<&'a Entry> {
    if term.trim().is_empty() {
        return entries.iter().collect();
    }
    let needle = term.to_lowercase();
    entries
        .iter()
        .filter(|entry| entry.as_str().to_lowercase().contains(&needle))
        .collect()
}

/// Dictionary-style comparison: accents and case only break ties.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    base_key(a)
        .cmp(&base_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| case_key(a).cmp(&case_key(b)))
        .then_with(|| a.cmp(b))
}

fn base_key(text: &str) -> String {
    text.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect::<String>()
        .to_lowercase()
}

// Lowercase sorts before uppercase on otherwise equal text.
fn case_key(text: &str) -> Vec<bool> {
    text.chars().map(char::is_uppercase).collect()
}
