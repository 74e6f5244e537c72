//! Keyword-list membership.

use itertools::Itertools;

/// A case-folded keyword set.
///
/// Built from a whitespace-separated list; entries are lowercased, sorted
/// and deduplicated once, and membership is a binary search over the
/// ASCII-lowercased candidate, so lists may be written in any case.
///
/// Entries may carry a marker character splitting them into a mandatory
/// prefix and an optional continuation, tested with
/// [`in_list_abbreviated`]: the entry `min(imum)` matches `min`, `mini`, …
/// up to `minimum`, nothing shorter and nothing that diverges.
///
/// [`in_list_abbreviated`]: WordList::in_list_abbreviated
///
/// # Example
/// ```
/// use ed_text::WordList;
///
/// let kw = WordList::new("select from WHERE");
/// assert!(kw.in_list("Select"));
/// assert!(kw.in_list("where"));
/// assert!(!kw.in_list("selec"));
/// ```
#[derive(Clone, Default)]
pub struct WordList {
    words: Vec<Box<str>>,
}

impl WordList {
    pub fn new(list: &str) -> Self {
        let words = list
            .split_whitespace()
            .map(|w| w.to_ascii_lowercase().into_boxed_str())
            .sorted()
            .dedup()
            .collect();
        Self { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Exact (case-folded) membership.
    pub fn in_list(&self, word: &str) -> bool {
        let word = word.to_ascii_lowercase();
        self.words
            .binary_search_by(|entry| entry.as_ref().cmp(word.as_str()))
            .is_ok()
    }

    /// Membership against marker-abbreviated entries.
    ///
    /// For an entry containing `marker`, the part before the marker must be
    /// a prefix of `word` and the rest of `word` must be a prefix of the
    /// part after the marker. Entries without a marker match exactly.
    pub fn in_list_abbreviated(&self, word: &str, marker: u8) -> bool {
        let word = word.to_ascii_lowercase();
        self.words.iter().any(|entry| {
            match entry.find(marker as char) {
                Some(split) => {
                    let mandatory = &entry[..split];
                    let optional = &entry[split + 1..];
                    word.len() >= mandatory.len()
                        && word.starts_with(mandatory)
                        && optional.starts_with(&word[mandatory.len()..])
                }
                None => entry.as_ref() == word,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_folded() {
        let kw = WordList::new("BEGIN end Loop end");
        assert!(kw.in_list("begin"));
        assert!(kw.in_list("END"));
        assert!(kw.in_list("loop"));
        assert!(!kw.in_list("begins"));
        assert!(!WordList::default().in_list("begin"));
    }

    #[test]
    fn abbreviated() {
        let kw = WordList::new("des(cribe) print");
        assert!(kw.in_list_abbreviated("des", b'('));
        assert!(kw.in_list_abbreviated("desc", b'('));
        assert!(kw.in_list_abbreviated("describe", b'('));
        assert!(!kw.in_list_abbreviated("de", b'('));
        assert!(!kw.in_list_abbreviated("describes", b'('));
        assert!(!kw.in_list_abbreviated("desk", b'('));
        assert!(kw.in_list_abbreviated("print", b'('));
        assert!(!kw.in_list_abbreviated("prin", b'('));
    }
}
