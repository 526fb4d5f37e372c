//! Skeleton: the normalized character stream of a document
//!
//! Concatenates every word's normalized text into one whitespace-free
//! string, and keeps a parallel map from each character back to the word
//! it came from. The locator aligns fragments against this string and maps
//! run endpoints back to word spans through `char_to_word`.

use crate::normalize::normalize_matchable;
use crate::word_index::WordIndex;

/// Invariant: `text.chars().count() == char_to_word.len()`, and every entry
/// of `char_to_word` is a valid global index into the source `WordIndex`.
#[derive(Debug, Clone)]
pub struct Skeleton {
    text: String,
    char_to_word: Vec<u32>,
}

impl Skeleton {
    /// Build the skeleton over the whole document. Deterministic and pure
    /// given the index: words whose text normalizes to the empty string
    /// contribute no characters at all.
    pub fn build(index: &WordIndex) -> Self {
        Self::build_filtered(index, |_| true)
    }

    /// Build a sub-skeleton from the given 0-based pages only. Character
    /// positions still map to global word indices, so spans located in a
    /// narrowed skeleton address the full index.
    pub fn build_for_pages(index: &WordIndex, pages: &[u32]) -> Self {
        Self::build_filtered(index, |page| pages.contains(&page))
    }

    fn build_filtered(index: &WordIndex, keep: impl Fn(u32) -> bool) -> Self {
        let mut text = String::new();
        let mut char_to_word = Vec::new();

        for (word_idx, word) in index.words().iter().enumerate() {
            if !keep(word.page_index) {
                continue;
            }
            let normalized = normalize_matchable(&word.text);
            if normalized.is_empty() {
                continue;
            }
            char_to_word.extend(std::iter::repeat(word_idx as u32).take(normalized.chars().count()));
            text.push_str(&normalized);
        }

        Self { text, char_to_word }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.char_to_word.is_empty()
    }

    /// Global word index owning the character at `char_idx` (character
    /// offset, not byte offset).
    pub fn word_at(&self, char_idx: usize) -> Option<usize> {
        self.char_to_word.get(char_idx).map(|w| *w as usize)
    }

    pub fn char_len(&self) -> usize {
        self.char_to_word.len()
    }
}
