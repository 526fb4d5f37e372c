//! Text normalization shared by the skeleton and query fragments
//!
//! Normalization is the single source of truth for all comparisons: the
//! same function runs over every extracted word and over every incoming
//! chunk, so two imperfect renditions of the same text land on identical
//! character sequences. NFKC unifies precomposed and decomposed Vietnamese
//! diacritics as well as compatibility forms (ligatures, fullwidth digits).

use unicode_normalization::UnicodeNormalization;

/// Zero-width characters PDF extractors and chunkers leak into text.
const ZERO_WIDTH: &[char] = &[
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // byte order mark
];

fn is_zero_width(c: char) -> bool {
    ZERO_WIDTH.contains(&c)
}

/// Normalize for matching: NFKC, lowercase, all whitespace and zero-width
/// characters removed. PDF extraction inserts spurious breaks inside words,
/// so whitespace carries no signal at all in skeleton space.
pub fn normalize_matchable(text: &str) -> String {
    let stripped: String = text
        .nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| !c.is_whitespace() && !is_zero_width(*c))
        .collect();
    // Stripping can juxtapose a base letter and a combining mark that were
    // separated by removed characters; renormalize so equal text always
    // yields equal character sequences.
    stripped.nfkc().collect()
}

/// Normalize preserving word boundaries: NFKC, lowercase, zero-width
/// removal, whitespace runs collapsed to a single space. Used only for
/// tokenizing fragments ahead of the token-overlap fallback.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.nfkc().flat_map(char::to_lowercase) {
        if is_zero_width(c) {
            continue;
        }
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out.nfkc().collect()
}

/// Count the words of a fragment after boundary-preserving normalization.
pub fn token_count(text: &str) -> usize {
    collapse_whitespace(text).split(' ').filter(|t| !t.is_empty()).count()
}
