//! Approximate locator: aligns a fragment against the skeleton
//!
//! The primary strategy is a longest-common-run search (longest common
//! substring over character vectors) between the document skeleton and the
//! normalized fragment; a global match is never required, only one solid
//! contiguous run. Short fragments carry too little signal for run scoring
//! and fall back to exact containment of the fragment skeleton.

use crate::config::HighlightConfig;
use crate::normalize::{normalize_matchable, token_count};
use crate::skeleton::Skeleton;
use tracing::debug;

/// Which matching strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Skeleton,
    TokenOverlap,
}

/// An inclusive span of global word indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub start_word: usize,
    pub end_word: usize,
    pub strategy: Strategy,
}

/// Find the best-aligned word span for `fragment` in `skeleton`.
///
/// Returns `None` when the fragment (or its best matching run) falls below
/// the configured minimum length or coverage; small matches are more
/// likely boilerplate collisions than real alignments.
pub fn locate(skeleton: &Skeleton, fragment: &str, config: &HighlightConfig) -> Option<Located> {
    let fragment_skeleton = normalize_matchable(fragment);
    let frag_chars: Vec<char> = fragment_skeleton.chars().collect();
    if frag_chars.len() < config.min_match_chars || skeleton.is_empty() {
        return None;
    }
    let doc_chars: Vec<char> = skeleton.text().chars().collect();

    if token_count(fragment) < config.short_fragment_words {
        return locate_by_containment(skeleton, &doc_chars, &frag_chars);
    }

    let (start, len) = longest_common_run(&doc_chars, &frag_chars);
    if len < config.min_match_chars {
        debug!(run_len = len, "matched run below minimum length");
        return None;
    }
    if (len as f64) < config.min_coverage * frag_chars.len() as f64 {
        debug!(
            run_len = len,
            fragment_len = frag_chars.len(),
            "matched run below coverage threshold"
        );
        return None;
    }

    span_for(skeleton, start, len, Strategy::Skeleton)
}

/// Fallback for fragments under the token threshold: accept only an exact
/// occurrence of the whole fragment skeleton.
fn locate_by_containment(
    skeleton: &Skeleton,
    doc_chars: &[char],
    frag_chars: &[char],
) -> Option<Located> {
    if frag_chars.len() > doc_chars.len() {
        return None;
    }
    let start = doc_chars
        .windows(frag_chars.len())
        .position(|window| window == frag_chars)?;
    span_for(skeleton, start, frag_chars.len(), Strategy::TokenOverlap)
}

fn span_for(skeleton: &Skeleton, start: usize, len: usize, strategy: Strategy) -> Option<Located> {
    let start_word = skeleton.word_at(start)?;
    let end_word = skeleton.word_at(start + len - 1)?;
    Some(Located {
        start_word,
        end_word,
        strategy,
    })
}

/// Longest contiguous matching run between `doc` and `frag`, returned as
/// `(start_in_doc, length)`. Ties resolve to the leftmost run in the
/// document. Rolling-array dynamic program: O(|doc| * |frag|) time,
/// O(|frag|) memory.
fn longest_common_run(doc: &[char], frag: &[char]) -> (usize, usize) {
    let mut prev = vec![0u32; frag.len() + 1];
    let mut curr = vec![0u32; frag.len() + 1];
    let mut best_len = 0usize;
    let mut best_end = 0usize;

    for (i, &dc) in doc.iter().enumerate() {
        for (j, &fc) in frag.iter().enumerate() {
            curr[j + 1] = if dc == fc { prev[j] + 1 } else { 0 };
            if curr[j + 1] as usize > best_len {
                best_len = curr[j + 1] as usize;
                best_end = i + 1;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_end - best_len, best_len)
}
