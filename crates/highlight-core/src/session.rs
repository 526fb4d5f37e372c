//! Highlight session: one open document, many chunk lookups
//!
//! Ties the pipeline together: word index, skeleton, locator, geometry.
//! A session is built once per document and answers any number of chunk
//! queries against the same immutable index.
//!
//! Page hints narrow the search in widening steps: the hinted page alone,
//! then the hinted page with its direct neighbors, then the whole
//! document. A chunk that matches nowhere produces no highlight at all;
//! callers never receive a guessed location.

use crate::config::HighlightConfig;
use crate::error::HighlightError;
use crate::geometry::{areas_for_span, merge_areas, primary_page};
use crate::locate::locate;
use crate::skeleton::Skeleton;
use crate::types::{Chunk, ChunkHighlight};
use crate::word_index::WordIndex;
use std::path::Path;
use tracing::{debug, warn};

pub struct HighlightSession {
    index: WordIndex,
    skeleton: Skeleton,
    config: HighlightConfig,
}

impl HighlightSession {
    /// Open a PDF and index it with the default thresholds.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HighlightError> {
        Self::open_with_config(path, HighlightConfig::default())
    }

    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: HighlightConfig,
    ) -> Result<Self, HighlightError> {
        Ok(Self::from_index(WordIndex::open(path)?, config))
    }

    /// Build a session from in-memory PDF bytes.
    pub fn from_bytes(bytes: &[u8], config: HighlightConfig) -> Result<Self, HighlightError> {
        Ok(Self::from_index(WordIndex::from_bytes(bytes)?, config))
    }

    fn from_index(index: WordIndex, config: HighlightConfig) -> Self {
        let skeleton = Skeleton::build(&index);
        Self {
            index,
            skeleton,
            config,
        }
    }

    pub fn page_count(&self) -> usize {
        self.index.page_count()
    }

    /// Resolve one chunk to its merged highlight areas. `None` means the
    /// chunk could not be matched anywhere under the configured thresholds.
    pub fn highlight(&self, chunk: &Chunk) -> Option<ChunkHighlight> {
        for scope in self.hint_scopes(chunk) {
            let located = match &scope {
                Some(pages) => {
                    let narrowed = Skeleton::build_for_pages(&self.index, pages);
                    locate(&narrowed, &chunk.text, &self.config)
                }
                None => locate(&self.skeleton, &chunk.text, &self.config),
            };

            if let Some(located) = located {
                let areas = merge_areas(
                    areas_for_span(&self.index, located.start_word, located.end_word),
                    &self.config,
                );
                if areas.is_empty() {
                    continue;
                }
                debug!(
                    chunk_id = %chunk.id,
                    strategy = ?located.strategy,
                    areas = areas.len(),
                    "resolved chunk"
                );
                return Some(ChunkHighlight {
                    chunk_id: chunk.id.clone(),
                    page_index: primary_page(&areas),
                    text: chunk.text.clone(),
                    areas,
                });
            }
        }

        warn!(chunk_id = %chunk.id, "chunk matched nowhere, dropping");
        None
    }

    /// Resolve a batch of chunks. Unmatched chunks are dropped, so the
    /// output can be shorter than the input.
    pub fn highlight_all(&self, chunks: &[Chunk]) -> Vec<ChunkHighlight> {
        chunks.iter().filter_map(|c| self.highlight(c)).collect()
    }

    /// Release the underlying document handle. Idempotent; resolved
    /// geometry stays valid.
    pub fn close(&mut self) {
        self.index.close();
    }

    /// Search scopes in widening order. `None` is the whole document; a
    /// 1-based page hint yields the hinted page, then the hinted page with
    /// its neighbors, then the full document. An out-of-range hint falls
    /// straight through to the full document.
    fn hint_scopes(&self, chunk: &Chunk) -> Vec<Option<Vec<u32>>> {
        let Some(page) = chunk.page else {
            return vec![None];
        };
        let page_count = self.index.page_count() as u32;
        if page == 0 || page > page_count {
            warn!(
                chunk_id = %chunk.id,
                hint = page,
                pages = page_count,
                "page hint out of range, searching whole document"
            );
            return vec![None];
        }

        let idx = page - 1;
        let neighbors: Vec<u32> = (idx.saturating_sub(1)..=(idx + 1).min(page_count - 1)).collect();
        vec![Some(vec![idx]), Some(neighbors), None]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testpdf::synthetic_pdf;
    use pretty_assertions::assert_eq;

    fn two_page_session() -> HighlightSession {
        let pdf = synthetic_pdf(&[
            &["Hello world foo bar", "second line here"],
            &["Hello world baz qux"],
        ]);
        HighlightSession::from_bytes(&pdf, HighlightConfig::default()).unwrap()
    }

    #[test]
    fn test_chunk_resolves_to_single_merged_line_area() {
        let session = two_page_session();
        let chunk = Chunk::new("c1", "Hello world foo bar");

        let highlight = session.highlight(&chunk).unwrap();
        assert_eq!(highlight.chunk_id, "c1");
        assert_eq!(highlight.page_index, 0);
        // Four words on one line, gaps well under the horizontal threshold
        assert_eq!(highlight.areas.len(), 1);
        let area = highlight.areas[0];
        assert_eq!(area.page_index, 0);
        assert!(area.left > 0.0 && area.left < 100.0);
        assert!(area.width > 0.0 && area.right() <= 100.0);
    }

    #[test]
    fn test_unhinted_ambiguous_chunk_resolves_to_first_page() {
        let session = two_page_session();
        let highlight = session.highlight(&Chunk::new("c1", "Hello world")).unwrap();
        assert_eq!(highlight.page_index, 0);
    }

    #[test]
    fn test_page_hint_steers_ambiguous_chunk() {
        let session = two_page_session();
        // "Hello world" occurs on both pages; the 1-based hint picks page 2
        let highlight = session
            .highlight(&Chunk::with_page("c1", "Hello world", 2))
            .unwrap();
        assert_eq!(highlight.page_index, 1);
        assert!(highlight.areas.iter().all(|a| a.page_index == 1));
    }

    #[test]
    fn test_hint_never_leaks_matches_from_other_pages() {
        let lines = ["Annual report overview text"];
        let pdf = synthetic_pdf(&[&lines, &lines, &lines, &lines, &lines]);
        let session = HighlightSession::from_bytes(&pdf, HighlightConfig::default()).unwrap();

        let highlight = session
            .highlight(&Chunk::with_page("c1", "Annual report overview text", 5))
            .unwrap();
        assert_eq!(highlight.page_index, 4);
    }

    #[test]
    fn test_out_of_range_hint_falls_back_to_whole_document() {
        let session = two_page_session();
        let highlight = session
            .highlight(&Chunk::with_page("c1", "second line here", 99))
            .unwrap();
        assert_eq!(highlight.page_index, 0);
    }

    #[test]
    fn test_hint_on_wrong_page_widens_until_found() {
        let session = two_page_session();
        // Only page 0 contains this text; the page-2 hint must not lose it
        let highlight = session
            .highlight(&Chunk::with_page("c1", "second line here", 2))
            .unwrap();
        assert_eq!(highlight.page_index, 0);
    }

    #[test]
    fn test_unmatched_chunks_are_dropped_from_batch() {
        let session = two_page_session();
        let chunks = vec![
            Chunk::new("good", "Hello world foo bar"),
            Chunk::new("bad", "completely absent wording nowhere present"),
        ];

        let highlights = session.highlight_all(&chunks);
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].chunk_id, "good");
    }

    #[test]
    fn test_multi_line_chunk_produces_one_area_per_line() {
        let session = two_page_session();
        let chunk = Chunk::new("c1", "Hello world foo bar second line here");

        let highlight = session.highlight(&chunk).unwrap();
        assert_eq!(highlight.page_index, 0);
        assert_eq!(highlight.areas.len(), 2);
        // Line areas come out sorted top-down
        assert!(highlight.areas[0].top < highlight.areas[1].top);
    }

    #[test]
    fn test_whitespace_noisy_chunk_still_resolves() {
        let session = two_page_session();
        let clean = session.highlight(&Chunk::new("a", "Hello world foo bar")).unwrap();
        let noisy = session
            .highlight(&Chunk::new("b", "Hel lo\n\nworld   fo o bar"))
            .unwrap();
        assert_eq!(clean.areas, noisy.areas);
    }

    #[test]
    fn test_close_is_idempotent_and_preserves_results() {
        let mut session = two_page_session();
        let before = session.highlight(&Chunk::new("c1", "Hello world foo bar")).unwrap();
        session.close();
        session.close();
        let after = session.highlight(&Chunk::new("c1", "Hello world foo bar")).unwrap();
        assert_eq!(before.areas, after.areas);
    }
}
