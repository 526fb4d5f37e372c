//! Geometry mapping and region merging
//!
//! Converts matched word spans into percentage rectangles and merges
//! geometrically adjacent rectangles into line-level highlight areas,
//! the granularity a viewer can actually render. Merging computes the
//! bounding envelope of the merged rectangles, never an average.

use crate::config::HighlightConfig;
use crate::types::HighlightArea;
use crate::word_index::WordIndex;

/// Map an inclusive word span to one percentage rectangle per word, using
/// each word's own page dimensions.
pub fn areas_for_span(index: &WordIndex, start_word: usize, end_word: usize) -> Vec<HighlightArea> {
    let words = index.words();
    let end = end_word.min(words.len().saturating_sub(1));

    let mut areas = Vec::with_capacity(end.saturating_sub(start_word) + 1);
    for word in &words[start_word..=end] {
        let Some((page_width, page_height)) = index.page_size(word.page_index) else {
            continue;
        };
        areas.push(HighlightArea {
            page_index: word.page_index,
            left: word.bbox.x0 / page_width * 100.0,
            top: word.bbox.y0 / page_height * 100.0,
            width: (word.bbox.x1 - word.bbox.x0) / page_width * 100.0,
            height: (word.bbox.y1 - word.bbox.y0) / page_height * 100.0,
        });
    }
    areas
}

/// Merge adjacent word-level rectangles into line-level ones.
///
/// Areas are sorted by (page, top rounded to 0.1, left) and folded into an
/// accumulator; a neighbor joins the accumulator only when it sits on the
/// same page, on the same line (top difference below the vertical
/// threshold) and within the horizontal gap threshold. Rounding the sort
/// key keeps words of one line together despite sub-point jitter.
pub fn merge_areas(mut areas: Vec<HighlightArea>, config: &HighlightConfig) -> Vec<HighlightArea> {
    if areas.len() <= 1 {
        return areas;
    }

    areas.sort_by(|a, b| {
        (a.page_index, (a.top * 10.0).round() as i64)
            .cmp(&(b.page_index, (b.top * 10.0).round() as i64))
            .then(a.left.total_cmp(&b.left))
    });

    let mut merged = Vec::new();
    let mut current = areas[0];

    for next in areas.into_iter().skip(1) {
        let same_line = current.page_index == next.page_index
            && (current.top - next.top).abs() < config.vertical_merge_threshold;
        let gap = next.left - current.right();

        if same_line && gap < config.horizontal_merge_threshold {
            let left = current.left.min(next.left);
            let top = current.top.min(next.top);
            let right = current.right().max(next.right());
            let bottom = current.bottom().max(next.bottom());
            current = HighlightArea {
                page_index: current.page_index,
                left,
                top,
                width: right - left,
                height: bottom - top,
            };
        } else {
            merged.push(current);
            current = next;
        }
    }
    merged.push(current);
    merged
}

/// The page carrying the most areas; ties resolve to the lowest index.
pub fn primary_page(areas: &[HighlightArea]) -> u32 {
    let mut counts = std::collections::BTreeMap::new();
    for area in areas {
        *counts.entry(area.page_index).or_insert(0usize) += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(page, count)| (*count, std::cmp::Reverse(*page)))
        .map(|(page, _)| page)
        .unwrap_or(0)
}
