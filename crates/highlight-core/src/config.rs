//! Matching and merging thresholds
//!
//! Every numeric knob the engine uses lives here under a name, instead of
//! being re-derived at call sites.

/// Tunable thresholds for locating and merging.
#[derive(Debug, Clone)]
pub struct HighlightConfig {
    /// Minimum number of normalized characters a match must cover.
    /// Fragments or matched runs below this are considered unreliable
    /// and yield no result.
    pub min_match_chars: usize,

    /// The matched run must cover at least this fraction of the
    /// normalized fragment.
    pub min_coverage: f64,

    /// Fragments with fewer tokens than this use the token-overlap
    /// containment fallback instead of skeleton alignment.
    pub short_fragment_words: usize,

    /// Two areas on the same page merge only when their tops differ by
    /// less than this (percent of page height).
    pub vertical_merge_threshold: f64,

    /// Two areas on the same line merge only when the horizontal gap
    /// between them is below this (percent of page width).
    pub horizontal_merge_threshold: f64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            min_match_chars: 10,
            min_coverage: 0.3,
            short_fragment_words: 3,
            vertical_merge_threshold: 1.5,
            horizontal_merge_threshold: 4.0,
        }
    }
}

impl HighlightConfig {
    /// Preset for sources known to contain intra-word breaks ("ti en"
    /// instead of "tien"): a much wider horizontal gap still merges.
    pub fn loose() -> Self {
        Self {
            horizontal_merge_threshold: 20.0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = HighlightConfig::default();
        assert_eq!(config.min_match_chars, 10);
        assert_eq!(config.short_fragment_words, 3);
        assert!(config.vertical_merge_threshold > 0.0);
        assert!(config.horizontal_merge_threshold > 0.0);
    }

    #[test]
    fn test_loose_preset_widens_horizontal_gap() {
        let loose = HighlightConfig::loose();
        assert!(loose.horizontal_merge_threshold > HighlightConfig::default().horizontal_merge_threshold);
        assert_eq!(loose.min_match_chars, HighlightConfig::default().min_match_chars);
    }
}
