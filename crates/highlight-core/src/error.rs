use thiserror::Error;

/// Session-fatal errors. Per-chunk misses are not errors: an unmatched
/// chunk is dropped from the result set and logged, and an out-of-range
/// page hint is ignored.
#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Failed to open PDF: {0}")]
    FileOpen(String),

    #[error("Failed to parse PDF: {0}")]
    Parse(String),
}
