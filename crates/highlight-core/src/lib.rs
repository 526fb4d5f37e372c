//! Chunk-to-geometry alignment for PDF highlighting
//!
//! This crate reconnects retrieval chunks (noisy text fragments that lost
//! their positions) to highlight rectangles in the source PDF, using lopdf.
//!
//! The pipeline: extract per-word geometry ([`WordIndex`]), concatenate the
//! normalized text into a whitespace-free skeleton ([`Skeleton`]), align
//! each fragment by its longest common run ([`locate`]), and convert the
//! matched word span into merged percentage rectangles ([`geometry`]).
//! [`HighlightSession`] ties the stages together for callers.
//!
//! All output coordinates are percentages (0-100) of the page, top-left
//! origin, so they plug straight into page-overlay viewers regardless of
//! render scale.

pub mod config;
pub mod error;
pub mod geometry;
pub mod locate;
pub mod normalize;
pub mod session;
pub mod skeleton;
pub mod types;
pub mod word_index;

#[cfg(test)]
pub(crate) mod testpdf;

pub use config::HighlightConfig;
pub use error::HighlightError;
pub use locate::{locate, Located, Strategy};
pub use session::HighlightSession;
pub use skeleton::Skeleton;
pub use types::{Chunk, ChunkHighlight, HighlightArea};
pub use word_index::{Rect, Word, WordIndex};

/// Open a PDF, resolve every chunk, and return the highlights that matched.
pub fn extract_highlights(
    path: impl AsRef<std::path::Path>,
    chunks: &[Chunk],
) -> Result<Vec<ChunkHighlight>, HighlightError> {
    let session = HighlightSession::open(path)?;
    Ok(session.highlight_all(chunks))
}
