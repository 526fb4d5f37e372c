//! Input and output types for the alignment engine
//!
//! Output types serialize with camelCase keys to match the viewer's
//! highlight-plugin contract. All rectangle coordinates are percentages
//! (0-100) relative to the page they sit on.

use serde::{Deserialize, Serialize};

/// A unit of text produced by the upstream retrieval stage, to be located
/// in the PDF. `page` is an optional 1-based page hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Chunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            page: None,
        }
    }

    pub fn with_page(id: impl Into<String>, text: impl Into<String>, page: u32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            page: Some(page),
        }
    }
}

/// A single highlight rectangle on one page, in percentage coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightArea {
    /// Zero-based page index
    pub page_index: u32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl HighlightArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// All highlight areas resolved for a single chunk.
///
/// `page_index` is the primary page: the page carrying the most merged
/// areas, ties resolved to the lowest page index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkHighlight {
    pub chunk_id: String,
    /// Zero-based primary page index
    pub page_index: u32,
    /// The source chunk text this highlight was resolved from
    pub text: String,
    pub areas: Vec<HighlightArea>,
}
