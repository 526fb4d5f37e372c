//! Word Index: per-word geometry extraction
//!
//! Opens a PDF once and interprets every page's content stream to recover
//! each word together with its bounding box. The index is built eagerly at
//! open time and never mutated afterwards, so it is safe to share across
//! threads for read access. It is the sole owner of raw geometry; every
//! other component works with word indices into it.
//!
//! Coordinate system: bounding boxes are stored in absolute PDF points with
//! a top-left origin (y is flipped from PDF user space at extraction time),
//! so converting to viewer percentages is a plain division by the page size.
//!
//! The interpreter covers the text operators (BT/ET, Tf, Td/TD/Tm/T*, TL,
//! Tc/Tw/Tz, Tj/TJ/'/") plus the graphics-state subset that moves text
//! around (q/Q/cm). Glyph advances come from the font's /Widths array when
//! present, with a 500/1000-em fallback. String bytes are decoded as
//! single-byte Latin-1; composite-font text still produces geometry, and
//! the approximate matcher downstream tolerates the degraded characters.

use crate::error::HighlightError;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Glyph-space ascent/descent fractions used to approximate word height
/// from the font size. Exact metrics are not needed for highlight boxes.
const ASCENT: f64 = 0.8;
const DESCENT: f64 = 0.2;

/// Default glyph advance (thousandths of an em) when no /Widths entry
/// applies.
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

/// A TJ kern adjustment at least this large (thousandths of an em,
/// rightward) is treated as a word gap rather than kerning.
const TJ_WORD_GAP_THOUSANDTHS: f64 = 180.0;

/// A word extracted from a page, with its bounding box in absolute PDF
/// points, top-left origin.
#[derive(Debug, Clone)]
pub struct Word {
    pub page_index: u32,
    pub bbox: Rect,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Immutable per-document word index.
pub struct WordIndex {
    doc: Option<Document>,
    words: Vec<Word>,
    /// (width, height) in points, indexed by 0-based page
    page_sizes: Vec<(f64, f64)>,
    /// words[page_starts[p]..page_starts[p + 1]] are the words of page p
    page_starts: Vec<usize>,
}

impl WordIndex {
    /// Open a PDF file and build the full index. Fails fast: an
    /// unparseable document yields an error and no partial index.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HighlightError> {
        let doc = Document::load(path).map_err(|e| HighlightError::FileOpen(e.to_string()))?;
        Self::build(doc)
    }

    /// Build the index from in-memory PDF bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HighlightError> {
        let doc = Document::load_mem(bytes).map_err(|e| HighlightError::FileOpen(e.to_string()))?;
        Self::build(doc)
    }

    fn build(doc: Document) -> Result<Self, HighlightError> {
        let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

        let mut words = Vec::new();
        let mut page_sizes = Vec::with_capacity(pages.len());
        let mut page_starts = Vec::with_capacity(pages.len() + 1);

        for (page_index, (_page_num, page_id)) in pages.iter().enumerate() {
            page_starts.push(words.len());
            let (width, height) = page_size_of(&doc, *page_id);
            page_sizes.push((width, height));
            extract_page_words(&doc, *page_id, page_index as u32, height, &mut words)?;
        }
        page_starts.push(words.len());

        debug!(
            pages = page_sizes.len(),
            words = words.len(),
            "indexed document"
        );

        Ok(Self {
            doc: Some(doc),
            words,
            page_sizes,
            page_starts,
        })
    }

    /// All words in document reading order (page ascending, extraction
    /// order within page).
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Words on one 0-based page.
    pub fn words_on_page(&self, page_index: u32) -> &[Word] {
        let p = page_index as usize;
        if p + 1 >= self.page_starts.len() {
            return &[];
        }
        &self.words[self.page_starts[p]..self.page_starts[p + 1]]
    }

    pub fn page_count(&self) -> usize {
        self.page_sizes.len()
    }

    /// (width, height) of a 0-based page, in points.
    pub fn page_size(&self, page_index: u32) -> Option<(f64, f64)> {
        self.page_sizes.get(page_index as usize).copied()
    }

    /// Release the underlying document handle. Idempotent; the extracted
    /// words and page sizes remain usable.
    pub fn close(&mut self) {
        self.doc = None;
    }

    pub fn is_closed(&self) -> bool {
        self.doc.is_none()
    }

    #[cfg(test)]
    pub(crate) fn from_parts(words: Vec<Word>, page_sizes: Vec<(f64, f64)>) -> Self {
        let mut page_starts = Vec::with_capacity(page_sizes.len() + 1);
        for p in 0..page_sizes.len() as u32 {
            page_starts.push(words.iter().position(|w| w.page_index >= p).unwrap_or(words.len()));
        }
        page_starts.push(words.len());
        Self {
            doc: None,
            words,
            page_sizes,
            page_starts,
        }
    }
}

/// 2D affine transform in PDF row-vector convention: p' = p * M.
#[derive(Debug, Clone, Copy)]
struct Mat {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Mat {
    const IDENTITY: Mat = Mat {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translation(tx: f64, ty: f64) -> Mat {
        Mat {
            e: tx,
            f: ty,
            ..Mat::IDENTITY
        }
    }

    /// self * rhs (apply self first, then rhs).
    fn then(self, rhs: Mat) -> Mat {
        Mat {
            a: self.a * rhs.a + self.b * rhs.c,
            b: self.a * rhs.b + self.b * rhs.d,
            c: self.c * rhs.a + self.d * rhs.c,
            d: self.c * rhs.b + self.d * rhs.d,
            e: self.e * rhs.a + self.f * rhs.c + rhs.e,
            f: self.e * rhs.b + self.f * rhs.d + rhs.f,
        }
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }
}

#[derive(Debug, Clone)]
struct FontWidths {
    first_char: i64,
    widths: Vec<f64>,
}

impl FontWidths {
    /// Glyph advance in thousandths of an em.
    fn width(&self, code: u8) -> f64 {
        let idx = code as i64 - self.first_char;
        if idx >= 0 {
            if let Some(w) = self.widths.get(idx as usize) {
                return *w;
            }
        }
        DEFAULT_GLYPH_WIDTH
    }
}

/// Accumulates the glyphs of the word currently being shown.
struct WordBuilder {
    text: String,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl WordBuilder {
    fn new() -> Self {
        Self {
            text: String::new(),
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    fn push_glyph(&mut self, ch: char, trm: &Mat, advance: f64) {
        // Glyph box in text space, before the font-size scale carried by trm
        for (gx, gy) in [
            (0.0, -DESCENT),
            (advance, -DESCENT),
            (0.0, ASCENT),
            (advance, ASCENT),
        ] {
            let (x, y) = trm.apply(gx, gy);
            self.min_x = self.min_x.min(x);
            self.min_y = self.min_y.min(y);
            self.max_x = self.max_x.max(x);
            self.max_y = self.max_y.max(y);
        }
        self.text.push(ch);
    }

    fn flush(&mut self, page_index: u32, page_height: f64, out: &mut Vec<Word>) {
        if !self.text.is_empty() {
            out.push(Word {
                page_index,
                // Flip to top-left origin
                bbox: Rect {
                    x0: self.min_x,
                    y0: page_height - self.max_y,
                    x1: self.max_x,
                    y1: page_height - self.min_y,
                },
                text: std::mem::take(&mut self.text),
            });
        }
        self.min_x = f64::INFINITY;
        self.min_y = f64::INFINITY;
        self.max_x = f64::NEG_INFINITY;
        self.max_y = f64::NEG_INFINITY;
    }
}

/// Text and graphics state while walking one content stream.
struct TextWalker<'a> {
    page_index: u32,
    page_height: f64,
    fonts: HashMap<Vec<u8>, FontWidths>,
    font: Option<FontWidths>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    h_scale: f64,
    leading: f64,
    tm: Mat,
    tlm: Mat,
    ctm: Mat,
    ctm_stack: Vec<Mat>,
    word: WordBuilder,
    out: &'a mut Vec<Word>,
}

impl<'a> TextWalker<'a> {
    fn new(
        page_index: u32,
        page_height: f64,
        fonts: HashMap<Vec<u8>, FontWidths>,
        out: &'a mut Vec<Word>,
    ) -> Self {
        Self {
            page_index,
            page_height,
            fonts,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            tm: Mat::IDENTITY,
            tlm: Mat::IDENTITY,
            ctm: Mat::IDENTITY,
            ctm_stack: Vec::new(),
            word: WordBuilder::new(),
            out,
        }
    }

    fn flush_word(&mut self) {
        self.word.flush(self.page_index, self.page_height, self.out);
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.flush_word();
        self.tlm = Mat::translation(tx, ty).then(self.tlm);
        self.tm = self.tlm;
    }

    fn glyph_width(&self, code: u8) -> f64 {
        self.font
            .as_ref()
            .map(|f| f.width(code))
            .unwrap_or(DEFAULT_GLYPH_WIDTH)
    }

    /// Show a string: emit glyph boxes, advance the text matrix, split
    /// words on space glyphs.
    fn show_text(&mut self, bytes: &[u8]) {
        for &code in bytes {
            let w0 = self.glyph_width(code) / 1000.0;
            let mut advance = (w0 * self.font_size + self.char_spacing) * self.h_scale;
            if code == b' ' {
                advance += self.word_spacing * self.h_scale;
                self.flush_word();
            } else {
                let trm = Mat {
                    a: self.font_size * self.h_scale,
                    b: 0.0,
                    c: 0.0,
                    d: self.font_size,
                    e: 0.0,
                    f: 0.0,
                }
                .then(self.tm)
                .then(self.ctm);
                // Latin-1 view of the byte; see module docs
                self.word.push_glyph(code as char, &trm, w0);
            }
            self.tm = Mat::translation(advance, 0.0).then(self.tm);
        }
    }

    fn run(&mut self, content: &Content) {
        for op in &content.operations {
            let args = &op.operands;
            match op.operator.as_str() {
                "q" => self.ctm_stack.push(self.ctm),
                "Q" => self.ctm = self.ctm_stack.pop().unwrap_or(Mat::IDENTITY),
                "cm" => {
                    if let Some(m) = mat_from_args(args) {
                        self.ctm = m.then(self.ctm);
                    }
                }
                "BT" => {
                    self.tm = Mat::IDENTITY;
                    self.tlm = Mat::IDENTITY;
                }
                "ET" => self.flush_word(),
                "Tf" => {
                    self.flush_word();
                    if let Some(Object::Name(name)) = args.first() {
                        self.font = self.fonts.get(name.as_slice()).cloned();
                    }
                    self.font_size = args.get(1).and_then(num).unwrap_or(self.font_size);
                }
                "Tc" => self.char_spacing = args.first().and_then(num).unwrap_or(0.0),
                "Tw" => self.word_spacing = args.first().and_then(num).unwrap_or(0.0),
                "Tz" => self.h_scale = args.first().and_then(num).unwrap_or(100.0) / 100.0,
                "TL" => self.leading = args.first().and_then(num).unwrap_or(0.0),
                "Td" => {
                    let tx = args.first().and_then(num).unwrap_or(0.0);
                    let ty = args.get(1).and_then(num).unwrap_or(0.0);
                    self.next_line(tx, ty);
                }
                "TD" => {
                    let tx = args.first().and_then(num).unwrap_or(0.0);
                    let ty = args.get(1).and_then(num).unwrap_or(0.0);
                    self.leading = -ty;
                    self.next_line(tx, ty);
                }
                "Tm" => {
                    self.flush_word();
                    if let Some(m) = mat_from_args(args) {
                        self.tlm = m;
                        self.tm = m;
                    }
                }
                "T*" => {
                    let leading = self.leading;
                    self.next_line(0.0, -leading);
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = args.first() {
                        self.show_text(bytes);
                    }
                }
                "'" => {
                    let leading = self.leading;
                    self.next_line(0.0, -leading);
                    if let Some(Object::String(bytes, _)) = args.first() {
                        self.show_text(bytes);
                    }
                }
                "\"" => {
                    self.word_spacing = args.first().and_then(num).unwrap_or(0.0);
                    self.char_spacing = args.get(1).and_then(num).unwrap_or(0.0);
                    let leading = self.leading;
                    self.next_line(0.0, -leading);
                    if let Some(Object::String(bytes, _)) = args.get(2) {
                        self.show_text(bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(elements)) = args.first() {
                        for element in elements {
                            match element {
                                Object::String(bytes, _) => self.show_text(bytes),
                                other => {
                                    if let Some(adj) = num(other) {
                                        let tx =
                                            -adj / 1000.0 * self.font_size * self.h_scale;
                                        self.tm = Mat::translation(tx, 0.0).then(self.tm);
                                        if adj < -TJ_WORD_GAP_THOUSANDTHS {
                                            self.flush_word();
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        self.flush_word();
    }
}

fn extract_page_words(
    doc: &Document,
    page_id: ObjectId,
    page_index: u32,
    page_height: f64,
    out: &mut Vec<Word>,
) -> Result<(), HighlightError> {
    let data = doc
        .get_page_content(page_id)
        .map_err(|e| HighlightError::Parse(e.to_string()))?;
    let content = Content::decode(&data).map_err(|e| HighlightError::Parse(e.to_string()))?;

    let fonts = page_fonts(doc, page_id);
    let mut walker = TextWalker::new(page_index, page_height, fonts, out);
    walker.run(&content);
    Ok(())
}

fn num(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn mat_from_args(args: &[Object]) -> Option<Mat> {
    if args.len() < 6 {
        return None;
    }
    Some(Mat {
        a: num(&args[0])?,
        b: num(&args[1])?,
        c: num(&args[2])?,
        d: num(&args[3])?,
        e: num(&args[4])?,
        f: num(&args[5])?,
    })
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look up a page attribute, walking the Parent chain for inheritable
/// keys (MediaBox, Resources).
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut id = page_id;
    loop {
        let dict = doc.get_object(id).ok()?.as_dict().ok()?;
        if let Ok(obj) = dict.get(key) {
            return Some(resolve(doc, obj));
        }
        id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
}

fn page_size_of(doc: &Document, page_id: ObjectId) -> (f64, f64) {
    // US Letter when no MediaBox is present anywhere in the tree
    let default = (612.0, 792.0);
    let media_box = match inherited(doc, page_id, b"MediaBox").and_then(|o| o.as_array().ok()) {
        Some(arr) if arr.len() >= 4 => arr,
        _ => return default,
    };
    let v: Vec<f64> = media_box
        .iter()
        .map(|o| num(resolve(doc, o)).unwrap_or(0.0))
        .collect();
    let width = (v[2] - v[0]).abs();
    let height = (v[3] - v[1]).abs();
    if width <= 0.0 || height <= 0.0 {
        default
    } else {
        (width, height)
    }
}

/// Resolve the /Widths tables of every font named in the page resources.
fn page_fonts(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, FontWidths> {
    let mut fonts = HashMap::new();
    let font_dict = match inherited(doc, page_id, b"Resources")
        .and_then(|o| o.as_dict().ok())
        .and_then(|r| r.get(b"Font").ok())
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    {
        Some(d) => d,
        None => return fonts,
    };

    for (name, obj) in font_dict.iter() {
        if let Some(widths) = font_widths(doc, resolve(doc, obj)) {
            fonts.insert(name.clone(), widths);
        }
    }
    fonts
}

fn font_widths(doc: &Document, font: &Object) -> Option<FontWidths> {
    let dict: &Dictionary = font.as_dict().ok()?;
    let first_char = dict
        .get(b"FirstChar")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0);
    let widths = dict
        .get(b"Widths")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|arr| {
            arr.iter()
                .map(|o| num(resolve(doc, o)).unwrap_or(DEFAULT_GLYPH_WIDTH))
                .collect()
        })
        .unwrap_or_default();
    Some(FontWidths { first_char, widths })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testpdf::synthetic_pdf;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_open_invalid_bytes_fails_fast() {
        let result = WordIndex::from_bytes(b"not a pdf at all");
        assert!(matches!(result, Err(HighlightError::FileOpen(_))));
    }

    #[test]
    fn test_page_count_and_sizes() {
        let pdf = synthetic_pdf(&[&["Hello world"], &["Second page"]]);
        let index = WordIndex::from_bytes(&pdf).unwrap();
        assert_eq!(index.page_count(), 2);
        assert_eq!(index.page_size(0), Some((612.0, 792.0)));
        assert_eq!(index.page_size(2), None);
    }

    #[test]
    fn test_words_extracted_in_order() {
        let pdf = synthetic_pdf(&[&["Hello world foo bar"]]);
        let index = WordIndex::from_bytes(&pdf).unwrap();
        let texts: Vec<&str> = index.words().iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "world", "foo", "bar"]);
    }

    #[test]
    fn test_words_carry_page_index() {
        let pdf = synthetic_pdf(&[&["alpha beta"], &["gamma"]]);
        let index = WordIndex::from_bytes(&pdf).unwrap();

        let page0: Vec<&str> = index
            .words_on_page(0)
            .iter()
            .map(|w| w.text.as_str())
            .collect();
        let page1: Vec<&str> = index
            .words_on_page(1)
            .iter()
            .map(|w| w.text.as_str())
            .collect();
        assert_eq!(page0, vec!["alpha", "beta"]);
        assert_eq!(page1, vec!["gamma"]);
        assert!(index.words_on_page(5).is_empty());
    }

    #[test]
    fn test_word_boxes_advance_left_to_right() {
        let pdf = synthetic_pdf(&[&["one two three"]]);
        let index = WordIndex::from_bytes(&pdf).unwrap();
        let words = index.words();
        assert_eq!(words.len(), 3);
        for w in words {
            assert!(w.bbox.x0 < w.bbox.x1, "degenerate box for {:?}", w.text);
            assert!(w.bbox.y0 < w.bbox.y1);
        }
        assert!(words[0].bbox.x1 <= words[1].bbox.x0);
        assert!(words[1].bbox.x1 <= words[2].bbox.x0);
    }

    #[test]
    fn test_lines_stack_top_down() {
        let pdf = synthetic_pdf(&[&["first line", "second line"]]);
        let index = WordIndex::from_bytes(&pdf).unwrap();
        let words = index.words();
        assert_eq!(words.len(), 4);
        // Top-left origin: the second line sits below the first
        assert!(words[2].bbox.y0 > words[0].bbox.y0);
        assert!((words[0].bbox.y0 - words[1].bbox.y0).abs() < 0.01);
    }

    #[test]
    fn test_boxes_lie_within_page() {
        let pdf = synthetic_pdf(&[&["Hello world", "and more text here"]]);
        let index = WordIndex::from_bytes(&pdf).unwrap();
        let (pw, ph) = index.page_size(0).unwrap();
        for w in index.words() {
            assert!(w.bbox.x0 >= 0.0 && w.bbox.x1 <= pw);
            assert!(w.bbox.y0 >= 0.0 && w.bbox.y1 <= ph);
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let pdf = synthetic_pdf(&[&["Hello"]]);
        let mut index = WordIndex::from_bytes(&pdf).unwrap();
        assert!(!index.is_closed());
        index.close();
        assert!(index.is_closed());
        index.close();
        assert!(index.is_closed());
        // Extracted data survives the close
        assert_eq!(index.words().len(), 1);
    }
}
