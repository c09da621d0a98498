//! Structured content passed from format readers to the HTML renderer.
//!
//! Readers never emit HTML themselves. They describe what they found
//! (headings, formatted runs, tables, images, page boundaries) and the
//! renderer in [`crate::pipeline::html`] decides how it looks. Plain-text
//! output is derived from the same structure so the `.txt` and `.html`
//! files never disagree about content.

use image::DynamicImage;

/// Everything a reader extracted from one source file.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    /// Document title from metadata, if any.
    pub title: Option<String>,
    /// Pages in reading order. Flow formats (DOCX) produce a single page.
    pub pages: Vec<Page>,
}

/// How a page is laid out in the rendered HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageKind {
    /// Continuous flow content with no page container.
    #[default]
    Flow,
    /// A PDF page rendered from its text layer.
    Pdf,
    /// A page whose text came from OCR.
    Ocr,
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    /// 1-indexed page number.
    pub number: usize,
    pub kind: PageKind,
    pub blocks: Vec<Block>,
    /// Faint page scan shown behind OCR text.
    pub background: Option<EmbeddedImage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

/// A run of text sharing one set of character properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Hex colour without `#`, e.g. `1F4E79`.
    pub color: Option<String>,
    /// Font size in points.
    pub size_pt: Option<f32>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Span {
            text: text.into(),
            ..Span::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum Block {
    Heading {
        level: u8,
        spans: Vec<Span>,
    },
    Paragraph {
        spans: Vec<Span>,
        align: Option<Alignment>,
    },
    ListItem {
        spans: Vec<Span>,
    },
    /// Rows of cell text; the first row renders as the header.
    Table {
        rows: Vec<Vec<String>>,
    },
    /// Consecutive text lines whose breaks must be kept (PDF text layer).
    Lines(Vec<String>),
    Image(EmbeddedImage),
}

/// Image payload, either decoded pixels or already-encoded bytes.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Decoded pixels; re-encoded as JPEG at the configured quality.
    Bitmap(DynamicImage),
    /// Encoded file bytes embedded as-is.
    Encoded { mime: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub source: ImageSource,
    pub alt: String,
}

fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

impl Block {
    /// The block's text without formatting. Images contribute nothing.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Heading { spans, .. }
            | Block::Paragraph { spans, .. }
            | Block::ListItem { spans } => spans_text(spans),
            Block::Table { rows } => rows
                .iter()
                .map(|r| r.join("\t"))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Lines(lines) => lines.join("\n"),
            Block::Image(_) => String::new(),
        }
    }
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Plain text of the whole document: blocks separated by blank lines,
    /// pages separated by a form feed line.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| {
                page.blocks
                    .iter()
                    .map(Block::plain_text)
                    .filter(|t| !t.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n\u{000C}\n\n")
    }

    /// Count of non-whitespace characters across all text blocks.
    ///
    /// Used to decide whether a PDF has a usable text layer.
    pub fn text_char_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| p.blocks.iter())
            .map(|b| b.plain_text().chars().filter(|c| !c.is_whitespace()).count())
            .sum()
    }
}
