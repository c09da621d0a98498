//! PDF reading via pdfium: text layer, embedded images, page rasterisation.
//!
//! pdfium is not async-safe, so every call runs inside
//! `tokio::task::spawn_blocking`. The library is bound per call from the
//! explicitly configured path (or the system library); a missing library
//! surfaces as `ExternalConverterMissing` for that file only.

use crate::document::{Block, EmbeddedImage, ExtractedDocument, ImageSource, Page, PageKind};
use crate::error::ConversionError;
use crate::reader::DocumentReader;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Longest edge of a rasterised page, whatever the DPI.
const MAX_RENDERED_PIXELS: f32 = 10_000.0;

/// PDF reader backed by the pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumReader {
    library: Option<PathBuf>,
}

impl PdfiumReader {
    /// `library` is the full path of the pdfium shared library; `None`
    /// binds the system-installed one.
    pub fn new(library: Option<PathBuf>) -> Self {
        Self { library }
    }
}

#[async_trait]
impl DocumentReader for PdfiumReader {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    async fn read(&self, path: &Path) -> Result<ExtractedDocument, ConversionError> {
        let path = path.to_path_buf();
        let library = self.library.clone();
        tokio::task::spawn_blocking(move || read_blocking(&path, library.as_deref()))
            .await
            .map_err(|e| ConversionError::unknown(format!("PDF read task panicked: {e}")))?
    }

    async fn rasterize(
        &self,
        path: &Path,
        dpi: u32,
    ) -> Result<Vec<DynamicImage>, ConversionError> {
        let path = path.to_path_buf();
        let library = self.library.clone();
        tokio::task::spawn_blocking(move || rasterize_blocking(&path, library.as_deref(), dpi))
            .await
            .map_err(|e| ConversionError::unknown(format!("PDF render task panicked: {e}")))?
    }
}

/// Bind to pdfium at `library`, or the system library when `None`.
pub fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, ConversionError> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ConversionError::ExternalConverterMissing {
        tool: "pdfium".to_string(),
        detail: format!(
            "{e:?}. Install libpdfium or pass --pdfium-lib /path/to/libpdfium"
        ),
    })?;
    Ok(Pdfium::new(bindings))
}

fn open<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, ConversionError> {
    pdfium.load_pdf_from_file(path, None).map_err(|e| {
        let detail = format!("{e:?}");
        if detail.contains("Password") || detail.contains("password") {
            ConversionError::corrupt(path, "PDF is encrypted and requires a password")
        } else {
            ConversionError::corrupt(path, detail)
        }
    })
}

fn read_blocking(path: &Path, library: Option<&Path>) -> Result<ExtractedDocument, ConversionError> {
    let pdfium = bind_pdfium(library)?;
    let document = open(&pdfium, path)?;

    let title = document
        .metadata()
        .get(PdfDocumentMetadataTagType::Title)
        .map(|t| t.value().trim().to_string())
        .filter(|v| !v.is_empty());

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let number = idx + 1;
        let text = page
            .text()
            .map_err(|e| ConversionError::corrupt(path, format!("page {number}: {e:?}")))?
            .all();

        let mut blocks = text_blocks(&text);

        let mut image_index = 0;
        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };
            image_index += 1;
            match image_object.get_raw_image() {
                Ok(image) => blocks.push(Block::Image(EmbeddedImage {
                    source: ImageSource::Bitmap(image),
                    alt: format!("Page {number} Image {image_index}"),
                })),
                Err(e) => warn!("Failed to extract image {image_index} on page {number}: {e:?}"),
            }
        }

        debug!("Page {}: {} chars, {} images", number, text.len(), image_index);
        pages.push(Page {
            number,
            kind: PageKind::Pdf,
            blocks,
            background: None,
        });
    }

    info!("PDF loaded: {} pages from {}", pages.len(), path.display());
    Ok(ExtractedDocument { title, pages })
}

fn rasterize_blocking(
    path: &Path,
    library: Option<&Path>,
    dpi: u32,
) -> Result<Vec<DynamicImage>, ConversionError> {
    let pdfium = bind_pdfium(library)?;
    let document = open(&pdfium, path)?;
    let scale = dpi as f32 / 72.0;

    let mut images = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let width = (page.width().value * scale).min(MAX_RENDERED_PIXELS);
        let height = (page.height().value * scale).min(MAX_RENDERED_PIXELS);
        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_maximum_height(height as i32);

        let bitmap = page.render_with_config(&config).map_err(|e| {
            ConversionError::corrupt(path, format!("rasterisation failed for page {}: {e:?}", idx + 1))
        })?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px at {} DPI",
            idx + 1,
            image.width(),
            image.height(),
            dpi
        );
        images.push(image);
    }
    Ok(images)
}

/// Split a page's text layer into paragraphs of lines.
///
/// Blank lines separate paragraphs; line breaks inside a paragraph are kept
/// because resume layouts rely on them (addresses, date ranges).
pub(crate) fn text_blocks(text: &str) -> Vec<Block> {
    let normalised = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut blocks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in normalised.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(Block::Lines(std::mem::take(&mut current)));
            }
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        blocks.push(Block::Lines(current));
    }
    blocks
}
