//! Format readers and the format → reader dispatch table.
//!
//! Each supported [`DocumentFormat`] maps to exactly one [`DocumentReader`]
//! through [`ReaderTable::reader_for`]. The default table wires in the real
//! implementations from [`crate::pipeline`]; tests swap any entry for a fake.

use crate::config::ConversionSettings;
use crate::document::ExtractedDocument;
use crate::error::ConversionError;
use crate::format::DocumentFormat;
use crate::pipeline::{doc::LibreOfficeDocReader, docx::DocxReader, pdf::PdfiumReader};
use async_trait::async_trait;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;

/// Extracts structured content from one kind of document.
///
/// Implementations must be `Send + Sync`: a single reader instance is
/// shared by every worker in a batch.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    /// Short identifier used in logs, e.g. `"pdfium"`.
    fn name(&self) -> &'static str;

    /// Read text, formatting and images from `path`.
    async fn read(&self, path: &Path) -> Result<ExtractedDocument, ConversionError>;

    /// Render every page to a bitmap at `dpi` for OCR.
    ///
    /// Flow formats have no fixed pages and return an empty list.
    async fn rasterize(
        &self,
        path: &Path,
        dpi: u32,
    ) -> Result<Vec<DynamicImage>, ConversionError> {
        let _ = (path, dpi);
        Ok(Vec::new())
    }
}

/// Explicit mapping from each format to its reader.
#[derive(Clone)]
pub struct ReaderTable {
    pdf: Arc<dyn DocumentReader>,
    doc: Arc<dyn DocumentReader>,
    docx: Arc<dyn DocumentReader>,
}

impl ReaderTable {
    pub fn new(
        pdf: Arc<dyn DocumentReader>,
        doc: Arc<dyn DocumentReader>,
        docx: Arc<dyn DocumentReader>,
    ) -> Self {
        Self { pdf, doc, docx }
    }

    /// The production readers configured from `settings`.
    pub fn from_settings(settings: &ConversionSettings) -> Self {
        Self {
            pdf: Arc::new(PdfiumReader::new(settings.pdfium_library.clone())),
            doc: Arc::new(LibreOfficeDocReader::new(settings.soffice_path.clone())),
            docx: Arc::new(DocxReader::new()),
        }
    }

    pub fn with_pdf(mut self, reader: Arc<dyn DocumentReader>) -> Self {
        self.pdf = reader;
        self
    }

    pub fn with_doc(mut self, reader: Arc<dyn DocumentReader>) -> Self {
        self.doc = reader;
        self
    }

    pub fn with_docx(mut self, reader: Arc<dyn DocumentReader>) -> Self {
        self.docx = reader;
        self
    }

    pub fn reader_for(&self, format: DocumentFormat) -> &Arc<dyn DocumentReader> {
        match format {
            DocumentFormat::Pdf => &self.pdf,
            DocumentFormat::Doc => &self.doc,
            DocumentFormat::Docx => &self.docx,
        }
    }
}

impl std::fmt::Debug for ReaderTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderTable")
            .field("pdf", &self.pdf.name())
            .field("doc", &self.doc.name())
            .field("docx", &self.docx.name())
            .finish()
    }
}
